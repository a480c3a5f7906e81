//! Closed perimeter detection.

use tracing::{debug, info};

use crate::command::{Code, Command};
use crate::Mm;

/// What the slicer said it was printing, from its `;TYPE:` comments.
///
/// Reported alongside each loop; nothing treats the kinds differently yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtrusionRole {
    #[default]
    Regular,
    Perimeter,
    ExternalPerimeter,
    OverhangPerimeter,
    BridgeInfill,
    SolidInfill,
    TopSolidInfill,
}

impl ExtrusionRole {
    /// Role announced by a `;TYPE:...` comment line, if this is one.
    pub fn from_type_comment(command: &Command) -> Option<ExtrusionRole> {
        let Some(Code::Passthrough(text)) = &command.code else {
            return None;
        };
        let kind = text.strip_prefix(";TYPE:")?.trim();
        Some(match kind {
            "Perimeter" | "Inner wall" => ExtrusionRole::Perimeter,
            "External perimeter" | "Outer wall" => ExtrusionRole::ExternalPerimeter,
            "Overhang perimeter" | "Overhang wall" => ExtrusionRole::OverhangPerimeter,
            "Bridge infill" => ExtrusionRole::BridgeInfill,
            "Solid infill" | "Internal solid infill" => ExtrusionRole::SolidInfill,
            "Top solid infill" | "Top surface" => ExtrusionRole::TopSolidInfill,
            _ => ExtrusionRole::Regular,
        })
    }
}

/// Inclusive index range of a closed loop within a command log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopRange {
    pub start: usize,
    pub end: usize,
    pub role: ExtrusionRole,
}

/// Summed planar length of every XY move in `commands`.
pub fn path_length(commands: &[Command]) -> Mm {
    commands.iter().map(Command::move_length).sum()
}

/// Finds runs of extruding XY moves above the first layer that end near
/// where they started and are longer than `min_length`.
///
/// A run starts at an extruding XY move and ends at the last extruding XY
/// move before the next non-extruding XY move. Other commands inside a run
/// don't interrupt it. A run still open when the log ends is dropped. The
/// returned ranges are disjoint and in ascending order.
pub fn find_closed_loops(commands: &[Command], max_gap: Mm, min_length: Mm, first_layer_height: Mm) -> Vec<LoopRange> {
    let mut loops = vec![];
    let mut role = ExtrusionRole::Regular;
    let mut open: Option<LoopRange> = None;

    for (index, command) in commands.iter().enumerate() {
        if let Some(announced) = ExtrusionRole::from_type_comment(command) {
            role = announced;
            continue;
        }
        if !command.is_xy_move() {
            continue;
        }
        if command.is_extruding() {
            match open.as_mut() {
                Some(candidate) => candidate.end = index,
                None if command.resulting_state().z > first_layer_height => {
                    open = Some(LoopRange { start: index, end: index, role });
                }
                None => {}
            }
            continue;
        }
        let Some(candidate) = open.take() else {
            continue;
        };

        let first = &commands[candidate.start];
        let last = &commands[candidate.end];
        let gap = (last.resulting_state().xy() - first.previous_state.xy()).norm();
        if gap >= max_gap {
            debug!(start = candidate.start, end = candidate.end, gap, "loop ends too far from its start");
            continue;
        }
        let length = path_length(&commands[candidate.start..=candidate.end]);
        if length <= min_length {
            debug!(start = candidate.start, end = candidate.end, length, "loop too short");
            continue;
        }
        debug!(start = candidate.start, end = candidate.end, length, role = ?candidate.role, "found loop number {}", loops.len() + 1);
        loops.push(candidate);
    }

    info!("found {} closed loops", loops.len());
    loops
}
