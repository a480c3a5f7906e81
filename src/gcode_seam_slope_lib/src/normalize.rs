use tracing::{debug, info};

use crate::command::{Command, MachineState};

pub const RELATIVE_EXTRUSION_COMMENT: &str = "enable relative extrude mode";

/// Rewrites the log so every extrusion is a relative `E` delta.
///
/// An `M83` goes in right before the first motion command, every `M82` is
/// dropped, and the state chain is rebuilt from scratch. A log without any
/// motion command comes back unchanged.
pub fn normalize_extrusion(commands: Vec<Command>) -> Vec<Command> {
    let Some(first_motion) = commands.iter().position(|c| c.is_motion() || c.is_arc()) else {
        debug!("no motion command, extrusion mode left alone");
        return commands;
    };
    info!("converting extrusion to relative mode");

    let mut normalized = Vec::with_capacity(commands.len() + 1);
    let mut state = MachineState::default();
    let mut dropped = 0usize;
    for (index, mut command) in commands.into_iter().enumerate() {
        if index == first_motion {
            let enable = Command::word("M83", state).with_comment(RELATIVE_EXTRUSION_COMMENT);
            state = enable.resulting_state();
            normalized.push(enable);
        }
        if command.is_word("M82") {
            dropped += 1;
            continue;
        }
        if command.carries_extrusion() {
            // delta taken on the original chain, before re-threading
            let delta = command.extrusion_delta();
            command.set_value("E", delta);
        }
        command.previous_state = state;
        state = command.resulting_state();
        normalized.push(command);
    }

    debug!("dropped {} absolute extrusion commands", dropped);
    normalized
}
