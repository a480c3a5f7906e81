//! Turns one closed loop into a stepped ramp, so the layer change at its
//! seam is spread over the whole loop instead of happening in one jump.
//!
//! The loop is walked in N steps, each taking an even share of the path
//! still left, so a move kept whole rather than split into a tiny leftover
//! only shortens the steps after it. Step `i` is printed twice: once
//! rising, at `base + i * layer_height / N` with `i/N` of the filament, and
//! once more later at the finished height with the rest. The final step's second pass would carry no filament and
//! is left out.

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::command::Command;
use crate::error::GeometryError;
use crate::geometry::split_move;
use crate::loops::path_length;
use crate::serializer::round_to;
use crate::{Factor, Mm};

pub const START_SLOPE_COMMENT: &str = "Move nozzle in start slope position";

// Budget left below this counts as used up.
const LENGTH_EPSILON: Mm = 1e-6;

/// Replacement commands for `loop_commands`, or `None` when the loop should
/// be left as it is: nothing in it extrudes, it moves in relative mode, or
/// it switches move mode part way.
///
/// Every XY move in the loop must already use relative extrusion.
pub fn synthesize_slope(
    loop_commands: &[Command],
    layer_height: Mm,
    steps: u32,
    min_fragment: Mm,
) -> Result<Option<Vec<Command>>, GeometryError> {
    let Some(first_move) = loop_commands.iter().find(|c| c.is_xy_move() && c.is_extruding()) else {
        debug!("no extruding move in loop, left alone");
        return Ok(None);
    };
    if steps == 0 {
        return Ok(None);
    }
    if loop_commands.iter().any(Command::toggles_move_mode)
        || loop_commands.iter().any(|c| c.is_xy_move() && !c.previous_state.move_absolute)
    {
        warn!(line = ?first_move.line_number, "loop uses relative moves, left alone");
        return Ok(None);
    }
    if let Some(absolute) = loop_commands.iter().find(|c| c.is_xy_move() && c.previous_state.extrude_absolute) {
        return Err(GeometryError::AbsoluteExtrusion { line: absolute.line_number });
    }

    let finish_height = first_move.resulting_state().z;
    let base_height = finish_height - layer_height;
    let step_height = layer_height / steps as Mm;
    let mut remaining = path_length(loop_commands);

    let mut start = Command::word("G1", loop_commands[0].previous_state).with_comment(START_SLOPE_COMMENT);
    start.set_value("Z", base_height + step_height);

    let mut increase = vec![start];
    let mut decrease = vec![];
    let mut queue: VecDeque<Command> = loop_commands.iter().cloned().collect();
    let mut moves_left = queue.iter().filter(|c| c.is_xy_move()).count();

    for step in 1..=steps {
        // a move kept whole in an earlier step shortens the steps after it
        let mut budget = remaining / (steps - step + 1) as Mm;
        let mut consumed = vec![];
        while budget > LENGTH_EPSILON {
            let Some(front) = queue.pop_front() else {
                debug!(step, budget, "loop used up before the step was");
                break;
            };
            // feed rate changes and the like ride along without using length
            if !front.is_xy_move() {
                increase.push(front);
                continue;
            }
            moves_left -= 1;
            let length = front.move_length();
            let overshoot = length - budget;
            // the last move is never swallowed whole while steps remain
            let keep_tail = step < steps && moves_left == 0 && overshoot > LENGTH_EPSILON;
            if overshoot > min_fragment || keep_tail {
                let (head, tail) = split_move(&front, budget)?;
                budget -= head.move_length();
                remaining -= head.move_length();
                consumed.push(head);
                queue.push_front(tail);
                moves_left += 1;
            } else {
                budget -= length;
                remaining -= length;
                consumed.push(front);
            }
        }

        let share = step as Factor / steps as Factor;
        let rising_height = base_height + step_height * step as Mm;
        for original in &consumed {
            let extruded = original.value("E").unwrap_or(0.0);
            let rising_extruded = extruded * share;
            increase.push(sibling(original, rising_height, rising_extruded, "increase"));
            if step != steps {
                decrease.push(sibling(original, finish_height, extruded - rising_extruded, "decrease"));
            }
        }
    }

    if !queue.is_empty() {
        debug!(left = queue.len(), "commands left after the last step");
    }
    increase.extend(queue);
    increase.extend(decrease);
    Ok(Some(increase))
}

/// Copy of `original` over the same XY path at `height`, feeding `extruded`.
fn sibling(original: &Command, height: Mm, extruded: Mm, direction: &str) -> Command {
    let mut c = original.clone();
    c.set_value("Z", height);
    c.set_value("E", extruded);
    let length = c.move_length();
    let rate = c.extrusion_rate(extruded);
    c.comment = Some(format!("Slope {}. Length={} R={}", direction, round_to(length, 3), round_to(rate, 3)));
    c
}
