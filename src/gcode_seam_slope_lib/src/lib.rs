//! Hides perimeter seams in 3D printer gcode by turning each loop's layer
//! change into a gradual ramp.
//!
//! The pipeline is parse → relative extrusion → closed loop detection →
//! sloping each loop → splice → serialize. Everything works on whole,
//! already-read text; only [`process_file`] touches the filesystem.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info};

pub mod command;
pub mod config;
pub mod error;
pub mod geometry;
pub mod loops;
pub mod normalize;
pub mod parser;
pub mod serializer;
pub mod slope;

pub use command::{Code, Command, MachineState, Number, Parameter};
pub use config::SlopeConfig;
pub use error::{ConfigError, Error, GeometryError, Result};
pub use geometry::{planar_distance, split_move, Point2, Vec2};
pub use loops::{find_closed_loops, path_length, ExtrusionRole, LoopRange};
pub use normalize::normalize_extrusion;
pub use parser::{parse_line, parse_program};
pub use serializer::serialize_program;
pub use slope::synthesize_slope;

// This way we can switch float width in one place if it ever matters.
pub use f64 as Mm;
pub use f64 as Factor;

/// Normalizes extrusion, then replaces every closed loop with its sloped
/// version. Loops the synthesizer declines are kept as they were. The
/// result is a threaded log again: each command starts from the state the
/// one before it left behind.
pub fn process_commands(commands: Vec<Command>, config: &SlopeConfig) -> Result<Vec<Command>, GeometryError> {
    let commands = normalize_extrusion(commands);
    let loops = find_closed_loops(
        &commands,
        config.max_loop_gap,
        config.min_loop_length,
        config.first_layer_height,
    );

    let mut output = Vec::with_capacity(commands.len());
    let mut cursor = 0;
    for (number, range) in loops.iter().enumerate() {
        output.extend_from_slice(&commands[cursor..range.start]);
        let original = &commands[range.start..=range.end];
        match synthesize_slope(original, config.layer_height, config.slope_steps, config.min_fragment_length)? {
            Some(sloped) => {
                debug!(role = ?range.role, "added a slope to perimeter {}", number);
                output.extend(sloped);
            }
            None => output.extend_from_slice(original),
        }
        cursor = range.end + 1;
    }
    output.extend_from_slice(&commands[cursor..]);

    // siblings still carry the state of the move they were copied from
    let mut state = output.first().map(|c| c.previous_state).unwrap_or_default();
    for command in &mut output {
        command.previous_state = state;
        state = command.resulting_state();
    }
    Ok(output)
}

/// Text in, text out.
pub fn process_text(text: &str, config: &SlopeConfig) -> Result<String> {
    config.validate()?;

    let before_parse = Instant::now();
    let commands = parse_program(text);
    info!("read {} lines - elapsed: {:.2?}", commands.len(), before_parse.elapsed());

    let before_slope = Instant::now();
    let commands = process_commands(commands, config)?;
    info!("done sloping - commands: {} elapsed: {:.2?}", commands.len(), before_slope.elapsed());

    Ok(serialize_program(&commands))
}

/// Reads `input`, slopes it and writes `output`. `output` may be the same
/// path as `input`: nothing is overwritten until the complete output is
/// on disk next to it.
pub fn process_file(input: &Path, output: &Path, config: &SlopeConfig) -> Result<()> {
    let text = fs::read_to_string(input)?;
    let processed = process_text(&text, config)?;

    let mut tmp_output = PathBuf::from(output).into_os_string();
    tmp_output.push(".tmp");
    fs::write(&tmp_output, processed)?;
    fs::rename(&tmp_output, output)?;
    info!("wrote {}", output.display());
    Ok(())
}
