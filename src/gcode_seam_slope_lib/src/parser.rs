use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::command::{Code, Command, MachineState, Number, Parameter};

/// Comment put on any command that raises Z. Only a marker for humans
/// reading the output.
pub const Z_LIFT_COMMENT: &str = "Z lift";

// a letter followed by a non-negative integer, e.g. G1, M104
static COMMAND_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][0-9]+$").expect("command word regex"));

/// Parses one line. Never fails: anything unrecognized is carried through
/// verbatim, either as an opaque command or as a value-less flag.
pub fn parse_line(raw: &str, prior: &MachineState) -> Command {
    let line = raw.trim();
    let mut command = Command {
        code: None,
        parameters: vec![],
        comment: None,
        previous_state: *prior,
        line_number: None,
    };

    if line.is_empty() || line.starts_with(';') {
        command.code = Some(Code::Passthrough(line.to_owned()));
        return command;
    }

    let (body, comment) = match line.split_once(';') {
        Some((body, comment)) => (body.trim(), Some(comment.trim())),
        None => (line, None),
    };
    command.comment = comment.filter(|c| !c.is_empty()).map(str::to_owned);

    let mut tokens = body.split_whitespace();
    let word = tokens.next().unwrap_or_default();
    if !COMMAND_WORD.is_match(word) {
        command.code = Some(Code::Opaque(body.to_owned()));
        return command;
    }
    command.code = Some(Code::Word(word.to_owned()));
    command.parameters = tokens.map(parse_parameter).collect();

    if command.value("Z").is_some_and(|z| z > prior.z) {
        command.comment = Some(Z_LIFT_COMMENT.to_owned());
    }

    command
}

fn parse_parameter(token: &str) -> Parameter {
    let mut chars = token.chars();
    let name = chars.next().map(String::from).unwrap_or_default();
    match Number::parse(chars.as_str()) {
        Some(value) => Parameter { name, value: Some(value) },
        None => Parameter::flag(token),
    }
}

/// Parses a whole program, numbering lines from 1 and threading each
/// command's resulting state into the next.
pub fn parse_program(text: &str) -> Vec<Command> {
    let mut state = MachineState::default();
    let commands: Vec<Command> = text
        .lines()
        .enumerate()
        .map(|(index, line)| {
            let mut command = parse_line(line, &state);
            command.line_number = Some(index + 1);
            state = command.resulting_state();
            command
        })
        .collect();
    debug!("parsed {} lines", commands.len());
    commands
}
