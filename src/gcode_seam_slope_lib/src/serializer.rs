use std::fmt::{self, Write};

use crate::command::{Code, Command, Parameter};
use crate::Mm;

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut line = String::new();
        match &self.code {
            Some(Code::Passthrough(text)) => return f.write_str(text),
            Some(Code::Opaque(text)) => line.push_str(text),
            Some(Code::Word(word)) => {
                line.push_str(word);
                for p in &self.parameters {
                    line.push(' ');
                    write_parameter(&mut line, p)?;
                }
            }
            None => {}
        }
        if let Some(comment) = self.comment.as_deref().filter(|c| !c.is_empty()) {
            if line.is_empty() {
                write!(line, "; {}", comment)?;
            } else {
                write!(line, " ; {}", comment)?;
            }
        }
        f.write_str(&line)
    }
}

fn write_parameter(out: &mut String, p: &Parameter) -> fmt::Result {
    let Some(value) = p.value else {
        out.push_str(&p.name);
        return Ok(());
    };
    match p.name.as_str() {
        "X" | "Y" => write!(out, "{}{}", p.name, round_to(value.as_f64(), 3)),
        "Z" => write!(out, "Z{}", fixed_trimmed(value.as_f64(), 3)),
        "E" => write!(out, "E{}", fixed_trimmed(value.as_f64(), 2)),
        _ => write!(out, "{}{}", p.name, value),
    }
}

pub(crate) fn round_to(v: Mm, decimals: i32) -> Mm {
    let scale = 10f64.powi(decimals);
    // + 0.0 turns -0.0 into 0.0
    (v * scale).round() / scale + 0.0
}

/// Fixed-point with trailing zeros and a dangling `.` removed.
fn fixed_trimmed(v: Mm, decimals: usize) -> String {
    let s = format!("{:.*}", decimals, v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    match s {
        "-0" | "" => "0".to_owned(),
        _ => s.to_owned(),
    }
}

/// One line per command, each terminated by `\n`.
pub fn serialize_program(commands: &[Command]) -> String {
    let mut out = String::new();
    for command in commands {
        // writing into a String can't fail
        let _ = writeln!(out, "{}", command);
    }
    out
}
