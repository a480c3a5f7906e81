//! Command model: one parsed gcode line plus the machine state it starts from.

use std::fmt;

use crate::geometry::{planar_distance, Point2};
use crate::{Factor, Mm};

/// A parameter value exactly as it was read. Integers stay integers so that
/// things like `S215` or `T0` come back out unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> Mm {
        match self {
            Number::Int(i) => i as Mm,
            Number::Float(f) => f,
        }
    }

    /// Integer first, then float; `None` when neither parses.
    pub fn parse(s: &str) -> Option<Number> {
        if let Ok(i) = s.parse::<i64>() {
            return Some(Number::Int(i));
        }
        s.parse::<f64>().ok().map(Number::Float)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Float(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    // Usually one letter. A token whose value didn't parse keeps the whole
    // token here with no value.
    pub name: String,
    pub value: Option<Number>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: Mm) -> Parameter {
        Parameter { name: name.into(), value: Some(Number::Float(value)) }
    }

    pub fn flag(name: impl Into<String>) -> Parameter {
        Parameter { name: name.into(), value: None }
    }
}

/// Snapshot of everything the interpreter tracks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MachineState {
    pub x: Mm,
    pub y: Mm,
    pub z: Mm,
    pub e: Mm,
    pub feed_rate: Option<Mm>,
    pub extruder_temperature: Option<Mm>,
    pub bed_temperature: Option<Mm>,
    pub fan_speed: Option<Mm>,
    pub move_absolute: bool,
    pub extrude_absolute: bool,
}

impl Default for MachineState {
    fn default() -> Self {
        MachineState {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            e: 0.0,
            feed_rate: None,
            extruder_temperature: None,
            bed_temperature: None,
            fan_speed: None,
            move_absolute: true,
            extrude_absolute: true,
        }
    }
}

impl MachineState {
    pub fn xy(&self) -> Point2 {
        Point2 { x: self.x, y: self.y }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Code {
    /// `<letter><digits>`, e.g. `G1`, `M104`.
    Word(String),
    /// A line whose first token isn't a command word; kept verbatim.
    Opaque(String),
    /// A blank or `;` line, kept verbatim.
    Passthrough(String),
}

/// Linear moves, both travel and print.
const MOTION_WORDS: [&str; 2] = ["G0", "G1"];
const ARC_WORDS: [&str; 2] = ["G2", "G3"];

#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub code: Option<Code>,
    pub parameters: Vec<Parameter>,
    pub comment: Option<String>,
    // State before this command ran. Owned, never shared between commands.
    pub previous_state: MachineState,
    pub line_number: Option<usize>,
}

impl Command {
    /// A fresh `<word>` command with no parameters.
    pub fn word(word: &str, previous_state: MachineState) -> Command {
        Command {
            code: Some(Code::Word(word.to_owned())),
            parameters: vec![],
            comment: None,
            previous_state,
            line_number: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Command {
        self.comment = Some(comment.into());
        self
    }

    pub fn code_word(&self) -> Option<&str> {
        match &self.code {
            Some(Code::Word(w)) => Some(w.as_str()),
            _ => None,
        }
    }

    pub fn is_word(&self, word: &str) -> bool {
        self.code_word().is_some_and(|w| w.eq_ignore_ascii_case(word))
    }

    pub fn is_motion(&self) -> bool {
        MOTION_WORDS.iter().any(|w| self.is_word(w))
    }

    /// Clockwise or counter-clockwise arc. Only its end point and E are
    /// tracked; the arc itself is never measured or split.
    pub fn is_arc(&self) -> bool {
        ARC_WORDS.iter().any(|w| self.is_word(w))
    }

    pub fn toggles_move_mode(&self) -> bool {
        self.is_word("G90") || self.is_word("G91")
    }

    /// First parameter with this name, flag or not.
    pub fn param(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn value(&self, name: &str) -> Option<Mm> {
        self.param(name).and_then(|p| p.value).map(Number::as_f64)
    }

    pub fn has_value(&self, name: &str) -> bool {
        self.value(name).is_some()
    }

    /// Replaces the first parameter named `name`, or appends one.
    pub fn set_value(&mut self, name: &str, value: Mm) {
        match self.parameters.iter_mut().find(|p| p.name == name) {
            Some(p) => p.value = Some(Number::Float(value)),
            None => self.parameters.push(Parameter::new(name, value)),
        }
    }

    pub fn is_xy_move(&self) -> bool {
        self.is_motion() && (self.has_value("X") || self.has_value("Y"))
    }

    /// A line or arc with an E word, whatever its sign.
    pub fn carries_extrusion(&self) -> bool {
        (self.is_motion() || self.is_arc()) && self.has_value("E")
    }

    /// Filament fed by this command, independent of extrusion mode.
    pub fn extrusion_delta(&self) -> Mm {
        if !self.carries_extrusion() {
            return 0.0;
        }
        self.resulting_state().e - self.previous_state.e
    }

    pub fn is_extruding(&self) -> bool {
        self.extrusion_delta() > 0.0
    }

    /// Planar length of an XY move; 0 for anything else.
    pub fn move_length(&self) -> Mm {
        if !self.is_xy_move() {
            return 0.0;
        }
        let end = self.resulting_state();
        planar_distance(
            self.previous_state.xy(),
            self.has_value("X").then_some(end.x),
            self.has_value("Y").then_some(end.y),
        )
    }

    /// Extrusion per unit of planar length, 0 for a zero-length move.
    pub fn extrusion_rate(&self, extruded: Mm) -> Factor {
        let length = self.move_length();
        if length > 0.0 {
            extruded / length
        } else {
            0.0
        }
    }

    /// The state after this command runs, derived from `previous_state`.
    pub fn resulting_state(&self) -> MachineState {
        let mut s = self.previous_state;
        let Some(word) = self.code_word() else {
            return s;
        };
        let values = self
            .parameters
            .iter()
            .filter_map(|p| p.value.map(|v| (p.name.as_str(), v.as_f64())));

        match word.to_ascii_uppercase().as_str() {
            "G0" | "G1" | "G2" | "G3" => {
                for (name, v) in values {
                    match name {
                        "X" => s.x = if s.move_absolute { v } else { s.x + v },
                        "Y" => s.y = if s.move_absolute { v } else { s.y + v },
                        "Z" => s.z = if s.move_absolute { v } else { s.z + v },
                        "E" => s.e = if s.extrude_absolute { v } else { s.e + v },
                        "F" => s.feed_rate = Some(v),
                        _ => {}
                    }
                }
            }
            "G28" => {
                let mut home_all = true;
                for p in &self.parameters {
                    match p.name.as_str() {
                        "X" => s.x = 0.0,
                        "Y" => s.y = 0.0,
                        "Z" => s.z = 0.0,
                        _ => continue,
                    }
                    home_all = false;
                }
                if home_all {
                    s.x = 0.0;
                    s.y = 0.0;
                    s.z = 0.0;
                    s.e = 0.0;
                    s.feed_rate = None;
                }
            }
            "G92" => {
                for (name, v) in values {
                    match name {
                        "X" => s.x = v,
                        "Y" => s.y = v,
                        "Z" => s.z = v,
                        "E" => s.e = v,
                        _ => {}
                    }
                }
            }
            "M104" | "M109" => {
                if let Some(t) = self.value("S") {
                    s.extruder_temperature = Some(t);
                }
            }
            "M140" | "M190" => {
                if let Some(t) = self.value("S") {
                    s.bed_temperature = Some(t);
                }
            }
            "M106" => {
                if let Some(speed) = self.value("S") {
                    s.fan_speed = Some(speed);
                }
            }
            "M107" => s.fan_speed = Some(0.0),
            "G90" => s.move_absolute = true,
            "G91" => s.move_absolute = false,
            "M82" => s.extrude_absolute = true,
            "M83" => s.extrude_absolute = false,
            _ => {}
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g1(params: &[(&str, Mm)], previous_state: MachineState) -> Command {
        let mut c = Command::word("G1", previous_state);
        for (name, v) in params {
            c.set_value(name, *v);
        }
        c
    }

    #[test]
    fn absolute_and_relative_moves() {
        let abs = g1(&[("X", 10.0), ("E", 2.0)], MachineState { x: 4.0, e: 1.0, ..Default::default() });
        let s = abs.resulting_state();
        assert_eq!(s.x, 10.0);
        assert_eq!(s.e, 2.0);

        let rel_state = MachineState { x: 4.0, e: 1.0, move_absolute: false, extrude_absolute: false, ..Default::default() };
        let s = g1(&[("X", 10.0), ("E", 2.0)], rel_state).resulting_state();
        assert_eq!(s.x, 14.0);
        assert_eq!(s.e, 3.0);
    }

    #[test]
    fn feed_rate_is_always_absolute() {
        let prev = MachineState { feed_rate: Some(100.0), move_absolute: false, ..Default::default() };
        assert_eq!(g1(&[("F", 1500.0)], prev).resulting_state().feed_rate, Some(1500.0));
    }

    #[test]
    fn home_named_axes_only() {
        let prev = MachineState { x: 5.0, y: 6.0, z: 7.0, e: 8.0, feed_rate: Some(300.0), ..Default::default() };
        let mut home_x = Command::word("G28", prev);
        home_x.parameters.push(Parameter::flag("X"));
        let s = home_x.resulting_state();
        assert_eq!((s.x, s.y, s.z, s.e), (0.0, 6.0, 7.0, 8.0));
        assert_eq!(s.feed_rate, Some(300.0));

        let s = Command::word("G28", prev).resulting_state();
        assert_eq!((s.x, s.y, s.z, s.e), (0.0, 0.0, 0.0, 0.0));
        assert_eq!(s.feed_rate, None);
    }

    #[test]
    fn set_position_ignores_mode() {
        let prev = MachineState { e: 12.0, extrude_absolute: false, ..Default::default() };
        let mut c = Command::word("G92", prev);
        c.set_value("E", 0.0);
        assert_eq!(c.resulting_state().e, 0.0);
        assert!(!c.carries_extrusion());
    }

    #[test]
    fn temperatures_and_fan() {
        let mut c = Command::word("M109", MachineState::default());
        c.set_value("S", 215.0);
        assert_eq!(c.resulting_state().extruder_temperature, Some(215.0));

        let mut c = Command::word("M140", MachineState::default());
        c.set_value("S", 60.0);
        assert_eq!(c.resulting_state().bed_temperature, Some(60.0));

        let mut c = Command::word("M106", MachineState::default());
        c.set_value("S", 255.0);
        let s = c.resulting_state();
        assert_eq!(s.fan_speed, Some(255.0));
        assert_eq!(Command::word("M107", s).resulting_state().fan_speed, Some(0.0));
    }

    #[test]
    fn mode_toggles_only_flip_flags() {
        let prev = MachineState { x: 3.0, ..Default::default() };
        let s = Command::word("G91", prev).resulting_state();
        assert!(!s.move_absolute);
        assert_eq!(s.x, 3.0);
        let s = Command::word("M83", s).resulting_state();
        assert!(!s.extrude_absolute);
        assert!(!s.move_absolute);
    }

    #[test]
    fn move_length_and_extrusion_delta() {
        let prev = MachineState { x: 0.0, y: 0.0, e: 5.0, ..Default::default() };
        let c = g1(&[("X", 3.0), ("Y", 4.0), ("E", 6.0)], prev);
        assert_eq!(c.move_length(), 5.0);
        assert_eq!(c.extrusion_delta(), 1.0);
        assert!(c.is_extruding());

        let z_only = g1(&[("Z", 0.4)], prev);
        assert!(!z_only.is_xy_move());
        assert_eq!(z_only.move_length(), 0.0);
    }

    #[test]
    fn arcs_move_and_extrude_but_have_no_length() {
        let prev = MachineState { x: 1.0, e: 1.0, ..Default::default() };
        let mut arc = Command::word("G2", prev);
        for (name, v) in [("X", 2.0), ("Y", 1.0), ("I", 1.0), ("J", 0.0), ("E", 2.0)] {
            arc.set_value(name, v);
        }
        let s = arc.resulting_state();
        assert_eq!((s.x, s.y, s.e), (2.0, 1.0, 2.0));
        assert!(arc.is_arc());
        assert!(arc.carries_extrusion());
        assert_eq!(arc.extrusion_delta(), 1.0);
        assert!(!arc.is_xy_move());
        assert_eq!(arc.move_length(), 0.0);
    }

    #[test]
    fn set_value_replaces_first_match() {
        let mut c = Command::word("G1", MachineState::default());
        c.parameters.push(Parameter::new("X", 1.0));
        c.parameters.push(Parameter::new("X", 2.0));
        c.set_value("X", 9.0);
        assert_eq!(c.parameters[0].value, Some(Number::Float(9.0)));
        assert_eq!(c.parameters[1].value, Some(Number::Float(2.0)));
        c.set_value("E", 0.5);
        assert_eq!(c.parameters.last().map(|p| p.name.as_str()), Some("E"));
    }

    #[test]
    fn clones_are_independent() {
        let original = g1(&[("X", 1.0)], MachineState::default());
        let mut copy = original.clone();
        copy.set_value("X", 2.0);
        copy.previous_state.z = 9.0;
        assert_eq!(original.value("X"), Some(1.0));
        assert_eq!(original.previous_state.z, 0.0);
    }
}
