use std::ops;

use crate::command::Command;
use crate::error::GeometryError;
use crate::{Factor, Mm};

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Point2 {
    pub x: Mm,
    pub y: Mm,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Vec2 {
    pub x: Mm,
    pub y: Mm,
}

impl Vec2 {
    pub fn norm(&self) -> Mm {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn normalized(&self) -> Result<Vec2, GeometryError> {
        let norm = self.norm();
        if norm == 0.0 {
            return Err(GeometryError::ZeroLengthVector);
        }
        Ok(*self / norm)
    }
}

impl ops::Add<Vec2> for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2 { x: self.x + rhs.x, y: self.y + rhs.y }
    }
}

impl ops::Add<Vec2> for Point2 {
    type Output = Point2;

    fn add(self, rhs: Vec2) -> Point2 {
        Point2 { x: self.x + rhs.x, y: self.y + rhs.y }
    }
}

impl ops::Sub<Vec2> for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2 { x: self.x - rhs.x, y: self.y - rhs.y }
    }
}

impl ops::Sub<Point2> for Point2 {
    type Output = Vec2;

    fn sub(self, rhs: Point2) -> Vec2 {
        Vec2 { x: self.x - rhs.x, y: self.y - rhs.y }
    }
}

impl ops::Mul<Factor> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: Factor) -> Vec2 {
        Vec2 { x: self.x * rhs, y: self.y * rhs }
    }
}

impl ops::Div<Factor> for Vec2 {
    type Output = Vec2;

    fn div(self, rhs: Factor) -> Vec2 {
        Vec2 { x: self.x / rhs, y: self.y / rhs }
    }
}

/// Distance in the XY plane. A missing target coordinate means no
/// movement along that axis.
pub fn planar_distance(from: Point2, to_x: Option<Mm>, to_y: Option<Mm>) -> Mm {
    let to = Point2 { x: to_x.unwrap_or(from.x), y: to_y.unwrap_or(from.y) };
    (to - from).norm()
}

/// Splits an XY move `distance` along its path into two moves that together
/// cover the same path and feed the same filament, the filament being
/// shared in proportion to length.
///
/// The move must use relative extrusion; the second piece starts from the
/// first piece's resulting state.
pub fn split_move(command: &Command, distance: Mm) -> Result<(Command, Command), GeometryError> {
    if !command.is_xy_move() {
        return Err(GeometryError::NotAnXyMove { line: command.line_number });
    }
    if command.previous_state.extrude_absolute {
        return Err(GeometryError::AbsoluteExtrusion { line: command.line_number });
    }

    let start = command.previous_state.xy();
    let end = command.resulting_state().xy();
    let direction = (end - start).normalized()?;
    let split_point = start + direction * distance;

    let length = command.move_length();
    let ratio = distance / length;
    let extruded = command.value("E").unwrap_or(0.0);
    let first_extruded = extruded * ratio;

    let mut first = command.clone();
    let mut second = command.clone();
    if command.previous_state.move_absolute {
        first.set_value("X", split_point.x);
        first.set_value("Y", split_point.y);
    } else {
        let head = split_point - start;
        let tail = end - split_point;
        first.set_value("X", head.x);
        first.set_value("Y", head.y);
        second.set_value("X", tail.x);
        second.set_value("Y", tail.y);
        // A relative Z step happens once, on the first piece.
        if second.has_value("Z") {
            second.set_value("Z", 0.0);
        }
    }
    if command.has_value("E") {
        first.set_value("E", first_extruded);
        second.set_value("E", extruded - first_extruded);
    }
    second.previous_state = first.resulting_state();

    Ok((first, second))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::MachineState;

    const EPSILON: Mm = 1e-9;

    fn relative_extrusion() -> MachineState {
        MachineState { extrude_absolute: false, ..Default::default() }
    }

    fn g1_xy_e(x: Mm, y: Mm, e: Mm, previous_state: MachineState) -> Command {
        let mut c = Command::word("G1", previous_state);
        c.set_value("X", x);
        c.set_value("Y", y);
        c.set_value("E", e);
        c
    }

    #[test]
    fn vector_arithmetic() {
        let a = Point2 { x: 1.0, y: 2.0 };
        let b = Point2 { x: 4.0, y: 6.0 };
        let v = b - a;
        assert_eq!(v, Vec2 { x: 3.0, y: 4.0 });
        assert_eq!(v.norm(), 5.0);
        assert_eq!(a + v, b);
        assert_eq!(v * 2.0, Vec2 { x: 6.0, y: 8.0 });
        assert_eq!(v + v - v, v);
        let unit = v.normalized().unwrap();
        assert!((unit.norm() - 1.0).abs() < EPSILON);
    }

    #[test]
    fn zero_vector_cannot_be_normalized() {
        assert_eq!(Vec2::default().normalized(), Err(GeometryError::ZeroLengthVector));
    }

    #[test]
    fn missing_coordinate_means_no_displacement() {
        let from = Point2 { x: 1.0, y: 1.0 };
        assert_eq!(planar_distance(from, Some(4.0), None), 3.0);
        assert_eq!(planar_distance(from, None, Some(-1.0)), 2.0);
        assert_eq!(planar_distance(from, None, None), 0.0);
    }

    #[test]
    fn split_conserves_length_and_extrusion() {
        let m = g1_xy_e(10.0, 0.0, 2.0, relative_extrusion());
        let (a, b) = split_move(&m, 2.5).unwrap();
        assert!((a.move_length() - 2.5).abs() < EPSILON);
        assert!((b.move_length() - 7.5).abs() < EPSILON);
        assert!((a.value("E").unwrap() - 0.5).abs() < EPSILON);
        assert!((a.value("E").unwrap() + b.value("E").unwrap() - 2.0).abs() < EPSILON);
        assert_eq!(b.previous_state, a.resulting_state());
        assert_eq!(b.resulting_state().xy(), m.resulting_state().xy());
    }

    #[test]
    fn split_under_relative_moves_keeps_displacement() {
        let prev = MachineState { x: 1.0, y: 1.0, move_absolute: false, extrude_absolute: false, ..Default::default() };
        let m = g1_xy_e(0.0, 4.0, 1.0, prev);
        let (a, b) = split_move(&m, 1.0).unwrap();
        assert_eq!(a.value("Y"), Some(1.0));
        assert_eq!(b.value("Y"), Some(3.0));
        assert_eq!(b.resulting_state().xy(), Point2 { x: 1.0, y: 5.0 });
    }

    #[test]
    fn split_requires_relative_extrusion() {
        let m = g1_xy_e(10.0, 0.0, 2.0, MachineState::default());
        assert!(matches!(split_move(&m, 1.0), Err(GeometryError::AbsoluteExtrusion { .. })));
    }

    #[test]
    fn split_of_zero_length_move_fails() {
        let prev = MachineState { x: 3.0, y: 3.0, ..relative_extrusion() };
        let m = g1_xy_e(3.0, 3.0, 0.1, prev);
        assert_eq!(split_move(&m, 0.5), Err(GeometryError::ZeroLengthVector));
    }
}
