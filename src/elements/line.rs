//! Line segment - edge, load and result geometry

use serde::{Deserialize, Serialize};

use crate::math::{Point, Vec3};

/// A straight segment between two 3D points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// Start point
    pub start: Point,
    /// End point
    pub end: Point,
}

impl Line {
    /// Create a new line from two points
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Create a line from raw coordinates
    pub fn from_coords(start: [f64; 3], end: [f64; 3]) -> Self {
        Self::new(Point::from(start), Point::from(end))
    }

    /// Create a line anchored at `anchor` spanning `vector`
    pub fn from_vector(anchor: Point, vector: Vec3) -> Self {
        Self::new(anchor, anchor + vector)
    }

    /// Vector from start to end
    pub fn vector(&self) -> Vec3 {
        self.end - self.start
    }

    /// Length of the segment
    pub fn length(&self) -> f64 {
        self.vector().norm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_vector() {
        let line = Line::from_coords([1.0, 0.0, 0.0], [1.0, 0.0, -10.0]);
        assert_eq!(line.vector(), Vec3::new(0.0, 0.0, -10.0));
        assert!((line.length() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_from_vector() {
        let line = Line::from_vector(Point::new(0.0, 1.0, 2.0), Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(line.end, Point::new(1.0, 2.0, 3.0));
    }
}
