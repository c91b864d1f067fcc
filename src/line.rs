use std::fmt::{Display, Formatter};

use crate::mask::{self, Mask};
use crate::point::{Frame, Point};
use crate::shape::Shape;

/// Cardinal direction of travel; lines never run diagonally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Up-screen, toward decreasing y.
    North,
    /// Down-screen, toward increasing y.
    South,
    /// Toward increasing x.
    East,
    /// Toward decreasing x.
    West,
}

impl Orientation {
    /// Unit step of this direction.
    pub const fn delta(self) -> Point {
        match self {
            Self::North => Point::new(0, -1),
            Self::South => Point::new(0, 1),
            Self::East => Point::new(1, 0),
            Self::West => Point::new(-1, 0),
        }
    }

    /// Reversed direction.
    pub const fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::South => Self::North,
            Self::East => Self::West,
            Self::West => Self::East,
        }
    }

    /// True for east/west travel.
    pub const fn is_horizontal(self) -> bool {
        matches!(self, Self::East | Self::West)
    }

    /// Unit step a quarter turn clockwise on screen from this direction.
    pub const fn perpendicular(self) -> Point {
        let d = self.delta();
        Point::new(-d.y, d.x)
    }
}

impl Display for Orientation {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let label = match self {
            Self::North => "north",
            Self::South => "south",
            Self::East => "east",
            Self::West => "west",
        };
        write!(f, "{label}")
    }
}

/// Which reference cells a line-to-line bearing is measured between.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AzimuthMode {
    /// Measure between the two center cells.
    Centroid,
    /// Measure between the two end cells.
    Endpoint,
}

/// Directed axis-aligned segment used for corridors and streets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Line {
    origin: Point,
    length: i32,
    orient: Orientation,
}

impl Line {
    /// Creates a segment from its starting cell, cell count and direction.
    pub fn new(origin: Point, length: i32, orient: Orientation) -> Self {
        debug_assert!(length >= 1, "Line length must be at least 1, got {length}");
        Self {
            origin,
            length,
            orient,
        }
    }

    /// Starting cell.
    pub const fn origin(&self) -> Point {
        self.origin
    }

    /// Number of cells covered.
    pub const fn length(&self) -> i32 {
        self.length
    }

    /// Direction of travel.
    pub const fn orient(&self) -> Orientation {
        self.orient
    }

    /// Final cell of the segment.
    pub fn endpoint(&self) -> Point {
        self.origin + self.orient.delta() * (self.length - 1)
    }

    /// Bearing from the other line's reference cell to this line's, per the
    /// requested mode.
    pub fn azimuth_to(&self, other: &Line, mode: AzimuthMode) -> f64 {
        let vector = match mode {
            AzimuthMode::Centroid => self.centroid() - other.centroid(),
            AzimuthMode::Endpoint => self.endpoint() - other.endpoint(),
        };
        vector.azimuth()
    }

    /// Cardinal direction leading closest from this line toward the other,
    /// classified at the fixed 45-degree diagonals.
    pub fn nearest_orientation(&self, other: &Line, mode: AzimuthMode) -> Orientation {
        let toward = match mode {
            AzimuthMode::Centroid => other.centroid() - self.centroid(),
            AzimuthMode::Endpoint => other.endpoint() - self.endpoint(),
        };
        let bearing = toward.azimuth();
        if bearing > 315.0 || bearing <= 45.0 {
            Orientation::South
        } else if bearing <= 135.0 {
            Orientation::East
        } else if bearing <= 225.0 {
            Orientation::North
        } else {
            Orientation::West
        }
    }
}

impl Shape for Line {
    fn min_frame(&self) -> Frame {
        let end = self.endpoint();
        Frame::new(self.origin.x.max(end.x) + 1, self.origin.y.max(end.y) + 1)
    }

    fn centroid(&self) -> Point {
        self.origin + self.orient.delta() * (self.length / 2)
    }

    fn mask_fill(&self, frame: Frame) -> Mask {
        let mut m = mask::empty(frame);
        for step in 0..self.length {
            mask::set(&mut m, self.origin + self.orient.delta() * step);
        }
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_and_centroid_follow_the_direction() {
        let line = Line::new(Point::new(2, 3), 5, Orientation::East);
        assert_eq!(line.endpoint(), Point::new(6, 3));
        assert_eq!(line.centroid(), Point::new(4, 3));

        let up = Line::new(Point::new(1, 9), 4, Orientation::North);
        assert_eq!(up.endpoint(), Point::new(1, 6));
        assert_eq!(up.centroid(), Point::new(1, 7));
    }

    #[test]
    fn min_frame_covers_westward_travel() {
        let line = Line::new(Point::new(5, 2), 4, Orientation::West);
        assert_eq!(line.min_frame(), Frame::new(6, 3));
        assert_eq!(mask::count_nonzero(&line.mask()), 4);
    }

    #[test]
    fn mask_marks_one_cell_per_step() {
        let line = Line::new(Point::new(0, 0), 3, Orientation::South);
        let m = line.mask();
        assert_eq!(mask::count_nonzero(&m), 3);
        assert!(mask::get(&m, Point::new(0, 2)));
    }

    #[test]
    fn nearest_orientation_buckets_at_the_diagonals() {
        let base = Line::new(Point::new(10, 10), 1, Orientation::East);
        let east = Line::new(Point::new(20, 10), 1, Orientation::East);
        let north = Line::new(Point::new(10, 0), 1, Orientation::East);
        let diagonal = Line::new(Point::new(20, 20), 1, Orientation::East);

        assert_eq!(
            base.nearest_orientation(&east, AzimuthMode::Centroid),
            Orientation::East
        );
        assert_eq!(
            base.nearest_orientation(&north, AzimuthMode::Endpoint),
            Orientation::North
        );
        // An exact southeast diagonal lands in the closed south bucket.
        assert_eq!(
            base.nearest_orientation(&diagonal, AzimuthMode::Centroid),
            Orientation::South
        );
    }

    #[test]
    fn perpendicular_rotates_a_quarter_turn() {
        assert_eq!(Orientation::East.perpendicular(), Point::new(0, 1));
        assert_eq!(Orientation::South.perpendicular(), Point::new(-1, 0));
    }
}
