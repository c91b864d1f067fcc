use std::fmt::{Display, Formatter};
use std::ops::{Add, Div, Mul, Sub};

/// Integer 2D grid coordinate.
///
/// Arithmetic returns new points; the type is `Copy` and never mutated in
/// place. Doubles as [`Frame`] when read as a (width, height) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Point {
    /// Horizontal coordinate, increasing rightward.
    pub x: i32,
    /// Vertical coordinate, increasing downward (screen convention).
    pub y: i32,
}

/// Minimum bounding grid size for a shape: one past the maximum occupied
/// coordinate in each axis.
pub type Frame = Point;

impl Point {
    /// Creates a point from its coordinates.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Taxicab distance to another point.
    pub fn manhattan_distance(self, other: Self) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Bearing of this point read as a vector, in degrees within [0, 360).
    ///
    /// 0° points south (screen-down, since y grows downward) and east sits at
    /// 90°, so a southeast diagonal comes out at 45°.
    pub fn azimuth(self) -> f64 {
        f64::from(self.x)
            .atan2(f64::from(self.y))
            .to_degrees()
            .rem_euclid(360.0)
    }

    /// True when `p` lies inside this point read as a frame.
    pub const fn contains(self, p: Point) -> bool {
        p.x >= 0 && p.y >= 0 && p.x < self.x && p.y < self.y
    }
}

impl Add for Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<i32> for Point {
    type Output = Self;

    fn mul(self, rhs: i32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<i32> for Point {
    type Output = Self;

    fn div(self, rhs: i32) -> Self {
        Self::new(self.x / rhs, self.y / rhs)
    }
}

impl Display for Point {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_returns_new_points() {
        let a = Point::new(3, -1);
        let b = Point::new(1, 4);
        assert_eq!(a + b, Point::new(4, 3));
        assert_eq!(a - b, Point::new(2, -5));
        assert_eq!(a * 3, Point::new(9, -3));
        assert_eq!(Point::new(9, 7) / 2, Point::new(4, 3));
    }

    #[test]
    fn manhattan_distance_sums_axis_deltas() {
        assert_eq!(Point::new(0, 0).manhattan_distance(Point::new(3, 4)), 7);
        assert_eq!(Point::new(-2, 1).manhattan_distance(Point::new(2, -1)), 6);
        assert_eq!(Point::new(5, 5).manhattan_distance(Point::new(5, 5)), 0);
    }

    #[test]
    fn azimuth_starts_south_and_winds_through_east() {
        assert!((Point::new(0, 1).azimuth() - 0.0).abs() < 1e-9);
        assert!((Point::new(1, 1).azimuth() - 45.0).abs() < 1e-9);
        assert!((Point::new(1, 0).azimuth() - 90.0).abs() < 1e-9);
        assert!((Point::new(0, -1).azimuth() - 180.0).abs() < 1e-9);
        assert!((Point::new(-1, 0).azimuth() - 270.0).abs() < 1e-9);
    }

    #[test]
    fn frame_containment_is_half_open() {
        let frame = Frame::new(4, 3);
        assert!(frame.contains(Point::new(0, 0)));
        assert!(frame.contains(Point::new(3, 2)));
        assert!(!frame.contains(Point::new(4, 2)));
        assert!(!frame.contains(Point::new(3, 3)));
        assert!(!frame.contains(Point::new(-1, 1)));
    }
}
