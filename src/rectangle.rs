use std::fmt::{Display, Formatter};

use crate::line::Orientation;
use crate::mask::{self, Mask};
use crate::point::{Frame, Point};
use crate::shape::Shape;

/// Axis-aligned room or building primitive, cornered at its northwest cell.
///
/// Corner cells, the four corner-free wall cell runs and the wall-facing
/// boundary bearings are precomputed at construction.
#[derive(Clone, Debug, PartialEq)]
pub struct Rectangle {
    origin: Point,
    width: i32,
    height: i32,
    corners: [Point; 4],
    edge_north: Vec<Point>,
    edge_south: Vec<Point>,
    edge_east: Vec<Point>,
    edge_west: Vec<Point>,
    // Bearings of the SE, NE, NW and SW corners from the centroid; these
    // bound which wall faces a given direction, and shift away from the
    // 45-degree diagonals for non-square rectangles.
    wall_bounds: [f64; 4],
}

impl Rectangle {
    /// Creates a rectangle from its northwest corner and dimensions.
    pub fn new(origin: Point, width: i32, height: i32) -> Self {
        debug_assert!(
            width > 0 && height > 0,
            "Rectangle dimensions must be positive, got {width}x{height}"
        );
        let mut rect = Self {
            origin,
            width,
            height,
            corners: [origin; 4],
            edge_north: Vec::new(),
            edge_south: Vec::new(),
            edge_east: Vec::new(),
            edge_west: Vec::new(),
            wall_bounds: [0.0; 4],
        };
        rect.refresh_edge_cells();
        rect
    }

    /// Northwest corner cell.
    pub const fn origin(&self) -> Point {
        self.origin
    }

    /// Horizontal cell count.
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Vertical cell count.
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Covered cell count.
    pub const fn area(&self) -> i32 {
        self.width * self.height
    }

    /// The four corner cells, northwest first, row-major.
    pub const fn corners(&self) -> &[Point; 4] {
        &self.corners
    }

    /// Corner-free cells of the wall facing the given direction.
    pub fn wall_cells(&self, orient: Orientation) -> &[Point] {
        match orient {
            Orientation::North => &self.edge_north,
            Orientation::South => &self.edge_south,
            Orientation::East => &self.edge_east,
            Orientation::West => &self.edge_west,
        }
    }

    fn refresh_edge_cells(&mut self) {
        let Point { x: xi, y: yi } = self.origin;
        let xf = xi + self.width - 1;
        let yf = yi + self.height - 1;

        self.corners = [
            Point::new(xi, yi),
            Point::new(xf, yi),
            Point::new(xi, yf),
            Point::new(xf, yf),
        ];
        self.edge_north = (xi + 1..xf).map(|x| Point::new(x, yi)).collect();
        self.edge_south = (xi + 1..xf).map(|x| Point::new(x, yf)).collect();
        self.edge_west = (yi + 1..yf).map(|y| Point::new(xi, y)).collect();
        self.edge_east = (yi + 1..yf).map(|y| Point::new(xf, y)).collect();

        let centroid = self.centroid();
        let southeast = (Point::new(xf, yf) - centroid).azimuth();
        let northeast = (Point::new(xf, yi) - centroid).azimuth();
        let northwest = (Point::new(xi, yi) - centroid).azimuth();
        let southwest = (Point::new(xi, yf) - centroid).azimuth();
        self.wall_bounds = [southeast, northeast, northwest, southwest];
    }

    /// Fill minus interior, rasterized to an arbitrary frame.
    pub fn mask_edge(&self, frame: Frame) -> Mask {
        let mut m = self.mask_fill(frame);
        for y in self.origin.y + 1..self.origin.y + self.height - 1 {
            for x in self.origin.x + 1..self.origin.x + self.width - 1 {
                mask::unset(&mut m, Point::new(x, y));
            }
        }
        m
    }

    /// Fraction of this rectangle's area covered by the other shape.
    pub fn percent_overlap(&self, other: &dyn Shape) -> f64 {
        let a = self.min_frame();
        let b = other.min_frame();
        let frame = Frame::new(a.x.max(b.x), a.y.max(b.y));
        let shared = mask::intersection(&self.mask_fill(frame), &other.mask_fill(frame));
        mask::count_nonzero(&shared) as f64 / f64::from(self.area())
    }

    /// The wall facing the other shape, classified against this rectangle's
    /// own corner bearings, with its corner-free cell run.
    pub fn nearest_wall(&self, other: &dyn Shape) -> (Orientation, &[Point]) {
        let toward = other.azimuth(self);
        let [southeast, northeast, northwest, southwest] = self.wall_bounds;
        let orient = if toward > southwest || toward <= southeast {
            Orientation::South
        } else if toward <= northeast {
            Orientation::East
        } else if toward <= northwest {
            Orientation::North
        } else {
            Orientation::West
        };
        (orient, self.wall_cells(orient))
    }
}

impl Shape for Rectangle {
    fn min_frame(&self) -> Frame {
        self.origin + Point::new(self.width, self.height)
    }

    fn centroid(&self) -> Point {
        self.origin + Point::new(self.width / 2, self.height / 2)
    }

    fn mask_fill(&self, frame: Frame) -> Mask {
        let mut m = mask::empty(frame);
        for y in self.origin.y..self.origin.y + self.height {
            for x in self.origin.x..self.origin.x + self.width {
                mask::set(&mut m, Point::new(x, y));
            }
        }
        m
    }
}

impl Display for Rectangle {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "a {} by {} rectangle cornered at {}",
            self.width, self.height, self.origin
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_count_is_the_area() {
        let rect = Rectangle::new(Point::new(2, 1), 5, 3);
        assert_eq!(mask::count_nonzero(&rect.mask()), 15);
        assert_eq!(rect.min_frame(), Frame::new(7, 4));
    }

    #[test]
    fn edge_is_a_strict_subset_of_fill() {
        let rect = Rectangle::new(Point::new(0, 0), 4, 6);
        let fill = rect.mask();
        let edge = rect.mask_edge(rect.min_frame());
        assert_eq!(mask::count_nonzero(&edge), 2 * (4 + 6) - 4);
        assert!(mask::count_nonzero(&edge) < mask::count_nonzero(&fill));
        assert_eq!(mask::intersection(&fill, &edge), edge);
    }

    #[test]
    fn wall_cell_runs_exclude_corners() {
        let rect = Rectangle::new(Point::new(0, 0), 5, 4);
        assert_eq!(rect.wall_cells(Orientation::North).len(), 3);
        assert_eq!(rect.wall_cells(Orientation::South).len(), 3);
        assert_eq!(rect.wall_cells(Orientation::East).len(), 2);
        assert_eq!(rect.wall_cells(Orientation::West).len(), 2);
        assert!(!rect.wall_cells(Orientation::North).contains(&Point::new(0, 0)));
        assert!(rect.wall_cells(Orientation::East).iter().all(|p| p.x == 4));
    }

    #[test]
    fn nearest_wall_faces_a_southeast_neighbour() {
        let rect = Rectangle::new(Point::new(0, 0), 10, 10);
        let other = Rectangle::new(Point::new(20, 20), 10, 10);
        let (orient, cells) = rect.nearest_wall(&other);
        assert!(matches!(orient, Orientation::South | Orientation::East));
        assert!(!cells.is_empty());

        let (back, _) = other.nearest_wall(&rect);
        assert!(matches!(back, Orientation::North | Orientation::West));
    }

    #[test]
    fn wall_bounds_track_elongation() {
        // A wide rectangle's east wall subtends a narrower bearing range than
        // a square's, so a shallow diagonal still selects the south wall.
        let wide = Rectangle::new(Point::new(0, 0), 20, 6);
        let below_right = Rectangle::new(Point::new(24, 10), 4, 4);
        let (orient, _) = wide.nearest_wall(&below_right);
        assert_eq!(orient, Orientation::South);
    }

    #[test]
    fn percent_overlap_measures_own_area_share() {
        let rect = Rectangle::new(Point::new(0, 0), 4, 4);
        let half = Rectangle::new(Point::new(2, 0), 4, 4);
        assert!((rect.percent_overlap(&half) - 0.5).abs() < 1e-9);
        let clear = Rectangle::new(Point::new(10, 10), 2, 2);
        assert!((rect.percent_overlap(&clear)).abs() < 1e-9);
    }
}
