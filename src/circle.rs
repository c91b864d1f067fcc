use fixedbitset::FixedBitSet;
use std::collections::VecDeque;
use std::fmt::{Display, Formatter};

use crate::mask::{self, Mask};
use crate::point::{Frame, Point};
use crate::shape::Shape;

/// Cave room or tunnel primitive with a precomputed single-cell edge ring.
///
/// The ring is rebuilt whenever the origin or radius change; it is kept
/// sorted so edge lookups stay deterministic across identical circles.
#[derive(Clone, Debug, PartialEq)]
pub struct Circle {
    origin: Point,
    radius: i32,
    edge_cells: Vec<Point>,
}

impl Circle {
    /// Creates a circle from its center cell and radius.
    pub fn new(origin: Point, radius: i32) -> Self {
        debug_assert!(radius >= 0, "Circle radius must be non-negative, got {radius}");
        let mut circle = Self {
            origin,
            radius,
            edge_cells: Vec::new(),
        };
        circle.refresh_edge_cells();
        circle
    }

    /// Center cell.
    pub const fn origin(&self) -> Point {
        self.origin
    }

    /// Radius in cells.
    pub const fn radius(&self) -> i32 {
        self.radius
    }

    /// Moves the circle, rebuilding its edge ring.
    pub fn set_origin(&mut self, origin: Point) {
        self.origin = origin;
        self.refresh_edge_cells();
    }

    /// Resizes the circle, rebuilding its edge ring.
    pub fn set_radius(&mut self, radius: i32) {
        debug_assert!(radius >= 0, "Circle radius must be non-negative, got {radius}");
        self.radius = radius;
        self.refresh_edge_cells();
    }

    /// The edge ring, sorted by (x, y).
    pub fn edge_cells(&self) -> &[Point] {
        &self.edge_cells
    }

    // Walks the first quadrant of a fattened midpoint circle, then mirrors it
    // into the other three quadrants by exact quarter-turn rotations. The
    // squared-distance allowance of radius^2 + floor(sqrt(radius)) biases the
    // walk toward slightly-over-radius cells, which keeps the ring connected
    // at a single cell of thickness.
    fn refresh_edge_cells(&mut self) {
        self.edge_cells.clear();
        if self.radius == 0 {
            self.edge_cells.push(self.origin);
            return;
        }

        let allowance =
            self.radius * self.radius + f64::from(self.radius).sqrt().floor() as i32;
        let mut quadrant = Vec::new();
        let mut p = Point::new(self.radius, 0);
        while p.x > 0 {
            quadrant.push(p);
            let candidates = [
                Point::new(p.x - 1, p.y),
                Point::new(p.x, p.y + 1),
                Point::new(p.x - 1, p.y + 1),
            ];
            // The inward step always passes the allowance, so a farthest
            // surviving candidate always exists.
            p = candidates
                .into_iter()
                .filter(|c| c.x * c.x + c.y * c.y <= allowance)
                .max_by_key(|c| c.x * c.x + c.y * c.y)
                .unwrap();
        }

        for q in quadrant {
            let rotations = [
                q,
                Point::new(-q.y, q.x),
                Point::new(-q.x, -q.y),
                Point::new(q.y, -q.x),
            ];
            for r in rotations {
                self.edge_cells.push(self.origin + r);
            }
        }
        self.edge_cells.sort_unstable();
        self.edge_cells.dedup();
    }

    /// Edge ring rasterized to an arbitrary frame.
    pub fn mask_edge(&self, frame: Frame) -> Mask {
        let mut m = mask::empty(frame);
        for &p in &self.edge_cells {
            mask::set(&mut m, p);
        }
        m
    }

    /// Edge cell closest to the given bearing from the origin.
    ///
    /// The trigonometric ray estimate is returned directly when it lands on
    /// the ring; otherwise the ring cell with the smallest Manhattan distance
    /// to the estimate wins, ties resolved by the ring's sorted order.
    pub fn angled_edge_cell(&self, azimuth: f64) -> Point {
        let radians = azimuth.to_radians();
        let reach = f64::from(self.radius);
        let estimate = self.origin
            + Point::new(
                (reach * radians.sin()).round() as i32,
                (reach * radians.cos()).round() as i32,
            );
        if self.edge_cells.binary_search(&estimate).is_ok() {
            return estimate;
        }
        self.edge_cells
            .iter()
            .copied()
            .min_by_key(|p| p.manhattan_distance(estimate))
            .unwrap()
    }
}

impl Shape for Circle {
    fn min_frame(&self) -> Frame {
        self.origin + Point::new(self.radius + 1, self.radius + 1)
    }

    fn centroid(&self) -> Point {
        self.origin
    }

    // Flood fill from the origin, bounded by the edge ring. The worklist is
    // explicit so large radii cannot blow the stack; a visited bitset keeps
    // revisits cheap. Assumes the ring lies inside the frame, which every
    // in-bounds placement guarantees.
    fn mask_fill(&self, frame: Frame) -> Mask {
        let mut m = self.mask_edge(frame);
        if !frame.contains(self.origin) {
            return m;
        }

        let width = frame.x as usize;
        let mut visited = FixedBitSet::with_capacity((frame.x * frame.y) as usize);
        let mut queue = VecDeque::new();
        queue.push_back(self.origin);
        while let Some(p) = queue.pop_front() {
            if !frame.contains(p) {
                continue;
            }
            let index = p.y as usize * width + p.x as usize;
            if visited.contains(index) || m[(p.y as usize, p.x as usize)] {
                continue;
            }
            visited.insert(index);
            m[(p.y as usize, p.x as usize)] = true;
            queue.push_back(Point::new(p.x, p.y - 1));
            queue.push_back(Point::new(p.x - 1, p.y));
            queue.push_back(Point::new(p.x, p.y + 1));
            queue.push_back(Point::new(p.x + 1, p.y));
        }
        m
    }
}

impl Display for Circle {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "a radius {} circle centered at {}", self.radius, self.origin)
    }
}
