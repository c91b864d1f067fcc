use crate::mask::{self, Mask};
use crate::point::{Frame, Point};

/// Capability shared by every placeable primitive.
///
/// Each shape reports a minimum bounding frame and a centroid cell, and can
/// rasterize itself into a fresh boolean [`Mask`] of any requested frame.
/// Bounds, overlap and bearing queries are derived from those three.
pub trait Shape {
    /// Minimum frame fully containing the shape.
    fn min_frame(&self) -> Frame;

    /// Center cell of the shape.
    fn centroid(&self) -> Point;

    /// Occupied cells rasterized to an arbitrary frame; cells falling outside
    /// the frame are clipped, never written.
    fn mask_fill(&self, frame: Frame) -> Mask;

    /// Fill mask at the shape's own minimum frame.
    fn mask(&self) -> Mask {
        self.mask_fill(self.min_frame())
    }

    /// True when the shape fits within an arbitrary frame.
    fn is_in_bounds(&self, frame: Frame) -> bool {
        let min = self.min_frame();
        min.x <= frame.x && min.y <= frame.y
    }

    /// True when the two shapes occupy at least one common cell.
    ///
    /// Both fills are rasterized to the per-axis maximum of the two minimum
    /// frames, so the test is commutative.
    fn overlaps(&self, other: &dyn Shape) -> bool {
        let a = self.min_frame();
        let b = other.min_frame();
        let frame = Frame::new(a.x.max(b.x), a.y.max(b.y));
        mask::intersects(&self.mask_fill(frame), &other.mask_fill(frame))
    }

    /// Bearing from the other shape's centroid to this shape's centroid, in
    /// the 0°-south compass convention of [`Point::azimuth`].
    fn azimuth(&self, other: &dyn Shape) -> f64 {
        (self.centroid() - other.centroid()).azimuth()
    }
}
