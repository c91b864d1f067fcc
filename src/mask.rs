//! Boolean cell grids and the elementwise algebra the generators compose
//! their render layers with.

use ndarray::Array2;

use crate::point::{Frame, Point};

/// 2D boolean grid of occupied cells, row-major by (y, x).
pub type Mask = Array2<bool>;

/// Allocates an all-false mask of the given frame.
pub fn empty(frame: Frame) -> Mask {
    debug_assert!(
        frame.x > 0 && frame.y > 0,
        "Mask frame must be positive, got {frame}"
    );
    Array2::from_elem((frame.y as usize, frame.x as usize), false)
}

/// Frame of an existing mask.
pub fn frame_of(mask: &Mask) -> Frame {
    Frame::new(mask.ncols() as i32, mask.nrows() as i32)
}

/// Marks a cell, silently clipping points outside the frame.
pub fn set(mask: &mut Mask, p: Point) {
    if frame_of(mask).contains(p) {
        mask[(p.y as usize, p.x as usize)] = true;
    }
}

/// Clears a cell, silently clipping points outside the frame.
pub fn unset(mask: &mut Mask, p: Point) {
    if frame_of(mask).contains(p) {
        mask[(p.y as usize, p.x as usize)] = false;
    }
}

/// Reads a cell; points outside the frame read as unset.
pub fn get(mask: &Mask, p: Point) -> bool {
    frame_of(mask).contains(p) && mask[(p.y as usize, p.x as usize)]
}

/// Count of set cells.
pub fn count_nonzero(mask: &Mask) -> usize {
    mask.iter().filter(|&&cell| cell).count()
}

/// True when the two masks share at least one set cell.
pub fn intersects(a: &Mask, b: &Mask) -> bool {
    debug_assert_eq!(a.dim(), b.dim(), "Mask frames must match");
    a.iter().zip(b.iter()).any(|(&l, &r)| l && r)
}

/// Elementwise OR of two equally-framed masks.
pub fn union(a: &Mask, b: &Mask) -> Mask {
    let mut out = a.clone();
    merge(&mut out, b);
    out
}

/// Elementwise AND of two equally-framed masks.
pub fn intersection(a: &Mask, b: &Mask) -> Mask {
    debug_assert_eq!(a.dim(), b.dim(), "Mask frames must match");
    let mut out = a.clone();
    out.iter_mut()
        .zip(b.iter())
        .for_each(|(l, &r)| *l = *l && r);
    out
}

/// Cells set in `a` but not in `b`.
pub fn difference(a: &Mask, b: &Mask) -> Mask {
    debug_assert_eq!(a.dim(), b.dim(), "Mask frames must match");
    let mut out = a.clone();
    out.iter_mut()
        .zip(b.iter())
        .for_each(|(l, &r)| *l = *l && !r);
    out
}

/// ORs `other` into `acc` in place.
pub fn merge(acc: &mut Mask, other: &Mask) {
    debug_assert_eq!(acc.dim(), other.dim(), "Mask frames must match");
    acc.iter_mut()
        .zip(other.iter())
        .for_each(|(l, &r)| *l = *l || r);
}

/// Set cells bordering an unset or out-of-frame cell (4-connectivity).
pub fn boundary(mask: &Mask) -> Mask {
    let mut out = empty(frame_of(mask));
    for ((y, x), &cell) in mask.indexed_iter() {
        if !cell {
            continue;
        }
        let p = Point::new(x as i32, y as i32);
        let exposed = [(0, -1), (-1, 0), (0, 1), (1, 0)]
            .into_iter()
            .any(|(dx, dy)| !get(mask, p + Point::new(dx, dy)));
        if exposed {
            out[(y, x)] = true;
        }
    }
    out
}

/// Debug rendering: `#` for set cells, `_` for unset, one row per line.
pub fn to_ascii(mask: &Mask) -> String {
    let mut out = String::with_capacity(mask.len() + mask.nrows());
    for row in mask.rows() {
        for &cell in row.iter() {
            out.push(if cell { '#' } else { '_' });
        }
        out.push('\n');
    }
    out
}
