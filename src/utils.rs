use crate::{
    lattice::Lattice,
    tables::CORNER_STEPS,
    types::{Point, Value, Vector},
};

/// Returns the origin that centers a `resolution³` lattice of `cell_size` spacing on `center`.
///
/// ```text
///  origin = center - (N, N, N) * cell_size / 2
/// ```
#[inline]
pub fn centered_origin(center: Point, resolution: usize, cell_size: Value) -> Point {
    let n = resolution as Value;
    center - Vector::new(n, n, n) * cell_size / 2.
}

/// Gathers the 8 corner values of cell `(i, j, k)` in table corner order.
#[inline]
pub fn cell_corner_values(lattice: &Lattice, i: usize, j: usize, k: usize) -> [Value; 8] {
    CORNER_STEPS.map(|[di, dj, dk]| lattice.get(i + di, j + dj, k + dk))
}

/// Computes the case mask for a cube.
///
/// Each of the 8 corners maps to one bit. A bit is set when the corner's value
/// is **strictly above** zero (i.e. inside the surface):
///
/// ```text
/// corner index:  7  6  5  4  3  2  1  0
/// mask bits:    [_][_][_][_][_][_][_][_]
///                                      ^-- corner 0 inside?
/// ```
#[inline]
pub fn cube_mask(corners: &[Value; 8]) -> u8 {
    corners
        .iter()
        .enumerate()
        .fold(0, |mask, (b, &v)| if v > 0. { mask | (1 << b) } else { mask })
}
