use ndarray::Array3;
use rayon::prelude::*;
use tracing::trace;

use crate::{
    error::{MetaballError, Result},
    field::ScalarField,
    types::{Point, Value, Vector},
    utils::centered_origin,
};

/// A cubic lattice of sampled field values anchored at a world-space origin.
///
/// The lattice has `resolution³` points and `(resolution - 1)³` cells. Point `(i, j, k)` sits
/// at `origin + (i, j, k) * cell_size`.
///
/// Values are stored in one row-major buffer indexed `[i][j][k]`; the buffer is allocated once
/// and overwritten by every [`sample`](Lattice::sample).
#[derive(Clone, Debug)]
pub struct Lattice {
    resolution: usize,
    cell_size: Value,
    origin: Point,
    values: Array3<Value>,
}

impl Lattice {
    /// Creates a zero-filled lattice at the world origin.
    ///
    /// Returns an error if `resolution < 2` or `cell_size` is not a positive finite number.
    pub fn new(resolution: usize, cell_size: Value) -> Result<Self> {
        if resolution < 2 {
            return Err(MetaballError::InvalidResolution(resolution));
        }
        if !(cell_size.is_finite() && cell_size > 0.) {
            return Err(MetaballError::InvalidCellSize(cell_size));
        }
        Ok(Self {
            resolution,
            cell_size,
            origin: Point::origin(),
            values: Array3::zeros((resolution, resolution, resolution)),
        })
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Number of cells along each axis.
    pub fn cells(&self) -> usize {
        self.resolution - 1
    }

    pub fn cell_size(&self) -> Value {
        self.cell_size
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    /// Moves the origin so the lattice is centered on `center`.
    pub fn recenter(&mut self, center: Point) {
        self.origin = centered_origin(center, self.resolution, self.cell_size);
    }

    /// World-space offset of lattice point `(i, j, k)`: `(i, j, k) * cell_size + origin`.
    #[inline]
    pub fn offset(&self, i: usize, j: usize, k: usize) -> Point {
        let steps = Vector::new(i as Value, j as Value, k as Value);
        Point::from(steps * self.cell_size + self.origin.coords)
    }

    /// Returns the sampled value at lattice point `(i, j, k)`.
    #[inline]
    pub fn get(&self, i: usize, j: usize, k: usize) -> Value {
        self.values[[i, j, k]]
    }

    /// Sets the value at lattice point `(i, j, k)`.
    pub fn set(&mut self, i: usize, j: usize, k: usize, v: Value) {
        self.values[[i, j, k]] = v;
    }

    pub fn values(&self) -> &Array3<Value> {
        &self.values
    }

    /// Evaluates `field` at every lattice point.
    pub fn sample<F: ScalarField + ?Sized>(&mut self, field: &F) {
        let n = self.resolution;
        for i in 0..n {
            for j in 0..n {
                for k in 0..n {
                    let p = self.offset(i, j, k);
                    self.values[[i, j, k]] = field.value(&p);
                }
            }
        }
        trace!(points = n * n * n, "sampled lattice");
    }

    /// Like [`sample`](Lattice::sample), but spreads `i`-slabs across the rayon pool.
    ///
    /// Every point is written independently, so the result equals the sequential one.
    pub fn par_sample<F: ScalarField + Sync + ?Sized>(&mut self, field: &F) {
        let n = self.resolution;
        let scale = self.cell_size;
        let origin = self.origin;
        let Some(buffer) = self.values.as_slice_mut() else {
            self.sample(field);
            return;
        };
        buffer
            .par_chunks_mut(n * n)
            .enumerate()
            .for_each(|(i, slab)| {
                for (jk, value) in slab.iter_mut().enumerate() {
                    let (j, k) = (jk / n, jk % n);
                    let p = Point::from(
                        Vector::new(i as Value, j as Value, k as Value) * scale + origin.coords,
                    );
                    *value = field.value(&p);
                }
            });
        trace!(points = n * n * n, "sampled lattice in parallel");
    }
}
