use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::{
    error::{MetaballError, Result},
    field::ScalarField,
    interp::edge_crossing,
    lattice::Lattice,
    mesh::MeshBuffer,
    normal::estimate_normal,
    tables::{CORNER_OFFSETS, EDGE_CORNERS, EDGE_TABLE, case},
    types::{Point, Value, Vector},
    utils::{cell_corner_values, cube_mask},
};

/// One lattice cell: its index, the world position of corner 0 and the 8 corner values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cube {
    pub cell: [usize; 3],
    pub offset: Point,
    pub values: [Value; 8],
}

impl Cube {
    /// Reads cell `(i, j, k)` from the lattice.
    #[inline]
    pub fn gather(lattice: &Lattice, i: usize, j: usize, k: usize) -> Self {
        Self {
            cell: [i, j, k],
            offset: lattice.offset(i, j, k),
            values: cell_corner_values(lattice, i, j, k),
        }
    }

    #[inline]
    pub fn mask(&self) -> u8 {
        cube_mask(&self.values)
    }

    /// Zero crossing along `edge` in unit-cube coordinates.
    #[inline]
    pub fn crossing(&self, edge: usize) -> Result<Vector> {
        let [a, b] = EDGE_CORNERS[edge];
        edge_crossing(
            &Vector::from(CORNER_OFFSETS[a]),
            &Vector::from(CORNER_OFFSETS[b]),
            self.values[a],
            self.values[b],
        )
        .ok_or(MetaballError::DegenerateEdge {
            cell: self.cell,
            edge,
        })
    }

    /// World-space zero crossing along `edge`: `offset + crossing * cell_size`.
    #[inline]
    pub fn vertex(&self, edge: usize, cell_size: Value) -> Result<Point> {
        let vertex = self.offset + self.crossing(edge)? * cell_size;
        if vertex.coords.iter().all(|c| c.is_finite()) {
            Ok(vertex)
        } else {
            Err(MetaballError::NonFinite { position: vertex })
        }
    }
}

/// Walks lattice cells and appends their triangles, with normals taken from the field.
struct Triangulator<'a, F: ?Sized> {
    lattice: &'a Lattice,
    field: &'a F,
    normal_step: Value,
}

impl<F: ScalarField + ?Sized> Triangulator<'_, F> {
    /// Triangulates every cell with first index `i`, in `j`-then-`k` order.
    fn slab(&self, i: usize, mesh: &mut MeshBuffer) -> Result<()> {
        let cells = self.lattice.cells();
        for j in 0..cells {
            for k in 0..cells {
                let cube = Cube::gather(self.lattice, i, j, k);
                let mask = cube.mask();
                if EDGE_TABLE[mask as usize] == 0 {
                    continue;
                }
                for triangle in case(mask).triangles() {
                    let mut corners = [0u32; 3];
                    for (slot, &edge) in corners.iter_mut().zip(triangle) {
                        *slot = self.emit(&cube, edge as usize, mesh)?;
                    }
                    let [a, b, c] = corners;
                    mesh.push_triangle(a, b, c)?;
                }
            }
        }
        Ok(())
    }

    fn emit(&self, cube: &Cube, edge: usize, mesh: &mut MeshBuffer) -> Result<u32> {
        let vertex = cube.vertex(edge, self.lattice.cell_size())?;
        let normal = estimate_normal(self.field, &vertex, self.normal_step)?;
        mesh.push_vertex(&vertex, &normal)
    }
}

/// Runs marching cubes over a sampled lattice, appending to `mesh`.
///
/// ```text
/// Per cell (i outer, then j, then k):
/// 1. Cube::gather        →  8 corner values
/// 2. cube_mask           →  256-entry lookup key
/// 3. EDGE_TABLE[mask]    →  skip cells the surface misses
/// 4. case(mask)          →  triangles as edge triples
/// 5. Cube::vertex        →  interpolated crossing per edge
/// 6. estimate_normal     →  gradient normal per vertex
/// ```
///
/// Every emitted vertex is new; nothing is shared between triangles. `field` must be the field
/// the lattice was sampled from.
pub fn triangulate<F: ScalarField + ?Sized>(
    lattice: &Lattice,
    field: &F,
    normal_step: Value,
    mesh: &mut MeshBuffer,
) -> Result<()> {
    let triangulator = Triangulator {
        lattice,
        field,
        normal_step,
    };
    for i in 0..lattice.cells() {
        triangulator.slab(i, mesh)?;
    }
    Ok(())
}

/// Like [`triangulate`], but processes `i`-slabs on the rayon pool.
///
/// Slabs are merged back in order, so the output is identical to the sequential one.
pub fn par_triangulate<F: ScalarField + Sync + ?Sized>(
    lattice: &Lattice,
    field: &F,
    normal_step: Value,
    mesh: &mut MeshBuffer,
) -> Result<()> {
    let triangulator = Triangulator {
        lattice,
        field,
        normal_step,
    };
    let slabs = (0..lattice.cells())
        .into_par_iter()
        .map(|i| {
            let mut local = MeshBuffer::new();
            triangulator.slab(i, &mut local)?;
            Ok(local)
        })
        .collect::<Result<Vec<MeshBuffer>>>()?;

    for slab in &slabs {
        mesh.append(slab)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::{
        field::{MetaballField, Source},
        tables::CORNER_STEPS,
    };

    fn single_source() -> (MetaballField, Lattice) {
        let source = Source::new(Point::new(0.05, 0.07, 0.02), 1.);
        let field = MetaballField::new(vec![source]).unwrap();
        let mut lattice = Lattice::new(15, 0.3).unwrap();
        lattice.recenter(field.centroid());
        lattice.sample(&field);
        (field, lattice)
    }

    #[test]
    fn uniform_lattice_produces_nothing() {
        let field = MetaballField::new(vec![Source::new(Point::new(50., 50., 50.), 1.)]).unwrap();
        let mut lattice = Lattice::new(8, 0.3).unwrap();
        lattice.sample(&field);
        let mut mesh = MeshBuffer::new();
        triangulate(&lattice, &field, 0.1, &mut mesh).unwrap();
        assert!(mesh.is_empty());
        assert_eq!(mesh.vertex_count(), 0);
    }

    #[test]
    fn single_inside_corner_emits_one_triangle() {
        let mut lattice = Lattice::new(2, 1.).unwrap();
        for [i, j, k] in CORNER_STEPS {
            lattice.set(i, j, k, -1.);
        }
        lattice.set(0, 0, 0, 1.);
        let cube = Cube::gather(&lattice, 0, 0, 0);
        assert_eq!(cube.mask(), 0x01);

        // edges 0, 8 and 3 leave corner 0 along j, k and i; each crosses halfway
        assert_relative_eq!(cube.vertex(0, 1.).unwrap(), Point::new(0., 0.5, 0.));
        assert_relative_eq!(cube.vertex(8, 1.).unwrap(), Point::new(0., 0., 0.5));
        assert_relative_eq!(cube.vertex(3, 1.).unwrap(), Point::new(0.5, 0., 0.));
    }

    #[test]
    fn equal_corner_values_are_a_degenerate_edge() {
        let cube = Cube {
            cell: [3, 4, 5],
            offset: Point::origin(),
            values: [0.; 8],
        };
        assert_eq!(
            cube.vertex(6, 0.3),
            Err(MetaballError::DegenerateEdge { cell: [3, 4, 5], edge: 6 })
        );
    }

    #[test]
    fn selected_edges_always_straddle_zero() {
        let (_, lattice) = single_source();
        for i in 0..lattice.cells() {
            for j in 0..lattice.cells() {
                for k in 0..lattice.cells() {
                    let cube = Cube::gather(&lattice, i, j, k);
                    for triangle in case(cube.mask()).triangles() {
                        for &edge in triangle {
                            let [a, b] = EDGE_CORNERS[edge as usize];
                            let (va, vb) = (cube.values[a], cube.values[b]);
                            assert!(va.min(vb) <= 0. && va.max(vb) > 0.);
                            assert!(cube.crossing(edge as usize).is_ok());
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn vertices_lie_on_their_edges() {
        let (_, lattice) = single_source();
        let s = lattice.cell_size();
        for i in 0..lattice.cells() {
            for j in 0..lattice.cells() {
                for k in 0..lattice.cells() {
                    let cube = Cube::gather(&lattice, i, j, k);
                    for triangle in case(cube.mask()).triangles() {
                        for &edge in triangle {
                            let [a, b] = EDGE_CORNERS[edge as usize];
                            let pa = cube.offset + Vector::from(CORNER_OFFSETS[a]) * s;
                            let pb = cube.offset + Vector::from(CORNER_OFFSETS[b]) * s;
                            let v = cube.vertex(edge as usize, s).unwrap();
                            let t = (v - pa).dot(&(pb - pa)) / (s * s);
                            assert!(t > 0. && t < 1., "cell {:?} edge {edge}: t = {t}", cube.cell);
                            let off_axis = (v - pa) - (pb - pa) * t;
                            assert!(off_axis.norm() < 1e-5);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn emits_sequential_unshared_vertices() {
        let (field, lattice) = single_source();
        let mut mesh = MeshBuffer::new();
        triangulate(&lattice, &field, 0.1, &mut mesh).unwrap();
        assert!(!mesh.is_empty());
        assert_eq!(mesh.vertex_count(), mesh.indices().len());
        assert_eq!(mesh.normals().len(), mesh.vertex_count());
        assert!(mesh.indices().iter().enumerate().all(|(n, &i)| n as u32 == i));
    }

    #[test]
    fn parallel_output_matches_sequential() {
        let field = MetaballField::new(vec![
            Source::new(Point::new(-0.9, 0.05, 0.), 1.),
            Source::new(Point::new(0.8, -0.1, 0.2), 1.),
            Source::new(Point::new(0.1, 0.9, -0.3), 0.7),
        ])
        .unwrap();
        let mut lattice = Lattice::new(24, 0.3).unwrap();
        lattice.recenter(field.centroid());
        lattice.sample(&field);

        let mut seq = MeshBuffer::new();
        let mut par = MeshBuffer::new();
        triangulate(&lattice, &field, 0.1, &mut seq).unwrap();
        par_triangulate(&lattice, &field, 0.1, &mut par).unwrap();
        assert!(!seq.is_empty());
        assert_eq!(seq, par);
    }
}
