use crate::{
    error::{MetaballError, Result},
    types::{Point, Value, Vector},
};

/// Per-tick triangle soup: positions, normals and a flat index list.
///
/// `normals[n]` belongs to `vertices[n]`; every group of three consecutive entries in
/// `indices` forms one triangle. Vertices are never shared, so a mesh extracted by the
/// mesher has `indices == 0..vertices.len()`.
///
/// [`clear`](MeshBuffer::clear) keeps the allocations, so a buffer reused across ticks stops
/// allocating once it has seen its largest surface.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshBuffer {
    vertices: Vec<[Value; 3]>,
    normals: Vec<[Value; 3]>,
    indices: Vec<u32>,
}

impl MeshBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops all contents but keeps capacity.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.normals.clear();
        self.indices.clear();
    }

    /// Appends a vertex with its normal and returns its index.
    ///
    /// Returns [`MetaballError::IndexOverflow`] once the vertex count no longer fits a `u32`.
    pub fn push_vertex(&mut self, vertex: &Point, normal: &Vector) -> Result<u32> {
        let index = u32::try_from(self.vertices.len()).map_err(|_| MetaballError::IndexOverflow)?;
        self.vertices.push([vertex.x, vertex.y, vertex.z]);
        self.normals.push([normal.x, normal.y, normal.z]);
        Ok(index)
    }

    /// Adds a triangle defined by three vertex indices.
    ///
    /// Returns [`MetaballError::InvalidIndex`] if any index is out of bounds.
    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) -> Result<()> {
        if a.max(b).max(c) as usize >= self.vertices.len() {
            return Err(MetaballError::InvalidIndex);
        }
        self.indices.extend_from_slice(&[a, b, c]);
        Ok(())
    }

    /// Appends all of `other`, shifting its indices past the current vertices.
    pub fn append(&mut self, other: &MeshBuffer) -> Result<()> {
        let base = u32::try_from(self.vertices.len()).map_err(|_| MetaballError::IndexOverflow)?;
        if u32::try_from(self.vertices.len() + other.vertices.len()).is_err() {
            return Err(MetaballError::IndexOverflow);
        }
        self.vertices.extend_from_slice(&other.vertices);
        self.normals.extend_from_slice(&other.normals);
        self.indices.extend(other.indices.iter().map(|i| i + base));
        Ok(())
    }

    pub fn vertices(&self) -> &[[Value; 3]] {
        &self.vertices
    }

    pub fn normals(&self) -> &[[Value; 3]] {
        &self.normals
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Iterates over triangles as index triples.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    /// Returns the three vertex positions of triangle `tri`.
    pub fn tri_coords(&self, tri: usize) -> [Point; 3] {
        let corner = |n: usize| Point::from(self.vertices[self.indices[tri * 3 + n] as usize]);
        [corner(0), corner(1), corner(2)]
    }

    /// Computes the geometric normal for triangle `tri` from its winding.
    ///
    /// Returns the zero vector if the triangle is degenerate.
    pub fn tri_normal(&self, tri: usize) -> Vector {
        let [a, b, c] = self.tri_coords(tri);
        let cross = (b - a).cross(&(c - b));
        let norm = cross.norm();
        if norm == 0.0 { Vector::zeros() } else { cross / norm }
    }
}
