//! Mesh topology helpers shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;

use metaball_mesher::MeshBuffer;

/// Disjoint-set forest over `0..n`.
pub struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    pub fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}

/// Maps every vertex to a representative shared by all vertices within `tolerance` of it.
///
/// Neighbouring cells compute the same edge crossing independently, so copies of one surface
/// point may differ in the last bits. Keep `tolerance` well below the spacing of distinct
/// crossings: near a lattice corner the crossings of its edges crowd together.
pub fn weld(mesh: &MeshBuffer, tolerance: f32) -> Vec<usize> {
    let vertices = mesh.vertices();
    let key = |v: &[f32; 3]| v.map(|c| (c / tolerance).floor() as i64);
    let mut buckets: HashMap<[i64; 3], Vec<usize>> = HashMap::new();
    let mut sets = UnionFind::new(vertices.len());

    for (idx, v) in vertices.iter().enumerate() {
        let [x, y, z] = key(v);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(bucket) = buckets.get(&[x + dx, y + dy, z + dz]) else {
                        continue;
                    };
                    for &other in bucket {
                        let w = vertices[other];
                        if (0..3).all(|a| (w[a] - v[a]).abs() <= tolerance) {
                            sets.union(other, idx);
                        }
                    }
                }
            }
        }
        buckets.entry([x, y, z]).or_default().push(idx);
    }

    (0..vertices.len()).map(|v| sets.find(v)).collect()
}

/// Triangles of the welded mesh, minus those that collapsed because two corners welded together.
pub fn welded_triangles<'a>(
    mesh: &'a MeshBuffer,
    welded: &'a [usize],
) -> impl Iterator<Item = [usize; 3]> + 'a {
    mesh.triangles()
        .map(|tri| tri.map(|i| welded[i as usize]))
        .filter(|[a, b, c]| a != b && b != c && c != a)
}

/// Counts how many triangles use each undirected edge of the welded mesh.
pub fn edge_uses(mesh: &MeshBuffer, welded: &[usize]) -> HashMap<(usize, usize), usize> {
    let mut uses = HashMap::new();
    for [a, b, c] in welded_triangles(mesh, welded) {
        for (p, q) in [(a, b), (b, c), (c, a)] {
            *uses.entry((p.min(q), p.max(q))).or_insert(0) += 1;
        }
    }
    uses
}

/// Number of edge-connected pieces of the welded mesh, found by flood fill.
pub fn component_count(mesh: &MeshBuffer, welded: &[usize]) -> usize {
    let mut adjacency: HashMap<usize, Vec<usize>> = HashMap::new();
    for [a, b, c] in welded_triangles(mesh, welded) {
        for (p, q) in [(a, b), (b, c), (c, a)] {
            adjacency.entry(p).or_default().push(q);
            adjacency.entry(q).or_default().push(p);
        }
    }

    let mut seen = std::collections::HashSet::new();
    let mut components = 0;
    for &start in adjacency.keys() {
        if !seen.insert(start) {
            continue;
        }
        components += 1;
        let mut stack = vec![start];
        while let Some(v) = stack.pop() {
            for &n in &adjacency[&v] {
                if seen.insert(n) {
                    stack.push(n);
                }
            }
        }
    }
    components
}
