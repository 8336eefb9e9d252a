use crate::types::{Value, Vector};

/// Zero crossing of the field along the edge from corner offset `a` to corner offset `b`.
///
/// Assuming the field varies affinely along the edge, the root sits at
///
/// ```text
///  (a * vb - b * va) / (vb - va)
/// ```
///
/// in unit-cube coordinates. Returns `None` when `va == vb`: the edge then has no single
/// crossing and the division is undefined.
#[inline]
pub fn edge_crossing(a: &Vector, b: &Vector, va: Value, vb: Value) -> Option<Vector> {
    let denom = vb - va;
    if denom == 0. {
        return None;
    }
    Some((a * vb - b * va) / denom)
}
