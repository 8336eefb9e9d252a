use crate::{
    error::{MetaballError, Result},
    field::ScalarField,
    types::{Point, Value, Vector},
};

/// Estimates the surface normal at `x` as the normalized central-difference gradient of `field`.
///
/// ```text
///  n = normalize(F(x+dx) - F(x-dx), F(x+dy) - F(x-dy), F(x+dz) - F(x-dz))
/// ```
///
/// The result points toward increasing field values, which for metaballs is toward the
/// sources. A zero gradient (a critical point of the field) has no direction and is reported
/// as [`MetaballError::CriticalPoint`]; a NaN or infinite gradient as
/// [`MetaballError::NonFinite`].
pub fn estimate_normal<F: ScalarField + ?Sized>(
    field: &F,
    x: &Point,
    step: Value,
) -> Result<Vector> {
    let dx = Vector::new(step, 0., 0.);
    let dy = Vector::new(0., step, 0.);
    let dz = Vector::new(0., 0., step);

    let gradient = Vector::new(
        field.value(&(x + dx)) - field.value(&(x - dx)),
        field.value(&(x + dy)) - field.value(&(x - dy)),
        field.value(&(x + dz)) - field.value(&(x - dz)),
    );

    let norm = gradient.norm();
    if !norm.is_finite() {
        return Err(MetaballError::NonFinite { position: *x });
    }
    if norm == 0. {
        return Err(MetaballError::CriticalPoint { position: *x });
    }
    Ok(gradient / norm)
}
