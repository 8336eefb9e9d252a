use tracing::warn;

use crate::{
    error::{MetaballError, Result},
    types::{Point, Value, Vector},
};

/// The field collaborator the mesher samples every tick.
///
/// The surface is the zero level set of [`value`](ScalarField::value): points with a value
/// **above** zero are inside.
pub trait ScalarField {
    /// Evaluates the field at `point`. Must be free of side effects.
    fn value(&self, point: &Point) -> Value;

    /// Aggregate center of the generating sources; the lattice is re-centered on it every tick.
    fn centroid(&self) -> Point;

    /// Moves the sources one step. Called exactly once per tick, before sampling.
    fn advance(&mut self);

    /// Read access to the sources, for the centroid and diagnostics.
    fn sources(&self) -> &[Source];
}

/// A single metaball.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Source {
    pub position: Point,
    pub strength: Value,
}

impl Source {
    pub fn new(position: Point, strength: Value) -> Self {
        Self { position, strength }
    }

    /// Inverse-square falloff: `strength / |point - position|²`.
    #[inline]
    pub fn influence(&self, point: &Point) -> Value {
        self.strength / (point - self.position).norm_squared()
    }
}

/// Moves sources between ticks. The mesher treats it as opaque.
pub trait MotionLaw: Send + Sync {
    fn step(&mut self, sources: &mut [Source]);
}

/// Sources never move.
#[derive(Clone, Copy, Debug, Default)]
pub struct Stationary;

impl MotionLaw for Stationary {
    fn step(&mut self, _sources: &mut [Source]) {}
}

/// A circular path `center + radius * (u * cos θ + v * sin θ)`,
/// with `θ = phase + angular_speed * t`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Orbit {
    pub center: Point,
    pub radius: Value,
    pub angular_speed: Value,
    pub phase: Value,
    /// First in-plane axis, unit length.
    pub u: Vector,
    /// Second in-plane axis, unit length and orthogonal to `u`.
    pub v: Vector,
}

impl Orbit {
    /// An orbit in the plane spanned by the x and y axes.
    pub fn new(center: Point, radius: Value, angular_speed: Value) -> Self {
        Self {
            center,
            radius,
            angular_speed,
            phase: 0.,
            u: Vector::x(),
            v: Vector::y(),
        }
    }

    pub fn with_phase(mut self, phase: Value) -> Self {
        self.phase = phase;
        self
    }

    /// Sets the orbital plane. Both axes are normalized; `v` is made orthogonal to `u`.
    pub fn with_plane(mut self, u: Vector, v: Vector) -> Self {
        let u = u.normalize();
        self.v = (v - u * u.dot(&v)).normalize();
        self.u = u;
        self
    }

    pub fn position_at(&self, time: Value) -> Point {
        let theta = self.phase + self.angular_speed * time;
        self.center + (self.u * theta.cos() + self.v * theta.sin()) * self.radius
    }
}

/// Periodic orbits, one per source, advanced by a fixed time step.
///
/// Sources without a matching orbit (when there are fewer orbits than sources) stay put.
#[derive(Clone, Debug)]
pub struct Orbits {
    orbits: Vec<Orbit>,
    time: Value,
    time_step: Value,
}

impl Orbits {
    pub fn new(orbits: Vec<Orbit>, time_step: Value) -> Self {
        Self {
            orbits,
            time: 0.,
            time_step,
        }
    }

    pub fn time(&self) -> Value {
        self.time
    }

    /// Positions of all orbits at the current time, to seed a field.
    pub fn initial_sources(&self, strength: Value) -> Vec<Source> {
        self.orbits
            .iter()
            .map(|orbit| Source::new(orbit.position_at(self.time), strength))
            .collect()
    }
}

impl MotionLaw for Orbits {
    fn step(&mut self, sources: &mut [Source]) {
        self.time += self.time_step;
        for (source, orbit) in sources.iter_mut().zip(&self.orbits) {
            source.position = orbit.position_at(self.time);
        }
    }
}

/// Sum of inverse-square metaballs, offset by `bias` so the surface sits at zero.
pub struct MetaballField {
    sources: Vec<Source>,
    bias: Value,
    centroid_divisor: Value,
    motion: Box<dyn MotionLaw>,
}

impl MetaballField {
    /// Creates a stationary field with `bias = 1` and the centroid divisor fixed to the
    /// current source count.
    pub fn new(sources: Vec<Source>) -> Result<Self> {
        if sources.is_empty() {
            return Err(MetaballError::NoSources);
        }
        let centroid_divisor = sources.len() as Value;
        Ok(Self {
            sources,
            bias: 1.,
            centroid_divisor,
            motion: Box::new(Stationary),
        })
    }

    pub fn with_bias(mut self, bias: Value) -> Self {
        self.bias = bias;
        self
    }

    pub fn with_motion(mut self, motion: impl MotionLaw + 'static) -> Self {
        self.motion = Box::new(motion);
        self
    }

    /// Overrides the fixed divisor used by [`centroid`](ScalarField::centroid).
    ///
    /// The divisor is never re-derived from the live source count. A value that differs from
    /// the source count shifts the sampled volume away from the true mean of the sources.
    pub fn with_centroid_divisor(mut self, divisor: Value) -> Result<Self> {
        if !(divisor.is_finite() && divisor > 0.) {
            return Err(MetaballError::InvalidCentroidDivisor(divisor));
        }
        if divisor != self.sources.len() as Value {
            warn!(
                divisor,
                sources = self.sources.len(),
                "centroid divisor differs from the source count"
            );
        }
        self.centroid_divisor = divisor;
        Ok(self)
    }

    pub fn bias(&self) -> Value {
        self.bias
    }

    pub fn centroid_divisor(&self) -> Value {
        self.centroid_divisor
    }

    pub fn sources_mut(&mut self) -> &mut [Source] {
        &mut self.sources
    }
}

impl ScalarField for MetaballField {
    #[inline]
    fn value(&self, point: &Point) -> Value {
        let sum: Value = self.sources.iter().map(|s| s.influence(point)).sum();
        sum - self.bias
    }

    fn centroid(&self) -> Point {
        let sum = self
            .sources
            .iter()
            .fold(Vector::zeros(), |acc, s| acc + s.position.coords);
        Point::from(sum / self.centroid_divisor)
    }

    fn advance(&mut self) {
        self.motion.step(&mut self.sources);
    }

    fn sources(&self) -> &[Source] {
        &self.sources
    }
}

impl std::fmt::Debug for MetaballField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaballField")
            .field("sources", &self.sources)
            .field("bias", &self.bias)
            .field("centroid_divisor", &self.centroid_divisor)
            .finish_non_exhaustive()
    }
}
