use std::time::Instant;

use tracing::{debug, warn};

use crate::{
    error::{MetaballError, Result},
    extract::{par_triangulate, triangulate},
    field::ScalarField,
    lattice::Lattice,
    mesh::MeshBuffer,
    types::Value,
};

/// Tunable constants of the extraction pipeline.
///
/// ```rust,ignore
/// let config = MesherConfig::default().with_resolution(64).with_parallel(true);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MesherConfig {
    /// Lattice points per axis. Default: `100`.
    pub resolution: usize,
    /// World-space distance between lattice points. Default: `0.3`.
    pub cell_size: Value,
    /// Finite-difference offset used for normals. Default: `0.1`.
    pub normal_step: Value,
    /// Sample and triangulate on the rayon pool. The mesh is identical either way.
    /// Default: `false`.
    pub parallel: bool,
}

impl Default for MesherConfig {
    fn default() -> Self {
        Self {
            resolution: 100,
            cell_size: 0.3,
            normal_step: 0.1,
            parallel: false,
        }
    }
}

impl MesherConfig {
    pub fn with_resolution(mut self, resolution: usize) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_cell_size(mut self, cell_size: Value) -> Self {
        self.cell_size = cell_size;
        self
    }

    pub fn with_normal_step(mut self, normal_step: Value) -> Self {
        self.normal_step = normal_step;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Checks the extraction constants. Resolution and cell size are checked by
    /// [`Lattice::new`] when the lattice is allocated.
    pub fn validate(&self) -> Result<()> {
        if !(self.normal_step.is_finite() && self.normal_step > 0.) {
            return Err(MetaballError::InvalidNormalStep(self.normal_step));
        }
        Ok(())
    }
}

/// Owns a field, its sampling lattice and the mesh rebuilt from them every tick.
///
/// ```text
/// tick()
///   → field.advance()
///   → lattice.recenter(field.centroid())
///   → lattice.sample(field)
///   → triangulate(lattice, field)   →  mesh
/// ```
///
/// The returned mesh borrows the mesher, so the host must be done with it before the next
/// tick. A tick that fails leaves the mesh empty rather than half built.
pub struct MetaballMesher<F> {
    config: MesherConfig,
    field: F,
    lattice: Lattice,
    mesh: MeshBuffer,
    ticks: u64,
}

impl<F: ScalarField + Sync> MetaballMesher<F> {
    /// Validates `config` and allocates the lattice. Nothing is sampled until the first tick.
    pub fn new(field: F, config: MesherConfig) -> Result<Self> {
        config.validate()?;
        let lattice = Lattice::new(config.resolution, config.cell_size)?;
        Ok(Self {
            config,
            field,
            lattice,
            mesh: MeshBuffer::new(),
            ticks: 0,
        })
    }

    /// Replaces the configuration, reallocating the lattice when its resolution or cell size
    /// changes. The mesh is cleared and comes back on the next tick.
    ///
    /// On error the previous configuration stays in effect.
    pub fn set_config(&mut self, config: MesherConfig) -> Result<()> {
        config.validate()?;
        if (config.resolution, config.cell_size)
            != (self.config.resolution, self.config.cell_size)
        {
            self.lattice = Lattice::new(config.resolution, config.cell_size)?;
        }
        self.config = config;
        self.mesh.clear();
        Ok(())
    }

    /// Advances the field one step and rebuilds the mesh.
    pub fn tick(&mut self) -> Result<&MeshBuffer> {
        self.field.advance();
        self.ticks += 1;
        self.rebuild()
    }

    /// Re-centers, re-samples and re-triangulates without moving the field.
    pub fn rebuild(&mut self) -> Result<&MeshBuffer> {
        let start = Instant::now();
        self.lattice.recenter(self.field.centroid());
        if self.config.parallel {
            self.lattice.par_sample(&self.field);
        } else {
            self.lattice.sample(&self.field);
        }
        let sampled = start.elapsed();

        self.retriangulate()?;
        debug!(
            tick = self.ticks,
            vertices = self.mesh.vertex_count(),
            triangles = self.mesh.triangle_count(),
            ?sampled,
            total = ?start.elapsed(),
            "rebuilt metaball mesh"
        );
        Ok(&self.mesh)
    }

    /// Triangulates the current lattice again, leaving field and samples untouched.
    pub fn retriangulate(&mut self) -> Result<&MeshBuffer> {
        self.mesh.clear();
        let result = if self.config.parallel {
            par_triangulate(&self.lattice, &self.field, self.config.normal_step, &mut self.mesh)
        } else {
            triangulate(&self.lattice, &self.field, self.config.normal_step, &mut self.mesh)
        };
        if let Err(error) = result {
            warn!(tick = self.ticks, %error, "metaball extraction failed");
            self.mesh.clear();
            return Err(error);
        }
        Ok(&self.mesh)
    }
}

impl<F> MetaballMesher<F> {
    pub fn config(&self) -> &MesherConfig {
        &self.config
    }

    pub fn field(&self) -> &F {
        &self.field
    }

    pub fn field_mut(&mut self) -> &mut F {
        &mut self.field
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    /// The mesh produced by the last tick.
    pub fn mesh(&self) -> &MeshBuffer {
        &self.mesh
    }

    /// Number of [`tick`](MetaballMesher::tick) calls so far, failed ones included.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        field::{MetaballField, Orbit, Orbits, Source},
        types::Point,
    };

    fn orbiting_field() -> MetaballField {
        let motion = Orbits::new(
            vec![
                Orbit::new(Point::new(0., 0., 0.1), 0.9, 1.3),
                Orbit::new(Point::new(0.1, 0., 0.), 0.7, -0.8).with_phase(2.),
            ],
            0.05,
        );
        MetaballField::new(motion.initial_sources(0.8))
            .unwrap()
            .with_motion(motion)
    }

    fn small() -> MesherConfig {
        MesherConfig::default().with_resolution(16)
    }

    #[test]
    fn config_defaults() {
        let config = MesherConfig::default();
        assert_eq!(config.resolution, 100);
        assert_eq!(config.cell_size, 0.3);
        assert_eq!(config.normal_step, 0.1);
        assert!(!config.parallel);
    }

    #[test]
    fn rejects_invalid_config() {
        let field = || MetaballField::new(vec![Source::new(Point::origin(), 1.)]).unwrap();
        let err = |config: MesherConfig| MetaballMesher::new(field(), config).err();
        assert_eq!(err(small().with_resolution(1)), Some(MetaballError::InvalidResolution(1)));
        assert_eq!(err(small().with_cell_size(0.)), Some(MetaballError::InvalidCellSize(0.)));
        assert_eq!(err(small().with_cell_size(-0.3)), Some(MetaballError::InvalidCellSize(-0.3)));
        assert_eq!(err(small().with_normal_step(0.)), Some(MetaballError::InvalidNormalStep(0.)));
        assert_eq!(err(small()), None);
    }

    #[test]
    fn tick_moves_the_field_and_rebuilds() {
        let mut mesher = MetaballMesher::new(orbiting_field(), small()).unwrap();
        let before = mesher.field().sources().to_vec();
        let triangles = mesher.tick().unwrap().triangle_count();
        assert!(triangles > 0);
        assert_eq!(mesher.ticks(), 1);
        assert_ne!(mesher.field().sources(), before.as_slice());
        let centered = crate::utils::centered_origin(mesher.field().centroid(), 16, 0.3);
        assert_eq!(mesher.lattice().origin(), centered);
    }

    #[test]
    fn set_config_reallocates_the_lattice() {
        let mut mesher = MetaballMesher::new(orbiting_field(), small()).unwrap();
        let coarse = mesher.tick().unwrap().triangle_count();

        let fine = small().with_resolution(32).with_cell_size(0.15);
        mesher.set_config(fine).unwrap();
        assert_eq!(mesher.config(), &fine);
        assert_eq!(mesher.lattice().resolution(), 32);
        assert_eq!(mesher.lattice().cell_size(), 0.15);
        assert!(mesher.mesh().is_empty());
        assert!(mesher.rebuild().unwrap().triangle_count() > coarse);

        let rejected = mesher.set_config(fine.with_resolution(0));
        assert_eq!(rejected, Err(MetaballError::InvalidResolution(0)));
        assert_eq!(
            mesher.set_config(fine.with_normal_step(-1.)),
            Err(MetaballError::InvalidNormalStep(-1.))
        );
        assert_eq!(mesher.config(), &fine);
        assert_eq!(mesher.lattice().resolution(), 32);
    }

    #[test]
    fn mesh_is_replaced_not_merged() {
        let mut mesher = MetaballMesher::new(orbiting_field(), small()).unwrap();
        let first = mesher.tick().unwrap().clone();
        let second = mesher.tick().unwrap().clone();
        assert_eq!(second.indices().len(), second.vertex_count());
        assert_ne!(first, second);
        assert!(second.vertex_count() < first.vertex_count() * 2);
    }

    #[test]
    fn parallel_mesher_matches_sequential() {
        let mut seq = MetaballMesher::new(orbiting_field(), small()).unwrap();
        let mut par = MetaballMesher::new(orbiting_field(), small().with_parallel(true)).unwrap();
        for _ in 0..3 {
            assert_eq!(seq.tick().unwrap(), par.tick().unwrap());
        }
    }
}
