//! Marching cubes extraction of a moving metaball field, rebuilt from scratch every tick.
//!
//! [`MetaballMesher::tick`] advances a [`ScalarField`], re-centers and samples a cubic
//! [`Lattice`](lattice::Lattice) on the field's centroid, and triangulates every cell into a
//! [`MeshBuffer`]. [`MetaballPlugin`] drives the same pipeline from a Bevy app.

pub mod error;
pub mod extract;
pub mod field;
pub mod interp;
pub mod lattice;
pub mod mesh;
pub mod mesher;
pub mod normal;
pub mod plugin;
pub mod tables;
pub mod types;
pub mod utils;

pub use error::{MetaballError, Result};
pub use field::{MetaballField, MotionLaw, Orbit, Orbits, ScalarField, Source, Stationary};
pub use mesh::MeshBuffer;
pub use mesher::{MesherConfig, MetaballMesher};
pub use plugin::{MetaballMesh, MetaballPlugin, MetaballSet, MetaballSurface};
