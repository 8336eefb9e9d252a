use bevy::{
    asset::RenderAssetUsages,
    mesh::{Indices, PrimitiveTopology},
    prelude::*,
};

use crate::{field::MetaballField, mesh::MeshBuffer, mesher::MetaballMesher};

/// System sets for the metaball pipeline.
///
/// Use these to order your own systems relative to extraction:
///
/// ```rust,ignore
/// // Move sources by hand after the built-in motion law, before the mesh is rebuilt next frame:
/// app.add_systems(Update, steer_sources.after(MetaballSet::Upload));
/// ```
///
/// ```text
/// MetaballSet::Tick  →  MetaballSet::Upload  →  [your systems]
/// ```
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetaballSet {
    /// Advances the field and rebuilds the [`MeshBuffer`].
    Tick,
    /// Copies a freshly built [`MeshBuffer`] into a Bevy [`Mesh3d`] on every [`MetaballMesh`]
    /// entity.
    Upload,
}

/// Marker component for entities that display the metaball surface.
///
/// Give the entity a material; [`MetaballSet::Upload`] inserts the [`Mesh3d`].
#[derive(Component, Default)]
#[require(Transform)]
pub struct MetaballMesh;

/// The mesher driven once per frame by [`MetaballPlugin`].
///
/// Insert it yourself; the plugin's systems only run while it exists:
///
/// ```rust,ignore
/// let field = MetaballField::new(sources)?.with_motion(orbits);
/// let mesher = MetaballMesher::new(field, MesherConfig::default())?;
/// commands.insert_resource(MetaballSurface::new(mesher));
/// ```
///
/// The configuration can be changed between frames:
///
/// ```rust,ignore
/// fn refine(mut surface: ResMut<MetaballSurface>) {
///     let config = surface.mesher.config().with_resolution(160);
///     if let Err(error) = surface.mesher.set_config(config) {
///         warn!("kept the old lattice: {error}");
///     }
/// }
/// ```
#[derive(Resource)]
pub struct MetaballSurface {
    pub mesher: MetaballMesher<MetaballField>,
    fresh: bool,
}

impl MetaballSurface {
    pub fn new(mesher: MetaballMesher<MetaballField>) -> Self {
        Self {
            mesher,
            fresh: false,
        }
    }
}

/// Bevy plugin that rebuilds the metaball mesh every frame.
///
/// When the `auto_tick` feature is enabled the pipeline runs in `Update`:
///
/// ```text
/// MetaballSurface present
///   → field advanced, lattice sampled, cells triangulated   (MetaballSet::Tick)
///   → Mesh3d replaced on every MetaballMesh entity          (MetaballSet::Upload)
/// ```
///
/// A failed tick is logged and the previous mesh stays on screen.
#[derive(Default)]
pub struct MetaballPlugin;

impl Plugin for MetaballPlugin {
    fn build(&self, app: &mut App) {
        #[cfg(feature = "auto_tick")]
        app.configure_sets(
            Update,
            (MetaballSet::Tick, MetaballSet::Upload)
                .chain()
                .run_if(resource_exists::<MetaballSurface>),
        )
        .add_systems(
            Update,
            (
                tick_surface.in_set(MetaballSet::Tick),
                upload_surface.in_set(MetaballSet::Upload),
            ),
        );
    }
}

/// Runs one mesher tick.
fn tick_surface(mut surface: ResMut<MetaballSurface>) {
    let surface = surface.as_mut();
    match surface.mesher.tick() {
        Ok(mesh) => {
            trace!(triangles = mesh.triangle_count(), "metaball tick");
            surface.fresh = true;
        }
        Err(error) => {
            warn!("metaball tick {} failed: {error}", surface.mesher.ticks());
            surface.fresh = false;
        }
    }
}

/// Replaces the [`Mesh3d`] of every [`MetaballMesh`] entity with the freshly built surface.
fn upload_surface(
    mut commands: Commands,
    mut surface: ResMut<MetaballSurface>,
    query: Query<Entity, With<MetaballMesh>>,
    mut meshes: ResMut<Assets<Mesh>>,
) {
    if !surface.fresh {
        return;
    }
    surface.fresh = false;

    let handle = meshes.add(to_bevy_mesh(surface.mesher.mesh()));
    for entity in query.iter() {
        commands.entity(entity).insert(Mesh3d(handle.clone()));
    }
}

/// Builds a triangle-list Bevy [`Mesh`] with positions, normals and `u32` indices.
///
/// Mesher normals follow the field gradient, into the metaballs. Bevy shades front faces
/// (counter-clockwise, here facing out of the metaballs) with outward normals, so they are
/// negated on the way in.
pub fn to_bevy_mesh(buffer: &MeshBuffer) -> Mesh {
    let mut mesh = Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::RENDER_WORLD,
    );
    let normals: Vec<[f32; 3]> = buffer.normals().iter().map(|n| n.map(|c| -c)).collect();
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, buffer.vertices().to_vec());
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    mesh.insert_indices(Indices::U32(buffer.indices().to_vec()));
    mesh
}
