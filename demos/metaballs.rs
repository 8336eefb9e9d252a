use std::f32::consts::TAU;

use bevy::prelude::*;
use bevy_panorbit_camera::{PanOrbitCamera, PanOrbitCameraPlugin};
use metaball_mesher::{
    MesherConfig, MetaballField, MetaballMesh, MetaballMesher, MetaballPlugin, MetaballSurface,
    Orbit, Orbits,
    types::{Point, Vector},
};

fn main() {
    App::new()
        .add_plugins((DefaultPlugins, PanOrbitCameraPlugin, MetaballPlugin))
        .add_systems(Startup, setup)
        .run();
}

fn setup(mut commands: Commands, mut materials: ResMut<Assets<StandardMaterial>>) {
    info!("Metaballs Example");

    // Three balls on tilted orbits, a third of a turn apart.
    let orbits = (0..3)
        .map(|n| {
            let tilt = n as f32 * TAU / 6.;
            Orbit::new(Point::origin(), 1.4, 0.7 + 0.3 * n as f32)
                .with_phase(n as f32 * TAU / 3.)
                .with_plane(Vector::x(), Vector::new(0., tilt.cos(), tilt.sin()))
        })
        .collect();
    let motion = Orbits::new(orbits, 1. / 60.);

    let field = match MetaballField::new(motion.initial_sources(1.)) {
        Ok(field) => field.with_motion(motion),
        Err(error) => {
            error!("could not build the metaball field: {error}");
            return;
        }
    };
    let config = MesherConfig::default().with_parallel(true);
    match MetaballMesher::new(field, config) {
        Ok(mesher) => commands.insert_resource(MetaballSurface::new(mesher)),
        Err(error) => {
            error!("could not build the mesher: {error}");
            return;
        }
    }

    commands.spawn((
        MetaballMesh,
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.9, 0.35, 0.2),
            perceptual_roughness: 0.4,
            ..default()
        })),
    ));

    commands.spawn((
        DirectionalLight {
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(4.0, 8.0, 4.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(0.0, 3.0, 9.0).looking_at(Vec3::ZERO, Vec3::Y),
        PanOrbitCamera::default(),
    ));
}
