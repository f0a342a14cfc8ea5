use glimmer_config::{parse_config, ConfigFormat};
use glimmer_core::ParticleEntity;
use glimmer_simulation::Scene;
use std::rc::Rc;

const SCENE: &str = r#"{
  "framerate": 2,
  "seed": 11,
  "canvas": { "scale_factor": 2.0 },
  "particles": [
    { "name": "sparks", "group": 1, "primary": true, "mesh_sharing": true, "renderers": 2,
      "emission_rate": 10.0, "lifetime": 10.0 },
    { "name": "embers", "group": 1, "mesh_sharing": true, "renderers": 2,
      "emission_rate": 10.0, "lifetime": 10.0 },
    { "name": "smoke", "emission_rate": 4.0, "lifetime": 10.0 }
  ],
  "attractors": [
    { "name": "well", "position": [0.0, 0.0], "strength": 5.0, "radius": 500.0,
      "targets": ["smoke"] }
  ]
}"#;

fn scene() -> Scene {
    let config = parse_config(SCENE, ConfigFormat::Json).unwrap();
    Scene::from_config(&config).unwrap()
}

#[test]
fn frames_run_once_with_shared_group_rendering() {
    let scene = scene();

    for frame in 1..=4 {
        let report = scene.frame(frame, 0.5, 2).unwrap();
        assert_eq!(report.frame, frame);
        // sparks renders for group 1, smoke renders on its own
        assert_eq!(report.primary_renders, 1);
        assert_eq!(report.shared_renders, 0);
        assert_eq!(report.unshared_renders, 1);
        assert_eq!(report.transform_updates, 4);
        assert_eq!(report.attractions, 1);
        assert_eq!(report.count_refreshes, 3);
    }

    let sparks = scene.particle("sparks").unwrap();
    let embers = scene.particle("embers").unwrap();
    let smoke = scene.particle("smoke").unwrap();

    assert_eq!(sparks.stats().renders, 4);
    assert_eq!(embers.stats().renders, 0);
    assert_eq!(smoke.stats().renders, 4);
    assert_eq!(sparks.world_scale(), 2.0);

    assert_eq!(sparks.particle_count(), 20);
    assert_eq!(smoke.particle_count(), 8);
    assert_eq!(scene.live_particles(), 28);

    for index in 0..2 {
        let mesh = sparks.renderer(index).mesh();
        assert_eq!(mesh.quad_count(), 20);
        assert!(Rc::ptr_eq(&embers.renderer(index).mesh(), &mesh));
    }
    assert_eq!(scene.attractor("well").unwrap().pulls(), 4);
}

#[test]
fn disabling_the_primary_hands_the_group_to_the_next_member() {
    let scene = scene();
    scene.frame(1, 0.5, 1).unwrap();

    scene.set_enabled("sparks", false).unwrap();
    let report = scene.frame(2, 0.5, 1).unwrap();
    assert_eq!(report.primary_renders, 0);
    assert_eq!(report.shared_renders, 1);

    let embers = scene.particle("embers").unwrap();
    assert_eq!(embers.stats().renders, 1);
    assert_eq!(embers.particle_count(), 5);

    scene.set_enabled("sparks", true).unwrap();
    let report = scene.frame(3, 0.5, 1).unwrap();
    assert_eq!(report.primary_renders, 1);
    assert_eq!(report.shared_renders, 0);
}

#[test]
fn disabled_canvas_skips_particles_but_not_attractors() {
    let scene = scene();
    scene.canvas().set_enabled(false);

    let report = scene.frame(1, 0.5, 1).unwrap();
    assert_eq!(report.renders(), 0);
    assert_eq!(report.skipped, 3);
    assert_eq!(report.attractions, 1);
    assert_eq!(scene.live_particles(), 0);
}

#[test]
fn despawned_particle_leaves_the_cycle() {
    let mut scene = scene();
    scene.frame(1, 0.5, 1).unwrap();

    scene.despawn("smoke").unwrap();
    assert_eq!(scene.coordinator().particle_count(), 2);

    let report = scene.frame(2, 0.5, 1).unwrap();
    assert_eq!(report.unshared_renders, 0);
    assert_eq!(report.count_refreshes, 2);
    // The attractor's target is gone; the pass still visits it
    assert_eq!(report.attractions, 1);
}
