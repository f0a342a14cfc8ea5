use crate::attractor::{AttractorSettings, ParticleAttractor};
use crate::canvas::{Canvas, FrameTime};
use crate::emitter::EmitterSettings;
use crate::particle::{CanvasParticle, ParticleSettings};
use crate::Coordinator;
use glam::Vec2;
use glimmer_config::{Config, ParticleConfig};
use glimmer_core::{CycleReport, GroupId, UpdateCoordinator};
use log::{debug, info, warn};
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SceneError {
    #[error("Duplicate particle name '{0}'")]
    DuplicateParticle(String),

    #[error("Attractor '{attractor}' targets unknown particle '{target}'")]
    UnknownTarget { attractor: String, target: String },

    #[error("No particle named '{0}'")]
    UnknownParticle(String),
}

/// A canvas with its particles and attractors, all registered with one
/// coordinator.
pub struct Scene {
    coordinator: Rc<Coordinator>,
    canvas: Rc<Canvas>,
    time: Rc<FrameTime>,
    // Frame index the clock was last advanced for
    clock_frame: Cell<Option<u64>>,
    particles: Vec<Rc<CanvasParticle>>,
    attractors: Vec<Rc<ParticleAttractor>>,
}

fn particle_settings(config: &ParticleConfig, seed: u64) -> ParticleSettings {
    ParticleSettings {
        name: config.name.clone(),
        group: config.group.map(GroupId),
        primary: config.primary,
        mesh_sharing: config.mesh_sharing,
        renderers: config.renderers,
        scale: config.scale,
        emitter: EmitterSettings {
            emission_rate: config.emission_rate,
            lifetime: config.lifetime,
            speed: config.speed,
            max_particles: config.max_particles,
            size: config.size,
        },
        seed,
    }
}

impl Scene {
    /// Build and enable everything described by `config`
    pub fn from_config(config: &Config) -> Result<Self, SceneError> {
        let coordinator: Rc<Coordinator> = Rc::new(UpdateCoordinator::new());
        let canvas = Rc::new(Canvas::new(config.canvas.scale_factor));
        canvas.set_enabled(config.canvas.enabled);
        let time = Rc::new(FrameTime::new());

        let mut by_name = HashMap::new();
        let mut particles = Vec::with_capacity(config.particles.len());
        for (index, particle_config) in config.particles.iter().enumerate() {
            if by_name.contains_key(particle_config.name.as_str()) {
                return Err(SceneError::DuplicateParticle(particle_config.name.clone()));
            }
            let seed = config.seed.wrapping_add(index as u64);
            let particle = CanvasParticle::new(
                particle_settings(particle_config, seed),
                &canvas,
                &time,
                &coordinator,
            );
            by_name.insert(particle_config.name.as_str(), index);
            particles.push(particle);
        }

        let mut attractors = Vec::with_capacity(config.attractors.len());
        for attractor_config in &config.attractors {
            let attractor = ParticleAttractor::new(
                AttractorSettings {
                    name: attractor_config.name.clone(),
                    position: Vec2::from_array(attractor_config.position),
                    strength: attractor_config.strength,
                    radius: attractor_config.radius,
                    falloff: attractor_config.falloff,
                },
                &time,
                &coordinator,
            );
            for target in &attractor_config.targets {
                let Some(&index) = by_name.get(target.as_str()) else {
                    return Err(SceneError::UnknownTarget {
                        attractor: attractor_config.name.clone(),
                        target: target.clone(),
                    });
                };
                attractor.add_target(&particles[index]);
            }
            if attractor_config.targets.is_empty() {
                warn!("Attractor '{}' has no targets", attractor_config.name);
            }
            attractors.push(attractor);
        }

        for particle in &particles {
            particle.set_enabled(true);
            debug!("Enabled particle '{}'", particle.name());
        }
        for attractor in &attractors {
            attractor.set_enabled(true);
        }

        if !canvas.is_enabled() {
            warn!("Canvas starts disabled; particles will be skipped until it is enabled");
        }
        info!(
            "Scene ready: {} particles, {} attractors",
            coordinator.particle_count(),
            coordinator.attractor_count()
        );

        Ok(Self {
            coordinator,
            canvas,
            time,
            clock_frame: Cell::new(None),
            particles,
            attractors,
        })
    }

    /// Run one host frame, firing the coordinator trigger `triggers` times.
    ///
    /// Returns the report of the cycle that ran, `None` if every trigger was
    /// ignored. Repeating a frame index does not advance the clock.
    pub fn frame(&self, frame_index: u64, dt: f32, triggers: u32) -> Option<CycleReport> {
        if self.clock_frame.get() != Some(frame_index) {
            self.clock_frame.set(Some(frame_index));
            self.time.advance(dt);
        }
        let mut report = None;
        for _ in 0..triggers {
            if let Some(cycle) = self.coordinator.refresh(frame_index) {
                report = Some(cycle);
            }
        }
        report
    }

    /// Enable or disable a particle by name
    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<(), SceneError> {
        let particle = self
            .particle(name)
            .ok_or_else(|| SceneError::UnknownParticle(name.to_string()))?;
        particle.set_enabled(enabled);
        Ok(())
    }

    /// Drop the scene's handle to a particle; it unregisters once no other
    /// handle keeps it alive.
    pub fn despawn(&mut self, name: &str) -> Result<(), SceneError> {
        let position = self
            .particles
            .iter()
            .position(|particle| particle.name() == name)
            .ok_or_else(|| SceneError::UnknownParticle(name.to_string()))?;
        self.particles.remove(position);
        Ok(())
    }

    pub fn particle(&self, name: &str) -> Option<&Rc<CanvasParticle>> {
        self.particles.iter().find(|particle| particle.name() == name)
    }

    pub fn attractor(&self, name: &str) -> Option<&Rc<ParticleAttractor>> {
        self.attractors.iter().find(|attractor| attractor.name() == name)
    }

    pub fn particles(&self) -> &[Rc<CanvasParticle>] {
        &self.particles
    }

    pub fn coordinator(&self) -> &Rc<Coordinator> {
        &self.coordinator
    }

    pub fn canvas(&self) -> &Rc<Canvas> {
        &self.canvas
    }

    /// Sum of published particle counts
    pub fn live_particles(&self) -> usize {
        self.particles.iter().map(|particle| particle.particle_count()).sum()
    }
}
