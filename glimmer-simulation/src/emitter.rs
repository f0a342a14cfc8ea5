//! CPU particle pool and emission

use crate::mesh::Mesh;
use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: Vec2,
    pub velocity: Vec2,
    pub age: f32,
    pub lifetime: f32,
}

impl Particle {
    /// Normalized age in [0, 1]
    pub fn age_ratio(&self) -> f32 {
        if self.lifetime <= 0.0 {
            1.0
        } else {
            (self.age / self.lifetime).min(1.0)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmitterSettings {
    /// Particles spawned per second
    pub emission_rate: f32,
    pub lifetime: f32,
    pub speed: f32,
    pub max_particles: usize,
    /// Quad edge length in canvas units
    pub size: f32,
}

impl Default for EmitterSettings {
    fn default() -> Self {
        Self {
            emission_rate: 20.0,
            lifetime: 2.0,
            speed: 40.0,
            max_particles: 256,
            size: 4.0,
        }
    }
}

/// Owns a pool of live particles and spawns new ones at a fixed rate
pub struct Emitter {
    settings: EmitterSettings,
    particles: Vec<Particle>,
    accumulator: f32,
    rng: StdRng,
}

impl Emitter {
    pub fn new(settings: EmitterSettings, seed: u64) -> Self {
        Self {
            particles: Vec::with_capacity(settings.max_particles),
            settings,
            accumulator: 0.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn settings(&self) -> &EmitterSettings {
        &self.settings
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub fn alive_count(&self) -> usize {
        self.particles.len()
    }

    /// Advance the pool by `dt` seconds: emit, integrate, then kill expired
    pub fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }

        self.accumulator += self.settings.emission_rate * dt;
        let free = self.settings.max_particles.saturating_sub(self.particles.len());
        let due = self.accumulator as usize;
        if due > free || !self.accumulator.is_finite() {
            // Emission owed past pool capacity is dropped
            self.accumulator = 0.0;
        } else {
            self.accumulator -= due as f32;
        }
        for _ in 0..due.min(free) {
            self.spawn();
        }

        for particle in &mut self.particles {
            particle.age += dt;
            particle.position += particle.velocity * dt;
        }

        // Swap-remove expired particles; the swapped-in one is rechecked
        let mut i = 0;
        while i < self.particles.len() {
            if self.particles[i].age >= self.particles[i].lifetime {
                self.particles.swap_remove(i);
            } else {
                i += 1;
            }
        }
    }

    fn spawn(&mut self) {
        let angle = self.rng.gen_range(0.0..TAU);
        let speed = self.settings.speed * self.rng.gen_range(0.5..1.0);
        let lifetime = self.settings.lifetime * self.rng.gen_range(0.75..=1.0);
        self.particles.push(Particle {
            position: Vec2::ZERO,
            velocity: Vec2::from_angle(angle) * speed,
            age: 0.0,
            lifetime,
        });
    }

    /// Bake live particles into a quad mesh, fading alpha with age
    pub fn bake(&self, scale: f32) -> Mesh {
        let mut mesh = Mesh::new();
        let half_size = self.settings.size * 0.5 * scale;
        for particle in &self.particles {
            let alpha = 1.0 - particle.age_ratio();
            mesh.push_quad(particle.position * scale, half_size, [1.0, 1.0, 1.0, alpha]);
        }
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(rate: f32, max: usize) -> EmitterSettings {
        EmitterSettings {
            emission_rate: rate,
            lifetime: 10.0,
            speed: 10.0,
            max_particles: max,
            size: 2.0,
        }
    }

    fn resting(lifetime: f32) -> Particle {
        Particle {
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            age: 0.0,
            lifetime,
        }
    }

    #[test]
    fn emits_at_rate() {
        let mut emitter = Emitter::new(settings(10.0, 100), 1);
        emitter.step(0.5);
        assert_eq!(emitter.alive_count(), 5);
        // Fractional emission carries over
        emitter.step(0.25);
        assert_eq!(emitter.alive_count(), 7);
        emitter.step(0.25);
        assert_eq!(emitter.alive_count(), 10);
    }

    #[test]
    fn respects_pool_capacity() {
        let mut emitter = Emitter::new(settings(1000.0, 8), 1);
        emitter.step(0.5);
        assert_eq!(emitter.alive_count(), 8);
    }

    #[test]
    fn emission_past_capacity_is_dropped() {
        let mut emitter = Emitter::new(settings(2e9, 8), 1);
        emitter.step(1.0);
        assert_eq!(emitter.alive_count(), 8);
        assert_eq!(emitter.accumulator, 0.0);

        // Debt does not carry over once room frees up
        emitter.particles.truncate(6);
        emitter.settings.emission_rate = 0.0;
        emitter.step(0.5);
        assert_eq!(emitter.alive_count(), 6);
    }

    #[test]
    fn infinite_rate_fills_the_pool_and_returns() {
        let mut emitter = Emitter::new(settings(f32::INFINITY, 16), 1);
        emitter.step(0.5);
        emitter.step(0.5);
        assert_eq!(emitter.alive_count(), 16);
        assert_eq!(emitter.accumulator, 0.0);
    }

    #[test]
    fn expired_particles_are_removed() {
        let mut emitter = Emitter::new(settings(0.0, 100), 1);
        emitter.particles.push(resting(1.0));
        emitter.particles.push(resting(2.0));
        emitter.particles.push(resting(1.0));

        emitter.step(1.5);
        assert_eq!(emitter.alive_count(), 1);
        assert_eq!(emitter.particles()[0].lifetime, 2.0);
    }

    #[test]
    fn particles_move_outward() {
        let mut emitter = Emitter::new(settings(10.0, 100), 7);
        emitter.step(0.5);
        emitter.step(0.5);
        assert!(emitter.particles().iter().all(|p| p.position.length() > 0.0));
    }

    #[test]
    fn zero_dt_is_noop() {
        let mut emitter = Emitter::new(settings(10.0, 100), 1);
        emitter.step(0.0);
        assert_eq!(emitter.alive_count(), 0);
    }

    #[test]
    fn bake_scales_quads() {
        let mut emitter = Emitter::new(settings(10.0, 100), 1);
        emitter.step(0.5);
        let mesh = emitter.bake(2.0);
        assert_eq!(mesh.quad_count(), emitter.alive_count());

        let first = emitter.particles()[0];
        let center = first.position * 2.0;
        // Edge length 2.0 at scale 2.0 gives a half size of 2.0
        assert_eq!(mesh.vertices[0].position, (center - Vec2::splat(2.0)).to_array());
    }

    #[test]
    fn same_seed_is_deterministic() {
        let mut a = Emitter::new(settings(30.0, 100), 42);
        let mut b = Emitter::new(settings(30.0, 100), 42);
        for _ in 0..10 {
            a.step(1.0 / 30.0);
            b.step(1.0 / 30.0);
        }
        assert_eq!(a.particles(), b.particles());
    }
}
