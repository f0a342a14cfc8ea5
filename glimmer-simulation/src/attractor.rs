use crate::canvas::FrameTime;
use crate::particle::CanvasParticle;
use crate::Coordinator;
use glam::Vec2;
use glimmer_config::Falloff;
use glimmer_core::{Attractor, AttractorToken};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Pull weight at normalized distance `t` (0 at the center, 1 at the radius)
pub fn falloff_weight(falloff: Falloff, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    match falloff {
        Falloff::Linear => 1.0 - t,
        Falloff::Smooth => 1.0 - t * t * (3.0 - 2.0 * t),
        Falloff::Sphere => (1.0 - t * t).sqrt(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttractorSettings {
    pub name: String,
    pub position: Vec2,
    /// Velocity change per second at the center
    pub strength: f32,
    pub radius: f32,
    pub falloff: Falloff,
}

/// Pulls the particles of its target systems toward a point
pub struct ParticleAttractor {
    name: String,
    position: Cell<Vec2>,
    strength: Cell<f32>,
    radius: f32,
    falloff: Falloff,
    targets: RefCell<Vec<Weak<CanvasParticle>>>,
    time: Rc<FrameTime>,
    coordinator: Weak<Coordinator>,
    token: Cell<Option<AttractorToken>>,
    pulls: Cell<u64>,
}

impl ParticleAttractor {
    pub fn new(settings: AttractorSettings, time: &Rc<FrameTime>, coordinator: &Rc<Coordinator>) -> Rc<Self> {
        Rc::new(Self {
            name: settings.name,
            position: Cell::new(settings.position),
            strength: Cell::new(settings.strength),
            radius: settings.radius,
            falloff: settings.falloff,
            targets: RefCell::new(Vec::new()),
            time: time.clone(),
            coordinator: Rc::downgrade(coordinator),
            token: Cell::new(None),
            pulls: Cell::new(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_target(&self, target: &Rc<CanvasParticle>) {
        self.targets.borrow_mut().push(Rc::downgrade(target));
    }

    pub fn set_enabled(self: &Rc<Self>, enabled: bool) {
        if enabled == self.is_enabled() {
            return;
        }
        let Some(coordinator) = self.coordinator.upgrade() else {
            return;
        };
        if enabled {
            self.token.set(coordinator.register_attractor(self));
        } else if let Some(token) = self.token.take() {
            coordinator.unregister_attractor(token);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.token.get().is_some()
    }

    pub fn position(&self) -> Vec2 {
        self.position.get()
    }

    pub fn set_position(&self, position: Vec2) {
        self.position.set(position);
    }

    pub fn set_strength(&self, strength: f32) {
        self.strength.set(strength);
    }

    /// Number of attraction passes this attractor has run
    pub fn pulls(&self) -> u64 {
        self.pulls.get()
    }
}

impl Attractor for ParticleAttractor {
    fn attract(&self) {
        self.pulls.set(self.pulls.get() + 1);
        let dt = self.time.delta();
        if dt <= 0.0 || self.strength.get() == 0.0 {
            return;
        }

        // Upgrade first so no targets borrow is held across a particle call
        let targets: Vec<Rc<CanvasParticle>> =
            self.targets.borrow().iter().filter_map(Weak::upgrade).collect();
        for target in targets {
            target.attract_toward(self.position.get(), self.strength.get(), self.radius, self.falloff, dt);
        }
    }
}

impl Drop for ParticleAttractor {
    fn drop(&mut self) {
        if let (Some(token), Some(coordinator)) = (self.token.take(), self.coordinator.upgrade()) {
            coordinator.unregister_attractor(token);
        }
    }
}
