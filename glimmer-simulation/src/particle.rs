use crate::attractor::falloff_weight;
use crate::canvas::{Canvas, FrameTime};
use crate::emitter::{Emitter, EmitterSettings};
use crate::mesh::{Mesh, ParticleRenderer};
use crate::Coordinator;
use glam::Vec2;
use glimmer_config::Falloff;
use glimmer_core::{GroupId, ParticleEntity, ParticleProfile, ParticleToken};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

#[derive(Debug, Clone, PartialEq)]
pub struct ParticleSettings {
    pub name: String,
    pub group: Option<GroupId>,
    pub primary: bool,
    pub mesh_sharing: bool,
    pub renderers: usize,
    /// Local scale, multiplied by the canvas scale factor
    pub scale: f32,
    pub emitter: EmitterSettings,
    pub seed: u64,
}

impl ParticleSettings {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: None,
            primary: false,
            mesh_sharing: false,
            renderers: 1,
            scale: 1.0,
            emitter: EmitterSettings::default(),
            seed: 0,
        }
    }
}

/// Running totals of coordinator calls received
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParticleStats {
    pub renders: u64,
    pub transform_updates: u64,
    pub count_refreshes: u64,
}

/// Particle system drawn onto a canvas.
///
/// Registers itself with the coordinator while enabled. With mesh sharing on,
/// the group's driver (see [`Coordinator::find_primary`]) simulates and its
/// baked mesh is pushed into every renderer slot of the group.
pub struct CanvasParticle {
    name: String,
    group: Cell<Option<GroupId>>,
    primary: Cell<bool>,
    mesh_sharing: Cell<bool>,
    destroyed: Cell<bool>,
    scale: f32,
    world_scale: Cell<f32>,
    canvas: Weak<Canvas>,
    time: Rc<FrameTime>,
    coordinator: Weak<Coordinator>,
    token: Cell<Option<ParticleToken>>,
    emitter: RefCell<Emitter>,
    capacity: usize,
    simulated_frame: Cell<Option<u64>>,
    renderer_slots: usize,
    renderers: RefCell<Vec<Rc<ParticleRenderer>>>,
    particle_count: Cell<usize>,
    stats: Cell<ParticleStats>,
}

impl CanvasParticle {
    /// Create a particle. It stays inert until enabled.
    pub fn new(
        settings: ParticleSettings,
        canvas: &Rc<Canvas>,
        time: &Rc<FrameTime>,
        coordinator: &Rc<Coordinator>,
    ) -> Rc<Self> {
        let renderers = (0..settings.renderers)
            .map(|_| Rc::new(ParticleRenderer::new()))
            .collect();
        Rc::new(Self {
            name: settings.name,
            group: Cell::new(settings.group),
            primary: Cell::new(settings.primary),
            mesh_sharing: Cell::new(settings.mesh_sharing),
            destroyed: Cell::new(false),
            scale: settings.scale,
            world_scale: Cell::new(settings.scale),
            canvas: Rc::downgrade(canvas),
            time: time.clone(),
            coordinator: Rc::downgrade(coordinator),
            token: Cell::new(None),
            capacity: settings.emitter.max_particles,
            emitter: RefCell::new(Emitter::new(settings.emitter, settings.seed)),
            simulated_frame: Cell::new(None),
            renderer_slots: settings.renderers,
            renderers: RefCell::new(renderers),
            particle_count: Cell::new(0),
            stats: Cell::new(ParticleStats::default()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register with or unregister from the coordinator. Redundant calls are
    /// no-ops.
    pub fn set_enabled(self: &Rc<Self>, enabled: bool) {
        if enabled == self.is_enabled() {
            return;
        }
        let Some(coordinator) = self.coordinator.upgrade() else {
            return;
        };
        if enabled {
            self.token.set(coordinator.register_particle(self));
        } else if let Some(token) = self.token.take() {
            coordinator.unregister_particle(token);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.token.get().is_some()
    }

    /// Mark the particle destroyed. References held elsewhere stay alive but
    /// the coordinator treats it as invalid.
    pub fn destroy(&self) {
        self.destroyed.set(true);
        self.unregister();
    }

    fn unregister(&self) {
        if let (Some(token), Some(coordinator)) = (self.token.take(), self.coordinator.upgrade()) {
            coordinator.unregister_particle(token);
        }
    }

    pub fn group(&self) -> Option<GroupId> {
        self.group.get()
    }

    pub fn set_group(&self, group: Option<GroupId>) {
        self.group.set(group);
    }

    pub fn is_primary(&self) -> bool {
        self.primary.get()
    }

    pub fn set_primary(&self, primary: bool) {
        self.primary.set(primary);
    }

    pub fn uses_mesh_sharing(&self) -> bool {
        self.mesh_sharing.get()
    }

    pub fn set_mesh_sharing(&self, mesh_sharing: bool) {
        self.mesh_sharing.set(mesh_sharing);
    }

    /// Local scale times the canvas scale factor, as of the last transform update
    pub fn world_scale(&self) -> f32 {
        self.world_scale.get()
    }

    /// Live particle count, as of the last bookkeeping pass
    pub fn particle_count(&self) -> usize {
        self.particle_count.get()
    }

    /// Live particle count right now
    pub fn alive_count(&self) -> usize {
        self.emitter.borrow().alive_count()
    }

    pub fn stats(&self) -> ParticleStats {
        self.stats.get()
    }

    pub fn renderer_slots(&self) -> usize {
        self.renderer_slots
    }

    fn is_attached(&self) -> bool {
        self.canvas.upgrade().map_or(false, |canvas| canvas.is_enabled())
    }

    fn bump(&self, update: impl FnOnce(&mut ParticleStats)) {
        let mut stats = self.stats.get();
        update(&mut stats);
        self.stats.set(stats);
    }

    /// Step the emitter, at most once per frame
    fn simulate(&self) {
        let frame = self.time.frame();
        if self.simulated_frame.get() == Some(frame) {
            return;
        }
        self.simulated_frame.set(Some(frame));
        self.emitter.borrow_mut().step(self.time.delta());
    }

    fn bake(&self) -> Rc<Mesh> {
        Rc::new(self.emitter.borrow().bake(self.world_scale.get()))
    }

    fn render_own(&self) {
        self.simulate();
        let mesh = self.bake();
        for renderer in self.renderers.borrow().iter() {
            renderer.set_mesh(mesh.clone());
        }
    }

    fn render_shared(&self, coordinator: &Coordinator, group: GroupId) {
        let mesh = match coordinator.find_primary(group) {
            Some(driver) => {
                driver.simulate();
                driver.bake()
            }
            None => {
                self.simulate();
                self.bake()
            }
        };

        let mut renderers = Vec::new();
        for index in 0..self.renderer_slots {
            coordinator.collect_group_renderers(group, index, &mut renderers);
            for renderer in renderers.drain(..) {
                renderer.set_mesh(mesh.clone());
            }
        }
    }

    /// Pull live particles toward `center`, weighted by distance falloff
    pub(crate) fn attract_toward(&self, center: Vec2, strength: f32, radius: f32, falloff: Falloff, dt: f32) {
        let mut emitter = self.emitter.borrow_mut();
        for particle in emitter.particles_mut() {
            let offset = center - particle.position;
            let distance = offset.length();
            if distance <= f32::EPSILON || distance > radius {
                continue;
            }
            let weight = falloff_weight(falloff, distance / radius);
            particle.velocity += offset / distance * strength * weight * dt;
        }
    }
}

impl ParticleEntity for CanvasParticle {
    type Renderer = Rc<ParticleRenderer>;

    fn is_valid(&self) -> bool {
        !self.destroyed.get()
    }

    fn profile(&self) -> ParticleProfile {
        let can_simulate = self.is_enabled() && self.capacity > 0;
        ParticleProfile::new(self.group.get())
            .primary(self.primary.get())
            .sharing(self.mesh_sharing.get())
            .simulating(can_simulate)
            .attached(self.is_attached())
    }

    fn update_transform_scale(&self) {
        let canvas_scale = self.canvas.upgrade().map_or(1.0, |canvas| canvas.scale_factor());
        self.world_scale.set(self.scale * canvas_scale);
        self.bump(|stats| stats.transform_updates += 1);
    }

    fn update_renderers(&self) {
        self.bump(|stats| stats.renders += 1);
        let shared_group = self.group.get().filter(|_| self.mesh_sharing.get());
        match (self.coordinator.upgrade(), shared_group) {
            (Some(coordinator), Some(group)) => self.render_shared(&coordinator, group),
            _ => self.render_own(),
        }
    }

    fn update_particle_count(&self) {
        self.particle_count.set(self.emitter.borrow().alive_count());
        self.bump(|stats| stats.count_refreshes += 1);
    }

    /// Renderer slot `index`, created on first use
    fn renderer(&self, index: usize) -> Rc<ParticleRenderer> {
        let mut renderers = self.renderers.borrow_mut();
        while renderers.len() <= index {
            renderers.push(Rc::new(ParticleRenderer::new()));
        }
        renderers[index].clone()
    }
}

impl Drop for CanvasParticle {
    fn drop(&mut self) {
        self.unregister();
    }
}
