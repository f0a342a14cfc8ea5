use crate::capability::{Attractor, ParticleEntity};
use crate::entity::Token;
use crate::gate::FrameGate;
use crate::group::{GroupKey, GroupTracker};
use crate::registry::Registry;
use log::{debug, trace};
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Registration handle for a particle entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParticleToken(pub(crate) Token);

/// Registration handle for an attractor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttractorToken(pub(crate) Token);

/// Work performed by one cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub frame: u64,
    /// Renders performed by primaries in the first pass
    pub primary_renders: usize,
    /// Renders claimed for a sharing group in the second pass
    pub shared_renders: usize,
    /// Renders of entities that do not share meshes
    pub unshared_renders: usize,
    pub transform_updates: usize,
    /// Particle positions skipped in the second pass (stale, invalid or detached)
    pub skipped: usize,
    pub attractions: usize,
    pub count_refreshes: usize,
    pub elapsed: Duration,
}

impl CycleReport {
    fn new(frame: u64) -> Self {
        Self {
            frame,
            ..Self::default()
        }
    }

    pub fn renders(&self) -> usize {
        self.primary_renders + self.shared_renders + self.unshared_renders
    }
}

/// Runs the per-frame update cycle over registered particles and attractors.
///
/// The host constructs one coordinator, shares it as `Rc`, and calls
/// [`UpdateCoordinator::refresh`] from its frame trigger. Entities register
/// themselves when enabled and unregister when disabled or dropped. Every
/// method takes `&self` so entity callbacks may call back in; no internal
/// borrow is held while an entity method runs.
pub struct UpdateCoordinator<P: ?Sized, A: ?Sized> {
    pub(crate) particles: RefCell<Registry<P>>,
    attractors: RefCell<Registry<A>>,
    gate: Cell<FrameGate>,
    tracker: RefCell<GroupTracker>,
    in_cycle: Cell<bool>,
}

impl<P: ?Sized, A: ?Sized> Default for UpdateCoordinator<P, A> {
    fn default() -> Self {
        Self {
            particles: RefCell::new(Registry::new()),
            attractors: RefCell::new(Registry::new()),
            gate: Cell::new(FrameGate::new()),
            tracker: RefCell::new(GroupTracker::new()),
            in_cycle: Cell::new(false),
        }
    }
}

// Clears the in-cycle flag even if an entity callback panics
struct CycleGuard<'a>(&'a Cell<bool>);

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<P, A> UpdateCoordinator<P, A>
where
    P: ParticleEntity + ?Sized,
    A: Attractor + ?Sized,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a particle entity. Returns `None` if the entity is invalid.
    pub fn register_particle(&self, entity: &Rc<P>) -> Option<ParticleToken> {
        if !entity.is_valid() {
            return None;
        }
        let token = self.particles.borrow_mut().insert(entity);
        debug!("Registered particle {:?}", token);
        Some(ParticleToken(token))
    }

    /// Unregister a particle entity. Stale tokens are ignored.
    pub fn unregister_particle(&self, token: ParticleToken) -> bool {
        let mut particles = self.particles.borrow_mut();
        if !particles.remove(token.0) {
            return false;
        }
        if !self.in_cycle.get() && particles.needs_compaction() {
            particles.compact();
        }
        debug!("Unregistered particle {:?}", token.0);
        true
    }

    /// Register an attractor. Returns `None` if the attractor is invalid.
    pub fn register_attractor(&self, attractor: &Rc<A>) -> Option<AttractorToken> {
        if !attractor.is_valid() {
            return None;
        }
        let token = self.attractors.borrow_mut().insert(attractor);
        debug!("Registered attractor {:?}", token);
        Some(AttractorToken(token))
    }

    /// Unregister an attractor. Stale tokens are ignored.
    pub fn unregister_attractor(&self, token: AttractorToken) -> bool {
        let mut attractors = self.attractors.borrow_mut();
        if !attractors.remove(token.0) {
            return false;
        }
        if !self.in_cycle.get() && attractors.needs_compaction() {
            attractors.compact();
        }
        debug!("Unregistered attractor {:?}", token.0);
        true
    }

    pub fn is_particle_registered(&self, token: ParticleToken) -> bool {
        self.particles.borrow().contains(token.0)
    }

    pub fn is_attractor_registered(&self, token: AttractorToken) -> bool {
        self.attractors.borrow().contains(token.0)
    }

    /// Number of registered particle entities
    pub fn particle_count(&self) -> usize {
        self.particles.borrow().len()
    }

    pub fn attractor_count(&self) -> usize {
        self.attractors.borrow().len()
    }

    /// Last frame a cycle ran for
    pub fn last_frame(&self) -> Option<u64> {
        self.gate.get().last_frame()
    }

    /// Run the update cycle for `frame`.
    ///
    /// Returns `None` without touching any entity when a cycle already ran for
    /// `frame`, or when called from inside a running cycle.
    pub fn refresh(&self, frame: u64) -> Option<CycleReport> {
        if self.in_cycle.get() {
            return None;
        }

        let mut gate = self.gate.get();
        if !gate.should_run(frame) {
            return None;
        }
        self.gate.set(gate);

        let start = Instant::now();
        self.in_cycle.set(true);
        let guard = CycleGuard(&self.in_cycle);

        // Registrations made during the cycle are first seen next cycle
        let span = self.particles.borrow().span();
        let attractor_span = self.attractors.borrow().span();
        let mut report = CycleReport::new(frame);

        self.primary_pass(span, &mut report);
        self.secondary_pass(span, &mut report);
        self.tracker.borrow_mut().clear();
        self.attraction_pass(attractor_span, &mut report);
        self.bookkeeping_pass(span, &mut report);

        drop(guard);
        self.compact_registries();

        report.elapsed = start.elapsed();
        trace!(
            "Frame {}: {} renders ({} primary), {} transform updates, {} skipped, {} attractions",
            frame,
            report.renders(),
            report.primary_renders,
            report.transform_updates,
            report.skipped,
            report.attractions
        );
        Some(report)
    }

    /// Particle at `position` if it is still alive, valid, and on a canvas
    fn active_particle(&self, position: usize) -> Option<(Token, Rc<P>)> {
        let (token, entity) = self.particles.borrow().get_at(position)?;
        let entity = entity.upgrade()?;
        if !entity.is_valid() || !entity.profile().attached_to_canvas {
            return None;
        }
        Some((token, entity))
    }

    // Primaries compute their group's shared state first
    fn primary_pass(&self, span: usize, report: &mut CycleReport) {
        for position in 0..span {
            let Some((token, entity)) = self.active_particle(position) else {
                continue;
            };
            let profile = entity.profile();
            if !profile.is_primary {
                continue;
            }
            if !self.tracker.borrow_mut().claim(GroupKey::new(profile.group, token)) {
                continue;
            }

            entity.update_transform_scale();
            entity.update_renderers();
            report.transform_updates += 1;
            report.primary_renders += 1;
        }
    }

    fn secondary_pass(&self, span: usize, report: &mut CycleReport) {
        for position in 0..span {
            let Some((token, entity)) = self.active_particle(position) else {
                report.skipped += 1;
                continue;
            };

            entity.update_transform_scale();
            report.transform_updates += 1;

            // Read after the scale update, which may change the flags
            let profile = entity.profile();
            if !profile.mesh_sharing {
                entity.update_renderers();
                report.unshared_renders += 1;
            } else if self.tracker.borrow_mut().claim(GroupKey::new(profile.group, token)) {
                entity.update_renderers();
                report.shared_renders += 1;
            }
        }
    }

    // Attractors are not checked for validity here: a live registration is
    // assumed safe to call.
    fn attraction_pass(&self, span: usize, report: &mut CycleReport) {
        for position in 0..span {
            let Some(attractor) = self
                .attractors
                .borrow()
                .get_at(position)
                .and_then(|(_, attractor)| attractor.upgrade())
            else {
                continue;
            };
            attractor.attract();
            report.attractions += 1;
        }
    }

    fn bookkeeping_pass(&self, span: usize, report: &mut CycleReport) {
        for position in 0..span {
            if let Some((_, entity)) = self.active_particle(position) {
                entity.update_particle_count();
                report.count_refreshes += 1;
            }
        }
    }

    fn compact_registries(&self) {
        let mut particles = self.particles.borrow_mut();
        if particles.needs_compaction() {
            particles.compact();
        }
        drop(particles);

        let mut attractors = self.attractors.borrow_mut();
        if attractors.needs_compaction() {
            attractors.compact();
        }
    }
}
