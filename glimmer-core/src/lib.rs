//! Frame-update coordination for canvas particle entities.
//!
//! An [`UpdateCoordinator`] holds non-owning registrations of particle
//! entities and attractors and runs their per-frame work once per frame, in a
//! fixed order:
//!
//! 1. primaries update and render, one per group
//! 2. every entity updates its transform scale; sharing groups render once
//! 3. attractors pull particles
//! 4. every entity refreshes its particle count

pub mod capability;
pub mod entity;
pub mod gate;
pub mod group;
pub mod query;
pub mod registry;
pub mod scheduler;

pub use capability::{Attractor, ParticleEntity, ParticleProfile};
pub use entity::{SlotAllocator, Token};
pub use gate::FrameGate;
pub use group::{GroupId, GroupKey, GroupTracker};
pub use registry::Registry;
pub use scheduler::{AttractorToken, CycleReport, ParticleToken, UpdateCoordinator};
