//! Concrete canvas particles and attractors driven by a `glimmer-core`
//! coordinator.

pub mod attractor;
pub mod canvas;
pub mod emitter;
pub mod mesh;
pub mod particle;
pub mod scene;

use glimmer_core::UpdateCoordinator;

pub use attractor::{falloff_weight, AttractorSettings, ParticleAttractor};
pub use canvas::{Canvas, FrameTime};
pub use emitter::{Emitter, EmitterSettings, Particle};
pub use mesh::{Mesh, ParticleRenderer, Vertex};
pub use particle::{CanvasParticle, ParticleSettings, ParticleStats};
pub use scene::{Scene, SceneError};

/// Coordinator over this crate's entity types
pub type Coordinator = UpdateCoordinator<CanvasParticle, ParticleAttractor>;
