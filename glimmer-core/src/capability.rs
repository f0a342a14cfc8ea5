use crate::group::GroupId;

/// Flags a particle entity reports to the coordinator each time it is visited
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParticleProfile {
    /// Group the entity cooperates with, `None` when ungrouped
    pub group: Option<GroupId>,
    /// Computes shared group state ahead of the other members
    pub is_primary: bool,
    /// Render output may be computed once and reused by the group
    pub mesh_sharing: bool,
    pub can_simulate: bool,
    /// Entities off an active canvas are skipped
    pub attached_to_canvas: bool,
}

impl ParticleProfile {
    pub fn new(group: Option<GroupId>) -> Self {
        Self {
            group,
            can_simulate: true,
            attached_to_canvas: true,
            ..Self::default()
        }
    }

    pub fn primary(mut self, is_primary: bool) -> Self {
        self.is_primary = is_primary;
        self
    }

    pub fn sharing(mut self, mesh_sharing: bool) -> Self {
        self.mesh_sharing = mesh_sharing;
        self
    }

    pub fn simulating(mut self, can_simulate: bool) -> Self {
        self.can_simulate = can_simulate;
        self
    }

    pub fn attached(mut self, attached_to_canvas: bool) -> Self {
        self.attached_to_canvas = attached_to_canvas;
        self
    }

    /// Whether this entity takes part in `group`'s shared rendering
    pub fn shares_with(&self, group: GroupId) -> bool {
        self.mesh_sharing && self.group == Some(group)
    }
}

/// Capability contract a particle entity exposes to the coordinator.
///
/// All methods take `&self`: entities are shared through `Rc` and may be
/// queried by their siblings while one of their own methods is running, so
/// implementations keep mutable state behind `Cell`/`RefCell`.
pub trait ParticleEntity {
    /// Handle to one of the entity's renderer slots
    type Renderer;

    /// False once the entity has been destroyed but is still referenced
    fn is_valid(&self) -> bool {
        true
    }

    fn profile(&self) -> ParticleProfile;

    fn update_transform_scale(&self);

    fn update_renderers(&self);

    fn update_particle_count(&self);

    fn renderer(&self, index: usize) -> Self::Renderer;
}

/// Capability contract for attractors
pub trait Attractor {
    /// Checked only at registration; the attraction pass calls every live
    /// registration.
    fn is_valid(&self) -> bool {
        true
    }

    fn attract(&self);
}
