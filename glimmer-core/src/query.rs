//! Read-only group lookups used by entities cooperating with their siblings.

use crate::capability::{Attractor, ParticleEntity};
use crate::group::GroupId;
use crate::scheduler::UpdateCoordinator;
use std::rc::Rc;

impl<P, A> UpdateCoordinator<P, A>
where
    P: ParticleEntity + ?Sized,
    A: Attractor + ?Sized,
{
    /// Live, valid particle at `position` in registration order
    fn live_particle(&self, position: usize) -> Option<Rc<P>> {
        let (_, entity) = self.particles.borrow().get_at(position)?;
        entity.upgrade().filter(|entity| entity.is_valid())
    }

    /// Collect renderer slot `index` of every mesh-sharing member of `group`.
    ///
    /// `out` is cleared first. Members contribute in registration order, one
    /// handle each, whether or not they are on an active canvas.
    pub fn collect_group_renderers(&self, group: GroupId, index: usize, out: &mut Vec<P::Renderer>) {
        out.clear();
        let span = self.particles.borrow().span();
        for position in 0..span {
            let Some(entity) = self.live_particle(position) else {
                continue;
            };
            if entity.profile().shares_with(group) {
                out.push(entity.renderer(index));
            }
        }
    }

    /// Find the member that should drive `group`'s shared state.
    ///
    /// The first mesh-sharing member flagged primary wins. Without one, the
    /// first mesh-sharing member that can simulate is returned.
    pub fn find_primary(&self, group: GroupId) -> Option<Rc<P>> {
        let mut fallback = None;
        let span = self.particles.borrow().span();
        for position in 0..span {
            let Some(entity) = self.live_particle(position) else {
                continue;
            };
            let profile = entity.profile();
            if !profile.shares_with(group) {
                continue;
            }
            if profile.is_primary {
                return Some(entity);
            }
            if fallback.is_none() && profile.can_simulate {
                fallback = Some(entity);
            }
        }
        fallback
    }
}

#[cfg(test)]
mod tests {
    use crate::capability::{Attractor, ParticleEntity, ParticleProfile};
    use crate::group::GroupId;
    use crate::scheduler::UpdateCoordinator;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Member {
        name: &'static str,
        profile: Cell<ParticleProfile>,
        renderers_fetched: Cell<usize>,
    }

    impl Member {
        fn new(name: &'static str, profile: ParticleProfile) -> Rc<Self> {
            Rc::new(Self {
                name,
                profile: Cell::new(profile),
                renderers_fetched: Cell::new(0),
            })
        }
    }

    impl ParticleEntity for Member {
        type Renderer = String;

        fn profile(&self) -> ParticleProfile {
            self.profile.get()
        }

        fn update_transform_scale(&self) {}

        fn update_renderers(&self) {}

        fn update_particle_count(&self) {}

        fn renderer(&self, index: usize) -> String {
            self.renderers_fetched.set(self.renderers_fetched.get() + 1);
            format!("{}/{}", self.name, index)
        }
    }

    struct Inert;

    impl Attractor for Inert {
        fn attract(&self) {}
    }

    type Coordinator = UpdateCoordinator<Member, Inert>;

    fn sharing(group: i32) -> ParticleProfile {
        ParticleProfile::new(Some(GroupId(group))).sharing(true)
    }

    #[test]
    fn find_primary_prefers_flagged_member_registered_later() {
        let coordinator = Coordinator::new();
        let a = Member::new("a", sharing(1));
        let b = Member::new("b", sharing(1));
        let c = Member::new("c", sharing(1).primary(true));
        for member in [&a, &b, &c] {
            coordinator.register_particle(member).unwrap();
        }

        let primary = coordinator.find_primary(GroupId(1)).unwrap();
        assert_eq!(primary.name, "c");
    }

    #[test]
    fn find_primary_falls_back_to_first_simulating_member() {
        let coordinator = Coordinator::new();
        let a = Member::new("a", sharing(1).simulating(false));
        let b = Member::new("b", sharing(1));
        let c = Member::new("c", sharing(1));
        let other = Member::new("other", sharing(2).primary(true));
        for member in [&a, &b, &c, &other] {
            coordinator.register_particle(member).unwrap();
        }

        let primary = coordinator.find_primary(GroupId(1)).unwrap();
        assert_eq!(primary.name, "b");
    }

    #[test]
    fn find_primary_ignores_non_sharing_members() {
        let coordinator = Coordinator::new();
        let a = Member::new("a", ParticleProfile::new(Some(GroupId(1))).primary(true));
        coordinator.register_particle(&a).unwrap();

        assert!(coordinator.find_primary(GroupId(1)).is_none());
        assert!(coordinator.find_primary(GroupId(5)).is_none());
    }

    #[test]
    fn collect_group_renderers_in_registration_order() {
        let coordinator = Coordinator::new();
        let a = Member::new("a", sharing(3));
        let b = Member::new("b", sharing(4));
        let c = Member::new("c", sharing(3).attached(false));
        let d = Member::new("d", ParticleProfile::new(Some(GroupId(3))));
        for member in [&a, &b, &c, &d] {
            coordinator.register_particle(member).unwrap();
        }

        let mut out = vec!["stale".to_string()];
        coordinator.collect_group_renderers(GroupId(3), 2, &mut out);
        assert_eq!(out, vec!["a/2", "c/2"]);
        assert_eq!(b.renderers_fetched.get(), 0);
        assert_eq!(d.renderers_fetched.get(), 0);
    }

    #[test]
    fn collect_group_renderers_counts_duplicates() {
        let coordinator = Coordinator::new();
        let a = Member::new("a", sharing(3));
        coordinator.register_particle(&a).unwrap();
        coordinator.register_particle(&a).unwrap();

        let mut out = Vec::new();
        coordinator.collect_group_renderers(GroupId(3), 0, &mut out);
        assert_eq!(out, vec!["a/0", "a/0"]);
    }

    #[test]
    fn queries_skip_dropped_members() {
        let coordinator = Coordinator::new();
        let a = Member::new("a", sharing(1).primary(true));
        let b = Member::new("b", sharing(1));
        coordinator.register_particle(&a).unwrap();
        coordinator.register_particle(&b).unwrap();
        drop(a);

        assert_eq!(coordinator.find_primary(GroupId(1)).unwrap().name, "b");

        let mut out = Vec::new();
        coordinator.collect_group_renderers(GroupId(1), 0, &mut out);
        assert_eq!(out, vec!["b/0"]);
    }
}
