use crate::entity::Token;
use std::collections::HashSet;
use std::fmt;

/// Key correlating particle entities that cooperate on shared render state.
///
/// Entities that belong to no group report `None` instead of a reserved
/// value, so ungrouped entities never collide with each other.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub i32);

impl GroupId {
    pub fn raw(&self) -> i32 {
        self.0
    }
}

impl From<i32> for GroupId {
    fn from(id: i32) -> Self {
        GroupId(id)
    }
}

impl fmt::Debug for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupId({})", self.0)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deduplication key for one cycle.
///
/// An ungrouped entity is its own singleton group, keyed by its registration
/// token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Group(GroupId),
    Solo(Token),
}

impl GroupKey {
    pub fn new(group: Option<GroupId>, token: Token) -> Self {
        match group {
            Some(group) => GroupKey::Group(group),
            None => GroupKey::Solo(token),
        }
    }
}

/// Set of group keys whose shared work already ran this cycle
#[derive(Debug, Default)]
pub struct GroupTracker {
    claimed: HashSet<GroupKey>,
}

impl GroupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`. Returns true if no one had claimed it yet.
    pub fn claim(&mut self, key: GroupKey) -> bool {
        self.claimed.insert(key)
    }

    pub fn is_claimed(&self, key: &GroupKey) -> bool {
        self.claimed.contains(key)
    }

    pub fn clear(&mut self) {
        self.claimed.clear();
    }

    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}
