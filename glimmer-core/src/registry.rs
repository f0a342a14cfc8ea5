use crate::entity::{SlotAllocator, Token};
use std::rc::{Rc, Weak};

/// Ordered set of non-owning entity references.
///
/// Entries are addressed two ways: by [`Token`] for removal, and by position
/// in registration order for iteration. Removal leaves a tombstone behind so
/// positions stay stable while a cycle is walking the list; tombstones are
/// dropped by [`Registry::compact`].
pub struct Registry<T: ?Sized> {
    slots: SlotAllocator,
    // Indexed by token index
    entries: Vec<Option<Weak<T>>>,
    // Registration order; may contain stale tokens until compaction
    order: Vec<Token>,
    stale: usize,
}

impl<T: ?Sized> Default for Registry<T> {
    fn default() -> Self {
        Self {
            slots: SlotAllocator::new(),
            entries: Vec::new(),
            order: Vec::new(),
            stale: 0,
        }
    }
}

impl<T: ?Sized> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entity to the end of the registration order
    pub fn insert(&mut self, entity: &Rc<T>) -> Token {
        let token = self.slots.allocate();
        let index = token.index() as usize;
        if index >= self.entries.len() {
            self.entries.resize_with(index + 1, || None);
        }
        self.entries[index] = Some(Rc::downgrade(entity));
        self.order.push(token);
        token
    }

    /// Remove the entry named by `token`. Stale or foreign tokens are ignored.
    pub fn remove(&mut self, token: Token) -> bool {
        if !self.slots.release(token) {
            return false;
        }
        self.entries[token.index() as usize] = None;
        self.stale += 1;
        true
    }

    pub fn contains(&self, token: Token) -> bool {
        self.slots.is_live(token)
    }

    pub fn get(&self, token: Token) -> Option<Weak<T>> {
        if !self.slots.is_live(token) {
            return None;
        }
        self.entries[token.index() as usize].clone()
    }

    /// Entry at `position` in registration order, or `None` for a tombstone
    /// or an out-of-range position.
    pub fn get_at(&self, position: usize) -> Option<(Token, Weak<T>)> {
        let token = *self.order.get(position)?;
        self.get(token).map(|entity| (token, entity))
    }

    /// Number of live registrations
    pub fn len(&self) -> usize {
        self.order.len() - self.stale
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length of the registration order including tombstones. Positions
    /// below this bound stay valid until the next compaction.
    pub fn span(&self) -> usize {
        self.order.len()
    }

    /// Live entries in registration order
    pub fn iter(&self) -> impl Iterator<Item = (Token, &Weak<T>)> + '_ {
        self.order.iter().filter_map(move |token| {
            if !self.slots.is_live(*token) {
                return None;
            }
            self.entries[token.index() as usize]
                .as_ref()
                .map(|entity| (*token, entity))
        })
    }

    /// True once tombstones make up at least half of the order list
    pub fn needs_compaction(&self) -> bool {
        self.stale > 0 && self.stale * 2 >= self.order.len()
    }

    /// Drop tombstones, preserving the order of live entries
    pub fn compact(&mut self) {
        if self.stale == 0 {
            return;
        }
        let slots = &self.slots;
        self.order.retain(|token| slots.is_live(*token));
        self.stale = 0;
    }
}
