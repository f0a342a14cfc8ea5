use std::collections::VecDeque;
use std::fmt;

/// Generational handle naming one registration slot.
///
/// A token stays valid until the registration it names is removed. Slot
/// indices are recycled, but every removal bumps the slot's generation, so an
/// old token never aliases a newer registration.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token {
    index: u32,
    generation: u32,
}

impl Token {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Token { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({}v{})", self.index, self.generation)
    }
}

/// Hands out tokens, recycling slot indices of released ones.
#[derive(Debug, Default)]
pub struct SlotAllocator {
    generations: Vec<u32>,       // Current generation for each slot index
    recycled: VecDeque<u32>,     // Released slot indices awaiting reuse
}

impl SlotAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a token, reusing a released slot when one is available
    pub fn allocate(&mut self) -> Token {
        if let Some(index) = self.recycled.pop_front() {
            Token::new(index, self.generations[index as usize])
        } else {
            let index = self.generations.len() as u32;
            self.generations.push(0);
            Token::new(index, 0)
        }
    }

    /// Release a token. Returns false if it was already stale.
    pub fn release(&mut self, token: Token) -> bool {
        if !self.is_live(token) {
            return false;
        }

        // Bump the generation so every copy of `token` goes stale
        let slot = &mut self.generations[token.index as usize];
        *slot = slot.wrapping_add(1);
        self.recycled.push_back(token.index);
        true
    }

    /// Check whether a token names a slot that has not been released
    pub fn is_live(&self, token: Token) -> bool {
        self.generations
            .get(token.index as usize)
            .map_or(false, |generation| *generation == token.generation)
    }

    /// Total number of slots ever allocated
    pub fn capacity(&self) -> usize {
        self.generations.len()
    }

    /// Number of tokens currently live
    pub fn live_count(&self) -> usize {
        self.generations.len() - self.recycled.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_sequential_slots() {
        let mut slots = SlotAllocator::new();
        let a = slots.allocate();
        let b = slots.allocate();

        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(slots.live_count(), 2);
    }

    #[test]
    fn released_slot_is_recycled_with_new_generation() {
        let mut slots = SlotAllocator::new();
        let a = slots.allocate();
        assert!(slots.release(a));

        let b = slots.allocate();
        assert_eq!(b.index(), a.index());
        assert_ne!(b.generation(), a.generation());
        assert!(!slots.is_live(a));
        assert!(slots.is_live(b));
    }

    #[test]
    fn double_release_is_rejected() {
        let mut slots = SlotAllocator::new();
        let a = slots.allocate();
        assert!(slots.release(a));
        assert!(!slots.release(a));
        assert_eq!(slots.live_count(), 0);
        assert_eq!(slots.capacity(), 1);
    }

    #[test]
    fn unknown_token_is_not_live() {
        let slots = SlotAllocator::new();
        assert!(!slots.is_live(Token::new(7, 0)));
    }
}
