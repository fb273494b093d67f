//! Dense bot storage addressed by generational handles.

use slotmap::SlotMap;
use std::collections::HashSet;

use crate::{Bot, BotId};

/// Dense bot storage with generational handles; iteration order is insertion order.
#[derive(Debug, Clone)]
pub struct BotArena {
    slots: SlotMap<BotId, usize>,
    handles: Vec<BotId>,
    bots: Vec<Bot>,
}

impl Default for BotArena {
    fn default() -> Self {
        Self::new()
    }
}

impl BotArena {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: SlotMap::with_key(),
            handles: Vec::new(),
            bots: Vec::new(),
        }
    }

    /// Create an arena with reserved capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: SlotMap::with_capacity_and_key(capacity),
            handles: Vec::with_capacity(capacity),
            bots: Vec::with_capacity(capacity),
        }
    }

    /// Reserve room for `additional` more bots.
    pub fn reserve(&mut self, additional: usize) {
        self.slots.reserve(additional);
        self.handles.reserve(additional);
        self.bots.reserve(additional);
    }

    /// Number of stored bots, tombstoned ones included until reaped.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bots.is_empty()
    }

    /// Iterate over handles in dense (creation) order.
    pub fn iter_handles(&self) -> impl Iterator<Item = BotId> + '_ {
        self.handles.iter().copied()
    }

    /// Iterate over `(handle, bot)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (BotId, &Bot)> + '_ {
        self.handles.iter().copied().zip(self.bots.iter())
    }

    /// Borrow all bots in dense order.
    #[must_use]
    pub fn bots(&self) -> &[Bot] {
        &self.bots
    }

    /// Returns the dense index for `id`, if present.
    #[must_use]
    pub fn index_of(&self, id: BotId) -> Option<usize> {
        self.slots.get(id).copied()
    }

    #[must_use]
    pub fn contains(&self, id: BotId) -> bool {
        self.slots.contains_key(id)
    }

    #[must_use]
    pub fn get(&self, id: BotId) -> Option<&Bot> {
        self.index_of(id).map(|idx| &self.bots[idx])
    }

    pub fn get_mut(&mut self, id: BotId) -> Option<&mut Bot> {
        let idx = self.index_of(id)?;
        Some(&mut self.bots[idx])
    }

    /// Insert a bot at the end of the iteration order and return its handle.
    pub fn insert(&mut self, bot: Bot) -> BotId {
        let index = self.bots.len();
        self.bots.push(bot);
        let id = self.slots.insert(index);
        self.handles.push(id);
        id
    }

    /// Remove all bots whose ids are contained in `dead`, preserving iteration order.
    pub fn remove_many(&mut self, dead: &HashSet<BotId>) -> usize {
        if dead.is_empty() {
            return 0;
        }
        let mut write = 0;
        for read in 0..self.handles.len() {
            let id = self.handles[read];
            if dead.contains(&id) {
                self.slots.remove(id);
                continue;
            }
            if write != read {
                self.handles[write] = id;
                self.bots.swap(read, write);
            }
            if let Some(slot) = self.slots.get_mut(id) {
                *slot = write;
            }
            write += 1;
        }
        let removed = self.handles.len().saturating_sub(write);
        self.handles.truncate(write);
        self.bots.truncate(write);
        removed
    }

    /// Clear all stored bots.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.handles.clear();
        self.bots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Genome;
    use genebots_index::GridPos;

    fn sample_bot(seed: i32) -> Bot {
        Bot::new(
            GridPos::new(seed, seed + 1),
            Genome::new(vec![seed as u32; 4]).expect("genome"),
            10 + seed,
        )
    }

    #[test]
    fn insert_allocates_unique_handles() {
        let mut arena = BotArena::new();
        let a = arena.insert(sample_bot(0));
        let b = arena.insert(sample_bot(1));
        assert_ne!(a, b);
        assert_eq!(arena.len(), 2);
        assert!(arena.contains(a));
        assert_eq!(arena.get(b).map(Bot::energy), Some(11));
    }

    #[test]
    fn remove_many_compacts_in_order() {
        let mut arena = BotArena::with_capacity(4);
        let ids: Vec<_> = (0..5).map(|seed| arena.insert(sample_bot(seed))).collect();
        let dead: HashSet<_> = [ids[1], ids[3]].into_iter().collect();

        assert_eq!(arena.remove_many(&dead), 2);
        let survivors: Vec<_> = arena.iter_handles().collect();
        assert_eq!(survivors, vec![ids[0], ids[2], ids[4]]);
        assert!(!arena.contains(ids[1]));
        assert_eq!(arena.index_of(ids[4]), Some(2));
        assert_eq!(
            arena.get(ids[4]).map(Bot::position),
            Some(GridPos::new(4, 5))
        );

        let fresh = arena.insert(sample_bot(9));
        assert_ne!(fresh, ids[1], "generational handles are not reused immediately");
    }

    #[test]
    fn clear_drops_everything() {
        let mut arena = BotArena::new();
        let id = arena.insert(sample_bot(2));
        arena.clear();
        assert!(arena.is_empty());
        assert!(arena.get(id).is_none());
    }
}
