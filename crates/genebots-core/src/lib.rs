//! Core types shared across the GeneBots workspace.

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

pub mod analysis;
pub mod arena;
pub mod bot;
pub mod config;
pub mod genome;
pub mod mutation;
mod vm;
pub mod world;

pub use arena::BotArena;
pub use bot::{Bot, BotRecord, COMPASS, Color, Diet, OperandStack, absolute_direction};
pub use config::GeneBotsConfig;
pub use genebots_index::GridPos;
pub use genome::{Genome, GenomeError, Opcode};
pub use mutation::{MutationRates, MutationReport, mutate_offspring};
pub use world::{TickSummary, WorldSnapshot, WorldState, WorldStateError};

new_key_type! {
    /// Stable handle for bots backed by a generational slot map.
    pub struct BotId;
}

/// Discrete simulation tick counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tick(pub u64);

impl Tick {
    /// Returns the next sequential tick.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Resets the tick counter back to zero.
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }
}
