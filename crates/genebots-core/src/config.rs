//! Simulation constants and tunable configuration.

use rand::{SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};

use crate::WorldStateError;

/// Smallest genome a bot may carry.
pub const MIN_GENOME_SIZE: usize = 4;
/// Largest genome a bot may carry.
pub const MAX_GENOME_SIZE: usize = 2048;
/// Genome length of freshly seeded bots.
pub const INITIAL_GENOME_SIZE: usize = 64;
/// Capacity of the per-bot operand stack.
pub const MEMORY_SIZE: usize = 64;
/// Upper bound on bot energy.
pub const MAX_ENERGY: i32 = 300;
/// Largest op-code value produced by random genome generation and point mutation.
pub const MAX_OPCODE_VALUE: u32 = 127;

/// Static configuration for a GeneBots world.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneBotsConfig {
    /// Width of the world in cells.
    pub world_width: u32,
    /// Height of the world in cells.
    pub world_height: u32,
    /// Bots spawned by a fresh `new_world`.
    pub initial_bot_count: usize,
    /// Optional RNG seed; drawn from entropy when absent.
    pub rng_seed: Option<u32>,
    /// Energy assigned to seeded bots.
    pub initial_energy: i32,
    /// Energy required before reproduction is attempted.
    pub reproduction_energy_minimum: i32,
    /// Bots older than this become organic matter.
    pub maximum_bot_age: u32,
    /// Energy charged to every living bot each tick.
    pub metabolism_cost: i32,
    /// Energy charged for a successful move.
    pub move_cost: i32,
    /// Energy charged for every attack, hit or miss.
    pub attack_cost: i32,
    /// Photosynthesis yield in the left biome band.
    pub photosynthesis_high: i32,
    /// Photosynthesis yield in the middle biome band.
    pub photosynthesis_base: i32,
    /// Photosynthesis yield in the right biome band.
    pub photosynthesis_low: i32,
    /// Percentage of own energy given away by share-energy (truncated).
    pub share_energy_percent: i32,
    /// Genome distance strictly below which two bots count as relatives.
    pub relative_distance_threshold: usize,
    /// Per-gene probability of a point mutation.
    pub point_mutation_rate: f32,
    /// Probability of inserting one gene per reproduction.
    pub insertion_rate: f32,
    /// Probability of deleting one gene per reproduction.
    pub deletion_rate: f32,
    /// Maximum per-channel colour drift applied on point mutation.
    pub color_mutation_amount: u8,
    /// Magnitude bound for both diet counters.
    pub diet_limit: i32,
    /// Maximum number of recent tick summaries retained in-memory.
    pub history_capacity: usize,
}

impl Default for GeneBotsConfig {
    fn default() -> Self {
        Self {
            world_width: 165,
            world_height: 100,
            initial_bot_count: 10_000,
            rng_seed: None,
            initial_energy: 150,
            reproduction_energy_minimum: 100,
            maximum_bot_age: 3_000,
            metabolism_cost: 1,
            move_cost: 1,
            attack_cost: 10,
            photosynthesis_high: 20,
            photosynthesis_base: 10,
            photosynthesis_low: 1,
            share_energy_percent: 10,
            relative_distance_threshold: 5,
            point_mutation_rate: 0.01,
            insertion_rate: 0.01,
            deletion_rate: 0.01,
            color_mutation_amount: 20,
            diet_limit: 20,
            history_capacity: 256,
        }
    }
}

impl GeneBotsConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), WorldStateError> {
        if self.world_width == 0 || self.world_height == 0 {
            return Err(WorldStateError::InvalidConfig(
                "world dimensions must be non-zero",
            ));
        }
        if self.world_width > i32::MAX as u32 || self.world_height > i32::MAX as u32 {
            return Err(WorldStateError::InvalidConfig(
                "world dimensions must fit in i32 coordinates",
            ));
        }
        if !(1..=MAX_ENERGY).contains(&self.initial_energy) {
            return Err(WorldStateError::InvalidConfig(
                "initial_energy must be within 1..=MAX_ENERGY",
            ));
        }
        if self.reproduction_energy_minimum < 0
            || self.metabolism_cost < 0
            || self.move_cost < 0
            || self.attack_cost < 0
            || self.photosynthesis_high < 0
            || self.photosynthesis_base < 0
            || self.photosynthesis_low < 0
            || self.diet_limit < 0
        {
            return Err(WorldStateError::InvalidConfig(
                "energy costs, yields, and diet limits must be non-negative",
            ));
        }
        if !(0..=100).contains(&self.share_energy_percent) {
            return Err(WorldStateError::InvalidConfig(
                "share_energy_percent must be within 0..=100",
            ));
        }
        let rates = [
            self.point_mutation_rate,
            self.insertion_rate,
            self.deletion_rate,
        ];
        if rates.iter().any(|rate| !(0.0..=1.0).contains(rate)) {
            return Err(WorldStateError::InvalidConfig(
                "mutation rates must be probabilities in [0, 1]",
            ));
        }
        if self.history_capacity == 0 {
            return Err(WorldStateError::InvalidConfig(
                "history_capacity must be non-zero",
            ));
        }
        Ok(())
    }

    /// Returns the configured seed, drawing one from entropy if absent.
    pub(crate) fn resolve_seed(&self) -> u32 {
        self.rng_seed.unwrap_or_else(rand::random)
    }
}

/// Build the deterministic generator for `seed`.
#[must_use]
pub fn seeded_rng(seed: u32) -> SmallRng {
    SmallRng::seed_from_u64(u64::from(seed))
}
