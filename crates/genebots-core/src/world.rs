//! Spatial world: bot ownership, the occupancy mirror, and the tick scheduler.

use genebots_index::{GridPos, OccupancyGrid};
use rand::{Rng, rngs::SmallRng};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{GeneBotsConfig, seeded_rng};
use crate::{Bot, BotArena, BotId, BotRecord, GenomeError, Tick};

/// Errors that can occur when building or mutating world state outside the tick loop.
#[derive(Debug, Error, PartialEq)]
pub enum WorldStateError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// Bulk spawning ran out of attempts before every bot found an empty cell.
    #[error("could not find an empty cell: placed {placed} of {requested} bots")]
    SpawnCapacity { requested: usize, placed: usize },
    #[error("position ({}, {}) lies outside the world", .0.x, .0.y)]
    OutOfBounds(GridPos),
    #[error("cell ({}, {}) is already occupied", .0.x, .0.y)]
    CellOccupied(GridPos),
    #[error(transparent)]
    Genome(#[from] GenomeError),
}

/// Per-tick bookkeeping summarised once the tick completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct TickCounters {
    pub births: usize,
    pub starvations: usize,
    pub old_age_deaths: usize,
    pub kills: usize,
    pub consumed: usize,
}

/// Summary recorded after each processed tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickSummary {
    pub tick: Tick,
    pub population: usize,
    pub organic: usize,
    pub births: usize,
    pub starvations: usize,
    pub old_age_deaths: usize,
    pub kills: usize,
    pub consumed: usize,
    pub reaped: usize,
}

/// Persistable view of a world between ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub seed: u32,
    pub step_count: i64,
    pub bots: Vec<BotRecord>,
}

/// Aggregate world state driven one tick at a time by `process`.
pub struct WorldState {
    pub(crate) config: GeneBotsConfig,
    pub(crate) seed: u32,
    pub(crate) rng: SmallRng,
    pub(crate) tick: Tick,
    pub(crate) bots: BotArena,
    pub(crate) grid: OccupancyGrid<BotId>,
    pub(crate) pending_removals: Vec<BotId>,
    pub(crate) counters: TickCounters,
    history: VecDeque<TickSummary>,
}

impl fmt::Debug for WorldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorldState")
            .field("config", &self.config)
            .field("seed", &self.seed)
            .field("tick", &self.tick)
            .field("bot_count", &self.bots.len())
            .finish()
    }
}

impl WorldState {
    /// Instantiate an empty world using the supplied configuration.
    pub fn new(config: GeneBotsConfig) -> Result<Self, WorldStateError> {
        config.validate()?;
        let grid = OccupancyGrid::new(config.world_width, config.world_height)
            .map_err(|_| WorldStateError::InvalidConfig("world dimensions are unusable"))?;
        let seed = config.resolve_seed();
        let history_capacity = config.history_capacity;
        Ok(Self {
            rng: seeded_rng(seed),
            seed,
            config,
            tick: Tick::zero(),
            bots: BotArena::new(),
            grid,
            pending_removals: Vec::new(),
            counters: TickCounters::default(),
            history: VecDeque::with_capacity(history_capacity),
        })
    }

    /// Clear the world, reseed the generator and populate it with random bots.
    pub fn new_world(&mut self, seed: u32, initial_bot_count: usize) -> Result<(), WorldStateError> {
        self.clear();
        self.seed = seed;
        self.rng = seeded_rng(seed);
        info!(seed, initial_bot_count, "Seeding new world");
        self.spawn_initial_bots(initial_bot_count)
    }

    /// Place `count` random bots on random empty cells.
    ///
    /// Each bot gets at most `width * height` placement attempts; running out aborts the
    /// request with [`WorldStateError::SpawnCapacity`] (bots already placed stay).
    pub fn spawn_initial_bots(&mut self, count: usize) -> Result<(), WorldStateError> {
        let width = self.config.world_width as i32;
        let height = self.config.world_height as i32;
        let max_attempts = (self.config.world_width as usize) * (self.config.world_height as usize);
        self.bots.reserve(count);
        for placed in 0..count {
            let mut attempts = 0usize;
            let position = loop {
                let candidate = GridPos::new(
                    self.rng.random_range(0..width),
                    self.rng.random_range(0..height),
                );
                if self.grid.is_vacant(candidate) {
                    break candidate;
                }
                attempts += 1;
                if attempts > max_attempts {
                    warn!(requested = count, placed, "Spawn aborted: world is full");
                    return Err(WorldStateError::SpawnCapacity {
                        requested: count,
                        placed,
                    });
                }
            };
            let bot = Bot::random(&mut self.rng, position, self.config.initial_energy);
            self.add_bot(bot);
        }
        Ok(())
    }

    /// Drop every bot and reset the step counter. The seed is kept.
    pub fn clear(&mut self) {
        self.bots.clear();
        self.grid.clear();
        self.pending_removals.clear();
        self.counters = TickCounters::default();
        self.history.clear();
        self.tick = Tick::zero();
    }

    /// Insert `bot` into the collection and the grid at its current position.
    ///
    /// The caller guarantees the cell is empty; use [`WorldState::place_bot`] for a checked
    /// insertion.
    pub fn add_bot(&mut self, bot: Bot) -> BotId {
        let position = bot.position();
        let dead = bot.is_dead();
        let id = self.bots.insert(bot);
        if dead {
            self.pending_removals.push(id);
        } else {
            let previous = self.grid.insert(position, id);
            debug_assert!(previous.is_none(), "add_bot onto an occupied cell");
        }
        id
    }

    /// Checked variant of [`WorldState::add_bot`].
    pub fn place_bot(&mut self, bot: Bot) -> Result<BotId, WorldStateError> {
        let position = bot.position();
        if !self.grid.contains(position) {
            return Err(WorldStateError::OutOfBounds(position));
        }
        if !self.grid.is_vacant(position) {
            return Err(WorldStateError::CellOccupied(position));
        }
        Ok(self.add_bot(bot))
    }

    /// Tombstone `id` and clear its cell immediately; storage is freed at the end of the tick.
    pub fn remove_bot(&mut self, id: BotId) -> bool {
        let Some(bot) = self.bots.get_mut(id) else {
            return false;
        };
        if bot.is_dead {
            return false;
        }
        bot.is_dead = true;
        let position = bot.position;
        self.grid.remove_if(position, id);
        self.pending_removals.push(id);
        true
    }

    /// Resynchronise the grid after `id` moved away from `old_position`.
    pub fn update_bot_position(&mut self, id: BotId, old_position: GridPos) {
        if let Some(bot) = self.bots.get(id) {
            let position = bot.position;
            self.grid.relocate(id, old_position, position);
        }
    }

    /// Move a bot to `target`, updating position and grid together.
    pub(crate) fn relocate_bot(&mut self, id: BotId, target: GridPos) {
        let Some(bot) = self.bots.get_mut(id) else {
            return;
        };
        let old_position = bot.position;
        bot.position = target;
        self.update_bot_position(id, old_position);
    }

    /// Flip a living bot into organic matter in place; energy is preserved.
    pub(crate) fn convert_to_organic(&mut self, id: BotId) {
        if let Some(bot) = self.bots.get_mut(id) {
            bot.is_organic = true;
        }
    }

    /// Handle of the bot occupying `position`, if any. Out-of-world positions are empty.
    #[must_use]
    pub fn bot_at(&self, position: GridPos) -> Option<BotId> {
        self.grid.get(position)
    }

    /// Bot occupying `position`, if any.
    #[must_use]
    pub fn bot_ref_at(&self, position: GridPos) -> Option<&Bot> {
        self.bot_at(position).and_then(|id| self.bots.get(id))
    }

    #[must_use]
    pub fn bot(&self, id: BotId) -> Option<&Bot> {
        self.bots.get(id)
    }

    /// Mutable access for external tooling. Position is not writable through `Bot`, so the
    /// grid cannot be desynchronised from here.
    pub fn bot_mut(&mut self, id: BotId) -> Option<&mut Bot> {
        self.bots.get_mut(id)
    }

    /// Iterate over non-tombstoned bots in processing order.
    pub fn bots(&self) -> impl Iterator<Item = (BotId, &Bot)> + '_ {
        self.bots.iter().filter(|(_, bot)| !bot.is_dead())
    }

    /// Read-only access to the bot arena.
    #[must_use]
    pub fn arena(&self) -> &BotArena {
        &self.bots
    }

    /// Read-only access to the occupancy grid.
    #[must_use]
    pub fn grid(&self) -> &OccupancyGrid<BotId> {
        &self.grid
    }

    /// Number of stored bots.
    #[must_use]
    pub fn bot_count(&self) -> usize {
        self.bots.len()
    }

    #[must_use]
    pub fn config(&self) -> &GeneBotsConfig {
        &self.config
    }

    #[must_use]
    pub const fn seed(&self) -> u32 {
        self.seed
    }

    /// Ticks processed since the world was created, reset or loaded.
    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.tick
    }

    /// Iterate over retained tick summaries.
    pub fn history(&self) -> impl Iterator<Item = &TickSummary> {
        self.history.iter()
    }

    /// Biome band (1 = left, 2 = middle, 3 = right) containing column `x`.
    #[must_use]
    pub fn biome_of(&self, x: i32) -> u32 {
        let width = self.config.world_width as f32;
        let x = x as f32;
        if x < width / 3.0 {
            1
        } else if x < 2.0 * width / 3.0 {
            2
        } else {
            3
        }
    }

    /// Run one tick: process a snapshot of the current bots, then reap tombstones.
    pub fn process(&mut self) -> TickSummary {
        self.tick = self.tick.next();
        self.counters = TickCounters::default();

        let snapshot: Vec<BotId> = self.bots.iter_handles().collect();
        for id in snapshot {
            self.process_bot(id);
        }

        let reaped = self.reap();
        let summary = self.summarise(reaped);
        debug!(
            tick = summary.tick.0,
            population = summary.population,
            births = summary.births,
            starvations = summary.starvations,
            kills = summary.kills,
            "Tick processed"
        );
        if self.history.len() >= self.config.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(summary.clone());
        summary
    }

    fn process_bot(&mut self, id: BotId) {
        let upkeep = self.config.metabolism_cost;
        let maximum_age = self.config.maximum_bot_age;
        let Some(bot) = self.bots.get_mut(id) else {
            return;
        };
        if bot.is_dead {
            return;
        }
        bot.age = bot.age.saturating_add(1);

        if bot.is_organic {
            self.fall(id);
            return;
        }

        if bot.energy - upkeep <= 0 {
            bot.energy = 0;
            self.counters.starvations += 1;
            self.remove_bot(id);
            return;
        }
        if bot.age > maximum_age {
            self.counters.old_age_deaths += 1;
            self.convert_to_organic(id);
            return;
        }
        bot.energy -= upkeep;

        self.execute_instruction(id);
    }

    /// Organic matter drifts one cell right when that cell is inside the world and free.
    fn fall(&mut self, id: BotId) {
        let Some(bot) = self.bots.get(id) else {
            return;
        };
        let target = bot.position.offset(1, 0);
        if self.grid.is_vacant(target) {
            self.relocate_bot(id, target);
        }
    }

    fn reap(&mut self) -> usize {
        if self.pending_removals.is_empty() {
            return 0;
        }
        let dead: HashSet<BotId> = self.pending_removals.drain(..).collect();
        self.bots.remove_many(&dead)
    }

    fn summarise(&self, reaped: usize) -> TickSummary {
        let organic = self.bots.bots().iter().filter(|bot| bot.is_organic).count();
        TickSummary {
            tick: self.tick,
            population: self.bots.len(),
            organic,
            births: self.counters.births,
            starvations: self.counters.starvations,
            old_age_deaths: self.counters.old_age_deaths,
            kills: self.counters.kills,
            consumed: self.counters.consumed,
            reaped,
        }
    }

    /// Capture persisted state. Operand stacks are not part of the snapshot.
    #[must_use]
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            seed: self.seed,
            step_count: i64::try_from(self.tick.0).unwrap_or(i64::MAX),
            bots: self.bots.bots().iter().map(Bot::to_record).collect(),
        }
    }

    /// Replace the whole world with `snapshot`.
    ///
    /// Every record is validated before anything is touched, so a rejected snapshot leaves
    /// the world exactly as it was.
    pub fn restore(&mut self, snapshot: WorldSnapshot) -> Result<(), WorldStateError> {
        let mut occupied = HashSet::with_capacity(snapshot.bots.len());
        let mut bots = Vec::with_capacity(snapshot.bots.len());
        for record in snapshot.bots {
            let mut bot = Bot::from_record(record)?;
            bot.clamp_diet(self.config.diet_limit);
            if !self.grid.contains(bot.position) {
                return Err(WorldStateError::OutOfBounds(bot.position));
            }
            if !bot.is_dead && !occupied.insert(bot.position) {
                return Err(WorldStateError::CellOccupied(bot.position));
            }
            bots.push(bot);
        }

        self.clear();
        self.seed = snapshot.seed;
        self.rng = seeded_rng(snapshot.seed);
        self.tick = Tick(u64::try_from(snapshot.step_count).unwrap_or(0));
        self.bots.reserve(bots.len());
        for bot in bots {
            self.add_bot(bot);
        }
        info!(
            seed = self.seed,
            tick = self.tick.0,
            bots = self.bots.len(),
            "Restored world snapshot"
        );
        Ok(())
    }

    /// Living bots whose genome distance to `id` is below the relative threshold.
    #[must_use]
    pub fn relatives_of(&self, id: BotId) -> Vec<BotId> {
        let Some(root) = self.bots.get(id) else {
            return Vec::new();
        };
        let threshold = self.config.relative_distance_threshold;
        self.bots()
            .filter(|(other_id, other)| {
                *other_id != id
                    && !other.is_organic
                    && root.genome.distance(&other.genome) < threshold
            })
            .map(|(other_id, _)| other_id)
            .collect()
    }
}
