//! Offline inspection helpers: genome control flow, diet census, and isolated sandboxes.

use smallvec::SmallVec;
use std::collections::VecDeque;

use crate::{Bot, BotId, Diet, GeneBotsConfig, Genome, GridPos, Opcode, WorldState, WorldStateError};

/// Side length of the default inspection sandbox.
pub const SANDBOX_SIZE: u32 = 11;

/// Program counters that may follow `pc`, in the order the interpreter would try them.
#[must_use]
pub fn successors(genome: &Genome, pc: usize) -> SmallVec<[usize; 3]> {
    let len = genome.len();
    let pc = pc % len;
    let mut next = SmallVec::new();
    match genome.opcode_at(pc) {
        Opcode::Look => next.extend([1, 2, 3].map(|step| (pc + step) % len)),
        op if op.is_conditional_jump() => {
            let distance = (genome.gene_wrapping(pc + 1) % 10) as usize;
            next.push((pc + 2) % len);
            let target = (pc + distance) % len;
            if !next.contains(&target) {
                next.push(target);
            }
        }
        Opcode::Jump => next.push((pc + 2) % len),
        _ => next.push((pc + 1) % len),
    }
    next
}

/// Genes reachable from the entry point, indexed by position.
#[must_use]
pub fn reachable(genome: &Genome) -> Vec<bool> {
    let mut seen = vec![false; genome.len()];
    let mut queue = VecDeque::from([0usize]);
    seen[0] = true;
    while let Some(pc) = queue.pop_front() {
        for next in successors(genome, pc) {
            if !seen[next] {
                seen[next] = true;
                queue.push_back(next);
            }
        }
    }
    seen
}

/// Disassembly with unreachable genes marked by a leading `*`.
#[must_use]
pub fn annotated_listing(genome: &Genome) -> Vec<String> {
    let live = reachable(genome);
    genome
        .disassemble()
        .into_iter()
        .zip(live)
        .map(|(line, live)| if live { format!("  {line}") } else { format!("* {line}") })
        .collect()
}

/// Living bot counts per diet class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DietCensus {
    pub herbivores: usize,
    pub scavengers: usize,
    pub predators: usize,
}

impl DietCensus {
    #[must_use]
    pub fn of(world: &WorldState) -> Self {
        world
            .bots()
            .filter(|(_, bot)| !bot.is_organic())
            .fold(Self::default(), |mut census, (_, bot)| {
                match bot.diet() {
                    Diet::Herbivore => census.herbivores += 1,
                    Diet::Scavenger => census.scavengers += 1,
                    Diet::Predator => census.predators += 1,
                }
                census
            })
    }
}

impl WorldState {
    /// Build a `size`×`size` world holding only a copy of `bot` at its centre.
    ///
    /// The copy keeps genome, counters and memory; the sandbox reuses this world's
    /// configuration and seed so stepping it is reproducible.
    pub fn sandbox(&self, bot: &Bot, size: u32) -> Result<(WorldState, BotId), WorldStateError> {
        let config = GeneBotsConfig {
            world_width: size,
            world_height: size,
            initial_bot_count: 0,
            rng_seed: Some(self.seed),
            ..self.config.clone()
        };
        let mut sandbox = WorldState::new(config)?;
        let centre = (size / 2) as i32;
        let mut copy = bot.clone();
        copy.position = GridPos::new(centre, centre);
        copy.is_dead = false;
        let id = sandbox.place_bot(copy)?;
        Ok((sandbox, id))
    }
}
