//! Genome interpreter: one instruction per living bot per tick.

use genebots_index::GridPos;
use rand::seq::SliceRandom;
use tracing::trace;

use crate::bot::{COMPASS, absolute_direction};
use crate::mutation::{MutationRates, mutate_offspring};
use crate::{Bot, BotId, Opcode, WorldState};

const PREDATION_NUTRITION: i32 = -10;
const PREDATION_SCAVENGE: i32 = -2;
const PHOTOSYNTHESIS_NUTRITION: i32 = 1;
const PHOTOSYNTHESIS_SCAVENGE: i32 = -1;
const SCAVENGE_GAIN: i32 = 10;

impl WorldState {
    /// Execute the instruction under `id`'s program counter and advance it.
    ///
    /// Returns the executed op-code, or `None` when `id` is missing, tombstoned or organic.
    /// Metabolism and ageing are not applied here; [`WorldState::process`] handles those.
    pub fn execute_instruction(&mut self, id: BotId) -> Option<Opcode> {
        let bot = self.bots.get_mut(id)?;
        if bot.is_dead || bot.is_organic {
            return None;
        }
        bot.pc %= bot.genome.len();
        let pc = bot.pc;
        let opcode = bot.genome.opcode_at(pc);
        trace!(?id, pc, %opcode, "Executing instruction");

        let advance = match opcode {
            Opcode::Move => {
                let relative = self.pop(id);
                self.op_move(id, relative);
                1
            }
            Opcode::Turn => {
                let relative = self.pop(id);
                if let Some(bot) = self.bots.get_mut(id) {
                    bot.direction = ((u32::from(bot.direction) + relative % 8) % 8) as u8;
                }
                1
            }
            Opcode::Look => {
                let relative = self.pop(id);
                match self.target_bot(id, relative).and_then(|t| self.bots.get(t)) {
                    None => 1,
                    Some(target) if target.is_organic => 3,
                    Some(_) => 2,
                }
            }
            Opcode::Attack => {
                let relative = self.pop(id);
                self.op_attack(id, relative);
                1
            }
            Opcode::Photosynthesize => {
                self.op_photosynthesize(id);
                1
            }
            Opcode::CheckRelative => {
                let relative = self.pop(id);
                let is_relative = self.op_check_relative(id, relative);
                self.push(id, u32::from(is_relative));
                1
            }
            Opcode::ShareEnergy => {
                let relative = self.pop(id);
                self.op_share(id, relative);
                1
            }
            Opcode::ConsumeOrganic => {
                let relative = self.pop(id);
                self.op_consume(id, relative);
                1
            }
            Opcode::Reproduce => {
                self.op_reproduce(id);
                1
            }
            Opcode::CheckBiome => {
                let x = self.bots.get(id).map_or(0, |bot| bot.position.x);
                let biome = self.biome_of(x);
                self.push(id, biome);
                1
            }
            Opcode::CheckX | Opcode::CheckY | Opcode::CheckEnergy | Opcode::CheckAge => {
                let value = self.bots.get(id).map_or(0, |bot| match opcode {
                    Opcode::CheckX => bot.position.x as u32,
                    Opcode::CheckY => bot.position.y as u32,
                    Opcode::CheckEnergy => bot.energy as u32,
                    _ => bot.age,
                });
                self.push(id, value);
                1
            }
            Opcode::JumpIfEqual | Opcode::JumpIfNotEqual | Opcode::JumpIfGreater => {
                let right = self.pop(id);
                let left = self.pop(id);
                let taken = match opcode {
                    Opcode::JumpIfEqual => left == right,
                    Opcode::JumpIfNotEqual => left != right,
                    _ => left > right,
                };
                if taken {
                    self.bots
                        .get(id)
                        .map_or(2, |bot| (bot.genome.gene_wrapping(pc + 1) % 10) as usize)
                } else {
                    2
                }
            }
            Opcode::Jump => 2,
        };

        if let Some(bot) = self.bots.get_mut(id) {
            bot.advance_pc(advance);
        }
        Some(opcode)
    }

    fn pop(&mut self, id: BotId) -> u32 {
        self.bots.get_mut(id).map_or(0, Bot::pop_memory)
    }

    fn push(&mut self, id: BotId, value: u32) {
        if let Some(bot) = self.bots.get_mut(id) {
            bot.push_memory(value);
        }
    }

    /// Cell addressed by `relative` from the bot's facing; `None` past the side walls.
    fn target_cell(&self, id: BotId, relative: u32) -> Option<GridPos> {
        let bot = self.bots.get(id)?;
        let (dx, dy) = COMPASS[absolute_direction(bot.direction, relative)];
        self.grid.neighbor(bot.position, dx, dy)
    }

    /// Occupant of the addressed cell other than the bot itself.
    fn target_bot(&self, id: BotId, relative: u32) -> Option<BotId> {
        let cell = self.target_cell(id, relative)?;
        self.grid.get(cell).filter(|&target| target != id)
    }

    fn op_move(&mut self, id: BotId, relative: u32) {
        let Some(cell) = self.target_cell(id, relative) else {
            return;
        };
        if !self.grid.is_vacant(cell) {
            return;
        }
        self.relocate_bot(id, cell);
        let cost = self.config.move_cost;
        if let Some(bot) = self.bots.get_mut(id) {
            bot.add_energy(-cost);
        }
    }

    fn op_attack(&mut self, id: BotId, relative: u32) {
        let cost = self.config.attack_cost;
        let limit = self.config.diet_limit;
        if let Some(bot) = self.bots.get_mut(id) {
            bot.add_energy(-cost);
        }
        let Some(target) = self.target_bot(id, relative) else {
            return;
        };
        if self.bots.get(target).is_none_or(|victim| victim.is_organic) {
            return;
        }
        self.convert_to_organic(target);
        self.counters.kills += 1;
        if let Some(bot) = self.bots.get_mut(id) {
            bot.shift_nutrition(PREDATION_NUTRITION, limit);
            bot.shift_scavenge(PREDATION_SCAVENGE, limit);
        }
    }

    fn op_photosynthesize(&mut self, id: BotId) {
        let limit = self.config.diet_limit;
        let Some(x) = self.bots.get(id).map(|bot| bot.position.x) else {
            return;
        };
        let gain = match self.biome_of(x) {
            1 => self.config.photosynthesis_high,
            2 => self.config.photosynthesis_base,
            _ => self.config.photosynthesis_low,
        };
        if let Some(bot) = self.bots.get_mut(id) {
            bot.add_energy(gain);
            bot.shift_nutrition(PHOTOSYNTHESIS_NUTRITION, limit);
            bot.shift_scavenge(PHOTOSYNTHESIS_SCAVENGE, limit);
        }
    }

    fn op_check_relative(&self, id: BotId, relative: u32) -> bool {
        let threshold = self.config.relative_distance_threshold;
        let Some(target) = self.target_bot(id, relative) else {
            return false;
        };
        match (self.bots.get(id), self.bots.get(target)) {
            (Some(bot), Some(other)) => bot.genome.distance(&other.genome) < threshold,
            _ => false,
        }
    }

    fn op_share(&mut self, id: BotId, relative: u32) {
        let percent = self.config.share_energy_percent;
        let Some(amount) = self.bots.get(id).map(|bot| bot.energy * percent / 100) else {
            return;
        };
        if amount <= 0 {
            return;
        }
        let Some(target) = self.target_bot(id, relative) else {
            return;
        };
        if let Some(bot) = self.bots.get_mut(id) {
            bot.add_energy(-amount);
        }
        if let Some(recipient) = self.bots.get_mut(target) {
            recipient.add_energy(amount);
        }
    }

    fn op_consume(&mut self, id: BotId, relative: u32) {
        let limit = self.config.diet_limit;
        let Some(target) = self.target_bot(id, relative) else {
            return;
        };
        let Some(gain) = self
            .bots
            .get(target)
            .filter(|food| food.is_organic)
            .map(|food| food.energy)
        else {
            return;
        };
        if let Some(bot) = self.bots.get_mut(id) {
            bot.add_energy(gain);
            bot.shift_scavenge(SCAVENGE_GAIN, limit);
        }
        self.remove_bot(target);
        self.counters.consumed += 1;
    }

    fn op_reproduce(&mut self, id: BotId) {
        let minimum = self.config.reproduction_energy_minimum;
        let Some(parent) = self.bots.get(id) else {
            return;
        };
        if parent.energy < minimum {
            return;
        }
        let origin = parent.position;

        let mut directions = COMPASS;
        directions.shuffle(&mut self.rng);
        let Some(cell) = directions
            .iter()
            .filter_map(|&(dx, dy)| self.grid.neighbor(origin, dx, dy))
            .find(|&cell| self.grid.is_vacant(cell))
        else {
            return;
        };

        let Some(parent) = self.bots.get_mut(id) else {
            return;
        };
        let total = parent.energy;
        parent.energy = total / 2;
        let mut child = Bot::new(cell, parent.genome.clone(), total - total / 2)
            .with_color(parent.color);

        let rates = MutationRates::from_config(&self.config);
        let report = mutate_offspring(&mut child.genome, &mut child.color, &rates, &mut self.rng);
        let child_id = self.add_bot(child);
        self.counters.births += 1;
        trace!(parent = ?id, child = ?child_id, mutated = report.changed(), "Bot reproduced");
    }
}
