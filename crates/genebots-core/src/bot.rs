//! Bot entity state.

use genebots_index::GridPos;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{INITIAL_GENOME_SIZE, MAX_ENERGY, MEMORY_SIZE};
use crate::genome::{Genome, GenomeError};

/// Compass unit vectors ordered clockwise starting at northwest.
pub const COMPASS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
];

/// Facing offsets selected by a relative index: forward, the right-hand side, back,
/// then the left-hand side.
pub const RELATIVE_OFFSETS: [i32; 8] = [0, 1, 2, 3, 4, -3, -2, -1];

/// Compass index reached by turning `relative` (taken mod 8) away from `facing`.
#[must_use]
pub fn absolute_direction(facing: u8, relative: u32) -> usize {
    let offset = RELATIVE_OFFSETS[(relative % 8) as usize];
    (i32::from(facing) + offset).rem_euclid(8) as usize
}

/// RGBA colour; alpha is carried for persistence only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Random mid-range colour used for seeded bots.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::rgb(
            rng.random_range(50..=200),
            rng.random_range(50..=200),
            rng.random_range(50..=200),
        )
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::rgb(0, 0, 255)
    }
}

/// Dietary classification derived from the nutrition counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Diet {
    Herbivore,
    Scavenger,
    Predator,
}

/// Bounded LIFO of unsigned operands. Overflowing pushes are dropped, empty pops read 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperandStack {
    values: Vec<u32>,
}

impl OperandStack {
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: Vec::with_capacity(MEMORY_SIZE),
        }
    }

    pub fn push(&mut self, value: u32) {
        if self.values.len() < MEMORY_SIZE {
            self.values.push(value);
        }
    }

    pub fn pop(&mut self) -> u32 {
        self.values.pop().unwrap_or(0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values from bottom to top.
    #[must_use]
    pub fn as_slice(&self) -> &[u32] {
        &self.values
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// Flat copy of every persisted bot field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotRecord {
    pub position: GridPos,
    pub energy: i32,
    pub age: u32,
    pub genome: Vec<u32>,
    pub program_counter: u32,
    pub color: Color,
    pub direction: u32,
    pub is_dead: bool,
    pub is_organic: bool,
    pub nutrition_balance: i32,
    pub scavenge_points: i32,
}

/// A single simulated organism (or, once organic, its remains).
#[derive(Debug, Clone, PartialEq)]
pub struct Bot {
    pub(crate) position: GridPos,
    pub(crate) energy: i32,
    pub(crate) age: u32,
    pub(crate) genome: Genome,
    pub(crate) memory: OperandStack,
    pub(crate) pc: usize,
    pub(crate) direction: u8,
    pub(crate) color: Color,
    pub(crate) nutrition_balance: i32,
    pub(crate) scavenge_points: i32,
    pub(crate) is_organic: bool,
    pub(crate) is_dead: bool,
}

impl Bot {
    /// Living bot at `position` running `genome`, facing north with the given energy.
    #[must_use]
    pub fn new(position: GridPos, genome: Genome, energy: i32) -> Self {
        Self {
            position,
            energy: energy.clamp(0, MAX_ENERGY),
            age: 0,
            genome,
            memory: OperandStack::new(),
            pc: 0,
            direction: 1,
            color: Color::default(),
            nutrition_balance: 0,
            scavenge_points: 0,
            is_organic: false,
            is_dead: false,
        }
    }

    /// Seeded bot with a random genome and colour.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, position: GridPos, energy: i32) -> Self {
        let color = Color::random(rng);
        let genome = Genome::random(rng, INITIAL_GENOME_SIZE);
        Self {
            color,
            ..Self::new(position, genome, energy)
        }
    }

    #[must_use]
    pub fn with_age(mut self, age: u32) -> Self {
        self.age = age;
        self
    }

    #[must_use]
    pub fn with_direction(mut self, direction: u8) -> Self {
        self.direction = direction % 8;
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    #[must_use]
    pub fn with_program_counter(mut self, pc: usize) -> Self {
        self.pc = pc % self.genome.len();
        self
    }

    #[must_use]
    pub fn into_organic(mut self) -> Self {
        self.is_organic = true;
        self
    }

    #[must_use]
    pub const fn position(&self) -> GridPos {
        self.position
    }

    #[must_use]
    pub const fn energy(&self) -> i32 {
        self.energy
    }

    #[must_use]
    pub const fn age(&self) -> u32 {
        self.age
    }

    #[must_use]
    pub const fn genome(&self) -> &Genome {
        &self.genome
    }

    #[must_use]
    pub const fn memory(&self) -> &OperandStack {
        &self.memory
    }

    #[must_use]
    pub const fn program_counter(&self) -> usize {
        self.pc
    }

    #[must_use]
    pub const fn direction(&self) -> u8 {
        self.direction
    }

    #[must_use]
    pub const fn color(&self) -> Color {
        self.color
    }

    #[must_use]
    pub const fn nutrition_balance(&self) -> i32 {
        self.nutrition_balance
    }

    #[must_use]
    pub const fn scavenge_points(&self) -> i32 {
        self.scavenge_points
    }

    #[must_use]
    pub const fn is_organic(&self) -> bool {
        self.is_organic
    }

    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.is_dead
    }

    /// Herbivore when the balance leans vegetarian, otherwise whichever of scavenging or
    /// predation dominates.
    #[must_use]
    pub fn diet(&self) -> Diet {
        if self.nutrition_balance > 0 {
            Diet::Herbivore
        } else if self.scavenge_points > self.nutrition_balance.saturating_neg() {
            Diet::Scavenger
        } else {
            Diet::Predator
        }
    }

    /// Overwrite energy, clamped into `0..=MAX_ENERGY`.
    pub fn set_energy(&mut self, energy: i32) {
        self.energy = energy.clamp(0, MAX_ENERGY);
    }

    /// Add (or with a negative amount, drain) energy, clamped into `0..=MAX_ENERGY`.
    pub fn add_energy(&mut self, amount: i32) {
        self.set_energy(self.energy.saturating_add(amount));
    }

    /// Push an operand, dropped when memory is full.
    pub fn push_memory(&mut self, value: u32) {
        self.memory.push(value);
    }

    pub(crate) fn pop_memory(&mut self) -> u32 {
        self.memory.pop()
    }

    pub(crate) fn advance_pc(&mut self, delta: usize) {
        self.pc = (self.pc + delta) % self.genome.len();
    }

    pub(crate) fn shift_nutrition(&mut self, delta: i32, limit: i32) {
        self.nutrition_balance = self
            .nutrition_balance
            .saturating_add(delta)
            .clamp(-limit, limit);
    }

    pub(crate) fn shift_scavenge(&mut self, delta: i32, limit: i32) {
        self.scavenge_points = self.scavenge_points.saturating_add(delta).clamp(0, limit);
    }

    /// Pull both diet counters back inside `-limit..=limit` and `0..=limit`.
    pub(crate) fn clamp_diet(&mut self, limit: i32) {
        self.shift_nutrition(0, limit);
        self.shift_scavenge(0, limit);
    }

    /// Copy every persisted field; memory is intentionally not part of the record.
    #[must_use]
    pub fn to_record(&self) -> BotRecord {
        BotRecord {
            position: self.position,
            energy: self.energy,
            age: self.age,
            genome: self.genome.genes().to_vec(),
            program_counter: self.pc as u32,
            color: self.color,
            direction: u32::from(self.direction),
            is_dead: self.is_dead,
            is_organic: self.is_organic,
            nutrition_balance: self.nutrition_balance,
            scavenge_points: self.scavenge_points,
        }
    }

    /// Rebuild a bot from a record with empty memory.
    pub fn from_record(record: BotRecord) -> Result<Self, GenomeError> {
        let genome = Genome::new(record.genome)?;
        let pc = record.program_counter as usize % genome.len();
        Ok(Self {
            position: record.position,
            energy: record.energy.clamp(0, MAX_ENERGY),
            age: record.age,
            genome,
            memory: OperandStack::new(),
            pc,
            direction: (record.direction % 8) as u8,
            color: record.color,
            nutrition_balance: record.nutrition_balance,
            scavenge_points: record.scavenge_points,
            is_organic: record.is_organic,
            is_dead: record.is_dead,
        })
    }
}
