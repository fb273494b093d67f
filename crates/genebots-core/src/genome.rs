//! Genome storage and op-code decoding.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::{MAX_GENOME_SIZE, MAX_OPCODE_VALUE, MIN_GENOME_SIZE};

/// Errors raised when constructing genomes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenomeError {
    #[error("genome length {len} outside {min}..={max}")]
    InvalidLength { len: usize, min: usize, max: usize },
}

/// Decoded VM instruction. Values above [`Opcode::Jump`] decode to `Jump`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    Move = 0,
    Turn = 1,
    Look = 2,
    Attack = 3,
    Photosynthesize = 4,
    CheckRelative = 5,
    ShareEnergy = 6,
    ConsumeOrganic = 7,
    Reproduce = 8,
    CheckBiome = 9,
    CheckX = 10,
    CheckY = 11,
    CheckEnergy = 12,
    CheckAge = 13,
    JumpIfEqual = 14,
    JumpIfNotEqual = 15,
    JumpIfGreater = 16,
    Jump = 17,
}

impl Opcode {
    const TABLE: [Opcode; 18] = [
        Opcode::Move,
        Opcode::Turn,
        Opcode::Look,
        Opcode::Attack,
        Opcode::Photosynthesize,
        Opcode::CheckRelative,
        Opcode::ShareEnergy,
        Opcode::ConsumeOrganic,
        Opcode::Reproduce,
        Opcode::CheckBiome,
        Opcode::CheckX,
        Opcode::CheckY,
        Opcode::CheckEnergy,
        Opcode::CheckAge,
        Opcode::JumpIfEqual,
        Opcode::JumpIfNotEqual,
        Opcode::JumpIfGreater,
        Opcode::Jump,
    ];

    /// Decode a raw gene.
    #[must_use]
    pub fn decode(gene: u32) -> Self {
        Self::TABLE
            .get(gene as usize)
            .copied()
            .unwrap_or(Opcode::Jump)
    }

    /// Short assembler-style name.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Move => "MOVE",
            Opcode::Turn => "TURN",
            Opcode::Look => "LOOK",
            Opcode::Attack => "ATTACK",
            Opcode::Photosynthesize => "PHOTO",
            Opcode::CheckRelative => "CH_RELATIVE",
            Opcode::ShareEnergy => "SHARE",
            Opcode::ConsumeOrganic => "EAT_ORGANIC",
            Opcode::Reproduce => "REPRODUCE",
            Opcode::CheckBiome => "CH_BIOME",
            Opcode::CheckX => "CHECK_X",
            Opcode::CheckY => "CHECK_Y",
            Opcode::CheckEnergy => "CHECK_ENERGY",
            Opcode::CheckAge => "CHECK_AGE",
            Opcode::JumpIfEqual => "JMP_EQ",
            Opcode::JumpIfNotEqual => "JMP_NE",
            Opcode::JumpIfGreater => "JMP_GT",
            Opcode::Jump => "JMP",
        }
    }

    /// Whether the instruction reads the following cell as a jump distance.
    #[must_use]
    pub const fn is_conditional_jump(self) -> bool {
        matches!(
            self,
            Opcode::JumpIfEqual | Opcode::JumpIfNotEqual | Opcode::JumpIfGreater
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Ordered, length-bounded sequence of op-codes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct Genome(Vec<u32>);

impl Genome {
    /// Wrap `genes`, enforcing `MIN_GENOME_SIZE..=MAX_GENOME_SIZE`.
    pub fn new(genes: Vec<u32>) -> Result<Self, GenomeError> {
        let len = genes.len();
        if !(MIN_GENOME_SIZE..=MAX_GENOME_SIZE).contains(&len) {
            return Err(GenomeError::InvalidLength {
                len,
                min: MIN_GENOME_SIZE,
                max: MAX_GENOME_SIZE,
            });
        }
        Ok(Self(genes))
    }

    /// Random genome of `len` genes (clamped into the legal range).
    pub fn random<R: Rng + ?Sized>(rng: &mut R, len: usize) -> Self {
        let len = len.clamp(MIN_GENOME_SIZE, MAX_GENOME_SIZE);
        Self(
            (0..len)
                .map(|_| rng.random_range(0..=MAX_OPCODE_VALUE))
                .collect(),
        )
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with slices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn genes(&self) -> &[u32] {
        &self.0
    }

    /// Gene at `index` taken modulo the genome length.
    #[must_use]
    pub fn gene_wrapping(&self, index: usize) -> u32 {
        self.0[index % self.0.len()]
    }

    /// Decoded instruction at `index` taken modulo the genome length.
    #[must_use]
    pub fn opcode_at(&self, index: usize) -> Opcode {
        Opcode::decode(self.gene_wrapping(index))
    }

    /// Differing op-codes over the shared prefix plus the length difference.
    #[must_use]
    pub fn distance(&self, other: &Genome) -> usize {
        let differing = self
            .0
            .iter()
            .zip(&other.0)
            .filter(|(a, b)| a != b)
            .count();
        differing + self.0.len().abs_diff(other.0.len())
    }

    pub(crate) fn try_insert(&mut self, index: usize, gene: u32) -> bool {
        if self.0.len() >= MAX_GENOME_SIZE {
            return false;
        }
        self.0.insert(index.min(self.0.len()), gene);
        true
    }

    pub(crate) fn try_remove(&mut self, index: usize) -> bool {
        if self.0.len() <= MIN_GENOME_SIZE || index >= self.0.len() {
            return false;
        }
        self.0.remove(index);
        true
    }

    pub(crate) fn genes_mut(&mut self) -> &mut [u32] {
        &mut self.0
    }

    /// One line per gene: index, raw value, mnemonic.
    #[must_use]
    pub fn disassemble(&self) -> Vec<String> {
        self.0
            .iter()
            .enumerate()
            .map(|(idx, &gene)| format!("{idx:>4}: {gene:>3}  {}", Opcode::decode(gene)))
            .collect()
    }
}

impl TryFrom<Vec<u32>> for Genome {
    type Error = GenomeError;

    fn try_from(genes: Vec<u32>) -> Result<Self, Self::Error> {
        Self::new(genes)
    }
}

impl From<Genome> for Vec<u32> {
    fn from(genome: Genome) -> Self {
        genome.0
    }
}
