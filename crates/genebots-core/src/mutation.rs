//! Offspring mutation applied at reproduction time.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{GeneBotsConfig, MAX_OPCODE_VALUE};
use crate::{Color, Genome};

/// Probabilities and bounds driving offspring mutation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MutationRates {
    pub point: f32,
    pub insertion: f32,
    pub deletion: f32,
    pub color_drift: u8,
}

impl MutationRates {
    #[must_use]
    pub fn from_config(config: &GeneBotsConfig) -> Self {
        Self {
            point: config.point_mutation_rate,
            insertion: config.insertion_rate,
            deletion: config.deletion_rate,
            color_drift: config.color_mutation_amount,
        }
    }
}

/// What a single mutation pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationReport {
    pub inserted: bool,
    pub deleted: bool,
    pub point_mutations: usize,
}

impl MutationReport {
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.inserted || self.deleted || self.point_mutations > 0
    }
}

/// Mutate a child's genome and colour in place.
pub fn mutate_offspring<R: Rng + ?Sized>(
    genome: &mut Genome,
    color: &mut Color,
    rates: &MutationRates,
    rng: &mut R,
) -> MutationReport {
    let mut report = MutationReport::default();

    if rng.random::<f32>() < rates.insertion {
        let index = rng.random_range(0..=genome.len());
        let gene = rng.random_range(0..=MAX_OPCODE_VALUE);
        report.inserted = genome.try_insert(index, gene);
    }

    if rng.random::<f32>() < rates.deletion {
        let index = rng.random_range(0..genome.len());
        report.deleted = genome.try_remove(index);
    }

    for gene in genome.genes_mut() {
        if rng.random::<f32>() < rates.point {
            *gene = rng.random_range(0..=MAX_OPCODE_VALUE);
            report.point_mutations += 1;
            drift_color(color, rates.color_drift, rng);
        }
    }

    report
}

fn drift_color<R: Rng + ?Sized>(color: &mut Color, amount: u8, rng: &mut R) {
    let amount = i16::from(amount);
    for channel in [&mut color.r, &mut color.g, &mut color.b] {
        let delta = rng.random_range(-amount..=amount);
        *channel = (i16::from(*channel) + delta).clamp(0, 255) as u8;
    }
}
