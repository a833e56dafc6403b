//! Constrained sequence generation and mutation
//!
//! Every sequence produced here satisfies the hard constraints of its
//! `DesignTarget`: the length lies within the target's range and every fixed
//! (catalytic or key) position carries an accepted residue. Fixed positions are
//! never touched by `mutate` or `crossover`.

use log::trace;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::residue::AminoAcid;
use crate::sequence::Sequence;
use crate::target::DesignTarget;

/// Probability of an insertion/deletion per mutation event
pub const DEFAULT_INDEL_PROBABILITY: f64 = 0.05;

/// How residues are drawn for free positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResidueDistribution {
    /// Each of the 20 amino acids is equally likely
    #[default]
    Uniform,

    /// Weighted by natural background frequency
    Background,
}

/// Produces random and mutated sequences for a design target
#[derive(Debug, Clone)]
pub struct SequenceGenerator {
    pub distribution: ResidueDistribution,

    /// Probability that a mutation event also inserts or deletes a residue
    pub indel_probability: f64,
}

impl Default for SequenceGenerator {
    fn default() -> Self {
        Self {
            distribution: ResidueDistribution::Uniform,
            indel_probability: DEFAULT_INDEL_PROBABILITY,
        }
    }
}

impl SequenceGenerator {
    /// Create a generator with uniform residue choice
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a generator with a custom residue distribution
    pub fn with_distribution(distribution: ResidueDistribution) -> Self {
        Self {
            distribution,
            ..Self::default()
        }
    }

    /// Override the indel probability
    pub fn with_indel_probability(mut self, probability: f64) -> Self {
        self.indel_probability = probability;
        self
    }

    /// Draw one residue from the configured distribution
    fn random_residue<R: Rng + ?Sized>(&self, rng: &mut R) -> AminoAcid {
        match self.distribution {
            ResidueDistribution::Uniform => AminoAcid::ALL[rng.gen_range(0..AminoAcid::ALL.len())],
            ResidueDistribution::Background => AminoAcid::ALL
                .choose_weighted(rng, |aa| aa.background_frequency())
                .copied()
                .unwrap_or(AminoAcid::Ala),
        }
    }

    /// Draw a residue different from `current`
    fn different_residue<R: Rng + ?Sized>(&self, current: AminoAcid, rng: &mut R) -> AminoAcid {
        let others: Vec<AminoAcid> = AminoAcid::ALL
            .iter()
            .copied()
            .filter(|&aa| aa != current)
            .collect();

        let choice = match self.distribution {
            ResidueDistribution::Uniform => others.choose(rng),
            ResidueDistribution::Background => others
                .choose_weighted(rng, |aa| aa.background_frequency())
                .ok(),
        };

        // `others` always holds 19 residues
        choice.copied().unwrap_or(current)
    }

    /// Generate a random sequence satisfying the target's hard constraints
    ///
    /// The length is uniform over `min_feasible_length..=max_len`, so every
    /// fixed position exists. Inconsistent targets are rejected when the
    /// `DesignTarget` is built, so this cannot fail.
    pub fn generate_random<R: Rng + ?Sized>(&self, target: &DesignTarget, rng: &mut R) -> Sequence {
        let (_, max_len) = target.length_range();
        let length = rng.gen_range(target.min_feasible_length()..=max_len);

        let residues = (1..=length)
            .map(|position| match target.allowed_at(position) {
                Some(allowed) => allowed
                    .choose(rng)
                    .copied()
                    .unwrap_or_else(|| self.random_residue(rng)),
                None => self.random_residue(rng),
            })
            .collect::<Vec<_>>();

        Sequence::new(residues)
    }

    /// Point-mutate free positions, each with probability `mutation_rate`
    ///
    /// With probability `indel_probability` an insertion or deletion is also
    /// attempted in the free tail after the last fixed position, so fixed
    /// positions never shift. An indel that would leave the length range is
    /// skipped.
    pub fn mutate<R: Rng + ?Sized>(
        &self,
        sequence: &Sequence,
        target: &DesignTarget,
        mutation_rate: f64,
        rng: &mut R,
    ) -> Sequence {
        let mut residues = sequence.residues().to_vec();

        for (idx, residue) in residues.iter_mut().enumerate() {
            if target.is_fixed(idx + 1) {
                continue;
            }
            if rng.gen::<f64>() < mutation_rate {
                *residue = self.different_residue(*residue, rng);
            }
        }

        if rng.gen::<f64>() < self.indel_probability {
            self.apply_indel(&mut residues, target, rng);
        }

        let mutant = Sequence::new(residues);
        assert_fixed_positions_preserved(target, &mutant, |_| sequence);
        mutant
    }

    /// Insert or delete a residue in the free C-terminal tail
    fn apply_indel<R: Rng + ?Sized>(
        &self,
        residues: &mut Vec<AminoAcid>,
        target: &DesignTarget,
        rng: &mut R,
    ) {
        let (_, max_len) = target.length_range();
        let tail_start = target.last_fixed_position();
        let len = residues.len();

        if rng.gen_bool(0.5) {
            if len + 1 > max_len || tail_start > len {
                trace!("Skipping insertion at length {}", len);
                return;
            }
            let idx = rng.gen_range(tail_start..=len);
            let residue = self.random_residue(rng);
            residues.insert(idx, residue);
        } else {
            if len <= target.min_feasible_length() || tail_start >= len {
                trace!("Skipping deletion at length {}", len);
                return;
            }
            let idx = rng.gen_range(tail_start..len);
            residues.remove(idx);
        }
    }

    /// Single-point crossover: `first[..cut]` followed by `second[cut..]`
    ///
    /// Each position keeps the residue of the parent that contributes it, so
    /// fixed positions carried by both parents survive. The child has the
    /// length of `second`.
    pub fn crossover<R: Rng + ?Sized>(
        &self,
        first: &Sequence,
        second: &Sequence,
        target: &DesignTarget,
        rng: &mut R,
    ) -> Sequence {
        let shorter = first.len().min(second.len());
        if shorter < 2 {
            return second.clone();
        }

        let cut = rng.gen_range(1..shorter);
        let residues = first.residues()[..cut]
            .iter()
            .chain(&second.residues()[cut..])
            .copied()
            .collect::<Vec<_>>();

        let child = Sequence::new(residues);
        assert_fixed_positions_preserved(target, &child, |position| {
            if position <= cut {
                first
            } else {
                second
            }
        });
        child
    }
}

/// Panic if a fixed position differs from the parent that contributed it
///
/// A violation means the generator contract is broken, not that the input
/// was bad.
fn assert_fixed_positions_preserved<'a, F>(target: &DesignTarget, child: &Sequence, parent_of: F)
where
    F: Fn(usize) -> &'a Sequence,
{
    for position in (1..=child.len()).filter(|&p| target.is_fixed(p)) {
        assert_eq!(
            child.residue_at(position),
            parent_of(position).residue_at(position),
            "fixed residue at position {} was altered",
            position
        );
    }
}
