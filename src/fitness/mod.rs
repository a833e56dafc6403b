//! Multi-objective fitness evaluation
//!
//! A sequence and its predicted structure are scored against a design target
//! on three sub-objectives, each in [0, 1]:
//!
//! - **structure**: distance of (helix, sheet) from the target bounding box
//! - **function**: fraction of catalytic positions carrying an accepted residue
//! - **stability**: hydropathy and net charge against their bounds
//!
//! Outside a bound, scores fall off smoothly with distance. Length is a hard
//! gate: a sequence of the wrong length gets a total of 0.

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::predictor::StructureSummary;
use crate::sequence::{Sequence, SequenceError};
use crate::target::DesignTarget;

/// Errors that can occur during fitness evaluation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitnessError {
    #[error("Invalid sequence: {0}")]
    InvalidSequence(#[from] SequenceError),

    #[error("Invalid structure summary: helix {helix}, sheet {sheet}, coil {coil}")]
    InvalidStructure { helix: f64, sheet: f64, coil: f64 },
}

/// Relative weights of the three sub-objectives
///
/// Weights are expected to be non-negative and to sum to 1 so that the total
/// stays meaningful in [0, 1]. The evaluator warns about, but does not
/// correct, weights that do not.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitnessWeights {
    pub stability: f64,
    pub function: f64,
    pub structure: f64,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            stability: 0.3,
            function: 0.5,
            structure: 0.2,
        }
    }
}

impl FitnessWeights {
    pub fn new(stability: f64, function: f64, structure: f64) -> Self {
        Self {
            stability,
            function,
            structure,
        }
    }

    pub fn sum(&self) -> f64 {
        self.stability + self.function + self.structure
    }

    /// Non-negative and summing to 1
    pub fn is_normalized(&self) -> bool {
        self.stability >= 0.0
            && self.function >= 0.0
            && self.structure >= 0.0
            && (self.sum() - 1.0).abs() < 1e-6
    }
}

/// Shape of the score decay outside an acceptable range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Falloff {
    /// Score drops linearly to 0 at `width` from the bound
    Linear { width: f64 },

    /// Score is exp(-d^2 / (2 sigma^2))
    Gaussian { sigma: f64 },
}

impl Falloff {
    /// Score for a distance outside the acceptable range (0 means inside)
    pub fn score(&self, distance: f64) -> f64 {
        if distance <= 0.0 {
            return 1.0;
        }

        let score = match *self {
            Falloff::Linear { width } if width > 0.0 => 1.0 - distance / width,
            Falloff::Gaussian { sigma } if sigma > 0.0 => {
                (-0.5 * (distance / sigma).powi(2)).exp()
            }
            _ => 0.0,
        };

        if score.is_finite() {
            score.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Distance of `value` from the closed interval [min, max]
fn interval_distance(value: f64, min: f64, max: f64) -> f64 {
    if value < min {
        min - value
    } else if value > max {
        value - max
    } else {
        0.0
    }
}

/// Which hard constraints a sequence satisfies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConstraintReport {
    /// Length within the target range
    pub length_ok: bool,

    /// Catalytic positions carrying an accepted residue
    pub catalytic_matched: usize,

    /// Number of catalytic positions in the target
    pub catalytic_total: usize,

    /// Every key structural residue is in place
    pub key_residues_ok: bool,
}

impl ConstraintReport {
    /// All catalytic positions satisfied
    pub fn catalytic_ok(&self) -> bool {
        self.catalytic_matched == self.catalytic_total
    }

    /// Every hard constraint satisfied
    pub fn all_satisfied(&self) -> bool {
        self.length_ok && self.catalytic_ok() && self.key_residues_ok
    }
}

/// Score of one sequence, with the breakdown that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitnessResult {
    /// Weighted total in [0, 1]
    pub total: f64,

    pub stability: f64,
    pub function: f64,
    pub structure: f64,

    /// Mean hydropathy of the sequence
    pub hydropathy_index: f64,

    /// Net charge of the sequence
    pub net_charge: i32,

    pub constraints: ConstraintReport,
}

impl FitnessResult {
    /// Result for a sequence that could not be evaluated
    pub fn unevaluated(sequence: &Sequence, constraints: ConstraintReport) -> Self {
        Self {
            total: 0.0,
            stability: 0.0,
            function: 0.0,
            structure: 0.0,
            hydropathy_index: sequence.hydropathy_index(),
            net_charge: sequence.net_charge(),
            constraints,
        }
    }
}

/// Scores sequences against a fixed design target
#[derive(Debug, Clone)]
pub struct FitnessEvaluator {
    target: DesignTarget,
    weights: FitnessWeights,

    /// Decay of the structure score, in fraction units
    pub structure_falloff: Falloff,

    /// Decay of the hydropathy score, in Kyte-Doolittle units
    pub hydropathy_falloff: Falloff,

    /// Decay of the charge score, in elementary charges
    pub charge_falloff: Falloff,
}

impl FitnessEvaluator {
    /// Create an evaluator with Gaussian falloffs
    pub fn new(target: DesignTarget, weights: FitnessWeights) -> Self {
        if !weights.is_normalized() {
            warn!(
                "Fitness weights {:?} are not non-negative or do not sum to 1 (sum {:.3}); totals will be clamped",
                weights,
                weights.sum()
            );
        }

        Self {
            target,
            weights,
            structure_falloff: Falloff::Gaussian { sigma: 0.1 },
            hydropathy_falloff: Falloff::Gaussian { sigma: 0.5 },
            charge_falloff: Falloff::Gaussian { sigma: 3.0 },
        }
    }

    /// Switch every sub-score to linear falloff
    pub fn with_linear_falloff(mut self) -> Self {
        self.structure_falloff = Falloff::Linear { width: 0.3 };
        self.hydropathy_falloff = Falloff::Linear { width: 1.5 };
        self.charge_falloff = Falloff::Linear { width: 10.0 };
        self
    }

    pub fn target(&self) -> &DesignTarget {
        &self.target
    }

    pub fn weights(&self) -> &FitnessWeights {
        &self.weights
    }

    /// Check the hard constraints of the target
    pub fn check_constraints(&self, sequence: &Sequence) -> ConstraintReport {
        let catalytic = self.target.catalytic_residues();
        let catalytic_matched = catalytic
            .iter()
            .filter(|&(&position, accepted)| {
                sequence
                    .residue_at(position)
                    .map_or(false, |aa| accepted.contains(&aa))
            })
            .count();

        let key_residues_ok = self
            .target
            .key_residues()
            .iter()
            .all(|(&position, &residue)| sequence.residue_at(position) == Some(residue));

        ConstraintReport {
            length_ok: self.target.contains_length(sequence.len()),
            catalytic_matched,
            catalytic_total: catalytic.len(),
            key_residues_ok,
        }
    }

    /// Structure sub-score: 1 inside the target box, decaying with distance
    pub fn structure_score(&self, structure: &StructureSummary) -> f64 {
        let ss = self.target.secondary_structure();
        let dh = interval_distance(structure.helix, ss.min_helix, ss.max_helix);
        let ds = interval_distance(structure.sheet, ss.min_sheet, ss.max_sheet);
        self.structure_falloff.score(dh.hypot(ds))
    }

    /// Function sub-score: fraction of satisfied catalytic positions
    pub fn function_score(&self, constraints: &ConstraintReport) -> f64 {
        if constraints.catalytic_total == 0 {
            return 1.0;
        }
        constraints.catalytic_matched as f64 / constraints.catalytic_total as f64
    }

    /// Stability sub-score: mean of the hydropathy and charge scores
    pub fn stability_score(&self, sequence: &Sequence) -> f64 {
        let props = self.target.properties();

        let hydropathy = self.hydropathy_falloff.score(interval_distance(
            sequence.hydropathy_index(),
            props.min_hydropathy,
            props.max_hydropathy,
        ));
        let charge = self.charge_falloff.score(interval_distance(
            sequence.net_charge() as f64,
            props.min_charge as f64,
            props.max_charge as f64,
        ));

        (hydropathy + charge) / 2.0
    }

    /// Score a sequence with its predicted structure
    ///
    /// Pure: identical inputs always give identical results.
    pub fn evaluate(
        &self,
        sequence: &Sequence,
        structure: &StructureSummary,
    ) -> Result<FitnessResult, FitnessError> {
        if !structure.has_valid_fractions() {
            return Err(FitnessError::InvalidStructure {
                helix: structure.helix,
                sheet: structure.sheet,
                coil: structure.coil,
            });
        }

        let constraints = self.check_constraints(sequence);
        let structure_score = self.structure_score(structure);
        let function_score = self.function_score(&constraints);
        let stability_score = self.stability_score(sequence);

        let weighted = self.weights.stability * stability_score
            + self.weights.function * function_score
            + self.weights.structure * structure_score;

        let total = if !constraints.length_ok || weighted.is_nan() {
            0.0
        } else {
            weighted.clamp(0.0, 1.0)
        };

        Ok(FitnessResult {
            total,
            stability: stability_score,
            function: function_score,
            structure: structure_score,
            hydropathy_index: sequence.hydropathy_index(),
            net_charge: sequence.net_charge(),
            constraints,
        })
    }

    /// Parse a one-letter string and score it
    pub fn evaluate_str(
        &self,
        sequence: &str,
        structure: &StructureSummary,
    ) -> Result<FitnessResult, FitnessError> {
        let sequence: Sequence = sequence.parse()?;
        self.evaluate(&sequence, structure)
    }
}
