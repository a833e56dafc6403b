//! Design target: what a successful sequence has to satisfy
//!
//! A `DesignTarget` is validated once, when it is built, and is immutable
//! afterwards. Every other component trusts it to be satisfiable.

use crate::residue::AminoAcid;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Errors raised when a design target cannot be satisfied
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstraintError {
    #[error("Invalid length range: ({min}, {max})")]
    InvalidLengthRange { min: usize, max: usize },

    #[error("{name} must be within [0, 1], got {value}")]
    FractionOutOfRange { name: &'static str, value: f64 },

    #[error("Inverted {name} bounds: min {min} > max {max}")]
    InvertedBounds {
        name: &'static str,
        min: f64,
        max: f64,
    },

    #[error("Minimum helix ({min_helix}) and sheet ({min_sheet}) fractions exceed 1")]
    UnsatisfiableStructure { min_helix: f64, min_sheet: f64 },

    #[error("Residue position {position} is outside 1..={max_len}")]
    PositionOutOfRange { position: usize, max_len: usize },

    #[error("No acceptable residues given for position {0}")]
    EmptyResidueSet(usize),

    #[error("Key residue {residue} at position {position} is not an accepted catalytic residue")]
    ConflictingResidues { position: usize, residue: AminoAcid },

    #[error("Invalid residue code '{0}'")]
    InvalidResidueCode(char),
}

/// Bounds on secondary-structure composition
///
/// Coil is whatever is left over and is not constrained directly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SecondaryStructureTarget {
    pub min_helix: f64,
    pub max_helix: f64,
    pub min_sheet: f64,
    pub max_sheet: f64,
}

impl Default for SecondaryStructureTarget {
    fn default() -> Self {
        Self {
            min_helix: 0.0,
            max_helix: 1.0,
            min_sheet: 0.0,
            max_sheet: 1.0,
        }
    }
}

impl SecondaryStructureTarget {
    pub fn new(min_helix: f64, max_helix: f64, min_sheet: f64, max_sheet: f64) -> Self {
        Self {
            min_helix,
            max_helix,
            min_sheet,
            max_sheet,
        }
    }

    fn validate(&self) -> Result<(), ConstraintError> {
        for (name, value) in [
            ("min_helix", self.min_helix),
            ("max_helix", self.max_helix),
            ("min_sheet", self.min_sheet),
            ("max_sheet", self.max_sheet),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConstraintError::FractionOutOfRange { name, value });
            }
        }

        check_bounds("helix", self.min_helix, self.max_helix)?;
        check_bounds("sheet", self.min_sheet, self.max_sheet)?;

        if self.min_helix + self.min_sheet > 1.0 {
            return Err(ConstraintError::UnsatisfiableStructure {
                min_helix: self.min_helix,
                min_sheet: self.min_sheet,
            });
        }

        Ok(())
    }
}

/// Bounds on bulk physicochemical properties
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PropertyTarget {
    /// Mean Kyte-Doolittle hydropathy bounds
    pub min_hydropathy: f64,
    pub max_hydropathy: f64,

    /// Net charge bounds at physiological pH
    pub min_charge: i32,
    pub max_charge: i32,
}

impl Default for PropertyTarget {
    fn default() -> Self {
        Self {
            min_hydropathy: -4.5,
            max_hydropathy: 4.5,
            min_charge: i32::MIN,
            max_charge: i32::MAX,
        }
    }
}

impl PropertyTarget {
    pub fn new(min_hydropathy: f64, max_hydropathy: f64, min_charge: i32, max_charge: i32) -> Self {
        Self {
            min_hydropathy,
            max_hydropathy,
            min_charge,
            max_charge,
        }
    }

    fn validate(&self) -> Result<(), ConstraintError> {
        check_bounds("hydropathy", self.min_hydropathy, self.max_hydropathy)?;
        check_bounds("charge", self.min_charge as f64, self.max_charge as f64)
    }
}

fn check_bounds(name: &'static str, min: f64, max: f64) -> Result<(), ConstraintError> {
    // NaN fails the comparison and lands here too
    if !(min <= max) {
        return Err(ConstraintError::InvertedBounds { name, min, max });
    }
    Ok(())
}

/// Immutable description of a design goal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DesignTarget {
    desired_function: String,
    length_range: (usize, usize),
    secondary_structure: SecondaryStructureTarget,
    properties: PropertyTarget,
    catalytic_residues: BTreeMap<usize, BTreeSet<AminoAcid>>,
    key_residues: BTreeMap<usize, AminoAcid>,

    /// Residues the generator may place at each fixed position
    #[serde(skip)]
    fixed_positions: BTreeMap<usize, Vec<AminoAcid>>,
}

impl DesignTarget {
    /// Start building a target for sequences of `min_len..=max_len` residues
    pub fn builder(min_len: usize, max_len: usize) -> DesignTargetBuilder {
        DesignTargetBuilder::new(min_len, max_len)
    }

    pub fn desired_function(&self) -> &str {
        &self.desired_function
    }

    /// Inclusive length bounds
    pub fn length_range(&self) -> (usize, usize) {
        self.length_range
    }

    pub fn secondary_structure(&self) -> &SecondaryStructureTarget {
        &self.secondary_structure
    }

    pub fn properties(&self) -> &PropertyTarget {
        &self.properties
    }

    /// Catalytic residues keyed by 1-based position
    pub fn catalytic_residues(&self) -> &BTreeMap<usize, BTreeSet<AminoAcid>> {
        &self.catalytic_residues
    }

    /// Key structural residues keyed by 1-based position
    pub fn key_residues(&self) -> &BTreeMap<usize, AminoAcid> {
        &self.key_residues
    }

    /// Residues accepted at a fixed position, or `None` for a free position
    pub fn allowed_at(&self, position: usize) -> Option<&[AminoAcid]> {
        self.fixed_positions.get(&position).map(Vec::as_slice)
    }

    /// Is this 1-based position pinned by a catalytic or key residue?
    pub fn is_fixed(&self, position: usize) -> bool {
        self.fixed_positions.contains_key(&position)
    }

    /// Largest fixed position, or 0 when nothing is pinned
    pub fn last_fixed_position(&self) -> usize {
        self.fixed_positions.keys().next_back().copied().unwrap_or(0)
    }

    /// Shortest length that still contains every fixed position
    pub fn min_feasible_length(&self) -> usize {
        self.length_range.0.max(self.last_fixed_position())
    }

    /// Is `len` within the inclusive length range?
    pub fn contains_length(&self, len: usize) -> bool {
        (self.length_range.0..=self.length_range.1).contains(&len)
    }
}

/// Validating builder for [`DesignTarget`]
#[derive(Debug, Clone)]
pub struct DesignTargetBuilder {
    desired_function: String,
    length_range: (usize, usize),
    secondary_structure: SecondaryStructureTarget,
    properties: PropertyTarget,
    catalytic_residues: BTreeMap<usize, BTreeSet<AminoAcid>>,
    key_residues: BTreeMap<usize, AminoAcid>,
}

impl DesignTargetBuilder {
    pub fn new(min_len: usize, max_len: usize) -> Self {
        Self {
            desired_function: String::new(),
            length_range: (min_len, max_len),
            secondary_structure: SecondaryStructureTarget::default(),
            properties: PropertyTarget::default(),
            catalytic_residues: BTreeMap::new(),
            key_residues: BTreeMap::new(),
        }
    }

    pub fn desired_function(mut self, description: impl Into<String>) -> Self {
        self.desired_function = description.into();
        self
    }

    pub fn secondary_structure(mut self, target: SecondaryStructureTarget) -> Self {
        self.secondary_structure = target;
        self
    }

    pub fn properties(mut self, target: PropertyTarget) -> Self {
        self.properties = target;
        self
    }

    /// Require one of `residues` at a 1-based position
    ///
    /// Repeated calls for the same position extend its accepted set.
    pub fn catalytic_residue<I>(mut self, position: usize, residues: I) -> Self
    where
        I: IntoIterator<Item = AminoAcid>,
    {
        self.catalytic_residues
            .entry(position)
            .or_default()
            .extend(residues);
        self
    }

    /// Same as [`Self::catalytic_residue`] but from one-letter codes, e.g. `"HK"`
    pub fn catalytic_codes(self, position: usize, codes: &str) -> Result<Self, ConstraintError> {
        let residues = codes
            .chars()
            .map(|c| AminoAcid::from_code(c).ok_or(ConstraintError::InvalidResidueCode(c)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.catalytic_residue(position, residues))
    }

    /// Pin a structural residue at a 1-based position
    pub fn key_residue(mut self, position: usize, residue: AminoAcid) -> Self {
        self.key_residues.insert(position, residue);
        self
    }

    /// Validate and freeze the target
    pub fn build(self) -> Result<DesignTarget, ConstraintError> {
        let (min_len, max_len) = self.length_range;
        if min_len < 1 || max_len < min_len {
            return Err(ConstraintError::InvalidLengthRange {
                min: min_len,
                max: max_len,
            });
        }

        self.secondary_structure.validate()?;
        self.properties.validate()?;

        let check_position = |position: usize| {
            if position < 1 || position > max_len {
                Err(ConstraintError::PositionOutOfRange { position, max_len })
            } else {
                Ok(())
            }
        };

        let mut fixed_positions = BTreeMap::new();

        for (&position, residues) in &self.catalytic_residues {
            check_position(position)?;
            if residues.is_empty() {
                return Err(ConstraintError::EmptyResidueSet(position));
            }
            fixed_positions.insert(position, residues.iter().copied().collect::<Vec<_>>());
        }

        for (&position, &residue) in &self.key_residues {
            check_position(position)?;
            if let Some(accepted) = self.catalytic_residues.get(&position) {
                if !accepted.contains(&residue) {
                    return Err(ConstraintError::ConflictingResidues { position, residue });
                }
            }
            fixed_positions.insert(position, vec![residue]);
        }

        Ok(DesignTarget {
            desired_function: self.desired_function,
            length_range: self.length_range,
            secondary_structure: self.secondary_structure,
            properties: self.properties,
            catalytic_residues: self.catalytic_residues,
            key_residues: self.key_residues,
            fixed_positions,
        })
    }
}
