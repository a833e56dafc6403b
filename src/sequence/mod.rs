//! Protein sequence representation and bulk physicochemical properties

use crate::residue::AminoAcid;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when building a sequence
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    #[error("Invalid residue '{symbol}' at position {position}")]
    InvalidResidue { symbol: char, position: usize },

    #[error("Empty sequence")]
    Empty,
}

/// An ordered chain of canonical amino acids
///
/// Sequences are values: a mutation always produces a new `Sequence`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sequence {
    residues: Vec<AminoAcid>,
}

impl Sequence {
    /// Create a sequence from residues
    pub fn new(residues: Vec<AminoAcid>) -> Self {
        Self { residues }
    }

    /// Number of residues
    pub fn len(&self) -> usize {
        self.residues.len()
    }

    /// Is the sequence empty?
    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    /// Residue at a 1-based position
    pub fn residue_at(&self, position: usize) -> Option<AminoAcid> {
        position
            .checked_sub(1)
            .and_then(|idx| self.residues.get(idx).copied())
    }

    /// All residues in order
    pub fn residues(&self) -> &[AminoAcid] {
        &self.residues
    }

    /// Consume the sequence and return its residues
    pub fn into_residues(self) -> Vec<AminoAcid> {
        self.residues
    }

    /// Grand average of hydropathy (mean Kyte-Doolittle value)
    ///
    /// Returns 0.0 for an empty sequence.
    pub fn hydropathy_index(&self) -> f64 {
        if self.residues.is_empty() {
            return 0.0;
        }

        let sum: f64 = self.residues.iter().map(|aa| aa.hydropathy()).sum();
        sum / self.residues.len() as f64
    }

    /// Net side-chain charge at physiological pH
    pub fn net_charge(&self) -> i32 {
        self.residues.iter().map(|aa| aa.charge()).sum()
    }

    /// Count residues by type
    pub fn composition(&self) -> BTreeMap<AminoAcid, usize> {
        let mut counts = BTreeMap::new();

        for aa in &self.residues {
            *counts.entry(*aa).or_insert(0) += 1;
        }

        counts
    }
}

impl FromStr for Sequence {
    type Err = SequenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(SequenceError::Empty);
        }

        let residues = trimmed
            .chars()
            .enumerate()
            .map(|(i, symbol)| {
                AminoAcid::from_code(symbol).ok_or(SequenceError::InvalidResidue {
                    symbol,
                    position: i + 1,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { residues })
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for aa in &self.residues {
            write!(f, "{}", aa.code())?;
        }
        Ok(())
    }
}

impl From<Vec<AminoAcid>> for Sequence {
    fn from(residues: Vec<AminoAcid>) -> Self {
        Self::new(residues)
    }
}

// Serialized as the one-letter string so reports stay readable
impl Serialize for Sequence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Sequence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
