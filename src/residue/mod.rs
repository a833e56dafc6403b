//! Amino acid alphabet and per-residue physicochemical tables

use serde::{Deserialize, Serialize};
use std::fmt;

/// The 20 canonical amino acids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AminoAcid {
    Ala, // A
    Arg, // R
    Asn, // N
    Asp, // D
    Cys, // C
    Gln, // Q
    Glu, // E
    Gly, // G
    His, // H
    Ile, // I
    Leu, // L
    Lys, // K
    Met, // M
    Phe, // F
    Pro, // P
    Ser, // S
    Thr, // T
    Trp, // W
    Tyr, // Y
    Val, // V
}

impl AminoAcid {
    /// All 20 canonical amino acids, in three-letter alphabetical order
    pub const ALL: [AminoAcid; 20] = [
        AminoAcid::Ala,
        AminoAcid::Arg,
        AminoAcid::Asn,
        AminoAcid::Asp,
        AminoAcid::Cys,
        AminoAcid::Gln,
        AminoAcid::Glu,
        AminoAcid::Gly,
        AminoAcid::His,
        AminoAcid::Ile,
        AminoAcid::Leu,
        AminoAcid::Lys,
        AminoAcid::Met,
        AminoAcid::Phe,
        AminoAcid::Pro,
        AminoAcid::Ser,
        AminoAcid::Thr,
        AminoAcid::Trp,
        AminoAcid::Tyr,
        AminoAcid::Val,
    ];

    /// Parse a single-letter code (case-insensitive)
    pub fn from_code(code: char) -> Option<Self> {
        match code.to_ascii_uppercase() {
            'A' => Some(AminoAcid::Ala),
            'R' => Some(AminoAcid::Arg),
            'N' => Some(AminoAcid::Asn),
            'D' => Some(AminoAcid::Asp),
            'C' => Some(AminoAcid::Cys),
            'Q' => Some(AminoAcid::Gln),
            'E' => Some(AminoAcid::Glu),
            'G' => Some(AminoAcid::Gly),
            'H' => Some(AminoAcid::His),
            'I' => Some(AminoAcid::Ile),
            'L' => Some(AminoAcid::Leu),
            'K' => Some(AminoAcid::Lys),
            'M' => Some(AminoAcid::Met),
            'F' => Some(AminoAcid::Phe),
            'P' => Some(AminoAcid::Pro),
            'S' => Some(AminoAcid::Ser),
            'T' => Some(AminoAcid::Thr),
            'W' => Some(AminoAcid::Trp),
            'Y' => Some(AminoAcid::Tyr),
            'V' => Some(AminoAcid::Val),
            _ => None,
        }
    }

    /// Single-letter IUPAC code
    pub fn code(&self) -> char {
        match self {
            AminoAcid::Ala => 'A',
            AminoAcid::Arg => 'R',
            AminoAcid::Asn => 'N',
            AminoAcid::Asp => 'D',
            AminoAcid::Cys => 'C',
            AminoAcid::Gln => 'Q',
            AminoAcid::Glu => 'E',
            AminoAcid::Gly => 'G',
            AminoAcid::His => 'H',
            AminoAcid::Ile => 'I',
            AminoAcid::Leu => 'L',
            AminoAcid::Lys => 'K',
            AminoAcid::Met => 'M',
            AminoAcid::Phe => 'F',
            AminoAcid::Pro => 'P',
            AminoAcid::Ser => 'S',
            AminoAcid::Thr => 'T',
            AminoAcid::Trp => 'W',
            AminoAcid::Tyr => 'Y',
            AminoAcid::Val => 'V',
        }
    }

    /// Three-letter residue name as used in PDB records
    pub fn residue_name(&self) -> &'static str {
        match self {
            AminoAcid::Ala => "ALA",
            AminoAcid::Arg => "ARG",
            AminoAcid::Asn => "ASN",
            AminoAcid::Asp => "ASP",
            AminoAcid::Cys => "CYS",
            AminoAcid::Gln => "GLN",
            AminoAcid::Glu => "GLU",
            AminoAcid::Gly => "GLY",
            AminoAcid::His => "HIS",
            AminoAcid::Ile => "ILE",
            AminoAcid::Leu => "LEU",
            AminoAcid::Lys => "LYS",
            AminoAcid::Met => "MET",
            AminoAcid::Phe => "PHE",
            AminoAcid::Pro => "PRO",
            AminoAcid::Ser => "SER",
            AminoAcid::Thr => "THR",
            AminoAcid::Trp => "TRP",
            AminoAcid::Tyr => "TYR",
            AminoAcid::Val => "VAL",
        }
    }

    /// Kyte-Doolittle hydropathy value
    pub fn hydropathy(&self) -> f64 {
        match self {
            AminoAcid::Ile => 4.5,
            AminoAcid::Val => 4.2,
            AminoAcid::Leu => 3.8,
            AminoAcid::Phe => 2.8,
            AminoAcid::Cys => 2.5,
            AminoAcid::Met => 1.9,
            AminoAcid::Ala => 1.8,
            AminoAcid::Gly => -0.4,
            AminoAcid::Thr => -0.7,
            AminoAcid::Ser => -0.8,
            AminoAcid::Trp => -0.9,
            AminoAcid::Tyr => -1.3,
            AminoAcid::Pro => -1.6,
            AminoAcid::His => -3.2,
            AminoAcid::Glu => -3.5,
            AminoAcid::Gln => -3.5,
            AminoAcid::Asp => -3.5,
            AminoAcid::Asn => -3.5,
            AminoAcid::Lys => -3.9,
            AminoAcid::Arg => -4.5,
        }
    }

    /// Side-chain charge at physiological pH
    ///
    /// Histidine (pKa ~6) is counted as neutral.
    pub fn charge(&self) -> i32 {
        match self {
            AminoAcid::Lys | AminoAcid::Arg => 1,
            AminoAcid::Asp | AminoAcid::Glu => -1,
            _ => 0,
        }
    }

    /// Chou-Fasman propensities as (helix, sheet, turn)
    pub fn propensities(&self) -> (f64, f64, f64) {
        match self {
            AminoAcid::Ala => (1.42, 0.83, 0.66),
            AminoAcid::Arg => (0.98, 0.93, 0.95),
            AminoAcid::Asn => (0.67, 0.89, 1.56),
            AminoAcid::Asp => (1.01, 0.54, 1.46),
            AminoAcid::Cys => (0.70, 1.19, 1.19),
            AminoAcid::Gln => (1.11, 1.10, 0.98),
            AminoAcid::Glu => (1.51, 0.37, 0.74),
            AminoAcid::Gly => (0.57, 0.75, 1.56),
            AminoAcid::His => (1.00, 0.87, 0.95),
            AminoAcid::Ile => (1.08, 1.60, 0.47),
            AminoAcid::Leu => (1.21, 1.30, 0.59),
            AminoAcid::Lys => (1.16, 0.74, 1.01),
            AminoAcid::Met => (1.45, 1.05, 0.60),
            AminoAcid::Phe => (1.13, 1.38, 0.60),
            AminoAcid::Pro => (0.57, 0.55, 1.52),
            AminoAcid::Ser => (0.77, 0.75, 1.43),
            AminoAcid::Thr => (0.83, 1.19, 0.96),
            AminoAcid::Trp => (1.08, 1.37, 0.96),
            AminoAcid::Tyr => (0.69, 1.47, 1.14),
            AminoAcid::Val => (1.06, 1.70, 0.50),
        }
    }

    /// Natural background frequency (UniProtKB/Swiss-Prot composition, percent)
    pub fn background_frequency(&self) -> f64 {
        match self {
            AminoAcid::Ala => 8.25,
            AminoAcid::Arg => 5.53,
            AminoAcid::Asn => 4.06,
            AminoAcid::Asp => 5.45,
            AminoAcid::Cys => 1.37,
            AminoAcid::Gln => 3.93,
            AminoAcid::Glu => 6.75,
            AminoAcid::Gly => 7.07,
            AminoAcid::His => 2.27,
            AminoAcid::Ile => 5.96,
            AminoAcid::Leu => 9.66,
            AminoAcid::Lys => 5.84,
            AminoAcid::Met => 2.42,
            AminoAcid::Phe => 3.86,
            AminoAcid::Pro => 4.70,
            AminoAcid::Ser => 6.56,
            AminoAcid::Thr => 5.34,
            AminoAcid::Trp => 1.08,
            AminoAcid::Tyr => 2.92,
            AminoAcid::Val => 6.87,
        }
    }
}

impl fmt::Display for AminoAcid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip_covers_alphabet() {
        for aa in AminoAcid::ALL {
            assert_eq!(AminoAcid::from_code(aa.code()), Some(aa));
        }
    }

    #[test]
    fn test_from_code_lowercase_and_invalid() {
        assert_eq!(AminoAcid::from_code('h'), Some(AminoAcid::His));
        assert_eq!(AminoAcid::from_code('X'), None);
        assert_eq!(AminoAcid::from_code('B'), None);
        assert_eq!(AminoAcid::from_code('*'), None);
    }

    #[test]
    fn test_hydropathy_range() {
        for aa in AminoAcid::ALL {
            assert!((-4.5..=4.5).contains(&aa.hydropathy()));
        }
        assert_eq!(AminoAcid::Ile.hydropathy(), 4.5);
        assert_eq!(AminoAcid::Arg.hydropathy(), -4.5);
    }

    #[test]
    fn test_charge() {
        assert_eq!(AminoAcid::Lys.charge(), 1);
        assert_eq!(AminoAcid::Arg.charge(), 1);
        assert_eq!(AminoAcid::Asp.charge(), -1);
        assert_eq!(AminoAcid::Glu.charge(), -1);
        assert_eq!(AminoAcid::His.charge(), 0);
        assert_eq!(AminoAcid::Gly.charge(), 0);
    }

    #[test]
    fn test_background_frequencies_sum_to_about_100() {
        let total: f64 = AminoAcid::ALL.iter().map(|aa| aa.background_frequency()).sum();
        assert!((total - 100.0).abs() < 0.5, "total was {}", total);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", AminoAcid::Trp), "W");
        assert_eq!(AminoAcid::Trp.residue_name(), "TRP");
    }
}
