//! Deterministic propensity-based stand-in for a folding model
//!
//! Secondary structure is assigned per residue from windowed Chou-Fasman
//! propensities, and an idealized C-alpha trace is built from the assignment
//! so that coarse 3-D descriptors are available.

use nalgebra::{Point3, Rotation3, Unit, Vector3};

use crate::predictor::{
    CoarseGeometry, ModelHandle, PredictionError, SecondaryStructure, StructurePredictor,
    StructureSummary,
};
use crate::sequence::Sequence;

/// Parameters for the propensity predictor
#[derive(Debug, Clone)]
pub struct ChouFasmanParams {
    /// Width of the averaging window (residues)
    pub window: usize,

    /// Minimum mean helix propensity for a helix call
    pub helix_threshold: f64,

    /// Minimum mean sheet propensity for a sheet call
    pub sheet_threshold: f64,

    /// Build a C-alpha trace and coarse geometry
    pub build_trace: bool,
}

impl Default for ChouFasmanParams {
    fn default() -> Self {
        Self {
            window: 6,
            helix_threshold: 1.03,
            sheet_threshold: 1.05,
            build_trace: true,
        }
    }
}

// Idealized backbone geometry (Angstroms, radians)
const HELIX_RISE: f64 = 1.5;
const HELIX_RADIUS: f64 = 2.3;
const HELIX_TWIST: f64 = 100.0 * std::f64::consts::PI / 180.0;
const STRAND_RISE: f64 = 3.3;
const STRAND_PLEAT: f64 = 0.9;
const COIL_STEP: f64 = 3.8;
const COIL_TURN: f64 = 40.0 * std::f64::consts::PI / 180.0;

/// Deterministic structure predictor based on residue propensities
#[derive(Debug, Clone, Default)]
pub struct ChouFasmanPredictor {
    pub params: ChouFasmanParams,
}

impl ChouFasmanPredictor {
    /// Create a predictor with default parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a predictor with custom parameters
    pub fn with_params(params: ChouFasmanParams) -> Self {
        Self { params }
    }

    /// Assign a secondary-structure class to every residue
    pub fn assign_states(&self, sequence: &Sequence) -> Vec<SecondaryStructure> {
        let residues = sequence.residues();
        let n = residues.len();
        let half = self.params.window.max(1) / 2;

        (0..n)
            .map(|i| {
                let start = i.saturating_sub(half);
                let end = (i + half + 1).min(n);
                let span = (end - start) as f64;

                let (helix_sum, sheet_sum) = residues[start..end]
                    .iter()
                    .map(|aa| aa.propensities())
                    .fold((0.0, 0.0), |(h, s), (ph, ps, _)| (h + ph, s + ps));
                let (helix, sheet) = (helix_sum / span, sheet_sum / span);

                if helix >= self.params.helix_threshold && helix >= sheet {
                    SecondaryStructure::Helix
                } else if sheet >= self.params.sheet_threshold {
                    SecondaryStructure::Sheet
                } else {
                    SecondaryStructure::Coil
                }
            })
            .collect()
    }

    /// Build an idealized C-alpha trace for a state assignment
    ///
    /// Helices wind around the local chain axis, strands run straight with a
    /// pleat, and every coil residue bends the chain axis.
    pub fn build_ca_trace(&self, states: &[SecondaryStructure]) -> Vec<Point3<f64>> {
        let bend = Rotation3::from_axis_angle(&Vector3::z_axis(), COIL_TURN);
        let normal = Vector3::z();

        let mut axis = Vector3::x_axis();
        let mut origin: Point3<f64> = Point3::origin();
        let mut phase = 0.0_f64;
        let mut trace = Vec::with_capacity(states.len());

        for (i, state) in states.iter().enumerate() {
            // The axis stays in the xy-plane, so `side` is a unit vector
            let side = axis.cross(&normal);

            let position = match state {
                SecondaryStructure::Helix => {
                    origin += axis.into_inner() * HELIX_RISE;
                    phase += HELIX_TWIST;
                    origin + (normal * phase.cos() + side * phase.sin()) * HELIX_RADIUS
                }
                SecondaryStructure::Sheet => {
                    origin += axis.into_inner() * STRAND_RISE;
                    let pleat = if i % 2 == 0 { STRAND_PLEAT } else { -STRAND_PLEAT };
                    origin + normal * pleat
                }
                SecondaryStructure::Coil => {
                    axis = Unit::new_normalize(bend * axis.into_inner());
                    origin += axis.into_inner() * COIL_STEP;
                    origin
                }
            };

            trace.push(position);
        }

        trace
    }
}

impl StructurePredictor for ChouFasmanPredictor {
    fn name(&self) -> &'static str {
        "ChouFasman"
    }

    fn predict(&self, sequence: &Sequence) -> Result<StructureSummary, PredictionError> {
        if sequence.is_empty() {
            return Err(PredictionError::EmptySequence);
        }

        let states = self.assign_states(sequence);
        let summary = StructureSummary::from_states(&states)?;

        if !self.params.build_trace {
            return Ok(summary);
        }

        let trace = self.build_ca_trace(&states);
        Ok(match CoarseGeometry::from_trace(&trace) {
            Some(geometry) => summary
                .with_geometry(geometry)
                .with_model(ModelHandle::CaTrace(trace)),
            None => summary,
        })
    }
}
