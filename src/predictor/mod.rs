//! Structure prediction boundary
//!
//! The search core only needs secondary-structure fractions for a sequence.
//! Prediction itself is a capability supplied by the caller: a cheap
//! deterministic stand-in for tests and quick runs, or an adapter around an
//! external folding model.

pub mod chou_fasman;
pub mod external;

use lru::LruCache;
use nalgebra::Point3;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

use crate::sequence::Sequence;

pub use chou_fasman::{ChouFasmanParams, ChouFasmanPredictor};
pub use external::ExternalPredictor;

/// Tolerance on helix + sheet + coil summing to 1
pub const FRACTION_TOLERANCE: f64 = 1e-6;

/// Errors that can occur during structure prediction
#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("Cannot predict structure of an empty sequence")]
    EmptySequence,

    #[error("Invalid structure fractions: helix {helix}, sheet {sheet}, coil {coil}")]
    InvalidFractions { helix: f64, sheet: f64, coil: f64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("External predictor exited with status {status:?}: {stderr}")]
    ExternalFailure { status: Option<i32>, stderr: String },

    #[error("Malformed predictor output: {0}")]
    MalformedOutput(String),
}

/// Per-residue secondary-structure class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SecondaryStructure {
    Helix,
    Sheet,
    Coil,
}

/// Handle to a predicted 3-D model, for writing it out later
#[derive(Debug, Clone, PartialEq)]
pub enum ModelHandle {
    /// Idealized C-alpha trace held in memory
    CaTrace(Vec<Point3<f64>>),

    /// Model file written by an external predictor
    File(PathBuf),
}

/// Coarse shape descriptors of a predicted model
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoarseGeometry {
    /// Radius of gyration in Angstroms
    pub radius_of_gyration: f64,

    /// Distance between first and last residue in Angstroms
    pub end_to_end: f64,
}

impl CoarseGeometry {
    /// Compute descriptors from a C-alpha trace
    pub fn from_trace(trace: &[Point3<f64>]) -> Option<Self> {
        let (first, last) = (trace.first()?, trace.last()?);

        let n = trace.len() as f64;
        let centroid = trace
            .iter()
            .fold(Point3::<f64>::origin(), |acc, p| acc + p.coords / n);
        let mean_sq = trace
            .iter()
            .map(|p| (p - centroid).norm_squared())
            .sum::<f64>()
            / n;

        Some(Self {
            radius_of_gyration: mean_sq.sqrt(),
            end_to_end: (last - first).norm(),
        })
    }
}

/// Predicted structure of one sequence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructureSummary {
    /// Fraction of residues in helix
    pub helix: f64,

    /// Fraction of residues in sheet
    pub sheet: f64,

    /// Fraction of residues in coil
    pub coil: f64,

    /// Coarse shape descriptors, if the predictor provides them
    pub geometry: Option<CoarseGeometry>,

    #[serde(skip)]
    pub model: Option<ModelHandle>,
}

impl StructureSummary {
    /// Create a summary, checking that the fractions form a distribution
    pub fn from_fractions(helix: f64, sheet: f64, coil: f64) -> Result<Self, PredictionError> {
        let summary = Self {
            helix,
            sheet,
            coil,
            geometry: None,
            model: None,
        };

        if !summary.has_valid_fractions() {
            return Err(PredictionError::InvalidFractions { helix, sheet, coil });
        }

        Ok(summary)
    }

    /// Summarize per-residue states
    pub fn from_states(states: &[SecondaryStructure]) -> Result<Self, PredictionError> {
        if states.is_empty() {
            return Err(PredictionError::EmptySequence);
        }

        let n = states.len() as f64;
        let count = |kind: SecondaryStructure| states.iter().filter(|&&s| s == kind).count() as f64;

        let helix = count(SecondaryStructure::Helix) / n;
        let sheet = count(SecondaryStructure::Sheet) / n;

        // Derive coil so the three always sum to exactly 1
        Self::from_fractions(helix, sheet, (1.0 - helix - sheet).max(0.0))
    }

    pub fn with_geometry(mut self, geometry: CoarseGeometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn with_model(mut self, model: ModelHandle) -> Self {
        self.model = Some(model);
        self
    }

    /// Are all fractions in [0, 1] and summing to 1?
    pub fn has_valid_fractions(&self) -> bool {
        let in_unit = |x: f64| (0.0..=1.0).contains(&x);
        in_unit(self.helix)
            && in_unit(self.sheet)
            && in_unit(self.coil)
            && ((self.helix + self.sheet + self.coil) - 1.0).abs() <= FRACTION_TOLERANCE
    }
}

/// Capability to predict a structure summary from a sequence
///
/// The Send + Sync bounds allow evaluating a whole generation with rayon.
pub trait StructurePredictor: Send + Sync {
    /// Get the name of the predictor
    fn name(&self) -> &'static str;

    /// Predict the structure of one sequence
    fn predict(&self, sequence: &Sequence) -> Result<StructureSummary, PredictionError>;
}

impl<P: StructurePredictor + ?Sized> StructurePredictor for Box<P> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn predict(&self, sequence: &Sequence) -> Result<StructureSummary, PredictionError> {
        (**self).predict(sequence)
    }
}

/// Default number of predictions kept by [`CachedPredictor`]
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Memoizes a deterministic predictor by sequence value
///
/// Holds at most `capacity` predictions and evicts the least recently used.
pub struct CachedPredictor<P> {
    inner: P,
    cache: Mutex<LruCache<Sequence, StructureSummary>>,
}

impl<P: StructurePredictor> CachedPredictor<P> {
    pub fn new(inner: P) -> Self {
        Self::with_capacity(inner, DEFAULT_CACHE_CAPACITY)
    }

    /// Create a cache holding at most `capacity` predictions (at least 1)
    pub fn with_capacity(inner: P, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of cached predictions
    pub fn len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.cache.lock().map(|c| c.cap().get()).unwrap_or(0)
    }
}

impl<P: StructurePredictor> StructurePredictor for CachedPredictor<P> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn predict(&self, sequence: &Sequence) -> Result<StructureSummary, PredictionError> {
        // `get` promotes the entry, so it needs the lock mutably
        if let Ok(mut cache) = self.cache.lock() {
            if let Some(hit) = cache.get(sequence) {
                return Ok(hit.clone());
            }
        }

        // Lock is not held while predicting; a concurrent miss just predicts twice
        let summary = self.inner.predict(sequence)?;

        if let Ok(mut cache) = self.cache.lock() {
            cache.put(sequence.clone(), summary.clone());
        }

        Ok(summary)
    }
}
