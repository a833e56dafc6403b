//! protein-design: stochastic search for protein sequences that meet a design target
//!
//! This library generates candidate amino-acid sequences under hard residue
//! constraints, predicts their secondary structure through a pluggable
//! predictor, scores them against a design target and improves them with
//! simulated annealing or a genetic algorithm.

pub mod fitness;
pub mod generator;
pub mod io;
pub mod optimization;
pub mod predictor;
pub mod residue;
pub mod sequence;
pub mod target;

// Re-export commonly used types
pub use fitness::{FitnessEvaluator, FitnessResult, FitnessWeights};
pub use generator::SequenceGenerator;
pub use optimization::annealing::SimulatedAnnealing;
pub use optimization::population::GeneticAlgorithm;
pub use optimization::{DesignContext, DesignResult, OptimizationParameters, Optimizer};
pub use predictor::{StructurePredictor, StructureSummary};
pub use residue::AminoAcid;
pub use sequence::Sequence;
pub use target::DesignTarget;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
