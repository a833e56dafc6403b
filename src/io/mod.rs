//! Input/output for design runs
//!
//! Loads JSON design configurations and writes the results of a run: a JSON
//! report of the best design, the fitness trajectory as CSV and the predicted
//! model as a C-alpha PDB.

use log::debug;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

use crate::fitness::{FitnessEvaluator, FitnessResult, FitnessWeights};
use crate::generator::ResidueDistribution;
use crate::optimization::{DesignResult, OptimizationParameters, StopReason};
use crate::predictor::{ModelHandle, StructureSummary};
use crate::residue::AminoAcid;
use crate::sequence::Sequence;
use crate::target::{ConstraintError, DesignTarget, PropertyTarget, SecondaryStructureTarget};

/// Errors that can occur during file I/O operations
#[derive(Error, Debug)]
pub enum IoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid design target: {0}")]
    Constraint(#[from] ConstraintError),

    #[error("No model available to write")]
    MissingModel,
}

/// Design target as written in a configuration file
///
/// Catalytic residues map 1-based positions to the accepted one-letter codes,
/// e.g. `{"57": "H", "102": "DE"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default)]
    pub desired_function: String,

    pub min_length: usize,
    pub max_length: usize,

    #[serde(default)]
    pub secondary_structure: SecondaryStructureTarget,

    #[serde(default)]
    pub properties: PropertyTarget,

    #[serde(default)]
    pub catalytic_residues: BTreeMap<usize, String>,

    #[serde(default)]
    pub key_residues: BTreeMap<usize, char>,
}

impl TryFrom<&TargetConfig> for DesignTarget {
    type Error = ConstraintError;

    fn try_from(config: &TargetConfig) -> Result<Self, Self::Error> {
        let mut builder = DesignTarget::builder(config.min_length, config.max_length)
            .desired_function(config.desired_function.clone())
            .secondary_structure(config.secondary_structure)
            .properties(config.properties);

        for (&position, codes) in &config.catalytic_residues {
            builder = builder.catalytic_codes(position, codes)?;
        }

        for (&position, &code) in &config.key_residues {
            let residue = AminoAcid::from_code(code).ok_or(ConstraintError::InvalidResidueCode(code))?;
            builder = builder.key_residue(position, residue);
        }

        builder.build()
    }
}

/// Complete description of a design run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignConfig {
    pub target: TargetConfig,

    #[serde(default)]
    pub weights: FitnessWeights,

    #[serde(default)]
    pub parameters: OptimizationParameters,

    /// Residue distribution for free positions
    #[serde(default)]
    pub distribution: ResidueDistribution,

    /// Use linear instead of Gaussian score falloff
    #[serde(default)]
    pub linear_falloff: bool,
}

impl DesignConfig {
    /// Build the evaluator described by this configuration
    pub fn evaluator(&self) -> Result<FitnessEvaluator, ConstraintError> {
        let target = DesignTarget::try_from(&self.target)?;
        let evaluator = FitnessEvaluator::new(target, self.weights);

        Ok(if self.linear_falloff {
            evaluator.with_linear_falloff()
        } else {
            evaluator
        })
    }
}

/// Load a JSON design configuration
pub fn load_design_config<P: AsRef<Path>>(path: P) -> Result<DesignConfig, IoError> {
    let file = File::open(path.as_ref())?;
    let config: DesignConfig = serde_json::from_reader(std::io::BufReader::new(file))?;

    debug!(
        "Loaded design config from {} ({}..={} residues)",
        path.as_ref().display(),
        config.target.min_length,
        config.target.max_length
    );

    Ok(config)
}

/// Report of the best design found by a run
#[derive(Debug, Serialize)]
pub struct DesignReport<'a> {
    pub version: &'static str,
    pub desired_function: &'a str,
    pub strategy: &'static str,
    pub sequence: &'a Sequence,
    pub length: usize,
    pub fitness: &'a FitnessResult,
    pub structure: Option<&'a StructureSummary>,
    pub trajectory: &'a [f64],
    pub iterations: usize,
    pub accepted: usize,
    pub evaluations: usize,
    pub failed_evaluations: usize,
    pub stop_reason: StopReason,
}

impl<'a> DesignReport<'a> {
    pub fn new(target: &'a DesignTarget, result: &'a DesignResult) -> Self {
        Self {
            version: crate::VERSION,
            desired_function: target.desired_function(),
            strategy: result.strategy,
            sequence: &result.best.sequence,
            length: result.best.sequence.len(),
            fitness: &result.best.fitness,
            structure: result.best.structure.as_ref(),
            trajectory: &result.trajectory,
            iterations: result.iterations,
            accepted: result.accepted,
            evaluations: result.evaluations,
            failed_evaluations: result.failed_evaluations,
            stop_reason: result.stop_reason,
        }
    }
}

/// Write the JSON report of a run
pub fn write_report<P: AsRef<Path>>(
    target: &DesignTarget,
    result: &DesignResult,
    path: P,
) -> Result<(), IoError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &DesignReport::new(target, result))?;
    writer.flush()?;
    Ok(())
}

/// Write the best-fitness trajectory, one row per iteration
pub fn write_trajectory_csv<P: AsRef<Path>>(trajectory: &[f64], path: P) -> Result<(), IoError> {
    let mut file = BufWriter::new(File::create(path)?);

    writeln!(file, "iteration,best_fitness")?;
    for (i, fitness) in trajectory.iter().enumerate() {
        writeln!(file, "{},{:.6}", i + 1, fitness)?;
    }

    file.flush()?;
    Ok(())
}

/// Write a C-alpha trace as PDB ATOM records, one per residue
pub fn write_ca_pdb<P: AsRef<Path>>(
    sequence: &Sequence,
    trace: &[Point3<f64>],
    path: P,
) -> Result<(), IoError> {
    let mut file = BufWriter::new(File::create(path)?);

    // Write header
    writeln!(file, "REMARK C-alpha trace generated by protein-design")?;
    writeln!(file, "REMARK SEQUENCE {}", sequence)?;

    for (i, (residue, ca)) in sequence.residues().iter().zip(trace).enumerate() {
        writeln!(
            file,
            "ATOM  {:5}  CA  {:3} A{:4}    {:8.3}{:8.3}{:8.3}{:6.2}{:6.2}           C",
            i + 1, // 1-based serial and residue number
            residue.residue_name(),
            i + 1,
            ca.x,
            ca.y,
            ca.z,
            1.0, // Occupancy
            0.0, // Temperature factor
        )?;
    }

    writeln!(file, "END")?;
    file.flush()?;
    Ok(())
}

/// Write whatever model a prediction produced
///
/// In-memory traces are written as PDB; model files are copied.
pub fn write_model<P: AsRef<Path>>(
    sequence: &Sequence,
    model: Option<&ModelHandle>,
    path: P,
) -> Result<(), IoError> {
    match model {
        Some(ModelHandle::CaTrace(trace)) => write_ca_pdb(sequence, trace, path),
        Some(ModelHandle::File(source)) => {
            std::fs::copy(source, path)?;
            Ok(())
        }
        None => Err(IoError::MissingModel),
    }
}
