//! Adapter for an out-of-process folding model
//!
//! The external program receives the query as FASTA on stdin and must print
//! one JSON object on stdout:
//!
//! ```json
//! {"helix": 0.42, "sheet": 0.21, "coil": 0.37, "model_path": "model.pdb"}
//! ```
//!
//! `coil` may be omitted and is then derived from the other two fractions.
//! `model_path`, `radius_of_gyration` and `end_to_end` are optional.

use log::debug;
use serde::Deserialize;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::predictor::{
    CoarseGeometry, ModelHandle, PredictionError, StructurePredictor, StructureSummary,
};
use crate::sequence::Sequence;

#[derive(Debug, Deserialize)]
struct PredictorOutput {
    helix: f64,
    sheet: f64,
    coil: Option<f64>,
    model_path: Option<PathBuf>,
    radius_of_gyration: Option<f64>,
    end_to_end: Option<f64>,
}

/// Structure predictor backed by an external command
#[derive(Debug, Clone)]
pub struct ExternalPredictor {
    program: PathBuf,
    args: Vec<String>,
}

impl ExternalPredictor {
    /// Create an adapter for `program`
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Arguments passed to the program on every call
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    fn parse_output(stdout: &[u8]) -> Result<StructureSummary, PredictionError> {
        let output: PredictorOutput = serde_json::from_slice(stdout)
            .map_err(|e| PredictionError::MalformedOutput(e.to_string()))?;

        let coil = output
            .coil
            .unwrap_or(1.0 - output.helix - output.sheet);
        let mut summary = StructureSummary::from_fractions(output.helix, output.sheet, coil)?;

        if let (Some(radius_of_gyration), Some(end_to_end)) =
            (output.radius_of_gyration, output.end_to_end)
        {
            summary = summary.with_geometry(CoarseGeometry {
                radius_of_gyration,
                end_to_end,
            });
        }

        if let Some(path) = output.model_path {
            summary = summary.with_model(ModelHandle::File(path));
        }

        Ok(summary)
    }
}

impl StructurePredictor for ExternalPredictor {
    fn name(&self) -> &'static str {
        "External"
    }

    fn predict(&self, sequence: &Sequence) -> Result<StructureSummary, PredictionError> {
        if sequence.is_empty() {
            return Err(PredictionError::EmptySequence);
        }

        debug!(
            "Running {} for a {}-residue sequence",
            self.program.display(),
            sequence.len()
        );

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // The child is always reaped, even if it stopped reading stdin early
        let written = match child.stdin.take() {
            Some(mut stdin) => {
                writeln!(stdin, ">query").and_then(|_| writeln!(stdin, "{}", sequence))
            }
            None => Ok(()),
        };

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(PredictionError::ExternalFailure {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        written?;

        Self::parse_output(&output.stdout)
    }
}
