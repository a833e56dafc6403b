//! Stochastic search over sequence space

pub mod annealing;
pub mod population;

use log::warn;
use rand::{Rng, RngCore};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fitness::{FitnessEvaluator, FitnessResult};
use crate::generator::SequenceGenerator;
use crate::predictor::{StructurePredictor, StructureSummary};
use crate::sequence::Sequence;
use crate::target::DesignTarget;

/// Errors that can occur during optimization
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimizationError {
    #[error("Invalid optimization parameters: {0}")]
    InvalidParameters(String),

    #[error("Initial candidate could not be evaluated: {0}")]
    UnevaluableStart(String),

    #[error("Every candidate of iteration {iteration} failed evaluation (last error: {last_error})")]
    AllCandidatesFailed { iteration: usize, last_error: String },
}

/// Parameters shared by the search strategies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationParameters {
    /// Number of iterations (annealing steps or generations)
    pub max_iterations: usize,

    /// Individuals per generation (population mode only)
    pub population_size: usize,

    /// Per-residue mutation probability per mutation event
    pub mutation_rate: f64,

    /// Initial annealing temperature
    pub temperature: f64,

    /// Multiplicative temperature decay per iteration
    pub cooling_rate: f64,

    /// Probability that an offspring comes from crossover (population mode only)
    pub crossover_rate: f64,

    /// Individuals carried unchanged into the next generation (population mode only)
    pub elite_size: usize,

    /// Stop after this many iterations without improving the best fitness
    pub patience: Option<usize>,
}

impl Default for OptimizationParameters {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            population_size: 20,
            mutation_rate: 0.1,
            temperature: 1.0,
            cooling_rate: 0.99,
            crossover_rate: 0.8,
            elite_size: 1,
            patience: None,
        }
    }
}

impl OptimizationParameters {
    /// Check every parameter against its documented range
    pub fn validate(&self) -> Result<(), OptimizationError> {
        let invalid = |msg: String| Err(OptimizationError::InvalidParameters(msg));

        if self.max_iterations == 0 {
            return invalid("max_iterations must be positive".to_string());
        }
        if self.population_size == 0 {
            return invalid("population_size must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return invalid(format!("mutation_rate {} not in [0, 1]", self.mutation_rate));
        }
        if !(self.temperature > 0.0) {
            return invalid(format!("temperature {} must be positive", self.temperature));
        }
        if !(self.cooling_rate > 0.0 && self.cooling_rate <= 1.0) {
            return invalid(format!("cooling_rate {} not in (0, 1]", self.cooling_rate));
        }
        if !(0.0..=1.0).contains(&self.crossover_rate) {
            return invalid(format!("crossover_rate {} not in [0, 1]", self.crossover_rate));
        }
        if self.elite_size == 0 {
            return invalid("elite_size must be at least 1".to_string());
        }
        if self.patience == Some(0) {
            return invalid("patience must be positive when set".to_string());
        }

        Ok(())
    }
}

/// An evaluated sequence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub sequence: Sequence,

    /// Predicted structure, absent when evaluation failed
    pub structure: Option<StructureSummary>,

    pub fitness: FitnessResult,

    /// Why evaluation failed, if it did
    pub failure: Option<String>,
}

impl Candidate {
    /// Total fitness; 0 for an unevaluable candidate
    pub fn total(&self) -> f64 {
        self.fitness.total
    }

    pub fn is_evaluated(&self) -> bool {
        self.failure.is_none()
    }
}

/// The generate, predict, score pipeline shared by all strategies
pub struct DesignContext<'a> {
    pub generator: SequenceGenerator,
    pub predictor: &'a dyn StructurePredictor,
    pub evaluator: &'a FitnessEvaluator,
}

impl<'a> DesignContext<'a> {
    pub fn new(predictor: &'a dyn StructurePredictor, evaluator: &'a FitnessEvaluator) -> Self {
        Self {
            generator: SequenceGenerator::default(),
            predictor,
            evaluator,
        }
    }

    pub fn with_generator(mut self, generator: SequenceGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn target(&self) -> &DesignTarget {
        self.evaluator.target()
    }

    /// Predict and score one sequence
    ///
    /// Prediction or evaluation failures are not fatal here: the candidate is
    /// scored 0 and carries the failure reason.
    pub fn score(&self, sequence: Sequence) -> Candidate {
        let outcome = self
            .predictor
            .predict(&sequence)
            .map_err(|e| e.to_string())
            .and_then(|structure| {
                self.evaluator
                    .evaluate(&sequence, &structure)
                    .map(|fitness| (structure, fitness))
                    .map_err(|e| e.to_string())
            });

        match outcome {
            Ok((structure, fitness)) => Candidate {
                sequence,
                structure: Some(structure),
                fitness,
                failure: None,
            },
            Err(reason) => {
                warn!(
                    "{} could not evaluate {}: {}",
                    self.predictor.name(),
                    sequence,
                    reason
                );
                let constraints = self.evaluator.check_constraints(&sequence);
                Candidate {
                    fitness: FitnessResult::unevaluated(&sequence, constraints),
                    sequence,
                    structure: None,
                    failure: Some(reason),
                }
            }
        }
    }

    /// Score a batch concurrently; results keep the input order
    pub fn score_all(&self, sequences: Vec<Sequence>) -> Vec<Candidate> {
        sequences
            .into_par_iter()
            .map(|sequence| self.score(sequence))
            .collect()
    }
}

/// Escalate a batch in which every candidate failed
pub(crate) fn check_batch(candidates: &[Candidate], iteration: usize) -> Result<(), OptimizationError> {
    if candidates.is_empty() || candidates.iter().any(Candidate::is_evaluated) {
        return Ok(());
    }

    let last_error = candidates
        .last()
        .and_then(|c| c.failure.clone())
        .unwrap_or_default();
    Err(OptimizationError::AllCandidatesFailed {
        iteration,
        last_error,
    })
}

/// Metropolis acceptance probability for a maximization objective
///
/// Underflow, a non-positive temperature or a NaN all give 0.
pub fn acceptance_probability(current: f64, proposed: f64, temperature: f64) -> f64 {
    if proposed >= current {
        return 1.0;
    }
    if !(temperature > 0.0) {
        return 0.0;
    }

    let probability = ((proposed - current) / temperature).exp();
    if probability.is_finite() {
        probability
    } else {
        0.0
    }
}

/// Accept ties and improvements always, worse moves with Metropolis probability
pub fn metropolis_accept<R: Rng + ?Sized>(
    current: f64,
    proposed: f64,
    temperature: f64,
    rng: &mut R,
) -> bool {
    if proposed >= current {
        return true;
    }
    rng.gen::<f64>() < acceptance_probability(current, proposed, temperature)
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    MaxIterations,
    Patience,
}

/// Search state, owned by exactly one run
#[derive(Debug, Clone)]
pub struct OptimizationState {
    /// Current candidate(s): one for annealing, a generation for population mode
    pub population: Vec<Candidate>,

    pub temperature: f64,
    pub iteration: usize,
    pub best: Candidate,

    /// Best total after each iteration
    pub trajectory: Vec<f64>,

    pub accepted: usize,
    pub evaluations: usize,
    pub failed_evaluations: usize,

    iterations_since_improvement: usize,
}

impl OptimizationState {
    /// Start from an evaluated initial population
    ///
    /// Returns `None` for an empty population.
    pub fn new(population: Vec<Candidate>, temperature: f64) -> Option<Self> {
        let best = population
            .iter()
            .max_by(|a, b| a.total().total_cmp(&b.total()))?
            .clone();
        let failed = population.iter().filter(|c| !c.is_evaluated()).count();

        Some(Self {
            evaluations: population.len(),
            failed_evaluations: failed,
            population,
            temperature,
            iteration: 0,
            best,
            trajectory: Vec::new(),
            accepted: 0,
            iterations_since_improvement: 0,
        })
    }

    /// Count an evaluation and track the best candidate seen
    ///
    /// Returns true if `candidate` is the new best.
    pub fn observe(&mut self, candidate: &Candidate) -> bool {
        self.evaluations += 1;
        if !candidate.is_evaluated() {
            self.failed_evaluations += 1;
        }

        if candidate.total() > self.best.total() {
            self.best = candidate.clone();
            true
        } else {
            false
        }
    }

    /// Close an iteration: cool down and record the best fitness
    pub fn finish_iteration(&mut self, improved: bool, cooling_rate: f64) {
        self.temperature *= cooling_rate;
        self.iteration += 1;
        self.trajectory.push(self.best.total());

        if improved {
            self.iterations_since_improvement = 0;
        } else {
            self.iterations_since_improvement += 1;
        }
    }

    /// Has the run stalled for `patience` iterations?
    pub fn out_of_patience(&self, patience: Option<usize>) -> bool {
        patience.map_or(false, |p| self.iterations_since_improvement >= p)
    }

    pub fn progress(&self, current_fitness: f64) -> IterationProgress {
        IterationProgress {
            iteration: self.iteration,
            temperature: self.temperature,
            current_fitness,
            best_fitness: self.best.total(),
        }
    }

    pub fn into_result(self, strategy: &'static str, stop_reason: StopReason) -> DesignResult {
        DesignResult {
            strategy,
            best: self.best,
            trajectory: self.trajectory,
            iterations: self.iteration,
            accepted: self.accepted,
            evaluations: self.evaluations,
            failed_evaluations: self.failed_evaluations,
            final_temperature: self.temperature,
            stop_reason,
        }
    }
}

/// Snapshot passed to progress callbacks after each iteration
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IterationProgress {
    /// Iterations completed so far
    pub iteration: usize,
    pub temperature: f64,
    pub current_fitness: f64,
    pub best_fitness: f64,
}

/// Outcome of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DesignResult {
    pub strategy: &'static str,

    /// Best candidate seen during the run
    pub best: Candidate,

    /// Best fitness after each iteration, non-decreasing
    pub trajectory: Vec<f64>,

    pub iterations: usize,

    /// Accepted proposals (annealing) or offspring produced (population)
    pub accepted: usize,

    pub evaluations: usize,
    pub failed_evaluations: usize,
    pub final_temperature: f64,
    pub stop_reason: StopReason,
}

/// Trait for sequence search strategies
pub trait Optimizer {
    /// Get the name of the strategy
    fn name(&self) -> &'static str;

    /// Run the search, calling `progress` after every iteration
    fn optimize_with_progress(
        &self,
        context: &DesignContext<'_>,
        rng: &mut dyn RngCore,
        progress: &mut dyn FnMut(&IterationProgress),
    ) -> Result<DesignResult, OptimizationError>;

    /// Run the search
    fn optimize(
        &self,
        context: &DesignContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<DesignResult, OptimizationError> {
        self.optimize_with_progress(context, rng, &mut |_| {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitness::FitnessWeights;
    use crate::predictor::{ChouFasmanPredictor, PredictionError};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct FailingPredictor;

    impl StructurePredictor for FailingPredictor {
        fn name(&self) -> &'static str {
            "Failing"
        }

        fn predict(&self, _sequence: &Sequence) -> Result<StructureSummary, PredictionError> {
            Err(PredictionError::MalformedOutput("no model".to_string()))
        }
    }

    fn evaluator() -> FitnessEvaluator {
        let target = DesignTarget::builder(10, 10).build().unwrap();
        FitnessEvaluator::new(target, FitnessWeights::default())
    }

    #[test]
    fn test_default_parameters_are_valid() {
        assert!(OptimizationParameters::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_parameters() {
        let cases = [
            OptimizationParameters {
                max_iterations: 0,
                ..Default::default()
            },
            OptimizationParameters {
                mutation_rate: 1.5,
                ..Default::default()
            },
            OptimizationParameters {
                temperature: 0.0,
                ..Default::default()
            },
            OptimizationParameters {
                cooling_rate: 0.0,
                ..Default::default()
            },
            OptimizationParameters {
                cooling_rate: 1.1,
                ..Default::default()
            },
            OptimizationParameters {
                elite_size: 0,
                ..Default::default()
            },
            OptimizationParameters {
                patience: Some(0),
                ..Default::default()
            },
        ];
        for params in cases {
            assert!(
                matches!(params.validate(), Err(OptimizationError::InvalidParameters(_))),
                "accepted {:?}",
                params
            );
        }
    }

    #[test]
    fn test_acceptance_probability() {
        assert_eq!(acceptance_probability(0.5, 0.5, 1.0), 1.0);
        assert_eq!(acceptance_probability(0.5, 0.7, 1.0), 1.0);
        assert!((acceptance_probability(0.5, 0.4, 1.0) - (-0.1f64).exp()).abs() < 1e-12);
        assert_eq!(acceptance_probability(0.5, 0.4, 1e-12), 0.0);
        assert_eq!(acceptance_probability(0.5, 0.4, 0.0), 0.0);
        assert_eq!(acceptance_probability(0.5, 0.4, f64::NAN), 0.0);
    }

    #[test]
    fn test_near_zero_temperature_rejects_worse_moves() {
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..1000 {
            assert!(!metropolis_accept(0.6, 0.59, 1e-12, &mut rng));
            assert!(metropolis_accept(0.6, 0.6, 1e-12, &mut rng));
        }
    }

    #[test]
    fn test_score_success_and_failure() {
        let evaluator = evaluator();
        let predictor = ChouFasmanPredictor::new();
        let context = DesignContext::new(&predictor, &evaluator);
        let seq: Sequence = "ACDEFGHIKL".parse().unwrap();

        let ok = context.score(seq.clone());
        assert!(ok.is_evaluated());
        assert!(ok.structure.is_some());

        let failing = FailingPredictor;
        let context = DesignContext::new(&failing, &evaluator);
        let failed = context.score(seq);
        assert!(!failed.is_evaluated());
        assert_eq!(failed.total(), 0.0);
        assert!(failed.fitness.constraints.length_ok);
    }

    #[test]
    fn test_check_batch_escalates_only_total_failure() {
        let evaluator = evaluator();
        let failing = FailingPredictor;
        let failing_context = DesignContext::new(&failing, &evaluator);
        let predictor = ChouFasmanPredictor::new();
        let context = DesignContext::new(&predictor, &evaluator);
        let seq: Sequence = "ACDEFGHIKL".parse().unwrap();

        let all_failed = failing_context.score_all(vec![seq.clone(), seq.clone()]);
        assert!(matches!(
            check_batch(&all_failed, 4),
            Err(OptimizationError::AllCandidatesFailed { iteration: 4, .. })
        ));

        let mixed = vec![failing_context.score(seq.clone()), context.score(seq)];
        assert!(check_batch(&mixed, 4).is_ok());
        assert!(check_batch(&[], 4).is_ok());
    }

    #[test]
    fn test_state_tracks_best_and_trajectory() {
        let evaluator = evaluator();
        let predictor = ChouFasmanPredictor::new();
        let context = DesignContext::new(&predictor, &evaluator);
        let good = context.score("AEEMAKEALA".parse().unwrap());
        let mut worse = good.clone();
        worse.fitness.total = good.total() / 2.0;

        let mut state = OptimizationState::new(vec![worse.clone()], 1.0).unwrap();
        assert!(!state.observe(&worse));
        state.finish_iteration(false, 0.5);
        assert!(state.observe(&good));
        state.finish_iteration(true, 0.5);

        assert_eq!(state.trajectory, vec![worse.total(), good.total()]);
        assert_eq!(state.temperature, 0.25);
        assert_eq!(state.evaluations, 3);
        assert!(!state.out_of_patience(Some(1)));
        state.finish_iteration(false, 0.5);
        assert!(state.out_of_patience(Some(1)));
        assert!(!state.out_of_patience(None));

        assert!(OptimizationState::new(Vec::new(), 1.0).is_none());
    }
}
