//! Integration tests for the protein-design library

use assert_approx_eq::assert_approx_eq;
use protein_design::fitness::{FitnessEvaluator, FitnessWeights};
use protein_design::io::{write_model, write_report, write_trajectory_csv, DesignConfig};
use protein_design::optimization::annealing::SimulatedAnnealing;
use protein_design::optimization::population::GeneticAlgorithm;
use protein_design::optimization::{
    metropolis_accept, DesignContext, OptimizationError, OptimizationParameters, Optimizer,
};
use protein_design::predictor::{
    CachedPredictor, ChouFasmanPredictor, PredictionError, StructurePredictor, StructureSummary,
};
use protein_design::residue::AminoAcid;
use protein_design::sequence::Sequence;
use protein_design::target::{DesignTarget, PropertyTarget, SecondaryStructureTarget};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::tempdir;

/// Ten residues, helix 0.3-0.5 and sheet 0.2-0.4, no catalytic residues
fn scenario_target() -> DesignTarget {
    DesignTarget::builder(10, 10)
        .secondary_structure(SecondaryStructureTarget::new(0.3, 0.5, 0.2, 0.4))
        .build()
        .expect("Scenario target should be valid")
}

/// A small hydrolase-like target with a catalytic triad and one key proline
fn triad_target() -> DesignTarget {
    DesignTarget::builder(40, 60)
        .desired_function("serine hydrolase")
        .secondary_structure(SecondaryStructureTarget::new(0.3, 0.5, 0.1, 0.3))
        .properties(PropertyTarget::new(-0.5, 0.5, -2, 2))
        .catalytic_residue(12, [AminoAcid::Ser])
        .catalytic_residue(25, [AminoAcid::His])
        .catalytic_residue(33, [AminoAcid::Asp, AminoAcid::Glu])
        .key_residue(20, AminoAcid::Pro)
        .build()
        .expect("Triad target should be valid")
}

/// Predictor that fails for every sequence containing a tryptophan
struct NoTryptophanPredictor {
    inner: ChouFasmanPredictor,
    failures: AtomicUsize,
}

impl StructurePredictor for NoTryptophanPredictor {
    fn name(&self) -> &'static str {
        "NoTryptophan"
    }

    fn predict(&self, sequence: &Sequence) -> Result<StructureSummary, PredictionError> {
        if sequence.residues().contains(&AminoAcid::Trp) {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(PredictionError::MalformedOutput("model crashed".to_string()));
        }
        self.inner.predict(sequence)
    }
}

#[test]
fn test_structure_inside_bounds_scores_one() {
    let evaluator = FitnessEvaluator::new(scenario_target(), FitnessWeights::default());
    let structure = StructureSummary::from_fractions(0.4, 0.3, 0.3).unwrap();

    let result = evaluator.evaluate_str("ACDEFGHIKL", &structure).unwrap();
    assert_approx_eq!(result.structure, 1.0);
}

#[test]
fn test_missing_catalytic_residue_zeroes_function_score() {
    let target = DesignTarget::builder(10, 10)
        .secondary_structure(SecondaryStructureTarget::new(0.3, 0.5, 0.2, 0.4))
        .catalytic_residue(5, [AminoAcid::His])
        .build()
        .unwrap();
    let weights = FitnessWeights::default();
    let evaluator = FitnessEvaluator::new(target, weights);
    let structure = StructureSummary::from_fractions(0.4, 0.3, 0.3).unwrap();

    // Position 5 is 'F'
    let result = evaluator.evaluate_str("ACDEFGHIKL", &structure).unwrap();
    assert_eq!(result.function, 0.0);
    assert!(result.total <= weights.structure + weights.stability + 1e-12);
    assert!(!result.constraints.catalytic_ok());
}

#[test]
fn test_near_zero_temperature_is_hill_climbing() {
    let mut rng = StdRng::seed_from_u64(123);
    let rejected = (0..10_000)
        .filter(|_| !metropolis_accept(0.8, 0.79999, 1e-12, &mut rng))
        .count();
    assert_eq!(rejected, 10_000);
}

#[test]
fn test_annealing_end_to_end() {
    let target = triad_target();
    let evaluator = FitnessEvaluator::new(target, FitnessWeights::default());
    let predictor = ChouFasmanPredictor::new();
    let context = DesignContext::new(&predictor, &evaluator);
    let optimizer = SimulatedAnnealing::with_params(OptimizationParameters {
        max_iterations: 300,
        ..OptimizationParameters::default()
    });

    let mut rng = StdRng::seed_from_u64(2024);
    let result = optimizer
        .optimize(&context, &mut rng)
        .expect("Annealing should succeed");

    assert_eq!(result.trajectory.len(), 300);
    assert!(result.trajectory.windows(2).all(|w| w[1] >= w[0]));
    assert!((0.0..=1.0).contains(&result.best.total()));

    let best = &result.best.sequence;
    assert!(evaluator.target().contains_length(best.len()));
    assert_eq!(best.residue_at(12), Some(AminoAcid::Ser));
    assert_eq!(best.residue_at(25), Some(AminoAcid::His));
    assert_eq!(best.residue_at(20), Some(AminoAcid::Pro));
    assert!(matches!(
        best.residue_at(33),
        Some(AminoAcid::Asp) | Some(AminoAcid::Glu)
    ));
    assert_approx_eq!(result.best.fitness.function, 1.0);
}

#[test]
fn test_population_end_to_end() {
    let target = triad_target();
    let evaluator = FitnessEvaluator::new(target, FitnessWeights::default());
    let predictor = ChouFasmanPredictor::new();
    let context = DesignContext::new(&predictor, &evaluator);
    let optimizer = GeneticAlgorithm::with_params(OptimizationParameters {
        max_iterations: 20,
        population_size: 16,
        ..OptimizationParameters::default()
    });

    let mut rng = StdRng::seed_from_u64(7);
    let result = optimizer
        .optimize(&context, &mut rng)
        .expect("Population search should succeed");

    assert_eq!(result.strategy, "GeneticAlgorithm");
    assert_eq!(result.trajectory.len(), 20);
    assert!(result.trajectory.windows(2).all(|w| w[1] >= w[0]));
    assert!(result.best.fitness.constraints.all_satisfied());
}

#[test]
fn test_prediction_failures_are_recovered() {
    let evaluator = FitnessEvaluator::new(triad_target(), FitnessWeights::default());
    let predictor = NoTryptophanPredictor {
        inner: ChouFasmanPredictor::new(),
        failures: AtomicUsize::new(0),
    };
    let context = DesignContext::new(&predictor, &evaluator);
    let optimizer = GeneticAlgorithm::with_params(OptimizationParameters {
        max_iterations: 10,
        population_size: 60,
        ..OptimizationParameters::default()
    });

    let mut rng = StdRng::seed_from_u64(11);
    let result = optimizer
        .optimize(&context, &mut rng)
        .expect("Some candidates should survive");

    // Most random sequences of 40 or more residues contain a Trp
    assert!(predictor.failures.load(Ordering::SeqCst) > 0);
    assert_eq!(
        result.failed_evaluations,
        predictor.failures.load(Ordering::SeqCst)
    );
    assert!(result.best.is_evaluated());
    assert!(!result.best.sequence.residues().contains(&AminoAcid::Trp));
}

#[test]
fn test_unevaluable_start_is_escalated() {
    let target = DesignTarget::builder(10, 10)
        .catalytic_residue(1, [AminoAcid::Trp])
        .build()
        .unwrap();
    let evaluator = FitnessEvaluator::new(target, FitnessWeights::default());
    let predictor = NoTryptophanPredictor {
        inner: ChouFasmanPredictor::new(),
        failures: AtomicUsize::new(0),
    };
    let context = DesignContext::new(&predictor, &evaluator);

    let mut rng = StdRng::seed_from_u64(0);
    let err = SimulatedAnnealing::new()
        .optimize(&context, &mut rng)
        .unwrap_err();
    assert!(matches!(err, OptimizationError::UnevaluableStart(_)));

    let err = GeneticAlgorithm::new()
        .optimize(&context, &mut rng)
        .unwrap_err();
    assert!(matches!(
        err,
        OptimizationError::AllCandidatesFailed { iteration: 0, .. }
    ));
}

#[test]
fn test_cached_predictor_gives_identical_results() {
    let evaluator = FitnessEvaluator::new(triad_target(), FitnessWeights::default());
    let params = OptimizationParameters {
        max_iterations: 100,
        ..OptimizationParameters::default()
    };

    let plain = ChouFasmanPredictor::new();
    let context = DesignContext::new(&plain, &evaluator);
    let expected = SimulatedAnnealing::with_params(params.clone())
        .optimize(&context, &mut StdRng::seed_from_u64(5))
        .unwrap();

    let cached = CachedPredictor::new(ChouFasmanPredictor::new());
    let context = DesignContext::new(&cached, &evaluator);
    let actual = SimulatedAnnealing::with_params(params)
        .optimize(&context, &mut StdRng::seed_from_u64(5))
        .unwrap();

    assert_eq!(expected.best.sequence, actual.best.sequence);
    assert_eq!(expected.trajectory, actual.trajectory);
    assert!(!cached.is_empty());
}

#[test]
fn test_parallel_chains() {
    let evaluator = FitnessEvaluator::new(triad_target(), FitnessWeights::default());
    let predictor = ChouFasmanPredictor::new();
    let context = DesignContext::new(&predictor, &evaluator);
    let optimizer = SimulatedAnnealing::with_params(OptimizationParameters {
        max_iterations: 50,
        ..OptimizationParameters::default()
    });

    let first = optimizer.run_chains(&context, 3, 42).unwrap();
    let second = optimizer.run_chains(&context, 3, 42).unwrap();

    assert_eq!(first.len(), 3);
    let totals = |results: &[protein_design::DesignResult]| {
        results.iter().map(|r| r.best.total()).collect::<Vec<_>>()
    };
    assert_eq!(totals(&first), totals(&second));
}

#[test]
fn test_config_run_and_outputs() {
    let config: DesignConfig = serde_json::from_str(
        r#"{
            "target": {
                "desired_function": "zinc finger",
                "min_length": 25,
                "max_length": 30,
                "catalytic_residues": {"3": "C", "6": "C", "19": "H", "23": "H"}
            },
            "weights": {"stability": 0.2, "function": 0.6, "structure": 0.2},
            "parameters": {"max_iterations": 40, "population_size": 8},
            "distribution": "background",
            "linear_falloff": true
        }"#,
    )
    .expect("Config should parse");

    let evaluator = config.evaluator().expect("Target should be valid");
    let predictor = ChouFasmanPredictor::new();
    let context = DesignContext::new(&predictor, &evaluator).with_generator(
        protein_design::generator::SequenceGenerator::with_distribution(config.distribution),
    );
    let result = GeneticAlgorithm::with_params(config.parameters.clone())
        .optimize(&context, &mut StdRng::seed_from_u64(3))
        .unwrap();

    let dir = tempdir().unwrap();
    let report = dir.path().join("report.json");
    let trajectory = dir.path().join("trajectory.csv");
    let model = dir.path().join("model.pdb");

    write_report(evaluator.target(), &result, &report).unwrap();
    write_trajectory_csv(&result.trajectory, &trajectory).unwrap();
    write_model(
        &result.best.sequence,
        result.best.structure.as_ref().and_then(|s| s.model.as_ref()),
        &model,
    )
    .unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["desired_function"], "zinc finger");
    assert_eq!(json["fitness"]["constraints"]["catalytic_total"], 4);

    let pdb = std::fs::read_to_string(&model).unwrap();
    assert!(pdb.lines().any(|l| l.starts_with("ATOM") && l.contains(" CA  CYS A   3")));
}
