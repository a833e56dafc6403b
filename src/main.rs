//! Main executable for protein-design

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};

use protein_design::fitness::FitnessEvaluator;
use protein_design::generator::SequenceGenerator;
use protein_design::io::{
    load_design_config, write_model, write_report, write_trajectory_csv, DesignConfig,
};
use protein_design::optimization::annealing::SimulatedAnnealing;
use protein_design::optimization::population::GeneticAlgorithm;
use protein_design::optimization::{
    DesignContext, DesignResult, IterationProgress, OptimizationParameters, Optimizer,
};
use protein_design::predictor::{
    CachedPredictor, ChouFasmanPredictor, ExternalPredictor, StructurePredictor,
    DEFAULT_CACHE_CAPACITY,
};
use protein_design::sequence::Sequence;

/// Patience used when neither the config nor the command line sets one
const DEFAULT_PATIENCE: usize = 20;

/// Command-line arguments for the application
#[derive(Parser, Debug)]
#[clap(
    name = "pdesign",
    version = protein_design::VERSION,
    about = "Stochastic protein sequence design against a structural and functional target"
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search for a sequence that meets a design target
    Design {
        /// JSON design configuration
        #[clap(long, short, value_parser)]
        config: PathBuf,

        /// Search strategy (annealing, population)
        #[clap(long, default_value = "annealing")]
        strategy: String,

        /// Random seed; drawn from the OS if omitted
        #[clap(long)]
        seed: Option<u64>,

        /// Independent annealing chains run in parallel
        #[clap(long, default_value_t = 1)]
        chains: usize,

        /// Output directory for the report, trajectory and model
        #[clap(long, short, value_parser, default_value = "design_out")]
        out: PathBuf,

        /// External structure predictor command (defaults to the built-in Chou-Fasman model)
        #[clap(long, value_parser)]
        predictor_cmd: Option<PathBuf>,

        /// Arguments passed to the external predictor
        #[clap(long, requires = "predictor_cmd")]
        predictor_arg: Vec<String>,

        /// Memoize predictions of repeated sequences
        #[clap(long)]
        cache: bool,

        /// Maximum number of memoized predictions
        #[clap(long, default_value_t = DEFAULT_CACHE_CAPACITY, requires = "cache")]
        cache_capacity: usize,

        /// Override the number of iterations from the config
        #[clap(long)]
        max_iterations: Option<usize>,

        /// Iterations without improvement before stopping (0 disables)
        #[clap(long)]
        patience: Option<usize>,
    },

    /// Score a single sequence against a design target
    Score {
        /// JSON design configuration
        #[clap(long, short, value_parser)]
        config: PathBuf,

        /// One-letter amino-acid sequence
        #[clap(long)]
        sequence: String,

        /// External structure predictor command
        #[clap(long, value_parser)]
        predictor_cmd: Option<PathBuf>,

        /// Arguments passed to the external predictor
        #[clap(long, requires = "predictor_cmd")]
        predictor_arg: Vec<String>,
    },
}

fn main() -> Result<()> {
    // Initialize logger
    env_logger::init();

    // Parse command-line arguments
    let cli = Cli::parse();

    match cli.command {
        Commands::Design {
            config,
            strategy,
            seed,
            chains,
            out,
            predictor_cmd,
            predictor_arg,
            cache,
            cache_capacity,
            max_iterations,
            patience,
        } => {
            let design = read_config(&config)?;
            let evaluator = design.evaluator().with_context(|| {
                format!("Invalid design target in {}", config.display())
            })?;

            let mut params = design.parameters.clone();
            if let Some(max_iterations) = max_iterations {
                params.max_iterations = max_iterations;
            }
            params.patience = match patience.or(params.patience).unwrap_or(DEFAULT_PATIENCE) {
                0 => None,
                p => Some(p),
            };

            let predictor = build_predictor(predictor_cmd, predictor_arg);
            let predictor: Box<dyn StructurePredictor> = if cache {
                Box::new(CachedPredictor::with_capacity(predictor, cache_capacity))
            } else {
                predictor
            };
            info!("Using {} structure predictor", predictor.name());

            let context = DesignContext::new(predictor.as_ref(), &evaluator)
                .with_generator(SequenceGenerator::with_distribution(design.distribution));

            let seed = seed.unwrap_or_else(rand::random);
            info!("Random seed: {}", seed);

            let result = run_design(&context, &strategy, params, chains, seed)?;

            std::fs::create_dir_all(&out)
                .with_context(|| format!("Failed to create output directory {}", out.display()))?;
            write_outputs(&evaluator, &result, &out)?;

            let best = &result.best;
            info!(
                "Best design: fitness {:.4} (stability {:.3}, function {:.3}, structure {:.3})",
                best.total(),
                best.fitness.stability,
                best.fitness.function,
                best.fitness.structure
            );
            println!("{}", best.sequence);
        }

        Commands::Score {
            config,
            sequence,
            predictor_cmd,
            predictor_arg,
        } => {
            let design = read_config(&config)?;
            let evaluator = design.evaluator().with_context(|| {
                format!("Invalid design target in {}", config.display())
            })?;

            let sequence: Sequence = sequence.parse().context("Invalid sequence")?;
            let predictor = build_predictor(predictor_cmd, predictor_arg);
            let structure = predictor
                .predict(&sequence)
                .with_context(|| format!("{} failed to predict the structure", predictor.name()))?;
            let fitness = evaluator.evaluate(&sequence, &structure)?;

            let report = serde_json::json!({
                "sequence": sequence,
                "structure": structure,
                "fitness": fitness,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn read_config(path: &Path) -> Result<DesignConfig> {
    info!("Loading design config: {}", path.display());
    load_design_config(path)
        .with_context(|| format!("Failed to load design config: {}", path.display()))
}

fn build_predictor(command: Option<PathBuf>, args: Vec<String>) -> Box<dyn StructurePredictor> {
    match command {
        Some(program) => Box::new(ExternalPredictor::new(program).with_args(args)),
        None => Box::new(ChouFasmanPredictor::new()),
    }
}

fn run_design(
    context: &DesignContext<'_>,
    strategy: &str,
    params: OptimizationParameters,
    chains: usize,
    seed: u64,
) -> Result<DesignResult> {
    let mut report_progress = |progress: &IterationProgress| {
        if progress.iteration % 10 == 0 {
            info!(
                "Iteration {}: current {:.4}, best {:.4}, T={:.3e}",
                progress.iteration,
                progress.current_fitness,
                progress.best_fitness,
                progress.temperature
            );
        }
    };

    let optimizer: Box<dyn Optimizer> = match strategy.to_lowercase().as_str() {
        "annealing" | "sa" => {
            let annealing = SimulatedAnnealing::with_params(params);
            if chains > 1 {
                let results = annealing.run_chains(context, chains, seed)?;
                for (i, result) in results.iter().enumerate() {
                    info!("Chain rank {}: best fitness {:.4}", i + 1, result.best.total());
                }
                return results
                    .into_iter()
                    .next()
                    .context("No annealing chain produced a result");
            }
            Box::new(annealing)
        }
        "population" | "ga" => Box::new(GeneticAlgorithm::with_params(params)),
        _ => {
            warn!("Unknown strategy: {}. Using annealing instead.", strategy);
            Box::new(SimulatedAnnealing::with_params(params))
        }
    };

    info!("Running {} optimizer", optimizer.name());
    let mut rng = StdRng::seed_from_u64(seed);
    Ok(optimizer.optimize_with_progress(context, &mut rng, &mut report_progress)?)
}

fn write_outputs(evaluator: &FitnessEvaluator, result: &DesignResult, out: &Path) -> Result<()> {
    let report_path = out.join("report.json");
    info!("Writing report to {}", report_path.display());
    write_report(evaluator.target(), result, &report_path)
        .with_context(|| format!("Failed to write report to {}", report_path.display()))?;

    let trajectory_path = out.join("trajectory.csv");
    write_trajectory_csv(&result.trajectory, &trajectory_path).with_context(|| {
        format!("Failed to write trajectory to {}", trajectory_path.display())
    })?;

    let best = &result.best;
    match best.structure.as_ref().and_then(|s| s.model.as_ref()) {
        Some(model) => {
            let model_path = out.join("model.pdb");
            write_model(&best.sequence, Some(model), &model_path).with_context(|| {
                format!("Failed to write model to {}", model_path.display())
            })?;
        }
        None => warn!("Predictor returned no model for the best design"),
    }

    Ok(())
}
