//! Population-based search
//!
//! Each generation keeps the elite unchanged and fills the rest with offspring
//! of fitness-proportionate parents (crossover, then mutation). A whole
//! generation is predicted and scored concurrently.

use log::{debug, info};
use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, RngCore};

use crate::optimization::{
    check_batch, Candidate, DesignContext, DesignResult, IterationProgress, OptimizationError,
    OptimizationParameters, OptimizationState, Optimizer, StopReason,
};
use crate::sequence::Sequence;

/// Genetic-algorithm optimizer
#[derive(Debug, Clone, Default)]
pub struct GeneticAlgorithm {
    pub params: OptimizationParameters,
}

impl GeneticAlgorithm {
    /// Create an optimizer with default parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an optimizer with custom parameters
    pub fn with_params(params: OptimizationParameters) -> Self {
        Self { params }
    }

    /// Pick a parent index with probability proportional to fitness
    ///
    /// Falls back to a uniform choice when every total is 0.
    fn select_parent<R: Rng + ?Sized>(population: &[Candidate], rng: &mut R) -> usize {
        match WeightedIndex::<f64>::new(population.iter().map(Candidate::total)) {
            Ok(dist) => dist.sample(rng),
            Err(_) => rng.gen_range(0..population.len()),
        }
    }

    /// Breed `count` offspring from the current generation
    fn breed(
        &self,
        context: &DesignContext<'_>,
        population: &[Candidate],
        count: usize,
        rng: &mut dyn RngCore,
    ) -> Vec<Sequence> {
        let target = context.target();
        let generator = &context.generator;

        (0..count)
            .map(|_| {
                let first = &population[Self::select_parent(population, rng)].sequence;
                let parent = if rng.gen::<f64>() < self.params.crossover_rate {
                    let second = &population[Self::select_parent(population, rng)].sequence;
                    generator.crossover(first, second, target, rng)
                } else {
                    first.clone()
                };
                generator.mutate(&parent, target, self.params.mutation_rate, rng)
            })
            .collect()
    }
}

/// Sort candidates best first
fn rank(population: &mut [Candidate]) {
    population.sort_by(|a, b| b.total().total_cmp(&a.total()));
}

impl Optimizer for GeneticAlgorithm {
    fn name(&self) -> &'static str {
        "GeneticAlgorithm"
    }

    fn optimize_with_progress(
        &self,
        context: &DesignContext<'_>,
        rng: &mut dyn RngCore,
        progress: &mut dyn FnMut(&IterationProgress),
    ) -> Result<DesignResult, OptimizationError> {
        let params = &self.params;
        params.validate()?;

        let target = context.target();
        let size = params.population_size;
        let elite_size = params.elite_size.min(size);

        // At least one offspring per generation, even when every member is elite
        let offspring_count = size - elite_size.min(size - 1);

        // Draw sequentially so a seed fixes the population, then score in parallel
        let initial: Vec<Sequence> = (0..size)
            .map(|_| context.generator.generate_random(target, rng))
            .collect();
        let mut population = context.score_all(initial);
        check_batch(&population, 0)?;
        rank(&mut population);

        info!(
            "Evolving {} individuals for {} generations (initial best {:.4})",
            size,
            params.max_iterations,
            population[0].total()
        );

        let mut state = OptimizationState::new(population, params.temperature).ok_or_else(|| {
            OptimizationError::InvalidParameters("population_size must be positive".to_string())
        })?;
        let mut stop_reason = StopReason::MaxIterations;

        for _ in 0..params.max_iterations {
            let offspring =
                context.score_all(self.breed(context, &state.population, offspring_count, rng));
            check_batch(&offspring, state.iteration + 1)?;

            let mut improved = false;
            for child in &offspring {
                improved |= state.observe(child);
            }
            state.accepted += offspring.len();

            let mut next_generation: Vec<Candidate> =
                state.population[..elite_size].to_vec();
            next_generation.extend(offspring);
            rank(&mut next_generation);
            next_generation.truncate(size);
            state.population = next_generation;

            state.finish_iteration(improved, params.cooling_rate);
            progress(&state.progress(state.population[0].total()));

            debug!(
                "Generation {}: best {:.4}, generation best {:.4}",
                state.iteration,
                state.best.total(),
                state.population[0].total()
            );

            if state.out_of_patience(params.patience) {
                info!(
                    "No improvement for {} generations, stopping",
                    params.patience.unwrap_or_default()
                );
                stop_reason = StopReason::Patience;
                break;
            }
        }

        info!(
            "Evolution finished after {} generations: best fitness {:.4} from {} evaluations",
            state.iteration,
            state.best.total(),
            state.evaluations
        );

        Ok(state.into_result(self.name(), stop_reason))
    }
}
