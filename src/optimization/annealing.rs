//! Simulated annealing over sequence space
//!
//! A single chain: mutate the current sequence, score the neighbor, accept it
//! by the Metropolis criterion, cool down. The best sequence is tracked
//! independently of acceptance, so the trajectory never decreases even when
//! the chain wanders away from it.

use log::{debug, info, trace};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rayon::prelude::*;

use crate::optimization::{
    metropolis_accept, DesignContext, DesignResult, IterationProgress, OptimizationError,
    OptimizationParameters, OptimizationState, Optimizer, StopReason,
};

/// Simulated-annealing optimizer
#[derive(Debug, Clone, Default)]
pub struct SimulatedAnnealing {
    pub params: OptimizationParameters,
}

impl SimulatedAnnealing {
    /// Create an optimizer with default parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an optimizer with custom parameters
    pub fn with_params(params: OptimizationParameters) -> Self {
        Self { params }
    }

    /// Run independent chains concurrently, best result first
    ///
    /// Chain `i` is seeded with `seed + i`, so a set of chains is reproducible.
    pub fn run_chains(
        &self,
        context: &DesignContext<'_>,
        num_chains: usize,
        seed: u64,
    ) -> Result<Vec<DesignResult>, OptimizationError> {
        info!("Running {} independent annealing chains", num_chains);

        let mut results = (0..num_chains)
            .into_par_iter()
            .map(|chain| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(chain as u64));
                self.optimize(context, &mut rng)
            })
            .collect::<Result<Vec<_>, _>>()?;

        results.sort_by(|a, b| b.best.total().total_cmp(&a.best.total()));
        Ok(results)
    }
}

impl Optimizer for SimulatedAnnealing {
    fn name(&self) -> &'static str {
        "SimulatedAnnealing"
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
        let initial = context.score(context.generator.generate_random(target, rng));
        if let Some(reason) = &initial.failure {
            return Err(OptimizationError::UnevaluableStart(reason.clone()));
        }

        info!(
            "Annealing {} iterations from T={} (initial fitness {:.4})",
            params.max_iterations,
            params.temperature,
            initial.total()
        );

        let mut state = OptimizationState::new(vec![initial], params.temperature)
            .ok_or_else(|| OptimizationError::UnevaluableStart("no initial candidate".to_string()))?;
        let mut stop_reason = StopReason::MaxIterations;

        for _ in 0..params.max_iterations {
            let current_fitness = state.population[0].total();
            let neighbor = context.score(context.generator.mutate(
                &state.population[0].sequence,
                target,
                params.mutation_rate,
                rng,
            ));

            let improved = state.observe(&neighbor);
            let proposed = neighbor.total();

            if metropolis_accept(current_fitness, proposed, state.temperature, rng) {
                trace!(
                    "Accepted {:.4} -> {:.4} at T={:.3e}",
                    current_fitness,
                    proposed,
                    state.temperature
                );
                state.population[0] = neighbor;
                state.accepted += 1;
            }

            state.finish_iteration(improved, params.cooling_rate);
            progress(&state.progress(state.population[0].total()));

            if state.iteration % 10 == 0 {
                debug!(
                    "Iteration {}, fitness {:.4}, best {:.4}, T={:.3e}",
                    state.iteration,
                    state.population[0].total(),
                    state.best.total(),
                    state.temperature
                );
            }

            if state.out_of_patience(params.patience) {
                info!(
                    "No improvement for {} iterations, stopping",
                    params.patience.unwrap_or_default()
                );
                stop_reason = StopReason::Patience;
                break;
            }
        }

        info!(
            "Annealing finished after {} iterations: best fitness {:.4}, {} of {} moves accepted",
            state.iteration,
            state.best.total(),
            state.accepted,
            state.iteration
        );

        Ok(state.into_result(self.name(), stop_reason))
    }
}
