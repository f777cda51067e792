//! Genetic programming over prefix token sequences
//!
//! This module implements the generational GA used by the pipeline: seeded
//! population, tournament selection, subtree crossover and mutation, a static
//! height limit and a hall of fame that outlives the generations of one play.

use rand::Rng;
use tracing::debug;

use crate::config::GaConfig;
use crate::context::SearchContext;
use crate::diagnostics::GenerationStats;
use crate::fitness::program::ProgramFitness;
use crate::genome::program::Program;
use crate::grammar::{Constraints, Grammar};
use crate::operators::crossover::SubtreeCrossover;
use crate::operators::mutation::SubtreeMutation;
use crate::operators::selection::TournamentSelection;
use crate::operators::traits::{CrossoverOperator, MutationOperator, SelectionOperator};
use crate::population::hall_of_fame::HallOfFame;
use crate::population::individual::Individual;
use crate::population::population::Population;
use crate::termination::{AnyOf, EvolutionState, MaxGenerations, StopRequested};

/// Depth range of the ramped initial programs
const INIT_DEPTH: (usize, usize) = (2, 4);
/// Depth limit of the subtrees grown by mutation
const MUTATION_DEPTH: usize = 2;

/// One GA engine
///
/// Holds its operators and outer form between plays; populations and halls
/// of fame are rebuilt by every [`GaEngine::play`].
#[derive(Debug)]
pub struct GaEngine {
    grammar: Grammar,
    constraints: Constraints,
    selection: TournamentSelection,
    crossover: SubtreeCrossover,
    mutation: SubtreeMutation,
    form: String,
    population_size: usize,
    generations: usize,
    max_height: usize,
    hall_of_fame_size: usize,
    discount: f64,
}

impl GaEngine {
    /// Create an engine with tournament selection, subtree crossover and
    /// subtree mutation configured from `config`, and no outer form
    pub fn new(grammar: Grammar, config: &GaConfig) -> Self {
        let constraints = Constraints::new(config.max_const, config.max_height);
        Self {
            selection: TournamentSelection::new(config.tournament_size),
            crossover: SubtreeCrossover::new(grammar.clone(), config.crossover_probability),
            mutation: SubtreeMutation::new(
                grammar.clone(),
                constraints,
                MUTATION_DEPTH,
                config.mutation_probability,
            ),
            grammar,
            constraints,
            form: String::new(),
            population_size: config.population_size,
            generations: config.generations,
            max_height: config.max_height,
            hall_of_fame_size: config.hall_of_fame_size,
            discount: config.token_discount,
        }
    }

    /// Outer form every scored program is wrapped in
    pub fn form(&self) -> &str {
        &self.form
    }

    /// Wrap every program scored by later plays in `form`
    pub fn set_form(&mut self, form: impl Into<String>) {
        self.form = form.into();
    }

    /// Score programs unwrapped again
    pub fn clear_form(&mut self) {
        self.form.clear();
    }

    /// Evolve a population seeded with `seeds` and return the hall of fame,
    /// lowest cost first
    ///
    /// `seeds` is read oldest first: when it holds more programs than the
    /// population, only the newest `population_size` are used. The rest of
    /// the population is filled with ramped random programs. The play ends after
    /// the configured number of generations or as soon as the context's stop
    /// flag is raised.
    pub fn play<R: Rng>(
        &self,
        seeds: &[Vec<usize>],
        ctx: &SearchContext,
        rng: &mut R,
    ) -> Vec<Vec<usize>> {
        let fitness = ProgramFitness::new(
            &self.grammar,
            self.constraints,
            ctx,
            &self.form,
            self.discount,
        );
        let mut population = self.initial_population(seeds, rng);
        population.evaluate_parallel(&fitness);

        let mut hall_of_fame = HallOfFame::new(self.hall_of_fame_size);
        hall_of_fame.update(&population);

        let termination: AnyOf<Program> = AnyOf::new(vec![
            Box::new(StopRequested),
            Box::new(MaxGenerations::new(self.generations)),
        ]);

        loop {
            let state = EvolutionState {
                generation: population.generation(),
                evaluations: ctx.evaluations(),
                best_cost: hall_of_fame.best().map_or(f64::INFINITY, |b| b.cost()),
                stop_requested: ctx.should_stop(),
                population: &population,
            };
            if let Some(reason) = termination.triggered(&state) {
                debug!(
                    reason,
                    generation = state.generation,
                    best_cost = state.best_cost,
                    "GA play finished"
                );
                break;
            }

            let mut offspring = self.breed(&population, rng);
            offspring.evaluate_parallel(&fitness);
            hall_of_fame.update(&offspring);
            population = offspring;

            let stats = GenerationStats::from_population(
                &population,
                population.generation(),
                ctx.evaluations(),
            );
            debug!(
                generation = stats.generation,
                best = stats.best_cost,
                mean = stats.mean_cost,
                rejected = stats.rejected,
                "GA generation"
            );
        }

        hall_of_fame
            .genomes()
            .into_iter()
            .map(Program::into_tokens)
            .collect()
    }

    pub(crate) fn initial_population<R: Rng>(&self, seeds: &[Vec<usize>], rng: &mut R) -> Population<Program> {
        let mut population = Population::with_capacity(self.population_size);
        let newest = seeds.len().saturating_sub(self.population_size);
        for seed in &seeds[newest..] {
            population.push(Individual::new(Program::new(seed.clone())));
        }
        let (min_depth, max_depth) = INIT_DEPTH;
        // a grammar whose rules reject every completion leaves the population short
        let mut attempts = 0;
        while population.len() < self.population_size && attempts < 4 * self.population_size {
            attempts += 1;
            if let Some(program) =
                Program::generate_ramped(&self.grammar, &self.constraints, min_depth, max_depth, rng)
            {
                population.push(Individual::new(program));
            }
        }
        population
    }

    /// One generation of offspring; unchanged children keep their parent's cost
    fn breed<R: Rng>(&self, population: &Population<Program>, rng: &mut R) -> Population<Program> {
        let generation = population.generation() + 1;
        let pool = population.as_fitness_pairs();
        let mut offspring = Population::with_capacity(population.len());
        offspring.set_generation(generation);
        if pool.is_empty() {
            return offspring;
        }

        while offspring.len() < population.len() {
            let first = self.selection.select(&pool, rng);
            let second = self.selection.select(&pool, rng);
            let parents = [&pool[first], &pool[second]];

            let mut children = [parents[0].0.clone(), parents[1].0.clone()];
            if rng.gen::<f64>() < self.crossover.crossover_probability() {
                let result = self.crossover.crossover(&parents[0].0, &parents[1].0, rng);
                if let Some((a, b)) = result.genome() {
                    children = [a, b];
                }
            }

            for (mut child, (parent, cost)) in children.into_iter().zip(parents) {
                if offspring.len() >= population.len() {
                    break;
                }
                if rng.gen::<f64>() < self.mutation.mutation_probability() {
                    self.mutation.mutate(&mut child, rng);
                }
                let within_limit = child
                    .height(&self.grammar)
                    .map_or(false, |height| height <= self.max_height);
                let individual = if !within_limit || child == *parent {
                    Individual::scored(parent.clone(), *cost, generation)
                } else {
                    Individual::offspring(child, generation)
                };
                offspring.push(individual);
            }
        }
        offspring
    }
}
