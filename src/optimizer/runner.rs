use super::reproduction::{pair_parents, reproduce, ReproductionParams};
use super::selection::SelectionStrategy;
use super::summary::GenerationSummary;
use crate::config::ExperimentConfig;
use crate::error::KfResult;
use crate::items::ItemTable;
use crate::memory::MemoryPolicy;
use crate::output::ExperimentCsv;
use crate::population::{ManagerParams, PopulationManager};
use crate::scorer::{FitnessEvaluator, FitnessMatrix};
use crate::storage::ExperimentStorage;
use fastrand::Rng;
use std::time::Instant;
use tracing::{debug, info};

/// Receives each generation's summary.
/// Boolean return value indicates if the run should continue (true) or abort (false).
pub trait ProgressCallback {
    fn on_generation(&mut self, summary: &GenerationSummary) -> bool;
}

impl<F> ProgressCallback for F
where
    F: FnMut(&GenerationSummary) -> bool,
{
    fn on_generation(&mut self, summary: &GenerationSummary) -> bool {
        self(summary)
    }
}

pub struct EvolutionResult {
    pub job_id: String,
    pub summaries: Vec<GenerationSummary>,
    pub final_fitness: FitnessMatrix,
    pub aborted: bool,
}

impl EvolutionResult {
    pub fn last(&self) -> Option<&GenerationSummary> {
        self.summaries.last()
    }
}

pub struct EvolutionRunner {
    config: ExperimentConfig,
    evaluator: FitnessEvaluator,
    storage: ExperimentStorage,
    selection: SelectionStrategy,
    reproduction: ReproductionParams,
    csv: Option<ExperimentCsv>,
}

impl EvolutionRunner {
    pub fn new(config: ExperimentConfig, items: ItemTable, storage: ExperimentStorage) -> KfResult<Self> {
        config.validate()?;
        let evaluator = FitnessEvaluator::from_config(items, &config);
        let selection = SelectionStrategy::from(&config.selection);
        let reproduction = ReproductionParams::from(&config);
        Ok(Self {
            config,
            evaluator,
            storage,
            selection,
            reproduction,
            csv: None,
        })
    }

    /// Streams every generation summary into `csv` as well.
    pub fn with_csv(mut self, csv: ExperimentCsv) -> Self {
        self.csv = Some(csv);
        self
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    fn manager_params(&self) -> KfResult<ManagerParams> {
        let items = self.evaluator.items();
        let probability = self.config.initial_gene_probability(items.weight_sum())?;
        Ok(ManagerParams::builder()
            .population_size(self.config.population.population_size)
            .genome_length(items.len())
            .stream_batch_size(self.config.population.stream_batch_size)
            .initial_gene_probability(probability)
            .commit_mode(self.config.storage.commit_mode)
            .memory(MemoryPolicy::from(&self.config.storage))
            .build())
    }

    pub fn run<CB: ProgressCallback>(mut self, rng: &mut Rng, mut callback: CB) -> KfResult<EvolutionResult> {
        let start_time = Instant::now();
        let pop_size = self.config.population.population_size;
        let generations = self.config.population.generations;

        let mut manager = PopulationManager::new(self.manager_params()?, self.storage.clone())?;
        manager.init_pop_and_children(rng)?;

        let mut fitness = self.evaluator.evaluate(manager.population()?)?;
        let mut summaries = Vec::with_capacity(generations + 1);
        let mut aborted = false;

        let first = GenerationSummary::from_fitness(0, &fitness, manager.population()?)?;
        if !self.record(first, &mut summaries, &mut callback)? {
            aborted = true;
        }

        for generation in 1..=generations {
            if aborted {
                break;
            }
            let selected = self.selection.select(&fitness, pop_size, rng)?;
            let pairs = pair_parents(&selected, rng)?;
            {
                let (population, children) = manager.buffers_mut()?;
                reproduce(population, children, &pairs, &self.reproduction, rng)?;
            }
            manager.commit_reproduction_of_population()?;
            debug!("Generation {} committed", generation);

            fitness = self.evaluator.evaluate(manager.population()?)?;
            let summary = GenerationSummary::from_fitness(generation, &fitness, manager.population()?)?;
            if !self.record(summary, &mut summaries, &mut callback)? {
                info!("Run aborted by callback after generation {}", generation);
                aborted = true;
            }
        }

        manager.close()?;
        if let Some(csv) = self.csv.take() {
            csv.finish()?;
        }
        if !self.config.storage.keep_temp {
            self.storage.remove_temp_data()?;
        }

        info!(
            "Finished {} generation(s) in {:.2}s",
            summaries.len().saturating_sub(1),
            start_time.elapsed().as_secs_f32()
        );
        Ok(EvolutionResult {
            job_id: self.storage.job_id().to_string(),
            summaries,
            final_fitness: fitness,
            aborted,
        })
    }

    fn record<CB: ProgressCallback>(
        &mut self,
        summary: GenerationSummary,
        summaries: &mut Vec<GenerationSummary>,
        callback: &mut CB,
    ) -> KfResult<bool> {
        info!(
            "Gen {:>4} | best {} (w {}) | avg {:.2} | worst {} (w {}) | x{}",
            summary.iteration,
            summary.best_fitness,
            summary.best_weight,
            summary.avg_fitness,
            summary.worst_fitness,
            summary.worst_weight,
            summary.identical_best_count
        );
        if let Some(csv) = self.csv.as_mut() {
            csv.write_summary(&summary)?;
        }
        let keep_going = callback.on_generation(&summary);
        summaries.push(summary);
        Ok(keep_going)
    }
}
