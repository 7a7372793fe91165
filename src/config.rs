use crate::error::{KfResult, KnapForgeError};
use clap::{parser::ValueSource, ArgMatches, Args, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use strum_macros::{Display, EnumIter, EnumString};

/// Largest chunk of rows streamed through a kernel in one step.
pub const MAX_STREAM_BATCH: usize = 10_000;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, EnumIter, ValueEnum, Serialize, Deserialize,
)]
pub enum SelectionKind {
    #[default]
    #[strum(serialize = "roulette")]
    #[value(name = "roulette")]
    #[serde(rename = "roulette")]
    Roulette,
    #[strum(serialize = "tournament")]
    #[value(name = "tournament")]
    #[serde(rename = "tournament")]
    Tournament,
    #[strum(serialize = "rank")]
    #[value(name = "rank")]
    #[serde(rename = "rank")]
    LinearRank,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, EnumIter, ValueEnum, Serialize, Deserialize,
)]
pub enum CrossoverKind {
    #[default]
    #[strum(serialize = "one")]
    #[value(name = "one")]
    #[serde(rename = "one")]
    OnePoint,
    #[strum(serialize = "two")]
    #[value(name = "two")]
    #[serde(rename = "two")]
    TwoPoint,
}

/// How children are promoted to population at the end of a generation.
///
/// `Auto` flips in-memory buffers and atomically replaces disk-mapped ones.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, EnumIter, ValueEnum, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CommitMode {
    #[default]
    Auto,
    Flip,
    Atomic,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, EnumIter, ValueEnum, Serialize, Deserialize,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warning => tracing::Level::WARN,
            LogLevel::Error | LogLevel::Critical => tracing::Level::ERROR,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExperimentConfig {
    #[command(flatten)]
    pub data: DataParams,
    #[command(flatten)]
    pub population: PopulationParams,
    #[command(flatten)]
    pub selection: SelectionParams,
    #[command(flatten)]
    pub operators: OperatorParams,
    #[command(flatten)]
    pub storage: StorageParams,
    #[command(flatten)]
    pub experiment: ExperimentParams,
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataParams {
    /// Item file with one `<value> <weight>` pair per line.
    #[arg(long = "data", default_value = "data/items.txt")]
    pub data_filename: String,
    #[arg(long, default_value_t = 1000)]
    pub max_weight: i64,
}

impl Default for DataParams {
    fn default() -> Self {
        Self {
            data_filename: "data/items.txt".to_string(),
            max_weight: 1000,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationParams {
    #[arg(long, default_value_t = 100)]
    pub population_size: usize,
    #[arg(long, default_value_t = 100)]
    pub generations: usize,
    #[arg(long, default_value_t = 500)]
    pub stream_batch_size: usize,
}

impl Default for PopulationParams {
    fn default() -> Self {
        Self {
            population_size: 100,
            generations: 100,
            stream_batch_size: 500,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionParams {
    #[arg(long, value_enum, default_value_t = SelectionKind::Roulette)]
    pub selection_type: SelectionKind,
    #[arg(long, default_value_t = 5)]
    pub tournament_size: usize,
    #[arg(long, default_value_t = 1.5)]
    pub selection_pressure: f64,
}

impl Default for SelectionParams {
    fn default() -> Self {
        Self {
            selection_type: SelectionKind::Roulette,
            tournament_size: 5,
            selection_pressure: 1.5,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorParams {
    #[arg(long, value_enum, default_value_t = CrossoverKind::OnePoint)]
    pub crossover_type: CrossoverKind,
    #[arg(long, default_value_t = 0.9)]
    pub crossover_probability: f64,
    #[arg(long, default_value_t = 0.01)]
    pub mutation_probability: f64,
    #[arg(long, default_value_t = 1.0)]
    pub penalty_multiplier: f64,
    /// Overweight solutions score 0 instead of being penalized.
    #[arg(long, default_value_t = false)]
    pub strict_weight_constraints: bool,
}

impl Default for OperatorParams {
    fn default() -> Self {
        Self {
            crossover_type: CrossoverKind::OnePoint,
            crossover_probability: 0.9,
            mutation_probability: 0.01,
            penalty_multiplier: 1.0,
            strict_weight_constraints: false,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageParams {
    #[arg(long, value_enum, default_value_t = CommitMode::Auto)]
    pub commit_mode: CommitMode,
    /// Share of currently available RAM a single population buffer may take.
    #[arg(long, default_value_t = 0.2)]
    pub ram_fraction: f64,
    #[arg(long)]
    pub hard_max_ram_bytes: Option<u64>,
    #[arg(long, default_value = "experiments")]
    pub output_root: String,
    #[arg(long, default_value_t = false)]
    pub keep_temp: bool,
}

impl Default for StorageParams {
    fn default() -> Self {
        Self {
            commit_mode: CommitMode::Auto,
            ram_fraction: 0.2,
            hard_max_ram_bytes: None,
            output_root: "experiments".to_string(),
            keep_temp: false,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExperimentParams {
    #[arg(long)]
    pub seed: Option<u64>,
    #[arg(long, default_value_t = 0)]
    pub experiment_identifier: u32,
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

impl ExperimentConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> KfResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(KnapForgeError::not_found(path));
        }
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Overlays every argument the user typed explicitly onto `self`.
    pub fn merge_from_cli(&mut self, cli: &ExperimentConfig, matches: &ArgMatches) {
        macro_rules! update_if_present {
            ($group:ident . $field:ident, $arg_name:expr) => {
                if matches.value_source($arg_name) == Some(ValueSource::CommandLine) {
                    self.$group.$field = cli.$group.$field.clone();
                }
            };
        }

        update_if_present!(data.data_filename, "data_filename");
        update_if_present!(data.max_weight, "max_weight");

        update_if_present!(population.population_size, "population_size");
        update_if_present!(population.generations, "generations");
        update_if_present!(population.stream_batch_size, "stream_batch_size");

        update_if_present!(selection.selection_type, "selection_type");
        update_if_present!(selection.tournament_size, "tournament_size");
        update_if_present!(selection.selection_pressure, "selection_pressure");

        update_if_present!(operators.crossover_type, "crossover_type");
        update_if_present!(operators.crossover_probability, "crossover_probability");
        update_if_present!(operators.mutation_probability, "mutation_probability");
        update_if_present!(operators.penalty_multiplier, "penalty_multiplier");
        update_if_present!(operators.strict_weight_constraints, "strict_weight_constraints");

        update_if_present!(storage.commit_mode, "commit_mode");
        update_if_present!(storage.ram_fraction, "ram_fraction");
        update_if_present!(storage.hard_max_ram_bytes, "hard_max_ram_bytes");
        update_if_present!(storage.output_root, "output_root");
        update_if_present!(storage.keep_temp, "keep_temp");

        update_if_present!(experiment.seed, "seed");
        update_if_present!(experiment.experiment_identifier, "experiment_identifier");
        update_if_present!(experiment.log_level, "log_level");
    }

    pub fn validate(&self) -> KfResult<()> {
        let pop = &self.population;
        if pop.population_size < 2 || pop.population_size % 2 != 0 {
            return Err(KnapForgeError::Config(format!(
                "Population size must be even and at least 2, got {}",
                pop.population_size
            )));
        }
        if pop.generations < 1 {
            return Err(KnapForgeError::Config(
                "Generations must be greater than 0".into(),
            ));
        }
        if pop.stream_batch_size < 1 || pop.stream_batch_size > MAX_STREAM_BATCH {
            return Err(KnapForgeError::Config(format!(
                "Stream batch size must be in [1, {}], got {}",
                MAX_STREAM_BATCH, pop.stream_batch_size
            )));
        }
        if self.data.max_weight <= 0 {
            return Err(KnapForgeError::Config(
                "Max weight must be greater than 0".into(),
            ));
        }

        let ops = &self.operators;
        check_probability("crossover_probability", ops.crossover_probability)?;
        check_probability("mutation_probability", ops.mutation_probability)?;
        if !(ops.penalty_multiplier >= 0.0) || !ops.penalty_multiplier.is_finite() {
            return Err(KnapForgeError::Config(format!(
                "Penalty multiplier must be a finite value >= 0, got {}",
                ops.penalty_multiplier
            )));
        }

        let sel = &self.selection;
        match sel.selection_type {
            SelectionKind::LinearRank => {
                if !(1.0..=2.0).contains(&sel.selection_pressure) {
                    return Err(KnapForgeError::Config(format!(
                        "Selection pressure must be in range [1.0, 2.0], got {}",
                        sel.selection_pressure
                    )));
                }
            }
            SelectionKind::Tournament => {
                if !(2..=10).contains(&sel.tournament_size) {
                    return Err(KnapForgeError::Config(format!(
                        "Tournament size must be in range [2, 10], got {}",
                        sel.tournament_size
                    )));
                }
            }
            SelectionKind::Roulette => {}
        }

        let fraction = self.storage.ram_fraction;
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(KnapForgeError::Config(format!(
                "RAM fraction must be in (0, 1], got {}",
                fraction
            )));
        }
        Ok(())
    }

    /// Penalty actually applied by the scorer; 0 means hard cutoff.
    pub fn effective_penalty(&self) -> f64 {
        if self.operators.strict_weight_constraints {
            0.0
        } else {
            self.operators.penalty_multiplier
        }
    }

    /// Probability of a gene starting as 1, biased towards feasible knapsacks.
    pub fn initial_gene_probability(&self, weight_sum: i64) -> KfResult<f64> {
        if weight_sum < 1 {
            return Err(KnapForgeError::Validation(format!(
                "Weight sum must be greater than 0, got {}",
                weight_sum
            )));
        }
        let p = self.data.max_weight as f64 / weight_sum as f64;
        Ok(p.clamp(0.0, 1.0))
    }
}

fn check_probability(name: &str, value: f64) -> KfResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(KnapForgeError::Config(format!(
            "{} must be between 0 and 1, got {}",
            name, value
        )));
    }
    Ok(())
}
