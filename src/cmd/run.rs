use super::init_tracing;
use crate::reports;
use chrono::Local;
use clap::{ArgMatches, Args};
use fastrand::Rng;
use knapforge::config::ExperimentConfig;
use knapforge::error::KfResult;
use knapforge::items::ItemTable;
use knapforge::optimizer::{EvolutionRunner, GenerationSummary};
use knapforge::output::{experiment_metadata, ExperimentCsv};
use knapforge::storage::{experiment_name, ExperimentStorage, StorageLayout};
use std::path::Path;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// JSON experiment config. Explicit command-line flags override its values.
    #[arg(long = "config")]
    pub config_file: Option<String>,

    #[command(flatten)]
    pub config: ExperimentConfig,
}

pub fn run(args: RunArgs, matches: &ArgMatches) -> KfResult<()> {
    let config = match &args.config_file {
        Some(path) => {
            let mut file_config = ExperimentConfig::load_from_file(path)?;
            file_config.merge_from_cli(&args.config, matches);
            file_config
        }
        None => args.config.clone(),
    };
    config.validate()?;

    let items = ItemTable::load_from_file(&config.data.data_filename)?;
    let job_id = experiment_name(&config, items.len(), Local::now());
    let layout = StorageLayout::new(Path::new(&config.storage.output_root).join(&job_id));
    let storage = ExperimentStorage::new(layout, job_id.as_str());
    storage.ensure_storage_exists()?;

    init_tracing(config.experiment.log_level, Some(&storage.log_path()))?;
    info!("Experiment {}", job_id);
    info!(
        "Loaded {} items (total weight {}) from {}",
        items.len(),
        items.weight_sum(),
        config.data.data_filename
    );

    let csv_path = storage.csv_path();
    let csv = ExperimentCsv::create(&csv_path, &experiment_metadata(&job_id, &config))?;

    let mut rng = match config.experiment.seed {
        Some(s) => Rng::with_seed(s),
        None => Rng::new(),
    };

    let result = EvolutionRunner::new(config, items, storage)?
        .with_csv(csv)
        .run(&mut rng, |_: &GenerationSummary| true)?;

    reports::print_run_summary(&result, &csv_path);
    Ok(())
}
