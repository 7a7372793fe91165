//! Per-experiment CSV report: `#key,value` metadata, a blank line, then one
//! row per generation.

use crate::config::{ExperimentConfig, SelectionKind};
use crate::error::{KfResult, KnapForgeError};
use crate::optimizer::GenerationSummary;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const HEADERS: [&str; 8] = [
    "iteration",
    "best_fitness",
    "best_weight",
    "avg_fitness",
    "worst_fitness",
    "worst_weight",
    "identical_best_count",
    "genome_of_best_individual",
];

pub struct ExperimentCsv {
    writer: csv::Writer<File>,
    path: PathBuf,
    rows: usize,
}

impl ExperimentCsv {
    /// Creates the file and writes the metadata block and header.
    pub fn create<P: AsRef<Path>>(path: P, metadata: &[(String, String)]) -> KfResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_path(&path)?;

        for (key, value) in metadata {
            writer.write_record([format!("#{}", key).as_str(), value.as_str()])?;
        }
        writer.flush()?;
        (&mut writer.get_ref()).write_all(b"\n")?;
        writer.write_record(HEADERS)?;
        writer.flush()?;

        Ok(Self {
            writer,
            path,
            rows: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_written(&self) -> usize {
        self.rows
    }

    pub fn write_row(&mut self, fields: &[String]) -> KfResult<()> {
        if fields.len() != HEADERS.len() {
            return Err(KnapForgeError::Validation(format!(
                "CSV row has {} fields, header has {}",
                fields.len(),
                HEADERS.len()
            )));
        }
        self.writer.write_record(fields)?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    pub fn write_summary(&mut self, s: &GenerationSummary) -> KfResult<()> {
        self.write_row(&[
            s.iteration.to_string(),
            s.best_fitness.to_string(),
            s.best_weight.to_string(),
            s.avg_fitness.to_string(),
            s.worst_fitness.to_string(),
            s.worst_weight.to_string(),
            s.identical_best_count.to_string(),
            s.genome.clone(),
        ])
    }

    pub fn finish(mut self) -> KfResult<()> {
        self.writer.flush()?;
        debug!("Wrote {} generation rows to {}", self.rows, self.path.display());
        Ok(())
    }
}

/// Run parameters recorded at the top of the report.
pub fn experiment_metadata(job_id: &str, config: &ExperimentConfig) -> Vec<(String, String)> {
    let mut meta = vec![
        ("job_id", job_id.to_string()),
        ("data_filename", config.data.data_filename.clone()),
        ("population_size", config.population.population_size.to_string()),
        ("generations", config.population.generations.to_string()),
        ("max_weight", config.data.max_weight.to_string()),
        (
            "seed",
            config
                .experiment
                .seed
                .map(|s| s.to_string())
                .unwrap_or_else(|| "none".to_string()),
        ),
        ("selection_type", config.selection.selection_type.to_string()),
        ("crossover_type", config.operators.crossover_type.to_string()),
        (
            "crossover_probability",
            config.operators.crossover_probability.to_string(),
        ),
        (
            "mutation_probability",
            config.operators.mutation_probability.to_string(),
        ),
        ("penalty_multiplier", config.effective_penalty().to_string()),
        (
            "experiment_identifier",
            config.experiment.experiment_identifier.to_string(),
        ),
        ("log_level", config.experiment.log_level.to_string()),
    ];
    match config.selection.selection_type {
        SelectionKind::Tournament => {
            meta.push(("tournament_size", config.selection.tournament_size.to_string()))
        }
        SelectionKind::LinearRank => meta.push((
            "selection_pressure",
            config.selection.selection_pressure.to_string(),
        )),
        SelectionKind::Roulette => {}
    }
    meta.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}
