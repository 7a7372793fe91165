use crate::config::ExperimentConfig;
use chrono::{DateTime, Local};

/// File naming conventions for one job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NamingScheme;

impl NamingScheme {
    /// Array Store name of the population (`{job}.dat` + `{job}.json`).
    pub fn population_array(&self, job_id: &str) -> String {
        job_id.to_string()
    }

    /// Array Store name of the children buffer (`child_{job}.dat` + `.json`).
    pub fn children_array(&self, job_id: &str) -> String {
        format!("child_{}", job_id)
    }

    pub fn csv_file(&self, job_id: &str) -> String {
        format!("{}.csv", job_id)
    }

    pub fn log_file(&self, job_id: &str) -> String {
        format!("runtime_experiment_{}.log", job_id)
    }
}

/// Builds a descriptive, minute/second-stamped experiment id, e.g.
/// `knap_1_100-roulette-PS100-GW100-GE50-CR0p9-MR0p01-EXP001T0412`.
pub fn experiment_name(config: &ExperimentConfig, genome_length: usize, now: DateTime<Local>) -> String {
    let data_stem = std::path::Path::new(&config.data.data_filename)
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let parts = [
        sanitize(&data_stem),
        config.selection.selection_type.to_string(),
        format!("PS{}", config.population.population_size),
        format!("GW{}", genome_length),
        format!("GE{}", config.population.generations),
        format!("CR{}", probability_tag(config.operators.crossover_probability)),
        format!("MR{}", probability_tag(config.operators.mutation_probability)),
        format!(
            "EXP{:03}T{}",
            config.experiment.experiment_identifier,
            now.format("%M%S")
        ),
    ];
    parts.join("-")
}

fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_run = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    out
}

fn probability_tag(p: f64) -> String {
    format!("{}", p).replace('.', "p")
}
