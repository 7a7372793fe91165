use fastrand::Rng;
use knapforge::config::{CommitMode, CrossoverKind, ExperimentConfig, SelectionKind};
use knapforge::items::ItemTable;
use knapforge::optimizer::{EvolutionResult, EvolutionRunner, GenerationSummary};
use knapforge::output::{experiment_metadata, ExperimentCsv, HEADERS};
use knapforge::storage::{ExperimentStorage, StorageLayout};
use rstest::rstest;
use std::fs;
use tempfile::TempDir;

fn items() -> ItemTable {
    ItemTable::from_pairs(&[
        (60, 10),
        (100, 20),
        (120, 30),
        (80, 15),
        (30, 5),
        (70, 25),
        (90, 12),
        (40, 8),
    ])
    .unwrap()
}

fn config(mode: CommitMode) -> ExperimentConfig {
    let mut cfg = ExperimentConfig::default();
    cfg.data.max_weight = 50;
    cfg.population.population_size = 12;
    cfg.population.generations = 6;
    cfg.population.stream_batch_size = 5;
    cfg.operators.mutation_probability = 0.05;
    cfg.storage.commit_mode = mode;
    cfg.experiment.seed = Some(1234);
    cfg
}

fn run(dir: &TempDir, cfg: ExperimentConfig, seed: u64) -> EvolutionResult {
    let storage = ExperimentStorage::new(StorageLayout::new(dir.path()), "job");
    storage.ensure_storage_exists().unwrap();
    let mut rng = Rng::with_seed(seed);
    EvolutionRunner::new(cfg, items(), storage)
        .unwrap()
        .run(&mut rng, |_: &GenerationSummary| true)
        .unwrap()
}

#[rstest]
#[case(CommitMode::Flip, SelectionKind::Roulette, CrossoverKind::OnePoint)]
#[case(CommitMode::Atomic, SelectionKind::Tournament, CrossoverKind::TwoPoint)]
#[case(CommitMode::Auto, SelectionKind::LinearRank, CrossoverKind::OnePoint)]
fn test_run_produces_one_summary_per_generation(
    #[case] mode: CommitMode,
    #[case] selection: SelectionKind,
    #[case] crossover: CrossoverKind,
) {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(mode);
    cfg.selection.selection_type = selection;
    cfg.operators.crossover_type = crossover;

    let result = run(&dir, cfg, 7);
    assert!(!result.aborted);
    assert_eq!(result.summaries.len(), 7);
    for (i, s) in result.summaries.iter().enumerate() {
        assert_eq!(s.iteration, i);
        assert_eq!(s.genome.len(), 8);
        assert!(s.best_fitness >= s.worst_fitness);
        assert!(s.identical_best_count >= 1);
        assert!(s.genome.chars().all(|c| c == '0' || c == '1'));
    }
    assert_eq!(result.final_fitness.len(), 12);
    // Temp data is removed unless asked to keep it.
    assert!(!dir.path().join("temp").exists());
}

#[test]
fn test_same_seed_same_history() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    let first = run(&a, config(CommitMode::Flip), 99);
    let second = run(&b, config(CommitMode::Atomic), 99);
    assert_eq!(first.summaries, second.summaries);
}

#[test]
fn test_keep_temp_leaves_population_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(CommitMode::Atomic);
    cfg.storage.keep_temp = true;
    run(&dir, cfg, 3);
    assert!(dir.path().join("temp").join("job.dat").exists());
    assert!(dir.path().join("temp").join("job.json").exists());
}

#[test]
fn test_callback_can_abort() {
    let dir = tempfile::tempdir().unwrap();
    let storage = ExperimentStorage::new(StorageLayout::new(dir.path()), "job");
    let mut rng = Rng::with_seed(5);
    let mut seen = 0;
    let result = EvolutionRunner::new(config(CommitMode::Flip), items(), storage)
        .unwrap()
        .run(&mut rng, |s: &GenerationSummary| {
            seen += 1;
            s.iteration < 2
        })
        .unwrap();
    assert!(result.aborted);
    assert_eq!(result.summaries.len(), 3);
    assert_eq!(seen, 3);
}

#[test]
fn test_csv_report_has_row_per_generation() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(CommitMode::Flip);
    let storage = ExperimentStorage::new(StorageLayout::new(dir.path()), "job");
    storage.ensure_storage_exists().unwrap();
    let csv_path = storage.csv_path();
    let csv = ExperimentCsv::create(&csv_path, &experiment_metadata("job", &cfg)).unwrap();

    let mut rng = Rng::with_seed(1);
    EvolutionRunner::new(cfg, items(), storage)
        .unwrap()
        .with_csv(csv)
        .run(&mut rng, |_: &GenerationSummary| true)
        .unwrap();

    let content = fs::read_to_string(&csv_path).unwrap();
    let mut sections = content.split("\n\n");
    let meta = sections.next().unwrap();
    assert!(meta.lines().all(|l| l.starts_with('#')));
    assert!(meta.contains("#population_size,12"));

    let body: Vec<&str> = sections.next().unwrap().lines().collect();
    assert_eq!(body[0], HEADERS.join(","));
    assert_eq!(body.len(), 1 + 7);
    for line in &body[1..] {
        assert_eq!(line.split(',').count(), HEADERS.len());
    }
}

#[test]
fn test_invalid_config_rejected_before_running() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(CommitMode::Flip);
    cfg.population.population_size = 7;
    let storage = ExperimentStorage::new(StorageLayout::new(dir.path()), "job");
    assert!(EvolutionRunner::new(cfg, items(), storage).is_err());
}
