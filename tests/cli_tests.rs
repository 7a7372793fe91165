use regex::Regex;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

struct TestContext {
    dir: TempDir,
    items_path: PathBuf,
    output_root: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let items_path = dir.path().join("items.txt");
        let output_root = dir.path().join("runs");

        let mut items = File::create(&items_path).unwrap();
        for (value, weight) in [(60, 10), (100, 20), (120, 30), (80, 15), (30, 5), (70, 25)] {
            writeln!(items, "{} {}", value, weight).unwrap();
        }

        Self {
            dir,
            items_path,
            output_root,
        }
    }

    fn run(&self, extra: &[&str]) -> Output {
        let mut args = vec![
            "run",
            "--data",
            self.items_path.to_str().unwrap(),
            "--output-root",
            self.output_root.to_str().unwrap(),
            "--max-weight",
            "50",
            "--seed",
            "11",
        ];
        args.extend_from_slice(extra);
        Command::new(env!("CARGO_BIN_EXE_knapforge"))
            .args(&args)
            .output()
            .expect("Failed to execute binary")
    }

    /// The single job directory created under the output root.
    fn job_dir(&self) -> PathBuf {
        let mut dirs: Vec<PathBuf> = fs::read_dir(&self.output_root)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.is_dir())
            .collect();
        assert_eq!(dirs.len(), 1, "expected one job dir, found {:?}", dirs);
        dirs.remove(0)
    }
}

fn job_id(job_dir: &Path) -> String {
    job_dir.file_name().unwrap().to_string_lossy().to_string()
}

#[test]
fn test_cli_run_writes_report() {
    let ctx = TestContext::new();
    let output = ctx.run(&["--population-size", "8", "--generations", "3"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(stdout.contains("Experiment:"), "stdout: {}", stdout);
    assert!(stdout.contains("Best genome:"), "stdout: {}", stdout);

    let job_dir = ctx.job_dir();
    let id = job_id(&job_dir);
    let pattern = Regex::new(r"^items_txt-roulette-PS8-GW6-GE3-CR0p9-MR0p01-EXP000T\d{4}$").unwrap();
    assert!(pattern.is_match(&id), "job id: {}", id);

    let csv = fs::read_to_string(job_dir.join("output").join(format!("{}.csv", id))).unwrap();
    assert!(csv.contains("#population_size,8"));
    assert!(csv.contains("iteration,best_fitness,best_weight"));
    assert!(job_dir
        .join("logs")
        .join(format!("runtime_experiment_{}.log", id))
        .exists());
    assert!(!job_dir.join("temp").exists());
}

#[test]
fn test_cli_config_file_with_override() {
    let ctx = TestContext::new();
    let config_path = ctx.dir.path().join("experiment.json");
    fs::write(
        &config_path,
        r#"{"population": {"population_size": 6, "generations": 9}, "selection": {"selection_type": "tournament", "tournament_size": 3}}"#,
    )
    .unwrap();

    let output = ctx.run(&["--config", config_path.to_str().unwrap(), "--generations", "2"]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let job_dir = ctx.job_dir();
    let id = job_id(&job_dir);
    let csv = fs::read_to_string(job_dir.join("output").join(format!("{}.csv", id))).unwrap();
    assert!(csv.contains("#population_size,6"), "{}", csv);
    assert!(csv.contains("#generations,2"), "{}", csv);
    assert!(csv.contains("#tournament_size,3"), "{}", csv);
}

#[test]
fn test_cli_inspect_kept_population() {
    let ctx = TestContext::new();
    let output = ctx.run(&[
        "--population-size",
        "4",
        "--generations",
        "2",
        "--commit-mode",
        "atomic",
        "--keep-temp",
    ]);
    assert!(output.status.success());

    let job_dir = ctx.job_dir();
    let id = job_id(&job_dir);
    let inspect = Command::new(env!("CARGO_BIN_EXE_knapforge"))
        .args(["inspect", "--dir"])
        .arg(job_dir.join("temp"))
        .args(["--name", id.as_str()])
        .output()
        .expect("Failed to execute binary");
    let stdout = String::from_utf8_lossy(&inspect.stdout);
    assert!(inspect.status.success(), "stdout: {}", stdout);
    assert!(stdout.contains("uint8"));
    assert!(stdout.contains("non_binary_cells"));
    assert!(stdout.contains("24"), "stdout: {}", stdout);
}

#[test]
fn test_cli_rejects_odd_population() {
    let ctx = TestContext::new();
    let output = ctx.run(&["--population-size", "5"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("even"));
}

#[test]
fn test_cli_missing_data_file() {
    let ctx = TestContext::new();
    fs::remove_file(&ctx.items_path).unwrap();
    let output = ctx.run(&[]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not found"));
}

#[test]
fn test_cli_inspect_missing_array() {
    let ctx = TestContext::new();
    let output = Command::new(env!("CARGO_BIN_EXE_knapforge"))
        .args(["inspect", "--dir"])
        .arg(ctx.dir.path())
        .args(["--name", "ghost"])
        .output()
        .expect("Failed to execute binary");
    assert!(!output.status.success());
}
