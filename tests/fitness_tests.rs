use knapforge::config::ExperimentConfig;
use knapforge::error::KnapForgeError;
use knapforge::items::ItemTable;
use knapforge::population::GenomeBuffer;
use knapforge::scorer::{evaluate, FitnessEvaluator};
use rstest::rstest;

fn buffer(rows: usize, cols: usize, data: &[u8]) -> GenomeBuffer {
    let mut buf = GenomeBuffer::in_memory(rows, cols);
    buf.write_rows(0, data).unwrap();
    buf
}

#[test]
fn test_hard_cutoff_zeroes_overweight() {
    let pop = buffer(2, 3, &[1, 0, 1, 1, 1, 1]);
    let fitness = evaluate(&pop, &[5, 5, 5], &[4, 6, 2], 10, 0.0, 500).unwrap();
    assert_eq!(fitness.scores, vec![10, 0]);
    assert_eq!(fitness.weights, vec![6, 12]);
}

#[rstest]
#[case(1.0, 13)]
#[case(2.5, 10)]
#[case(100.0, 0)]
fn test_linear_penalty(#[case] penalty: f64, #[case] expected: i64) {
    // Raw value 15, weight 12 against a cap of 10.
    let pop = buffer(1, 3, &[1, 1, 1]);
    let fitness = evaluate(&pop, &[5, 5, 5], &[4, 6, 2], 10, penalty, 1).unwrap();
    assert_eq!(fitness.scores, vec![expected]);
    assert_eq!(fitness.weights, vec![12]);
}

#[test]
fn test_feasible_rows_keep_raw_score() {
    let pop = buffer(2, 3, &[0, 0, 0, 1, 0, 1]);
    let fitness = evaluate(&pop, &[5, 7, 9], &[1, 1, 1], 10, 3.0, 1).unwrap();
    assert_eq!(fitness.scores, vec![0, 14]);
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(7)]
#[case(500)]
fn test_batch_size_does_not_change_result(#[case] batch: usize) {
    let rows = 7;
    let data: Vec<u8> = (0..rows * 4).map(|i| ((i * 7 + 3) % 5 < 2) as u8).collect();
    let pop = buffer(rows, 4, &data);
    let reference = evaluate(&pop, &[3, 1, 4, 1], &[5, 9, 2, 6], 8, 1.5, rows).unwrap();
    let batched = evaluate(&pop, &[3, 1, 4, 1], &[5, 9, 2, 6], 8, 1.5, batch).unwrap();
    assert_eq!(batched, reference);
    assert_eq!(batched.len(), rows);
}

#[test]
fn test_item_table_width_mismatch() {
    let pop = buffer(1, 3, &[1, 1, 1]);
    assert!(matches!(
        evaluate(&pop, &[1, 2], &[1, 2], 10, 0.0, 1),
        Err(KnapForgeError::Validation(_))
    ));
}

#[test]
fn test_evaluator_uses_strict_constraints() {
    let items = ItemTable::from_pairs(&[(5, 4), (5, 6), (5, 2)]).unwrap();
    let mut cfg = ExperimentConfig::default();
    cfg.data.max_weight = 10;
    cfg.operators.penalty_multiplier = 1.0;
    cfg.operators.strict_weight_constraints = true;

    let evaluator = FitnessEvaluator::from_config(items, &cfg);
    let pop = buffer(2, 3, &[1, 0, 1, 1, 1, 1]);
    let fitness = evaluator.evaluate(&pop).unwrap();
    assert_eq!(fitness.scores, vec![10, 0]);
}
