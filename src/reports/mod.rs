use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use knapforge::optimizer::EvolutionResult;
use knapforge::storage::ArrayDescriptor;
use std::path::Path;

pub fn print_run_summary(result: &EvolutionResult, csv_path: &Path) {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec![
        Cell::new("Gen").add_attribute(Attribute::Bold),
        Cell::new("Best").fg(Color::Green),
        Cell::new("Weight"),
        Cell::new("Avg"),
        Cell::new("Worst").fg(Color::Red),
        Cell::new("Weight"),
        Cell::new("Same"),
    ]);
    for i in 0..=6 {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }

    let first = result.summaries.first();
    let last = result.last();
    for s in first.into_iter().chain(last.filter(|_| result.summaries.len() > 1)) {
        table.add_row(vec![
            Cell::new(s.iteration).add_attribute(Attribute::Bold),
            Cell::new(s.best_fitness).fg(Color::Green),
            Cell::new(s.best_weight),
            Cell::new(format!("{:.2}", s.avg_fitness)),
            Cell::new(s.worst_fitness).fg(Color::Red),
            Cell::new(s.worst_weight),
            Cell::new(s.identical_best_count),
        ]);
    }

    println!("\nExperiment: {}", result.job_id);
    println!("{}", table);
    if let Some(s) = last {
        println!("Best genome: {}", s.genome);
    }
    if result.aborted {
        println!("⚠️  Run stopped early.");
    }
    println!("📄 Report: {}", csv_path.display());
}

pub fn print_descriptor(descriptor: &ArrayDescriptor, non_binary: usize) {
    let mut table = Table::new();
    table.load_preset(ASCII_FULL);

    let rows = [
        ("filename", descriptor.filename.display().to_string()),
        ("data_type", descriptor.data_type.to_string()),
        ("population_size", descriptor.population_size.to_string()),
        ("genome_length", descriptor.genome_length.to_string()),
        ("filesize", descriptor.filesize.to_string()),
        ("non_binary_cells", non_binary.to_string()),
    ];
    for (key, value) in rows {
        let value_cell = if key == "non_binary_cells" && non_binary > 0 {
            Cell::new(value).fg(Color::Red)
        } else {
            Cell::new(value)
        };
        table.add_row(vec![Cell::new(key).add_attribute(Attribute::Bold), value_cell]);
    }
    println!("{}", table);
}
