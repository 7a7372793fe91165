use super::init_tracing;
use crate::reports;
use clap::Args;
use knapforge::config::LogLevel;
use knapforge::error::KfResult;
use knapforge::population::GenomeBuffer;
use knapforge::storage::{ArrayStore, OpenMode};
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// Directory holding `<name>.dat` and `<name>.json`.
    #[arg(long)]
    pub dir: PathBuf,

    #[arg(long)]
    pub name: String,
}

pub fn run(args: InspectArgs) -> KfResult<()> {
    init_tracing(LogLevel::Warning, None)?;

    let store = ArrayStore::new(&args.dir);
    let (array, descriptor) = store.load(&args.name, OpenMode::ReadOnly)?;
    let buffer = GenomeBuffer::mapped(array);
    let non_binary = buffer.count_non_binary();

    reports::print_descriptor(&descriptor, non_binary);
    buffer.close()
}
