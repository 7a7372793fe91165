pub mod inspect;
pub mod run;

use knapforge::config::LogLevel;
use knapforge::error::KfResult;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Installs the global fmt subscriber, teeing into `log_file` when given.
pub fn init_tracing(level: LogLevel, log_file: Option<&Path>) -> KfResult<()> {
    let builder = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::from(level))
        .with_target(false);

    let installed = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .with_ansi(false)
                .with_writer(std::io::stderr.and(Mutex::new(file)))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    if let Err(e) = installed {
        eprintln!("⚠️  Logging already initialized: {}", e);
    }
    Ok(())
}
