use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use std::process;

mod cmd;
mod reports;

#[derive(Parser, Debug)]
#[command(author, version, about = "Genetic knapsack solver with a disk-backed population store", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one experiment and write its CSV report.
    Run(cmd::run::RunArgs),
    /// Validate an array file and print its descriptor.
    Inspect(cmd::inspect::InspectArgs),
}

fn main() {
    // Raw matches tell user-typed values apart from defaults when merging configs.
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    let result = match cli.command {
        Commands::Run(args) => {
            let sub_matches = matches.subcommand_matches("run").unwrap_or(&matches);
            cmd::run::run(args, sub_matches)
        }
        Commands::Inspect(args) => cmd::inspect::run(args),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        eprintln!("\n❌ FATAL ERROR:");
        eprintln!("   {}", e);
        process::exit(1);
    }
}
