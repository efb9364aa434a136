#[macro_use]
mod errors;
mod assistant;
mod command;
mod repl;
mod session;
mod sql;
mod storage;

use clap::Parser;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(
    name = "minisql",
    version = VERSION,
    about = "Tiny single-file SQL database."
)]
struct Cli {
    /// Path to the database file.
    filename: PathBuf,
    /// File receiving debug logs; stdout stays reserved for the REPL.
    #[arg(long, env = "MINISQL_LOG", default_value = "minisql.log")]
    log_file: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    match OpenOptions::new()
        .append(true)
        .create(true)
        .open(&cli.log_file)
    {
        Ok(file) => {
            tracing_subscriber::fmt()
                .with_writer(file)
                .with_ansi(false)
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
                )
                .init();
        }
        Err(e) => eprintln!("Failed to open log file: {}", e),
    }

    if let Err(e) = repl::console::start(&cli.filename) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
