//! hivedir CLI entry point.

use clap::Parser;
use hivedir::cli::{commands, Cli, Commands};
use hivedir::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e}");
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use the verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("hivedir=info"),
            2 => EnvFilter::new("hivedir=debug"),
            _ => EnvFilter::new("hivedir=trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli) -> Result<(), Error> {
    match &cli.command {
        Commands::CreateHive { hive_uri } => commands::create_hive::execute(hive_uri),

        Commands::CreateDimension {
            hive_uri,
            dimension_name,
            db_type,
            directory_uri,
        } => commands::create_dimension::execute(
            hive_uri,
            dimension_name,
            *db_type,
            directory_uri.as_deref(),
        ),

        Commands::CreateNode {
            hive_uri,
            dimension_name,
            node_name,
            node_uri,
        } => commands::create_node::execute(hive_uri, dimension_name, node_name, node_uri),
    }
}
