//! Flowkeeper CLI - versioned, checksum-verified backups of Node-RED flows
//!
//! This is the main entry point for the flowkeeper command-line interface.

mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    if let Err(e) = run(cli).await {
        output::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let tools = commands::open_tools(cli.config.as_deref(), cli.backup_path, cli.flow_file)?;
    let json = cli.json;

    match cli.command {
        Commands::Create(args) => commands::backup::create(&tools, args, json).await,
        Commands::List(args) => commands::backup::list(&tools, args, json).await,
        Commands::Get(args) => commands::backup::get(&tools, args, json).await,
        Commands::Health => commands::backup::health(&tools, json).await,
        Commands::Delete(args) => commands::backup::delete(&tools, args, json).await,
        Commands::Restore(args) => commands::backup::restore(&tools, args, json).await,
        Commands::Migrate(args) => commands::backup::migrate(&tools, args, json).await,
        Commands::Tool(args) => commands::tool::run(&tools, args).await,
    }
}

/// Initialize tracing on stderr so stdout stays machine-readable
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
