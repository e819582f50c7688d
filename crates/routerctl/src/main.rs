mod cli;
mod handlers;
mod output;
mod utils;

use clap::Parser;

use cli::{Cli, Command};
use output::OutputFormat;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let format = OutputFormat::from_json_flag(cli.json);

    match cli.command {
        Command::Version => handlers::handle_version(),
        command => handlers::handle_router(command, cli.connection, format).await,
    }
}
