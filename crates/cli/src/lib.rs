pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "birkbot",
    about = "Birkbot operator CLI",
    long_about = "Apply migrations, inspect configuration, check readiness and refresh stored Birkman core data.",
    after_help = "Examples:\n  birkbot migrate\n  birkbot doctor --json\n  birkbot refresh --birkman-id GTW013"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, database connectivity and the profile schema")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Re-fetch core data from the Birkman API for stored profiles")]
    Refresh {
        #[arg(long, help = "Only refresh this profile (default: every profile)")]
        birkman_id: Option<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Refresh { birkman_id } => commands::refresh::run(birkman_id.as_deref()),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
