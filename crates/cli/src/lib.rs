pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "orderly",
    about = "Orderly operator CLI",
    long_about = "Sync the orders spreadsheet through the intake agent, run migrations, \
                  inspect configuration, and check runtime readiness.",
    after_help = "Examples:\n  orderly sync\n  orderly sync --day friday --days 14\n  orderly sync --review\n  orderly doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Scan the orders sheet and run the agent loop for each date section")]
    Sync {
        #[arg(long, help = "Window size in days (today .. today + days)")]
        days: Option<u32>,
        #[arg(long, help = "Restrict to a single harvest day, e.g. friday")]
        day: Option<String>,
        #[arg(long, help = "Stage review proposals instead of creating orders directly")]
        review: bool,
    },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo catalog into the database")]
    Seed,
    #[command(about = "Inspect effective configuration values with secrets redacted")]
    Config,
    #[command(about = "Validate config, credential readiness, and DB connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Sync { days, day, review } => commands::sync::run(days, day, review),
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
