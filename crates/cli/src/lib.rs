pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "facturador",
    about = "Facturador operator CLI",
    long_about = "Operate the quote service: preflight checks, migrations, demo data, API tokens, and config inspection.",
    after_help = "Examples:\n  facturador doctor --json\n  facturador issue-token --user ana --tenant tenant-demo\n  facturador next-number --tenant tenant-demo"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run startup preflight checks and return structured status output")]
    Start,
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo tenant and clients and issue a demo bearer token")]
    Seed {
        #[arg(long, help = "Skip issuing a bearer token for the demo user")]
        no_token: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, database connectivity, migrations, and emission setup")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Issue an API bearer token; the raw value is printed once")]
    IssueToken {
        #[arg(long, help = "User id the token authenticates as")]
        user: String,
        #[arg(long, help = "Tenant the user belongs to")]
        tenant: Option<String>,
        #[arg(long, help = "Free-form label stored with the token")]
        label: Option<String>,
    },
    #[command(about = "Preview the next quote number for a tenant without reserving it")]
    NextNumber {
        #[arg(long, help = "Tenant id")]
        tenant: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Start => commands::start::run(),
        Command::Migrate => commands::migrate::run(),
        Command::Seed { no_token } => commands::seed::run(no_token),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::IssueToken { user, tenant, label } => {
            commands::issue_token::run(&user, tenant.as_deref(), label.as_deref())
        }
        Command::NextNumber { tenant } => commands::next_number::run(&tenant),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
