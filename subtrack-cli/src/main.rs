//! Subtrack CLI - subscription ledger in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

mod commands;
mod output;

use commands::{
    create, delete, get, list, logs, total_cost, update, CommandError, SubscriptionArgs,
};

/// Subtrack - track subscriptions and what they cost
#[derive(Parser)]
#[command(name = "subs", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a subscription
    Create {
        #[command(flatten)]
        args: SubscriptionArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a subscription by id
    Get {
        /// Subscription ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replace a subscription's fields
    Update {
        /// Subscription ID
        id: String,
        #[command(flatten)]
        args: SubscriptionArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a subscription
    Delete {
        /// Subscription ID
        id: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List all subscriptions, most recent start first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sum prices of subscriptions active during a period
    TotalCost {
        /// First month of the period, MM-YYYY
        #[arg(long)]
        period_start: Option<String>,
        /// Last month of the period, MM-YYYY (defaults to 12-2100)
        #[arg(long)]
        period_end: Option<String>,
        /// Only count this user's subscriptions
        #[arg(long)]
        user_id: Option<String>,
        /// Only count subscriptions to this service
        #[arg(long)]
        service_name: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    fn wants_json(&self) -> bool {
        match self {
            Commands::Create { json, .. }
            | Commands::Get { json, .. }
            | Commands::Update { json, .. }
            | Commands::Delete { json, .. }
            | Commands::List { json }
            | Commands::TotalCost { json, .. } => *json,
            Commands::Logs { command } => match command {
                logs::LogsCommands::List { json, .. }
                | logs::LogsCommands::Clear { json, .. }
                | logs::LogsCommands::Stats { json } => *json,
            },
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let json = cli.command.wants_json();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => ExitCode::from(report(&e, json)),
    }
}

/// How a failed command is reported
struct Failure {
    code: u8,
    message: String,
    detail: Option<String>,
}

impl Failure {
    fn from_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<CommandError>() {
            Some(e) => Self {
                code: e.exit_code,
                message: e.message.to_string(),
                detail: e.detail.clone(),
            },
            None => match err.downcast_ref::<subtrack_core::Error>() {
                Some(core) if core.kind() == subtrack_core::ErrorKind::Config => Self {
                    code: commands::EXIT_CONFIG,
                    message: "Invalid configuration".to_string(),
                    detail: Some(format!("{:#}", err)),
                },
                _ => Self {
                    code: 1,
                    message: err.to_string(),
                    detail: Some(format!("{:#}", err)),
                },
            },
        }
    }

    /// JSON error body; never includes the detail
    fn json_body(&self) -> String {
        serde_json::json!({ "error": self.message }).to_string()
    }
}

/// Print the error and pick the exit code
fn report(err: &anyhow::Error, json: bool) -> u8 {
    let failure = Failure::from_error(err);

    if json {
        println!("{}", failure.json_body());
    } else {
        output::error(&failure.message);
        if let Some(detail) = failure.detail.filter(|d| *d != failure.message) {
            eprintln!("{}", detail.dimmed());
        }
    }
    failure.code
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Create { args, json } => create::run(args, json),
        Commands::Get { id, json } => get::run(&id, json),
        Commands::Update { id, args, json } => update::run(&id, args, json),
        Commands::Delete { id, force, json } => delete::run(&id, force, json),
        Commands::List { json } => list::run(json),
        Commands::TotalCost {
            period_start,
            period_end,
            user_id,
            service_name,
            json,
        } => total_cost::run(period_start, period_end, user_id, service_name, json),
        Commands::Logs { command } => logs::run(command),
    }
}
