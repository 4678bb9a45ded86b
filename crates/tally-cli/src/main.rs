//! Tally CLI - Rule-based Monzo transaction tagging
//!
//! Usage:
//!   tally init                           Initialize database
//!   tally tags add '#online' EXPR        Define a tag
//!   tally apply '#online'                Tag matching transactions
//!   tally bucket weekday                 Tag transactions by weekday
//!   tally history                        Show past tagging runs

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Status => commands::cmd_status(&cli.db, cli.no_encrypt),
        Commands::Accounts => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_accounts(&db).await
        }
        Commands::Summary { account } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_summary(&db, account.as_deref()).await
        }
        Commands::Tags { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None => commands::cmd_tags_list(&db),
                Some(TagsAction::Add { label, expression }) => {
                    commands::cmd_tags_add(&db, &label, &expression)
                }
                Some(TagsAction::Edit { label, expression }) => {
                    commands::cmd_tags_edit(&db, &label, &expression)
                }
                Some(TagsAction::Delete { label }) => commands::cmd_tags_delete(&db, &label),
            }
        }
        Commands::Apply { tag, account } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_apply(&db, &tag, account.as_deref()).await
        }
        Commands::Bucket { period, account } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_bucket(&db, &period, account.as_deref()).await
        }
        Commands::History { limit } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_history(&db, limit)
        }
    }
}
