//! Forchette - CLI and HTTP server for restaurant-rating dinner sessions.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use forchette::{AppState, SessionService, Settings, SqliteStore};
use forchette_core::{ResetMode, SessionSnapshot};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so command output on stdout stays parseable JSON.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Command::Schema = cli.command {
        return print_json(&schemars::schema_for!(SessionSnapshot));
    }

    let settings = Settings::load(&cli.config)?.override_db_path(cli.db_path);
    debug!(?settings, "Settings resolved");

    let store = SqliteStore::open(settings.db_path().clone())?;
    let service =
        SessionService::new(Arc::new(store)).with_conflict_retries(*settings.conflict_retries());

    match cli.command {
        Command::Serve { host, port } => {
            run_server(service, settings.override_bind(host, port)).await
        }
        command => {
            tokio::task::spawn_blocking(move || run_command(&service, &settings, command)).await?
        }
    }
}

/// Runs the HTTP server until Ctrl+C.
#[instrument(skip_all, fields(host = %settings.host(), port = settings.port()))]
async fn run_server(service: SessionService, settings: Settings) -> Result<()> {
    info!("Starting forchette HTTP server");
    let state = AppState::new(service, settings.draft_config());
    forchette::serve(state, settings.host(), *settings.port()).await?;
    Ok(())
}

/// Runs a one-shot store command and prints its result.
#[instrument(skip(service, settings))]
fn run_command(service: &SessionService, settings: &Settings, command: Command) -> Result<()> {
    match command {
        Command::Create {
            session,
            owner,
            config,
        } => {
            let config = config.apply_to(settings.draft_config());
            print_json(&service.create_session(&session, owner, config)?)
        }
        Command::Configure { session, config } => {
            let draft = service.get(&session)?.config;
            print_json(&service.configure(&session, config.apply_to(draft))?)
        }
        Command::Start { session } => print_json(&service.start_session(&session)?),
        Command::Vote {
            session,
            round,
            participant,
            food,
            service: service_score,
            location,
            bill,
            bonus,
        } => {
            let request =
                cli::vote_request(round, participant, food, service_score, location, bill, bonus);
            let (_, vote) = service.submit_vote(&session, request)?;
            print_json(&vote)
        }
        Command::Status { session } => print_json(&service.get(&session)?),
        Command::Ranking { session } => print_json(&service.get_ranking(&session)?),
        Command::Slot { session } => print_json(&service.get_current_slot(&session)?),
        Command::Reveal { session } => print_json(&service.reveal_next(&session)?),
        Command::Reset { session, fresh } => {
            let mode = if fresh {
                ResetMode::FreshDefaults
            } else {
                ResetMode::KeepConfig
            };
            print_json(&service.reset_session(&session, mode)?)
        }
        Command::List => print_json(&service.list()?),
        Command::Serve { .. } | Command::Schema => Ok(()),
    }
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
