// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
mod cli;
mod dispatch;
mod turn;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};
use dispatch::Repl;
use ikigai_runtime::Paths;
use ikigai_store::{AgentRow, AgentStatus, Store};

#[tokio::main]
async fn main() {
    match run().await {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            eprintln!("ikigai: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    let paths = Paths::resolve();

    if let Some(cmd) = &cli.command {
        match cmd {
            Commands::Completions { shell } => {
                cli::print_completions(*shell);
                return Ok(());
            }
            Commands::ShowConfig => {
                let config = ikigai_config::load(&paths).context("failed to load config")?;
                println!("{}", serde_json::to_string_pretty(&config)?);
                return Ok(());
            }
        }
    }

    let config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config at {}", path.display()))?;
            let config: ikigai_config::Config =
                serde_json::from_str(&text).with_context(|| format!("failed to parse config at {}", path.display()))?;
            config.validate().context("config failed validation")?;
            config
        }
        None => ikigai_config::load(&paths).context("failed to load config")?,
    };
    let credentials = ikigai_config::load_credentials(&paths);

    let database_url = format!(
        "postgres://{user}:{password}@{host}:{port}/{name}",
        user = config.db_user,
        password = config.db_password,
        host = config.db_host,
        port = config.db_port,
        name = config.db_name,
    );
    let store = Store::connect(&database_url, &paths.migrations_dir())
        .await
        .context("failed to connect to the store")?;

    let session_id = match store.sessions.find_open().await? {
        Some(id) => {
            tracing::info!(session_id = id, "resuming open session");
            id
        }
        None => {
            let id = store.sessions.open().await?;
            tracing::info!(session_id = id, "opened new session");
            id
        }
    };

    let root_uuid = find_or_create_root(&store, session_id, &config).await?;
    let tools = ikigai_tools::ToolCatalog::discover(&paths).context("failed to discover tools")?;
    let policy = ikigai_tools::ToolPolicy::default();

    let mut repl = Repl::new(store, session_id, paths, credentials, config, tools, policy, root_uuid).await?;
    let result = repl.run().await;
    repl.shutdown().await?;
    result
}

/// Find the session's root agent (the one with no parent), or create one
/// seeded from `config`'s default provider/model.
async fn find_or_create_root(
    store: &Store,
    session_id: i64,
    config: &ikigai_config::Config,
) -> anyhow::Result<String> {
    for row in store.registry.list_all(session_id).await? {
        if row.parent_uuid.is_none() {
            return Ok(row.uuid);
        }
    }

    let uuid = dispatch::new_agent_uuid();
    store
        .registry
        .insert(&AgentRow {
            uuid: uuid.clone(),
            name: None,
            parent_uuid: None,
            created_at: chrono::Utc::now().timestamp(),
            fork_message_id: 0,
            status: AgentStatus::Running,
            ended_at: None,
            idle: false,
            session_id,
        })
        .await?;
    tracing::info!(agent_uuid = %uuid, model = %config.openai_model, "created root agent");
    Ok(uuid)
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("IKIGAI_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}
