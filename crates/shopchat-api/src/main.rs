//! Shopchat server and CLI entry point.
//!
//! Binary name: `shopchat`
//!
//! Resolves the data directory and configuration, sets up tracing, then
//! dispatches to a CLI command or starts the chat server.

mod cli;
mod http;
mod state;

use std::path::PathBuf;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands, ConversationCommand};
use shopchat_infra::config::{apply_env_overrides, load_config, resolve_data_dir};
use shopchat_observe::tracing_setup::{init_tracing, shutdown_tracing};
use shopchat_types::config::AppConfig;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need config or state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "shopchat", &mut std::io::stdout());
        return Ok(());
    }

    let data_dir = resolve_data_dir();
    let mut config = load_config(&data_dir).await;
    apply_env_overrides(&mut config)?;

    let (otel, json_logs) = match &cli.command {
        Commands::Serve {
            otel, json_logs, ..
        } => (*otel, *json_logs),
        _ => (false, false),
    };
    let filter = cli::default_filter(&cli.command, cli.verbose, &config.log_level);
    init_tracing(otel, json_logs, &filter).map_err(|e| anyhow::anyhow!("{e}"))?;

    let result = run(cli, data_dir, config).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli, data_dir: PathBuf, mut config: AppConfig) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve { host, port, .. } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            serve(data_dir, config).await?;
        }

        Commands::Sweep { days } => {
            let (pool, service) = state::open_chat_service(&data_dir).await?;
            let days = days.unwrap_or(config.retention_days);
            let result = cli::maintenance::sweep(&service, days, cli.json).await;
            pool.close().await;
            result?;
        }

        Commands::Conversations { action } => {
            let (pool, service) = state::open_chat_service(&data_dir).await?;
            let result = match action {
                ConversationCommand::List { owner } => {
                    let owner = owner.unwrap_or(config.default_owner_id);
                    cli::conversations::list_conversations(
                        &service,
                        owner,
                        config.max_conversations_per_user,
                        cli.json,
                    )
                    .await
                }
                ConversationCommand::Delete { id } => {
                    cli::conversations::delete_conversation(&service, id, cli.json).await
                }
            };
            pool.close().await;
            result?;
        }

        Commands::Config => {
            cli::config::show_config(&config, &data_dir, cli.json)?;
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

async fn serve(data_dir: PathBuf, config: AppConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::init(data_dir, config).await?;

    if let Err(e) =
        cli::maintenance::run_maintenance(&state.chat_service, state.config.retention_days).await
    {
        tracing::warn!(error = %e, "Startup maintenance failed");
    }

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, model = %state.config.model, "Shopchat listening");

    println!(
        "  {} Shopchat listening on {}",
        console::style("⚡").bold(),
        console::style(format!("http://{addr}")).cyan()
    );
    println!("  {}", console::style("Press Ctrl+C to stop").dim());

    let db_pool = state.db_pool.clone();
    let router = http::router::build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db_pool.close().await;
    println!("\n  Server stopped.");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
