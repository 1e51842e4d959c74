mod config_commands;

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    porter_auto_reply::SessionStore,
    porter_config::PorterConfig,
    porter_gateway::AppState,
    porter_telegram::{AccountStateMap, TelegramAccountConfig},
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use crate::config_commands::ConfigAction;

#[derive(Parser)]
#[command(name = "porter", version, about = "Porter: password-gated Telegram responder")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Address to bind the liveness endpoint to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port for the liveness endpoint (overrides config and `PORT`).
    #[arg(long, global = true)]
    port: Option<u16>,
    /// Explicit config file (skips discovery).
    #[arg(long, global = true, env = "PORTER_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot and the liveness endpoint (default when no subcommand is provided).
    Run,
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Apply `--bind` / `--port` on top of file and environment settings.
fn apply_cli_overrides(config: &mut PorterConfig, cli: &Cli) {
    if let Some(ref bind) = cli.bind {
        config.server.bind = bind.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
}

#[cfg(unix)]
async fn shutdown_signal() -> anyhow::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res.context("waiting for Ctrl-C")?;
            info!("received SIGINT, shutting down");
        },
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> anyhow::Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    info!("received Ctrl-C, shutting down");
    Ok(())
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut config = porter_config::discover_and_load(cli.config.as_deref())
        .context("failed to load configuration")?;
    apply_cli_overrides(&mut config, cli);

    // Refuse to start without both secrets.
    let creds = porter_config::credentials(&config)?;
    for d in porter_config::validate(&config).diagnostics {
        if d.severity == porter_config::Severity::Warning {
            warn!(path = d.path, "{}", d.message);
        }
    }

    #[cfg(feature = "metrics")]
    let metrics_handle = porter_metrics::init_metrics(porter_metrics::MetricsRecorderConfig {
        enabled: config.metrics.enabled,
        global_labels: vec![("account".into(), config.telegram.account_id.clone())],
    })?;

    let sessions = Arc::new(SessionStore::new(creds.password));
    let accounts: AccountStateMap = Arc::new(std::sync::RwLock::new(HashMap::new()));
    let tg_config = TelegramAccountConfig {
        poll_timeout_secs: config.telegram.poll_timeout_secs,
        register_commands: config.telegram.register_commands,
        ..TelegramAccountConfig::new(creds.bot_token)
    };

    let polling = porter_telegram::start_polling(
        config.telegram.account_id.clone(),
        tg_config,
        accounts,
        Arc::clone(&sessions),
    )
    .await
    .context("failed to connect to Telegram")?;

    let shutdown = CancellationToken::new();
    let state = AppState::new(env!("CARGO_PKG_VERSION"));
    #[cfg(feature = "metrics")]
    let state = state.with_metrics(metrics_handle);

    let bind = config.server.bind.clone();
    let port = config.server.port;
    let gateway_shutdown = shutdown.clone();
    let mut gateway = tokio::spawn(async move {
        porter_gateway::start_gateway(&bind, port, state, gateway_shutdown).await
    });

    let mut poll_task = polling.task;
    let outcome = tokio::select! {
        res = shutdown_signal() => res,
        res = &mut poll_task => match res {
            Ok(()) => Err(anyhow::anyhow!("telegram polling stopped")),
            Err(e) => Err(anyhow::Error::new(e).context("polling task panicked")),
        },
        res = &mut gateway => match res {
            Ok(Ok(())) => Err(anyhow::anyhow!("liveness endpoint exited unexpectedly")),
            Ok(Err(e)) => Err(e),
            Err(e) => Err(anyhow::Error::new(e).context("liveness task panicked")),
        },
    };

    polling.cancel.cancel();
    shutdown.cancel();
    if !poll_task.is_finished() {
        let _ = poll_task.await;
    }
    if !gateway.is_finished() {
        let _ = gateway.await;
    }

    let snapshot = sessions.snapshot();
    info!(
        active = snapshot.active,
        authorized = snapshot.authorized,
        "porter stopped"
    );
    outcome
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    match cli.command {
        None | Some(Commands::Run) => {
            info!(version = env!("CARGO_PKG_VERSION"), "porter starting");
            run(&cli).await
        },
        Some(Commands::Config { ref action }) => {
            config_commands::handle_config(action, cli.config.as_deref())
        },
    }
}
