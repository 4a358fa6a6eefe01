pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod entities;
pub mod scheduler;
pub mod services;
pub mod state;

use std::sync::Arc;
use tokio::signal;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands, PlatformMailerCommands};
pub use config::Config;
use scheduler::Scheduler;
use state::SharedState;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if matches!(cli.command, Some(Commands::Init)) {
        if Config::create_default_if_missing()? {
            println!("✓ Config file created. Edit config.toml and run again.");
        } else {
            println!("config.toml already exists, leaving it untouched.");
        }
        return Ok(());
    }

    let config = Config::load()?;
    config.validate()?;

    let prometheus_handle = if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        Some(handle)
    } else {
        None
    };

    init_tracing(&config)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server(config, prometheus_handle).await,
        Commands::Init => Ok(()),
        Commands::Reconcile => cli::cmd_reconcile(&config).await,
        Commands::PlatformMailer { command } => match command {
            PlatformMailerCommands::Initialize(args) => {
                cli::cmd_platform_mailer_set(&config, args, false).await
            }
            PlatformMailerCommands::Replace(args) => {
                cli::cmd_platform_mailer_set(&config, args, true).await
            }
            PlatformMailerCommands::Show => cli::cmd_platform_mailer_show(&config).await,
        },
    }
}

fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let mut builder = tracing_loki::builder();
        for (key, value) in &config.observability.loki_labels {
            builder = builder.label(key.as_str(), value.as_str())?;
        }
        let (layer, task) = builder.build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    Ok(())
}

async fn run_server(
    config: Config,
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> anyhow::Result<()> {
    info!("Xyno v{} starting...", env!("CARGO_PKG_VERSION"));

    let port = config.server.port;
    let shared = Arc::new(SharedState::new(config.clone()).await?);

    let scheduler = Arc::new(Scheduler::new(
        shared.reconcile.clone(),
        config.delivery.clone(),
    ));
    let scheduler_handle = {
        let sched = Arc::clone(&scheduler);
        tokio::spawn(async move {
            if let Err(e) = sched.start().await {
                error!("Scheduler error: {}", e);
            }
        })
    };

    let api_state = api::create_app_state(shared, prometheus_handle);
    let app = api::router(api_state).await?;
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(event = "server_started", port, "API listening on http://{addr}");

    let server = axum::serve(listener, app).with_graceful_shutdown(async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => error!("Error listening for shutdown: {}", e),
        }
    });

    if let Err(e) = server.await {
        error!("Web server error: {}", e);
    }

    scheduler.stop().await;
    if let Err(e) = scheduler_handle.await {
        error!("Scheduler task failed: {}", e);
    }
    info!("Server stopped");

    Ok(())
}
