//! fashionlens
//!
//! Classifies fashion product photos into category, sub-type, and brand,
//! either through the web form or from the command line.

use anyhow::{Context, Result};
use clap::Parser;
use fashionlens_classifiers::ClassificationCascade;
use fashionlens_server::{run_server, AppState, Cli, Commands, ServeArgs, ServerConfig};
use std::net::SocketAddr;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => serve(args).await,
        Commands::Classify {
            classifiers,
            json,
            verbose,
            images,
        } => {
            init_tracing(verbose);

            let cascade = ClassificationCascade::from_file(&classifiers)
                .with_context(|| format!("Failed to load classifiers from {}", classifiers.display()))?;

            for image in &images {
                let result = cascade
                    .classify_path(image)
                    .with_context(|| format!("Failed to classify {}", image.display()))?;

                if json {
                    println!("{}", serde_json::to_string(&result)?);
                } else {
                    println!("{}\t{}", image.display(), result.label());
                }
            }
            Ok(())
        }
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    init_tracing(args.verbose);

    info!("Starting fashionlens");

    // Load configuration
    let config = ServerConfig::load(&args.config, &args)?;
    info!("Upload directory: {}", config.upload_dir.display());
    info!("Classifiers: {}", config.classifiers_config.display());

    // Load every classifier before accepting requests
    info!("Loading classifier cascade...");
    let state = AppState::load(config).context("Failed to load classifier cascade")?;
    let registry = state.cascade.registry();
    info!(
        "Cascade ready: {} classifiers, sub-types for {}/{} categories",
        registry.count(),
        registry.subtype_count(),
        fashionlens_core::Category::ALL.len()
    );

    let addr: SocketAddr = format!("{}:{}", args.listen, args.port).parse()?;

    let shutdown = async {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping server...");
    };

    run_server(state, addr, shutdown).await
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("fashionlens=debug,fashionlens_server=debug,fashionlens_classifiers=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("fashionlens=info,fashionlens_server=info,fashionlens_classifiers=info,tower_http=warn")
        })
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
