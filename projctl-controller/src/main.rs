//! projctl-controller: applies the resource templates of ProjectDevelopmentStream
//! objects held in an in-memory store seeded from manifest files.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use projctl_log::Logger;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use projctl_controller::manifest;
use projctl_controller::resource::DESIRED_STATE_KIND;
use projctl_controller::{
    BatchResult, Controller, ControllerConfig, MemoryStore, NamespacedName, StreamReconciler,
    watch_store,
};

/// projctl controller
#[derive(Parser, Debug)]
#[command(name = "projctl-controller", version, about)]
struct Args {
    /// Directory of YAML/JSON manifests used to seed the store
    #[arg(long)]
    manifests: PathBuf,

    /// Reconcile every ProjectDevelopmentStream once, print a JSON report and exit
    #[arg(long)]
    once: bool,

    /// Delay before a requested requeue, in milliseconds
    #[arg(long, default_value = "1000")]
    requeue_delay_ms: u64,

    /// Upper bound of the error backoff, in seconds
    #[arg(long, default_value = "300")]
    max_backoff_secs: u64,

    /// Capacity of the trigger queue
    #[arg(long, default_value = "1024")]
    queue_capacity: usize,
}

impl Args {
    fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            requeue_delay: Duration::from_millis(self.requeue_delay_ms),
            max_backoff: Duration::from_secs(self.max_backoff_secs),
            queue_capacity: self.queue_capacity.max(1),
        }
    }
}

#[derive(Serialize)]
struct StreamReport {
    stream: NamespacedName,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<BatchResult>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "projctl_controller=info,projctl=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    info!("Starting projctl-controller");
    info!("Manifests: {}", args.manifests.display());

    let store = Arc::new(MemoryStore::new());
    let documents = manifest::load_dir(&args.manifests)
        .await
        .with_context(|| format!("loading manifests from {}", args.manifests.display()))?;
    manifest::seed(store.as_ref(), documents)
        .await
        .context("seeding store")?;

    let reconciler = Arc::new(StreamReconciler::new(store.clone(), Logger::tracing()));

    if args.once {
        return run_once(&store, &reconciler).await;
    }

    let config = args.controller_config();
    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::channel(config.queue_capacity);

    let watcher = tokio::spawn(watch_store(store.clone(), tx, cancel.clone()));
    let controller = Controller::new(reconciler, config);
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal"),
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
        shutdown.cancel();
    });

    controller.run(rx, cancel.clone()).await;
    cancel.cancel();
    watcher.await.context("store watcher panicked")?;

    info!("projctl-controller stopped");
    Ok(())
}

async fn run_once(
    store: &MemoryStore,
    reconciler: &StreamReconciler<MemoryStore>,
) -> Result<()> {
    let cancel = CancellationToken::new();
    let mut reports = Vec::new();

    for stored in store.list(DESIRED_STATE_KIND).await {
        let stream = NamespacedName::new(stored.document.namespace(), stored.document.name());
        let report = match reconciler.handle_trigger(&stream, &cancel).await {
            Ok(result) => StreamReport {
                stream,
                error: None,
                result: Some(result),
            },
            Err(e) => StreamReport {
                stream,
                error: Some(e.to_string()),
                result: None,
            },
        };
        reports.push(report);
    }

    let output = serde_json::to_string_pretty(&reports).context("encoding report")?;
    println!("{output}");
    Ok(())
}
