//! # Terminal Operator
//!
//! A Kubernetes operator that reconciles Terminal shop resources against the
//! Terminal API.
//!
//! ## Overview
//!
//! The operator watches eight custom resources in the `coffee.terminal.sh`
//! group and drives each toward its desired state on the service:
//!
//! 1. **Profile** - account profile sync
//! 2. **Address** / **Card** - shipping and payment prerequisites
//! 3. **Token** / **App** - access tokens and OAuth apps
//! 4. **Order** / **Cart** / **Subscription** - purchases, which gate on the
//!    prerequisites above being ready
//!
//! Each kind gets its own controller; resources reconcile independently and
//! in parallel, with serialized delivery per resource. Orders additionally
//! get a fixed-interval drift poll that folds shipment progress back into
//! status.
//!
//! ## Usage
//!
//! Set `TERMINAL_BEARER_TOKEN` (and optionally `TERMINAL_ENVIRONMENT`,
//! `METRICS_PORT`, `ORDER_POLL_INTERVAL_SECONDS`), apply the CRDs from
//! `crdgen`, and run the binary in-cluster or against a local kubeconfig.

use anyhow::{Context as _, Result};
use futures::StreamExt;
use kube::{Api, Client};
use kube_runtime::{watcher, Controller};
use std::sync::Arc;
use tracing::{error, info};

use terminal_operator::config::RuntimeConfig;
use terminal_operator::controller::deps::KubeResolver;
use terminal_operator::controller::{error_policy, reconcile, Context};
use terminal_operator::crd::{Address, App, Card, Cart, Order, Profile, Subscription, Token};
use terminal_operator::metrics;
use terminal_operator::server::{start_server, ServerState};
use terminal_operator::terminal::TerminalClient;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "terminal_operator=info".into()),
        )
        .init();

    info!(
        "Starting Terminal Operator (build {} {})",
        env!("BUILD_GIT_HASH"),
        env!("BUILD_DATETIME")
    );

    let config = RuntimeConfig::from_env().context("Failed to load configuration")?;

    // Initialize metrics
    metrics::register_metrics()?;

    // Start HTTP server for metrics and probes
    let server_state = Arc::new(ServerState {
        is_ready: Arc::new(std::sync::atomic::AtomicBool::new(false)),
    });
    let server_state_clone = Arc::clone(&server_state);
    let metrics_port = config.metrics_port;
    tokio::spawn(async move {
        if let Err(e) = start_server(metrics_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });

    // Create Kubernetes client and the shared reconciler context
    let client = Client::try_default().await?;
    let terminal = TerminalClient::new(config.base_url(), &config.bearer_token)
        .context("Failed to build Terminal API client")?;
    let ctx = Arc::new(Context {
        client: client.clone(),
        terminal: Arc::new(terminal),
        resolver: Arc::new(KubeResolver::new(client.clone())),
        order_poll_interval: config.order_poll_interval,
    });

    info!(
        "Watching Terminal resources in all namespaces (environment: {:?})",
        config.environment
    );

    // Mark as ready
    server_state
        .is_ready
        .store(true, std::sync::atomic::Ordering::Relaxed);

    // One controller per kind; resources of different kinds reconcile in
    // parallel, while delivery per resource identity stays serialized.
    let profiles = Controller::new(Api::<Profile>::all(client.clone()), watcher::Config::default())
        .shutdown_on_signal()
        .run(
            reconcile::profile::reconcile,
            error_policy::<Profile>,
            Arc::clone(&ctx),
        )
        .for_each(|_| std::future::ready(()));

    let addresses = Controller::new(Api::<Address>::all(client.clone()), watcher::Config::default())
        .shutdown_on_signal()
        .run(
            reconcile::address::reconcile,
            error_policy::<Address>,
            Arc::clone(&ctx),
        )
        .for_each(|_| std::future::ready(()));

    let cards = Controller::new(Api::<Card>::all(client.clone()), watcher::Config::default())
        .shutdown_on_signal()
        .run(
            reconcile::card::reconcile,
            error_policy::<Card>,
            Arc::clone(&ctx),
        )
        .for_each(|_| std::future::ready(()));

    let tokens = Controller::new(Api::<Token>::all(client.clone()), watcher::Config::default())
        .shutdown_on_signal()
        .run(
            reconcile::token::reconcile,
            error_policy::<Token>,
            Arc::clone(&ctx),
        )
        .for_each(|_| std::future::ready(()));

    let apps = Controller::new(Api::<App>::all(client.clone()), watcher::Config::default())
        .shutdown_on_signal()
        .run(
            reconcile::app::reconcile,
            error_policy::<App>,
            Arc::clone(&ctx),
        )
        .for_each(|_| std::future::ready(()));

    let carts = Controller::new(Api::<Cart>::all(client.clone()), watcher::Config::default())
        .shutdown_on_signal()
        .run(
            reconcile::cart::reconcile,
            error_policy::<Cart>,
            Arc::clone(&ctx),
        )
        .for_each(|_| std::future::ready(()));

    let subscriptions = Controller::new(
        Api::<Subscription>::all(client.clone()),
        watcher::Config::default(),
    )
    .shutdown_on_signal()
    .run(
        reconcile::subscription::reconcile,
        error_policy::<Subscription>,
        Arc::clone(&ctx),
    )
    .for_each(|_| std::future::ready(()));

    let orders = Controller::new(Api::<Order>::all(client.clone()), watcher::Config::default())
        .shutdown_on_signal()
        .run(
            reconcile::order::reconcile,
            error_policy::<Order>,
            Arc::clone(&ctx),
        )
        .for_each(|_| std::future::ready(()));

    tokio::join!(
        profiles,
        addresses,
        cards,
        tokens,
        apps,
        carts,
        subscriptions,
        orders
    );

    info!("Operator stopped");

    Ok(())
}
