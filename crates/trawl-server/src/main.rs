// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! trawl server binary.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trawl_aggregate::Aggregator;
use trawl_credentials::{CredentialStore, FileBackend, StoreConfig};
use trawl_search_google_cse::{CseClient, RetryConfig};
use trawl_server::{create_router, jobs::QuotaResetJob, AppState};
use trawl_server_jobs::JobScheduler;

/// trawl - quota-aware search aggregation over a pool of API keys.
#[derive(Parser, Debug)]
#[command(name = "trawl-server", about = "Quota-aware multi-key search aggregation server", version)]
struct Args {
	/// TOML config file; defaults to /etc/trawl/server.toml.
	#[arg(long, env = "TRAWL_SERVER_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version information
	Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!(
			"trawl-server {} ({}-{})",
			env!("CARGO_PKG_VERSION"),
			std::env::consts::OS,
			std::env::consts::ARCH
		);
		return Ok(());
	}

	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => trawl_server_config::load_config_with_file(path)?,
		None => trawl_server_config::load_config()?,
	};

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	tracing::info!(
		host = %config.http.host,
		port = config.http.port,
		store = %config.store.path.display(),
		rotation = %config.aggregate.rotation,
		"starting trawl-server"
	);

	let store = CredentialStore::open(
		Arc::new(FileBackend::new(&config.store.path)),
		StoreConfig {
			default_quota: config.store.default_quota,
			..StoreConfig::default()
		}
		.with_timings(config.store.flush_interval, config.store.quiescence),
	)
	.await?;
	tracing::info!(
		credentials = store.len().await,
		active = store.active_count().await,
		"credential store opened"
	);

	let client = CseClient::with_timeout(config.search.timeout)?
		.with_base_url(config.search.api_url.clone())
		.with_locale(config.search.locale.clone())
		.with_retry_config(RetryConfig::single_attempt().with_max_attempts(config.search.retry_attempts));
	let aggregator = Aggregator::new(store.clone(), client).with_rotation(config.aggregate.rotation);

	let mut scheduler = JobScheduler::default();
	if config.jobs.quota_reset_enabled {
		scheduler.register_daily(
			Arc::new(QuotaResetJob::new(store.clone())),
			config.jobs.quota_reset_at,
		);
	} else {
		tracing::info!("daily quota reset disabled");
	}
	let scheduler = Arc::new(scheduler);
	scheduler.start().await;

	let state = AppState {
		store: store.clone(),
		search: Arc::new(aggregator),
		scheduler: Arc::clone(&scheduler),
		default_count: config.aggregate.default_count,
	};
	let app = create_router(state);

	let addr = config.socket_addr();
	let listener = tokio::net::TcpListener::bind(&addr).await?;
	tracing::info!("listening on {}", addr);

	if let Err(e) = axum::serve(listener, app)
		.with_graceful_shutdown(shutdown_signal())
		.await
	{
		tracing::error!(error = %e, "server error");
	}

	tracing::info!("shutting down job scheduler");
	scheduler.shutdown().await;

	tracing::info!("flushing credential store");
	if let Err(e) = store.shutdown().await {
		tracing::error!(error = %e, "final credential store flush failed");
	}

	tracing::info!("server shutdown complete");
	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			tracing::error!(error = %e, "failed to listen for ctrl-c");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			}
			Err(e) => {
				tracing::error!(error = %e, "failed to listen for SIGTERM");
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

	tracing::info!("received shutdown signal");
}
