use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

mod codec;
mod config;
mod dash;
mod drm;
mod error;
mod fetch;
mod init;
mod mss;
mod proxy;
mod segment;
mod serve;

use config::ConfigStore;
use fetch::Cache;
use serve::AppState;

/// Republish Smooth Streaming channels as MPEG-DASH.
#[derive(Parser, Debug)]
#[command(name = "manifesto")]
struct Cli {
	/// Path to the configuration file
	#[arg(long, default_value = "config.json")]
	config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| "info".into()),
		)
		.init();

	let cli = Cli::parse();

	let config = ConfigStore::load(&cli.config).context("failed to load config")?;
	config.watch();

	let client = proxy::build_client(&config.get()).context("failed to build HTTP client")?;

	let cache = Cache::new(config.clone(), client);
	cache.clean_dir().context("failed to clean cache directory")?;
	cache.spawn_sweeper();

	let (log, log_worker) = serve::log::start(config.clone());

	let state = Arc::new(AppState { config, cache, log });

	serve::run(state.clone()).await?;

	// Let the log worker drain before exiting.
	drop(state);
	let _ = log_worker.await;

	Ok(())
}
