use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use recsync_service::SyncService;
use recsync_store::StoreClient;

#[derive(Debug, Parser)]
#[command(
	version = recsync_cli::VERSION,
	rename_all = "kebab",
	styles = recsync_cli::styles(),
)]
pub struct Args {
	#[command(flatten)]
	pub config: recsync_cli::ConfigArgs,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = recsync_config::load(&args.config.config)?;

	init_tracing(&config);

	let store = StoreClient::new(&config.store)?;
	let service = SyncService::new(config, Arc::new(store));
	let report = match service.ingest().await {
		Ok(report) => report,
		Err(err) => {
			tracing::error!(
				error = %err,
				committed_batches = err.committed_batches(),
				"Ingestion aborted. Re-running is safe."
			);

			return Err(err.into());
		},
	};

	tracing::info!(
		items = report.items.written,
		links = report.links.written,
		raw_ratings = report.raw_ratings.written,
		interactions = report.interactions.written,
		skipped = report.interactions.skipped,
		null_timestamps = report.null_timestamps,
		artifact = %report.artifact_path.display(),
		"Ingestion complete."
	);

	Ok(())
}

fn init_tracing(config: &recsync_config::Config) {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();
}
