use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = recsync_ingest::Args::parse();
	recsync_ingest::run(args).await
}
