use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = recsync_train::Args::parse();
	recsync_train::run(args).await
}
