use std::path::PathBuf;

use clap::builder::{
	Styles,
	styling::{AnsiColor, Effects},
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The single flag both stages accept. Everything else comes from the config file.
#[derive(Clone, Debug, clap::Args)]
pub struct ConfigArgs {
	/// TOML config file; `STORE_URL`, `STORE_API_KEY` and `STORE_BEARER_TOKEN` override it.
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Cyan.on_default() | Effects::BOLD | Effects::UNDERLINE)
		.usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
		.literal(AnsiColor::Yellow.on_default())
		.placeholder(AnsiColor::White.on_default() | Effects::ITALIC)
		.error(AnsiColor::Red.on_default() | Effects::BOLD)
		.valid(AnsiColor::Green.on_default())
		.invalid(AnsiColor::Magenta.on_default() | Effects::BOLD)
}
