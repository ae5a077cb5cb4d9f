mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, ConflictKeys, DEFAULT_BATCH_SIZE, DEFAULT_PAGE_SIZE, DEFAULT_TIMEOUT_MS,
	ENV_STORE_API_KEY, ENV_STORE_BEARER_TOKEN, ENV_STORE_URL, Ingest, InteractionSource,
	MIN_BATCH_SIZE, PRIOR_MEAN, PRIOR_WEIGHT, REQUIRE_TIMESTAMP, SCORE_DECIMALS, Service, Store,
	TOP_N, Tables, Train,
};

use std::{env, fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	load_with_env(path, |name| env::var(name).ok())
}

/// Loads a config file and overlays store credentials from `lookup`, which is consulted for
/// `STORE_URL`, `STORE_API_KEY` and `STORE_BEARER_TOKEN`.
pub fn load_with_env<F>(path: &Path, lookup: F) -> Result<Config>
where
	F: Fn(&str) -> Option<String>,
{
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	apply_env(&mut cfg, lookup);
	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn apply_env<F>(cfg: &mut Config, lookup: F)
where
	F: Fn(&str) -> Option<String>,
{
	let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

	if let Some(url) = non_empty(ENV_STORE_URL) {
		cfg.store.url = url;
	}
	if let Some(api_key) = non_empty(ENV_STORE_API_KEY) {
		cfg.store.api_key = api_key;
	}
	if let Some(token) = non_empty(ENV_STORE_BEARER_TOKEN) {
		cfg.store.bearer_token = Some(token);
	}
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.store.url.trim().is_empty() {
		return Err(Error::MissingSetting { name: "store.url", env: ENV_STORE_URL });
	}
	if cfg.store.api_key.trim().is_empty() {
		return Err(Error::MissingSetting { name: "store.api_key", env: ENV_STORE_API_KEY });
	}
	if !(cfg.store.url.starts_with("http://") || cfg.store.url.starts_with("https://")) {
		return Err(Error::Validation {
			message: "store.url must start with http:// or https://.".to_string(),
		});
	}
	if !cfg.store.rest_path.is_empty() && !cfg.store.rest_path.starts_with('/') {
		return Err(Error::Validation {
			message: "store.rest_path must be empty or start with '/'.".to_string(),
		});
	}
	if cfg.store.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "store.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.store.page_size == 0 {
		return Err(Error::Validation {
			message: "store.page_size must be greater than zero.".to_string(),
		});
	}

	for (label, value) in [
		("tables.items", &cfg.tables.items),
		("tables.links", &cfg.tables.links),
		("tables.raw_ratings", &cfg.tables.raw_ratings),
		("tables.interactions", &cfg.tables.interactions),
		("tables.recommendations", &cfg.tables.recommendations),
		("conflict_keys.items", &cfg.conflict_keys.items),
		("conflict_keys.links", &cfg.conflict_keys.links),
		("conflict_keys.raw_ratings", &cfg.conflict_keys.raw_ratings),
		("conflict_keys.interactions", &cfg.conflict_keys.interactions),
		("conflict_keys.recommendations", &cfg.conflict_keys.recommendations),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	validate_batching("ingest", cfg.ingest.batch_size, cfg.ingest.min_batch_size)?;
	validate_batching("train", cfg.train.batch_size, cfg.train.min_batch_size)?;

	if !cfg.train.prior_weight.is_finite() || cfg.train.prior_weight <= 0.0 {
		return Err(Error::Validation {
			message: "train.prior_weight must be a finite number greater than zero.".to_string(),
		});
	}
	if !cfg.train.prior_mean.is_finite() {
		return Err(Error::Validation {
			message: "train.prior_mean must be a finite number.".to_string(),
		});
	}
	if cfg.train.top_n == 0 {
		return Err(Error::Validation {
			message: "train.top_n must be greater than zero.".to_string(),
		});
	}
	if cfg.train.score_decimals > 12 {
		return Err(Error::Validation {
			message: "train.score_decimals must be 12 or less.".to_string(),
		});
	}

	Ok(())
}

fn validate_batching(section: &str, batch_size: usize, min_batch_size: usize) -> Result<()> {
	if min_batch_size == 0 {
		return Err(Error::Validation {
			message: format!("{section}.min_batch_size must be greater than zero."),
		});
	}
	if batch_size < min_batch_size {
		return Err(Error::Validation {
			message: format!("{section}.batch_size must be at least {section}.min_batch_size."),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.store.url = cfg.store.url.trim().trim_end_matches('/').to_string();
	cfg.store.rest_path = cfg.store.rest_path.trim().trim_end_matches('/').to_string();

	if cfg.store.bearer_token.as_deref().map(|token| token.trim().is_empty()).unwrap_or(false) {
		cfg.store.bearer_token = None;
	}
}
