use std::path::PathBuf;

use serde::Deserialize;

/// Bayesian prior weight `m`. Historical runs used 10 through 50; 50 is the value the final
/// training runs settled on and is the only one used here.
pub const PRIOR_WEIGHT: f64 = 50.0;
/// Global mean used when there are no interactions to average.
pub const PRIOR_MEAN: f64 = 3.5;
/// Recommendation list length.
pub const TOP_N: usize = 20;
/// Whether an interaction row with a missing or unparseable timestamp is dropped.
/// When false the row is kept with a null timestamp.
pub const REQUIRE_TIMESTAMP: bool = false;
/// Decimal places kept on published scores.
pub const SCORE_DECIMALS: u32 = 5;
pub const DEFAULT_BATCH_SIZE: usize = 1_000;
pub const MIN_BATCH_SIZE: usize = 1;
pub const DEFAULT_PAGE_SIZE: usize = 5_000;
pub const DEFAULT_TIMEOUT_MS: u64 = 120_000;

pub const ENV_STORE_URL: &str = "STORE_URL";
pub const ENV_STORE_API_KEY: &str = "STORE_API_KEY";
pub const ENV_STORE_BEARER_TOKEN: &str = "STORE_BEARER_TOKEN";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
	#[serde(default)]
	pub service: Service,
	#[serde(default)]
	pub store: Store,
	#[serde(default)]
	pub tables: Tables,
	#[serde(default)]
	pub conflict_keys: ConflictKeys,
	#[serde(default)]
	pub ingest: Ingest,
	#[serde(default)]
	pub train: Train,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Service {
	pub log_level: String,
}
impl Default for Service {
	fn default() -> Self {
		Self { log_level: "info".to_string() }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Store {
	pub url: String,
	pub api_key: String,
	/// Falls back to `api_key` when absent.
	pub bearer_token: Option<String>,
	pub rest_path: String,
	pub timeout_ms: u64,
	pub page_size: usize,
}
impl Store {
	pub fn bearer_token(&self) -> &str {
		self.bearer_token.as_deref().unwrap_or(&self.api_key)
	}
}
impl Default for Store {
	fn default() -> Self {
		Self {
			url: String::new(),
			api_key: String::new(),
			bearer_token: None,
			rest_path: "/rest/v1".to_string(),
			timeout_ms: DEFAULT_TIMEOUT_MS,
			page_size: DEFAULT_PAGE_SIZE,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Tables {
	pub items: String,
	pub links: String,
	/// Mirror of the source ratings as read, keeping the `rating` column name.
	pub raw_ratings: String,
	pub interactions: String,
	pub recommendations: String,
}
impl Default for Tables {
	fn default() -> Self {
		Self {
			items: "raw_items".to_string(),
			links: "raw_links".to_string(),
			raw_ratings: "raw_ratings".to_string(),
			interactions: "processed_interactions".to_string(),
			recommendations: "recommendations".to_string(),
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ConflictKeys {
	pub items: String,
	pub links: String,
	pub raw_ratings: String,
	pub interactions: String,
	pub recommendations: String,
}
impl Default for ConflictKeys {
	fn default() -> Self {
		Self {
			items: "item_id".to_string(),
			links: "item_id".to_string(),
			raw_ratings: "user_id,item_id".to_string(),
			interactions: "user_id,item_id".to_string(),
			recommendations: "user_id".to_string(),
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Ingest {
	pub items_path: PathBuf,
	pub links_path: PathBuf,
	pub ratings_path: PathBuf,
	/// Canonical `user_id,item_id,value,ts` file shared with the training stage.
	pub artifact_path: PathBuf,
	pub require_timestamp: bool,
	pub batch_size: usize,
	pub min_batch_size: usize,
}
impl Default for Ingest {
	fn default() -> Self {
		Self {
			items_path: PathBuf::from("data/movies.csv"),
			links_path: PathBuf::from("data/links.csv"),
			ratings_path: PathBuf::from("data/ratings.csv"),
			artifact_path: PathBuf::from("output/interaction_log_processed.csv"),
			require_timestamp: REQUIRE_TIMESTAMP,
			batch_size: DEFAULT_BATCH_SIZE,
			min_batch_size: MIN_BATCH_SIZE,
		}
	}
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum InteractionSource {
	#[default]
	Store,
	Artifact,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Train {
	pub source: InteractionSource,
	pub prior_weight: f64,
	pub prior_mean: f64,
	pub top_n: usize,
	pub score_decimals: u32,
	pub batch_size: usize,
	pub min_batch_size: usize,
	/// Optional `item_id,count,mean,score` export.
	pub stats_path: Option<PathBuf>,
}
impl Default for Train {
	fn default() -> Self {
		Self {
			source: InteractionSource::default(),
			prior_weight: PRIOR_WEIGHT,
			prior_mean: PRIOR_MEAN,
			top_n: TOP_N,
			score_decimals: SCORE_DECIMALS,
			batch_size: DEFAULT_BATCH_SIZE,
			min_batch_size: MIN_BATCH_SIZE,
			stats_path: None,
		}
	}
}
