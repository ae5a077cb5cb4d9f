mod error;
mod memory;
mod server;

pub use error::{Error, Result};
pub use memory::{MemoryStore, ReadCall, Rejection, UpsertCall};
pub use server::{FakeStoreServer, REST_PATH, RecordedRequest};

use serde_json::Value;

use recsync_store::Row;

pub const TEST_API_KEY: &str = "test-anon-key";

/// Store settings pointing at `url` with the test credential and a short timeout.
pub fn store_config(url: &str) -> recsync_config::Store {
	recsync_config::Store {
		url: url.trim_end_matches('/').to_string(),
		api_key: TEST_API_KEY.to_string(),
		bearer_token: None,
		rest_path: REST_PATH.to_string(),
		timeout_ms: 5_000,
		page_size: 100,
	}
}

/// Turns `json!` objects into table rows. Non-object values are skipped.
pub fn rows(values: impl IntoIterator<Item = Value>) -> Vec<Row> {
	values
		.into_iter()
		.filter_map(|value| match value {
			Value::Object(map) => Some(map),
			_ => None,
		})
		.collect()
}
