pub mod artifact;
pub mod ingest;
pub mod source;
pub mod train;

mod error;

pub use error::{Error, Result};
pub use ingest::{IngestReport, TableReport};
pub use train::TrainReport;

use std::{hash::Hash, sync::Arc};

use ahash::AHashMap;

use recsync_config::Config;
use recsync_store::DataAccess;

/// Both pipeline stages over one configuration and one store handle.
pub struct SyncService {
	pub cfg: Config,
	pub store: Arc<dyn DataAccess>,
}
impl SyncService {
	pub fn new(cfg: Config, store: Arc<dyn DataAccess>) -> Self {
		Self { cfg, store }
	}
}

/// Collapses records sharing a key to the last occurrence, kept at the first occurrence's
/// position. A single upsert request may not touch the same conflict key twice.
pub fn dedupe_last<T, K, F>(records: Vec<T>, key: F) -> (Vec<T>, usize)
where
	K: Eq + Hash,
	F: Fn(&T) -> K,
{
	let mut positions = AHashMap::with_capacity(records.len());
	let mut kept: Vec<T> = Vec::with_capacity(records.len());
	let mut duplicates = 0;

	for record in records {
		match positions.get(&key(&record)) {
			Some(&position) => {
				kept[position] = record;
				duplicates += 1;
			},
			None => {
				positions.insert(key(&record), kept.len());
				kept.push(record);
			},
		}
	}

	(kept, duplicates)
}
