use std::{hash::Hash, path::PathBuf};

use serde::Serialize;

use crate::{Result, SyncService, artifact, dedupe_last, source};
use recsync_domain::{
	InteractionRecord, ItemRecord, LinkRecord, NormalizePolicy, NormalizeStats, Normalizer,
	RawRatingRecord, RawRow, SkipReason, normalize,
};
use recsync_store::{AdaptiveBulkWriter, DataAccess};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableReport {
	pub table: String,
	pub read: usize,
	pub skipped: u64,
	pub duplicates: usize,
	pub written: usize,
	pub batches: usize,
	pub shrinks: usize,
	/// Row count reported by the store after the write, when it could be read.
	pub remote_count: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct IngestReport {
	pub items: TableReport,
	pub links: TableReport,
	pub raw_ratings: TableReport,
	pub interactions: TableReport,
	pub null_timestamps: u64,
	pub artifact_path: PathBuf,
}

struct Prepared<T> {
	records: Vec<T>,
	report: TableReport,
}

impl SyncService {
	/// Loads the three source files, writes the interaction artifact, then upserts items, links,
	/// the raw rating mirror and interactions. Re-running after a failure is safe: every write is
	/// an upsert.
	pub async fn ingest(&self) -> Result<IngestReport> {
		let cfg = &self.cfg;
		let mut items = prepare(
			&cfg.tables.items,
			source::read_rows(&cfg.ingest.items_path)?,
			normalize::item_from_row,
			|item: &ItemRecord| item.item_id,
		);
		let mut links = prepare(
			&cfg.tables.links,
			source::read_rows(&cfg.ingest.links_path)?,
			normalize::link_from_row,
			|link: &LinkRecord| link.item_id,
		);
		let rating_rows = source::read_rows(&cfg.ingest.ratings_path)?;
		let policy = NormalizePolicy { require_timestamp: cfg.ingest.require_timestamp };
		let mut normalizer = Normalizer::new(policy);
		let interactions = normalizer.normalize_all(&rating_rows);
		let stats = normalizer.into_stats();
		let (interactions, duplicates) = dedupe_last(interactions, |record: &InteractionRecord| {
			(record.user_id, record.item_id)
		});
		let report = TableReport {
			table: cfg.tables.interactions.clone(),
			read: rating_rows.len(),
			skipped: stats.skipped,
			duplicates,
			..TableReport::default()
		};
		let mut raw_ratings = Prepared {
			records: interactions.iter().map(RawRatingRecord::from).collect::<Vec<_>>(),
			report: TableReport { table: cfg.tables.raw_ratings.clone(), ..report.clone() },
		};
		let mut interactions = Prepared { records: interactions, report };

		log_skips(&cfg.tables.interactions, &stats);
		artifact::write_interactions(&cfg.ingest.artifact_path, &interactions.records)?;

		self.upload(&mut items, &cfg.conflict_keys.items).await?;
		self.upload(&mut links, &cfg.conflict_keys.links).await?;
		self.upload(&mut raw_ratings, &cfg.conflict_keys.raw_ratings).await?;
		self.upload(&mut interactions, &cfg.conflict_keys.interactions).await?;

		let report = IngestReport {
			items: items.report,
			links: links.report,
			raw_ratings: raw_ratings.report,
			interactions: interactions.report,
			null_timestamps: stats.null_timestamps,
			artifact_path: cfg.ingest.artifact_path.clone(),
		};

		for table in [&report.items, &report.links, &report.raw_ratings, &report.interactions] {
			tracing::info!(
				table = %table.table,
				read = table.read,
				skipped = table.skipped,
				duplicates = table.duplicates,
				written = table.written,
				remote_count = table.remote_count,
				"Table ingested."
			);
		}

		Ok(report)
	}

	async fn upload<T>(&self, prepared: &mut Prepared<T>, conflict_key: &str) -> Result<()>
	where
		T: Serialize,
	{
		let table = prepared.report.table.clone();
		let written = AdaptiveBulkWriter::new(&*self.store, self.cfg.ingest.min_batch_size)
			.write(&table, &prepared.records, conflict_key, self.cfg.ingest.batch_size)
			.await?;

		prepared.report.written = written.written;
		prepared.report.batches = written.batches;
		prepared.report.shrinks = written.shrinks;
		prepared.report.remote_count = remote_count(&*self.store, &table).await;

		Ok(())
	}
}

fn prepare<T, K, P, F>(table: &str, rows: Vec<RawRow>, parse: P, key: F) -> Prepared<T>
where
	K: Eq + Hash,
	P: Fn(&RawRow) -> Result<T, SkipReason>,
	F: Fn(&T) -> K,
{
	let mut stats = NormalizeStats::default();
	let records = rows.iter().filter_map(|row| stats.observe(parse(row))).collect();
	let (records, duplicates) = dedupe_last(records, key);

	log_skips(table, &stats);

	Prepared {
		records,
		report: TableReport {
			table: table.to_string(),
			read: rows.len(),
			skipped: stats.skipped,
			duplicates,
			..TableReport::default()
		},
	}
}

fn log_skips(table: &str, stats: &NormalizeStats) {
	if stats.skipped == 0 {
		return;
	}

	let reasons = stats
		.reasons
		.iter()
		.map(|(reason, count)| format!("{}={count}", reason.as_str()))
		.collect::<Vec<_>>()
		.join(",");

	tracing::warn!(
		table,
		skipped = stats.skipped,
		reasons = %reasons,
		"Skipped rows during normalisation."
	);
}

async fn remote_count<S>(store: &S, table: &str) -> Option<u64>
where
	S: DataAccess + ?Sized,
{
	match store.count(table).await {
		Ok(count) => count,
		Err(err) => {
			tracing::warn!(table, error = %err, "Failed to count remote rows.");

			None
		},
	}
}
