use std::path::PathBuf;

use time::OffsetDateTime;

use crate::{Result, SyncService, artifact};
use recsync_config::InteractionSource;
use recsync_domain::{
	BayesianSmoother, ItemRecord, LinkRecord, MetadataIndex, NormalizePolicy, NormalizeStats,
	Normalizer, RawRow, RecommendationBuilder, ScoreAggregate, normalize,
};
use recsync_store::{AdaptiveBulkWriter, PaginatedReader};

const INTERACTION_FIELDS: &str = "user_id,item_id,value";
const ITEM_FIELDS: &str = "item_id,title";
const LINK_FIELDS: &str = "item_id,tmdb_id";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrainReport {
	pub rows_read: usize,
	pub skipped: u64,
	pub interactions: u64,
	pub users: usize,
	pub items: usize,
	pub global_mean: f64,
	pub recommendations: usize,
	pub written: usize,
	pub batches: usize,
	pub shrinks: usize,
	pub stats_path: Option<PathBuf>,
}

impl SyncService {
	/// Rebuilds every user's list from the full interaction set and upserts it.
	pub async fn train(&self, generated_at: OffsetDateTime) -> Result<TrainReport> {
		let cfg = &self.cfg;
		let rows = self.load_interactions().await?;
		// The store projection carries no timestamp, so it can never be required here.
		let mut normalizer = Normalizer::new(NormalizePolicy { require_timestamp: false });
		let records = normalizer.normalize_all(&rows);
		let stats = normalizer.into_stats();
		let mut report =
			TrainReport { rows_read: rows.len(), skipped: stats.skipped, ..TrainReport::default() };

		if records.is_empty() {
			tracing::warn!(rows = rows.len(), "No usable interactions. Nothing to write.");

			return Ok(report);
		}

		let aggregate = ScoreAggregate::from_records(&records);
		let smoother = BayesianSmoother::for_aggregate(
			&aggregate,
			cfg.train.prior_weight,
			cfg.train.prior_mean,
		);
		let ranking = smoother.rank(&aggregate);

		report.interactions = aggregate.interaction_count();
		report.users = aggregate.user_count();
		report.items = aggregate.item_count();
		report.global_mean = smoother.global_mean();

		tracing::info!(
			interactions = report.interactions,
			users = report.users,
			items = report.items,
			global_mean = report.global_mean,
			prior_weight = smoother.prior_weight(),
			"Aggregated interactions."
		);

		let metadata = self.load_metadata().await?;
		let builder = RecommendationBuilder::new(
			&ranking,
			&metadata,
			cfg.train.top_n,
			cfg.train.score_decimals,
		);
		let recommendations = builder.build_all(&aggregate, generated_at);

		report.recommendations = recommendations.len();

		if let Some(path) = &cfg.train.stats_path {
			artifact::write_stats(path, &ranking, cfg.train.score_decimals)?;

			report.stats_path = Some(path.clone());
		}

		let written = AdaptiveBulkWriter::new(&*self.store, cfg.train.min_batch_size)
			.write(
				&cfg.tables.recommendations,
				&recommendations,
				&cfg.conflict_keys.recommendations,
				cfg.train.batch_size,
			)
			.await?;

		report.written = written.written;
		report.batches = written.batches;
		report.shrinks = written.shrinks;

		tracing::info!(
			recommendations = report.recommendations,
			written = report.written,
			batches = report.batches,
			"Training run complete."
		);

		Ok(report)
	}

	async fn load_interactions(&self) -> Result<Vec<RawRow>> {
		match self.cfg.train.source {
			InteractionSource::Store =>
				Ok(self.read_table(&self.cfg.tables.interactions, INTERACTION_FIELDS).await?),
			InteractionSource::Artifact =>
				artifact::read_interactions(&self.cfg.ingest.artifact_path),
		}
	}

	async fn load_metadata(&self) -> Result<MetadataIndex> {
		let item_rows = self.read_table(&self.cfg.tables.items, ITEM_FIELDS).await?;
		let link_rows = self.read_table(&self.cfg.tables.links, LINK_FIELDS).await?;
		let mut stats = NormalizeStats::default();
		let items: Vec<ItemRecord> = item_rows
			.iter()
			.filter_map(|row| stats.observe(normalize::item_from_row(row)))
			.collect();
		let links: Vec<LinkRecord> = link_rows
			.iter()
			.filter_map(|row| stats.observe(normalize::link_from_row(row)))
			.collect();
		let metadata = MetadataIndex::from_parts(&items, &links);

		tracing::info!(
			items = items.len(),
			links = links.len(),
			skipped = stats.skipped,
			"Loaded item metadata."
		);

		Ok(metadata)
	}

	async fn read_table(&self, table: &str, fields: &str) -> recsync_store::Result<Vec<RawRow>> {
		PaginatedReader::new(&*self.store, self.cfg.store.page_size).read_all(table, fields).await
	}
}
