//! The `user_id,item_id,value,ts` interchange file between ingestion and training, and the
//! optional per-item statistics export.

use std::{fs, path::Path};

use serde::Serialize;

use crate::{Error, Result};
use recsync_domain::{InteractionRecord, RawRow, ScoredItem, recommend};

pub const ARTIFACT_HEADER: [&str; 4] = ["user_id", "item_id", "value", "ts"];

#[derive(Serialize)]
struct StatsRow {
	item_id: i64,
	count: u64,
	mean: f64,
	score: f64,
}

/// Writes interactions with a null timestamp as an empty `ts` cell.
pub fn write_interactions(path: &Path, records: &[InteractionRecord]) -> Result<()> {
	let mut writer = open_writer(path)?;

	if records.is_empty() {
		writer.write_record(ARTIFACT_HEADER).map_err(|err| write_error(path, err))?;
	}
	for record in records {
		writer.serialize(record).map_err(|err| write_error(path, err))?;
	}

	writer.flush()?;

	tracing::info!(path = %path.display(), rows = records.len(), "Wrote interaction artifact.");

	Ok(())
}

/// Reads the artifact back as raw rows so it passes through the same normaliser as remote rows.
pub fn read_interactions(path: &Path) -> Result<Vec<RawRow>> {
	crate::source::read_rows(path)
}

pub fn write_stats(path: &Path, ranking: &[ScoredItem], decimals: u32) -> Result<()> {
	let mut writer = open_writer(path)?;
	let mut rows: Vec<&ScoredItem> = ranking.iter().collect();

	rows.sort_by_key(|scored| scored.item_id);

	if rows.is_empty() {
		writer
			.write_record(["item_id", "count", "mean", "score"])
			.map_err(|err| write_error(path, err))?;
	}
	for scored in rows {
		writer
			.serialize(StatsRow {
				item_id: scored.item_id,
				count: scored.count,
				mean: recommend::round_score(scored.mean, decimals),
				score: recommend::round_score(scored.score, decimals),
			})
			.map_err(|err| write_error(path, err))?;
	}

	writer.flush()?;

	tracing::info!(path = %path.display(), items = ranking.len(), "Wrote item statistics.");

	Ok(())
}

fn open_writer(path: &Path) -> Result<csv::Writer<fs::File>> {
	if let Some(parent) = path.parent()
		&& !parent.as_os_str().is_empty()
	{
		fs::create_dir_all(parent)?;
	}

	csv::Writer::from_path(path).map_err(|err| write_error(path, err))
}

fn write_error(path: &Path, source: csv::Error) -> Error {
	Error::WriteArtifact { path: path.to_path_buf(), source }
}
