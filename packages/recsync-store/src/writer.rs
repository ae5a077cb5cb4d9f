use serde::Serialize;
use serde_json::Value;

use crate::{DataAccess, Error};

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct WriteReport {
	pub table: String,
	pub written: usize,
	pub batches: usize,
	pub shrinks: usize,
	pub final_batch_size: usize,
}

/// An unrecoverable write failure. Batches acknowledged before the failure stay committed.
#[derive(Debug, thiserror::Error)]
#[error(
	"Write to {table} aborted after {committed_batches} committed batch(es) ({written} of {total} records)."
)]
pub struct WriteError {
	pub table: String,
	pub committed_batches: usize,
	pub written: usize,
	pub total: usize,
	#[source]
	pub source: Error,
}

/// Upserts records in sequential batches, halving the batch after each size rejection and
/// resending the same unsent remainder.
///
/// Only one request is in flight at a time. Records are never dropped or skipped: at every step
/// `written + remaining == records.len()`.
pub struct AdaptiveBulkWriter<'a, S>
where
	S: ?Sized,
{
	store: &'a S,
	min_batch_size: usize,
}
impl<'a, S> AdaptiveBulkWriter<'a, S>
where
	S: DataAccess + ?Sized,
{
	pub fn new(store: &'a S, min_batch_size: usize) -> Self {
		Self { store, min_batch_size: min_batch_size.max(1) }
	}

	pub async fn write<T>(
		&self,
		table: &str,
		records: &[T],
		conflict_key: &str,
		initial_batch_size: usize,
	) -> Result<WriteReport, WriteError>
	where
		T: Serialize,
	{
		let total = records.len();
		let abort = |committed_batches: usize, written: usize, source: Error| WriteError {
			table: table.to_string(),
			committed_batches,
			written,
			total,
			source,
		};
		let rows = records
			.iter()
			.map(serde_json::to_value)
			.collect::<Result<Vec<Value>, _>>()
			.map_err(|err| abort(0, 0, err.into()))?;
		let mut batch_size = initial_batch_size.max(self.min_batch_size);
		let mut report = WriteReport { table: table.to_string(), ..WriteReport::default() };

		while report.written < total {
			let end = (report.written + batch_size).min(total);
			let batch = &rows[report.written..end];

			match self.store.upsert(table, conflict_key, batch).await {
				Ok(()) => {
					report.written = end;
					report.batches += 1;

					tracing::debug!(
						table,
						batch_size = batch.len(),
						written = report.written,
						total,
						"Committed batch."
					);
				},
				Err(err) if err.is_size_rejection() && batch.len() > self.min_batch_size => {
					let shrunk = (batch.len() / 2).max(self.min_batch_size);

					tracing::warn!(
						table,
						from = batch.len(),
						to = shrunk,
						error = %err,
						"Batch rejected as too large. Shrinking."
					);

					batch_size = shrunk;
					report.shrinks += 1;
				},
				Err(err) => return Err(abort(report.batches, report.written, err)),
			}
		}

		report.final_batch_size = batch_size;

		tracing::info!(
			table,
			written = report.written,
			batches = report.batches,
			shrinks = report.shrinks,
			"Write complete."
		);

		Ok(report)
	}
}
