use crate::{DataAccess, Error, Result, Row};

/// Rebuilds a whole table from bounded windows.
///
/// Each request is independent of earlier responses apart from its offset. The read ends on an
/// empty page, on a short page, or once the served window reaches the reported total. When the
/// remote reports a total that a short page has not reached (a server-side row cap), the next
/// window starts right after the rows actually served so nothing is skipped. A page larger than
/// the requested window is only accepted when its `Content-Range` moves the offset forward;
/// otherwise the remote is ignoring the window and the read fails instead of looping.
pub struct PaginatedReader<'a, S>
where
	S: ?Sized,
{
	store: &'a S,
	page_size: u64,
}
impl<'a, S> PaginatedReader<'a, S>
where
	S: DataAccess + ?Sized,
{
	pub fn new(store: &'a S, page_size: usize) -> Self {
		Self { store, page_size: page_size.max(1) as u64 }
	}

	pub async fn read_all(&self, table: &str, fields: &str) -> Result<Vec<Row>> {
		let mut rows = Vec::new();
		let mut offset = 0_u64;

		loop {
			let end = offset + self.page_size - 1;
			let page = self.store.fetch_page(table, fields, offset, end).await?;
			let served = page.rows.len() as u64;
			let total = page.range.and_then(|range| range.total);
			let reported_end = page.range.and_then(|range| range.served_end());
			let served_end = reported_end.unwrap_or(offset + served);

			if served > self.page_size {
				match reported_end {
					Some(next) if next > offset => {
						rows.extend(page.rows);

						if total.is_some_and(|total| next >= total) {
							break;
						}

						offset = next;

						continue;
					},
					_ =>
						return Err(Error::InvalidResponse {
							message: format!(
								"{table} returned {served} rows for a {}-row window at offset \
								 {offset} without a usable Content-Range.",
								self.page_size
							),
						}),
				}
			}

			rows.extend(page.rows);

			tracing::debug!(table, offset, served, total, fetched = rows.len(), "Fetched page.");

			if served == 0 {
				break;
			}
			if let Some(total) = total
				&& served_end >= total
			{
				break;
			}
			if served < self.page_size {
				match total {
					Some(_) if served_end > offset => {
						offset = served_end;

						continue;
					},
					_ => break,
				}
			}

			offset += self.page_size;
		}

		tracing::info!(table, rows = rows.len(), "Table read complete.");

		Ok(rows)
	}
}
