use std::{
	collections::{BTreeMap, HashMap, VecDeque},
	sync::{Mutex, MutexGuard},
};

use serde_json::Value;

use recsync_store::{BoxFuture, ContentRange, DataAccess, Error, Page, Result, Row};

/// One upsert request as the store saw it.
#[derive(Clone, Debug, PartialEq)]
pub struct UpsertCall {
	pub table: String,
	pub conflict_key: String,
	pub rows: Vec<Value>,
	pub accepted: bool,
}

/// A refusal as the remote would send it: status plus raw body.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Rejection {
	pub status: u16,
	pub message: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReadCall {
	pub table: String,
	pub fields: String,
	pub start: u64,
	pub end: u64,
}

#[derive(Debug, Default)]
struct Table {
	rows: Vec<Row>,
	index: HashMap<String, usize>,
}

#[derive(Debug, Default)]
struct Inner {
	tables: BTreeMap<String, Table>,
	max_batch_rows: Option<usize>,
	max_page_rows: Option<usize>,
	omit_totals: bool,
	ignore_windows: bool,
	fail_reads: Option<(u16, String)>,
	scripted_failures: VecDeque<(u16, String)>,
	upserts: Vec<UpsertCall>,
	reads: Vec<ReadCall>,
}

/// In-memory table store with merge-on-conflict upserts and a size limit that is only
/// discoverable by sending a batch that is too large.
#[derive(Debug, Default)]
pub struct MemoryStore {
	inner: Mutex<Inner>,
}
impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Batches longer than `max` are answered with HTTP 413.
	pub fn with_max_batch_rows(self, max: usize) -> Self {
		self.lock().max_batch_rows = Some(max);

		self
	}

	/// Serves at most `max` rows per window regardless of the requested range.
	pub fn with_max_page_rows(self, max: usize) -> Self {
		self.lock().max_page_rows = Some(max.max(1));

		self
	}

	/// Omits totals from served windows, as a remote that ignores `Prefer: count=exact` would.
	pub fn without_totals(self) -> Self {
		self.lock().omit_totals = true;

		self
	}

	/// Serves the whole table on every read with no `Content-Range`, as a remote that drops the
	/// `Range` header would.
	pub fn ignoring_windows(self) -> Self {
		self.lock().ignore_windows = true;

		self
	}

	pub fn seed(&self, table: &str, rows: Vec<Row>) {
		let mut inner = self.lock();

		inner.tables.entry(table.to_string()).or_default().rows.extend(rows);
	}

	/// The next upsert fails with `status` before any size check.
	pub fn fail_next_upsert(&self, status: u16, message: &str) {
		self.lock().scripted_failures.push_back((status, message.to_string()));
	}

	pub fn fail_reads(&self, status: u16, message: &str) {
		self.lock().fail_reads = Some((status, message.to_string()));
	}

	pub fn rows(&self, table: &str) -> Vec<Row> {
		self.lock().tables.get(table).map(|table| table.rows.clone()).unwrap_or_default()
	}

	pub fn upserts(&self) -> Vec<UpsertCall> {
		self.lock().upserts.clone()
	}

	pub fn accepted_rows(&self, table: &str) -> Vec<Value> {
		self.lock()
			.upserts
			.iter()
			.filter(|call| call.accepted && call.table == table)
			.flat_map(|call| call.rows.iter().cloned())
			.collect()
	}

	pub fn reads(&self) -> Vec<ReadCall> {
		self.lock().reads.clone()
	}

	pub fn apply_upsert(&self, table: &str, conflict_key: &str, rows: &[Value]) -> Result<()> {
		self.try_upsert(table, conflict_key, rows).map_err(|rejection| {
			Error::from_write_status(table, rejection.status, &rejection.message)
		})
	}

	/// Same as [`MemoryStore::apply_upsert`] but reports refusals unclassified.
	pub fn try_upsert(
		&self,
		table: &str,
		conflict_key: &str,
		rows: &[Value],
	) -> Result<(), Rejection> {
		let mut inner = self.lock();
		let outcome = Self::check_upsert(&mut inner, rows)
			.and_then(|()| keyed_rows(conflict_key, rows));

		inner.upserts.push(UpsertCall {
			table: table.to_string(),
			conflict_key: conflict_key.to_string(),
			rows: rows.to_vec(),
			accepted: outcome.is_ok(),
		});

		let merged = outcome?;
		let state = inner.tables.entry(table.to_string()).or_default();

		for (key, object) in merged {
			match state.index.get(&key) {
				Some(&position) => state.rows[position].extend(object),
				None => {
					state.index.insert(key, state.rows.len());
					state.rows.push(object);
				},
			}
		}

		Ok(())
	}

	pub fn read_window(&self, table: &str, fields: &str, start: u64, end: u64) -> Result<Page> {
		self.try_read(table, fields, start, end).map_err(|rejection| {
			Error::from_read_status(table, rejection.status, &rejection.message)
		})
	}

	pub fn try_read(
		&self,
		table: &str,
		fields: &str,
		start: u64,
		end: u64,
	) -> Result<Page, Rejection> {
		let mut inner = self.lock();

		inner.reads.push(ReadCall {
			table: table.to_string(),
			fields: fields.to_string(),
			start,
			end,
		});

		if let Some((status, message)) = inner.fail_reads.clone() {
			return Err(Rejection { status, message });
		}

		let rows = inner.tables.get(table).map(|table| table.rows.as_slice()).unwrap_or_default();

		if inner.ignore_windows {
			let served = rows.iter().map(|row| project(row, fields)).collect();

			return Ok(Page { rows: served, range: None });
		}

		let total = rows.len() as u64;
		let reported_total = (!inner.omit_totals).then_some(total);
		let mut last = end;

		if let Some(cap) = inner.max_page_rows {
			last = last.min(start + cap as u64 - 1);
		}
		if start >= total {
			return Ok(Page { rows: Vec::new(), range: Some(ContentRange::empty(reported_total)) });
		}

		last = last.min(total - 1);

		let served = rows[start as usize..=last as usize]
			.iter()
			.map(|row| project(row, fields))
			.collect();

		Ok(Page { rows: served, range: Some(ContentRange::window(start, last, reported_total)) })
	}

	pub fn row_count(&self, table: &str) -> u64 {
		self.lock().tables.get(table).map(|table| table.rows.len() as u64).unwrap_or(0)
	}

	fn check_upsert(inner: &mut Inner, rows: &[Value]) -> Result<(), Rejection> {
		if let Some((status, message)) = inner.scripted_failures.pop_front() {
			return Err(Rejection { status, message });
		}
		if let Some(max) = inner.max_batch_rows
			&& rows.len() > max
		{
			return Err(Rejection { status: 413, message: "Payload Too Large".to_string() });
		}

		Ok(())
	}

	fn lock(&self) -> MutexGuard<'_, Inner> {
		self.inner.lock().unwrap_or_else(|err| err.into_inner())
	}
}
impl DataAccess for MemoryStore {
	fn fetch_page<'a>(
		&'a self,
		table: &'a str,
		fields: &'a str,
		start: u64,
		end: u64,
	) -> BoxFuture<'a, Result<Page>> {
		Box::pin(async move { self.read_window(table, fields, start, end) })
	}

	fn upsert<'a>(
		&'a self,
		table: &'a str,
		conflict_key: &'a str,
		rows: &'a [Value],
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { self.apply_upsert(table, conflict_key, rows) })
	}

	fn count<'a>(&'a self, table: &'a str) -> BoxFuture<'a, Result<Option<u64>>> {
		Box::pin(async move { Ok(Some(self.row_count(table))) })
	}
}

fn project(row: &Row, fields: &str) -> Row {
	if fields.trim() == "*" {
		return row.clone();
	}

	fields
		.split(',')
		.map(str::trim)
		.filter_map(|field| row.get(field).map(|value| (field.to_string(), value.clone())))
		.collect()
}

/// Pairs every row with its conflict key, refusing the whole batch when any row lacks one.
fn keyed_rows(conflict_key: &str, rows: &[Value]) -> Result<Vec<(String, Row)>, Rejection> {
	let keys: Vec<&str> = conflict_key.split(',').map(str::trim).collect();
	let mut keyed = Vec::with_capacity(rows.len());

	for row in rows {
		let Some(object) = row.as_object() else {
			return Err(bad_request("Row must be a JSON object."));
		};
		let mut key_values = Vec::with_capacity(keys.len());

		for key in &keys {
			match object.get(*key) {
				Some(value) if !value.is_null() => key_values.push(value.clone()),
				_ => {
					let message = format!("Row is missing conflict column {key}.");

					return Err(bad_request(&message));
				},
			}
		}

		keyed.push((Value::Array(key_values).to_string(), object.clone()));
	}

	Ok(keyed)
}

fn bad_request(message: &str) -> Rejection {
	Rejection { status: 400, message: message.to_string() }
}
