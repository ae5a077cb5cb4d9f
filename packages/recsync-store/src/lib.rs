pub mod client;
pub mod content_range;
pub mod reader;
pub mod writer;

mod error;

pub use client::StoreClient;
pub use content_range::ContentRange;
pub use error::{Error, Result};
pub use reader::PaginatedReader;
pub use writer::{AdaptiveBulkWriter, WriteError, WriteReport};

use std::{future::Future, pin::Pin};

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};

pub type Row = Map<String, Value>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One served window of a table read.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
	pub rows: Vec<Row>,
	pub range: Option<ContentRange>,
}

/// The remote table API the reader and writer run against.
pub trait DataAccess
where
	Self: Send + Sync,
{
	/// Reads rows `start..=end` of `table`, projecting `fields`.
	fn fetch_page<'a>(
		&'a self,
		table: &'a str,
		fields: &'a str,
		start: u64,
		end: u64,
	) -> BoxFuture<'a, Result<Page>>;

	/// Upserts `rows` as one request, merging on `conflict_key`.
	fn upsert<'a>(
		&'a self,
		table: &'a str,
		conflict_key: &'a str,
		rows: &'a [Value],
	) -> BoxFuture<'a, Result<()>>;

	/// Exact row count, when the remote reports one.
	fn count<'a>(&'a self, table: &'a str) -> BoxFuture<'a, Result<Option<u64>>>;
}

pub fn auth_headers(api_key: &str, bearer_token: &str) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();
	let mut api_key = HeaderValue::from_str(api_key)?;
	let mut authorization = HeaderValue::from_str(&format!("Bearer {bearer_token}"))?;

	api_key.set_sensitive(true);
	authorization.set_sensitive(true);
	headers.insert(HeaderName::from_static("apikey"), api_key);
	headers.insert(AUTHORIZATION, authorization);

	Ok(headers)
}
