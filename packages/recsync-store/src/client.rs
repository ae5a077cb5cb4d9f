use std::time::Duration;

use reqwest::{
	Client, Response, StatusCode,
	header::{CONTENT_RANGE, HeaderValue, RANGE},
};
use serde_json::Value;

use crate::{BoxFuture, ContentRange, DataAccess, Error, Page, Result, Row};

const PREFER_COUNT: &str = "count=exact";
const PREFER_UPSERT: &str = "resolution=merge-duplicates,return=minimal";

/// HTTP client for the table API. Every request carries the static credential pair and is bound
/// by the configured timeout.
#[derive(Clone, Debug)]
pub struct StoreClient {
	http: Client,
	base_url: String,
}
impl StoreClient {
	pub fn new(cfg: &recsync_config::Store) -> Result<Self> {
		let http = Client::builder()
			.timeout(Duration::from_millis(cfg.timeout_ms))
			.default_headers(crate::auth_headers(&cfg.api_key, cfg.bearer_token())?)
			.build()?;

		Ok(Self { http, base_url: format!("{}{}", cfg.url, cfg.rest_path) })
	}

	pub fn table_url(&self, table: &str) -> String {
		format!("{}/{table}", self.base_url)
	}

	pub async fn read_window(
		&self,
		table: &str,
		fields: &str,
		start: u64,
		end: u64,
	) -> Result<Page> {
		let res = self
			.http
			.get(self.table_url(table))
			.query(&[("select", fields)])
			.header("Range-Unit", "items")
			.header(RANGE, format!("{start}-{end}"))
			.header("Prefer", PREFER_COUNT)
			.send()
			.await?;
		let status = res.status();
		let range = parse_content_range(res.headers().get(CONTENT_RANGE))?;

		// Offset past the end of the table.
		if status == StatusCode::RANGE_NOT_SATISFIABLE {
			return Ok(Page { rows: Vec::new(), range });
		}
		if !matches!(status, StatusCode::OK | StatusCode::PARTIAL_CONTENT) {
			return Err(Error::from_read_status(table, status.as_u16(), &body_text(res).await));
		}

		let rows: Vec<Row> = res.json().await?;

		Ok(Page { rows, range })
	}

	pub async fn upsert_rows(&self, table: &str, conflict_key: &str, rows: &[Value]) -> Result<()> {
		let res = self
			.http
			.post(self.table_url(table))
			.query(&[("on_conflict", conflict_key)])
			.header("Prefer", PREFER_UPSERT)
			.json(rows)
			.send()
			.await?;
		let status = res.status();

		if matches!(status, StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT) {
			return Ok(());
		}

		Err(Error::from_write_status(table, status.as_u16(), &body_text(res).await))
	}

	pub async fn exact_count(&self, table: &str) -> Result<Option<u64>> {
		let res = self
			.http
			.get(self.table_url(table))
			.query(&[("select", "*"), ("limit", "1")])
			.header("Prefer", PREFER_COUNT)
			.send()
			.await?;
		let status = res.status();

		if !status.is_success() {
			return Err(Error::from_read_status(table, status.as_u16(), &body_text(res).await));
		}

		Ok(parse_content_range(res.headers().get(CONTENT_RANGE))?.and_then(|range| range.total))
	}
}
impl DataAccess for StoreClient {
	fn fetch_page<'a>(
		&'a self,
		table: &'a str,
		fields: &'a str,
		start: u64,
		end: u64,
	) -> BoxFuture<'a, Result<Page>> {
		Box::pin(self.read_window(table, fields, start, end))
	}

	fn upsert<'a>(
		&'a self,
		table: &'a str,
		conflict_key: &'a str,
		rows: &'a [Value],
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.upsert_rows(table, conflict_key, rows))
	}

	fn count<'a>(&'a self, table: &'a str) -> BoxFuture<'a, Result<Option<u64>>> {
		Box::pin(self.exact_count(table))
	}
}

fn parse_content_range(value: Option<&HeaderValue>) -> Result<Option<ContentRange>> {
	let Some(value) = value else {
		return Ok(None);
	};
	let raw = value.to_str().map_err(|_| Error::InvalidResponse {
		message: "Content-Range header is not valid ASCII.".to_string(),
	})?;

	raw.parse().map(Some)
}

async fn body_text(res: Response) -> String {
	res.text().await.unwrap_or_default()
}
