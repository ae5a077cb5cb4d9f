use std::{
	collections::HashMap,
	future::IntoFuture,
	sync::{Arc, Mutex},
	time::Duration,
};

use axum::{
	Json, Router,
	extract::{Path, Query, State},
	http::{HeaderMap, HeaderValue, StatusCode, header::CONTENT_RANGE},
	response::{IntoResponse, Response},
	routing,
};
use serde_json::Value;
use tokio::{
	net::TcpListener,
	sync::oneshot::{self, Sender},
};

use crate::{MemoryStore, Rejection, Result};
use recsync_store::ContentRange;

pub const REST_PATH: &str = "/rest/v1";

/// What the fake server received, kept for header and query assertions.
#[derive(Clone, Debug, Default)]
pub struct RecordedRequest {
	pub method: String,
	pub table: String,
	pub query: HashMap<String, String>,
	pub api_key: Option<String>,
	pub authorization: Option<String>,
	pub prefer: Option<String>,
	pub range: Option<String>,
}

#[derive(Clone)]
struct ServerState {
	store: Arc<MemoryStore>,
	requests: Arc<Mutex<Vec<RecordedRequest>>>,
	delay: Option<Duration>,
}

/// A loopback HTTP server speaking the subset of the table API the client uses, backed by a
/// [`MemoryStore`]. Requests without an `apikey` header are answered with 401.
pub struct FakeStoreServer {
	base_url: String,
	store: Arc<MemoryStore>,
	requests: Arc<Mutex<Vec<RecordedRequest>>>,
	shutdown: Option<Sender<()>>,
}
impl FakeStoreServer {
	pub async fn start(store: Arc<MemoryStore>) -> Result<Self> {
		Self::start_inner(store, None).await
	}

	/// Every response is held back for `delay`, for exercising client timeouts.
	pub async fn start_with_delay(store: Arc<MemoryStore>, delay: Duration) -> Result<Self> {
		Self::start_inner(store, Some(delay)).await
	}

	/// Base URL without the REST path, the form `[store] url` takes.
	pub fn url(&self) -> &str {
		&self.base_url
	}

	pub fn store(&self) -> &MemoryStore {
		&self.store
	}

	pub fn requests(&self) -> Vec<RecordedRequest> {
		self.requests.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	pub fn shutdown(mut self) {
		if let Some(tx) = self.shutdown.take() {
			let _ = tx.send(());
		}
	}

	async fn start_inner(store: Arc<MemoryStore>, delay: Option<Duration>) -> Result<Self> {
		let requests = Arc::new(Mutex::new(Vec::new()));
		let state = ServerState { store: store.clone(), requests: requests.clone(), delay };
		let app = Router::new()
			.route(
				&format!("{REST_PATH}/{{table}}"),
				routing::get(read_handler).post(upsert_handler),
			)
			.with_state(state);
		let listener = TcpListener::bind("127.0.0.1:0").await?;
		let addr = listener.local_addr()?;
		let (tx, rx) = oneshot::channel();
		let server = axum::serve(listener, app).with_graceful_shutdown(async move {
			let _ = rx.await;
		});

		tokio::spawn(async move {
			let _ = server.into_future().await;
		});

		Ok(Self { base_url: format!("http://{addr}"), store, requests, shutdown: Some(tx) })
	}
}
impl Drop for FakeStoreServer {
	fn drop(&mut self) {
		if let Some(tx) = self.shutdown.take() {
			let _ = tx.send(());
		}
	}
}

async fn read_handler(
	State(state): State<ServerState>,
	Path(table): Path<String>,
	Query(query): Query<HashMap<String, String>>,
	headers: HeaderMap,
) -> Response {
	let request = record(&state, "GET", &table, query, &headers);

	if let Some(delay) = state.delay {
		tokio::time::sleep(delay).await;
	}
	if request.api_key.is_none() {
		return (StatusCode::UNAUTHORIZED, "No API key found in request").into_response();
	}

	let fields = request.query.get("select").map(String::as_str).unwrap_or("*");
	let (start, end) = match (&request.range, request.query.get("limit")) {
		(_, Some(limit)) => match limit.parse::<u64>() {
			Ok(0) | Err(_) => return (StatusCode::BAD_REQUEST, "Invalid limit").into_response(),
			Ok(limit) => (0, limit - 1),
		},
		(Some(range), None) => match parse_range(range) {
			Some(window) => window,
			None => return (StatusCode::BAD_REQUEST, "Invalid Range header").into_response(),
		},
		(None, None) => (0, u64::MAX - 1),
	};

	match state.store.try_read(&table, fields, start, end) {
		Ok(page) => {
			let range = page.range.unwrap_or_default();

			if page.rows.is_empty() && start > 0 {
				let status = StatusCode::RANGE_NOT_SATISFIABLE;

				return with_content_range(status, range, Json(page.rows));
			}

			let served_end = range.served_end().unwrap_or(0);
			let complete = range.total.is_some_and(|total| start == 0 && served_end >= total);
			let status = if complete { StatusCode::OK } else { StatusCode::PARTIAL_CONTENT };

			with_content_range(status, range, Json(page.rows))
		},
		Err(err) => error_response(err),
	}
}

async fn upsert_handler(
	State(state): State<ServerState>,
	Path(table): Path<String>,
	Query(query): Query<HashMap<String, String>>,
	headers: HeaderMap,
	Json(rows): Json<Vec<Value>>,
) -> Response {
	let request = record(&state, "POST", &table, query, &headers);

	if let Some(delay) = state.delay {
		tokio::time::sleep(delay).await;
	}
	if request.api_key.is_none() {
		return (StatusCode::UNAUTHORIZED, "No API key found in request").into_response();
	}

	let Some(conflict_key) = request.query.get("on_conflict") else {
		return (StatusCode::BAD_REQUEST, "on_conflict is required").into_response();
	};

	match state.store.try_upsert(&table, conflict_key, &rows) {
		Ok(()) => StatusCode::CREATED.into_response(),
		Err(err) => error_response(err),
	}
}

fn record(
	state: &ServerState,
	method: &str,
	table: &str,
	query: HashMap<String, String>,
	headers: &HeaderMap,
) -> RecordedRequest {
	let header = |name: &str| {
		headers.get(name).and_then(|value| value.to_str().ok()).map(ToString::to_string)
	};
	let request = RecordedRequest {
		method: method.to_string(),
		table: table.to_string(),
		query,
		api_key: header("apikey"),
		authorization: header("authorization"),
		prefer: header("prefer"),
		range: header("range"),
	};

	state.requests.lock().unwrap_or_else(|err| err.into_inner()).push(request.clone());

	request
}

fn parse_range(raw: &str) -> Option<(u64, u64)> {
	let (start, end) = raw.trim().split_once('-')?;
	let start = start.parse().ok()?;
	let end = end.parse().ok()?;

	(end >= start).then_some((start, end))
}

fn with_content_range(
	status: StatusCode,
	range: ContentRange,
	body: impl IntoResponse,
) -> Response {
	let mut res = (status, body).into_response();

	if let Ok(value) = HeaderValue::from_str(&range.to_string()) {
		res.headers_mut().insert(CONTENT_RANGE, value);
	}

	res
}

fn error_response(rejection: Rejection) -> Response {
	let status =
		StatusCode::from_u16(rejection.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

	(status, Json(serde_json::json!({ "message": rejection.message }))).into_response()
}
