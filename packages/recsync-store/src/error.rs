pub type Result<T, E = Error> = std::result::Result<T, E>;

const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{table} rejected a batch as too large (HTTP {status}): {message}")]
	SizeRejection { table: String, status: u16, message: String },
	#[error("{table} request failed (HTTP {status}): {message}")]
	Remote { table: String, status: u16, message: String },
	#[error(transparent)]
	Transport(#[from] reqwest::Error),
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
	#[error(transparent)]
	InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
	#[error("{message}")]
	InvalidResponse { message: String },
}
impl Error {
	/// Maps a failed write response to its error class. 413 is always a size rejection; 400 is
	/// one only when the body names a size condition.
	pub fn from_write_status(table: &str, status: u16, body: &str) -> Self {
		let message = truncate(body);

		if status == 413 || (status == 400 && mentions_size(body)) {
			return Self::SizeRejection { table: table.to_string(), status, message };
		}
		if status == 409 {
			return Self::Remote {
				table: table.to_string(),
				status,
				message: format!(
					"{message} (the on_conflict key must match a unique index on {table})"
				),
			};
		}

		Self::Remote { table: table.to_string(), status, message }
	}

	pub fn from_read_status(table: &str, status: u16, body: &str) -> Self {
		Self::Remote { table: table.to_string(), status, message: truncate(body) }
	}

	pub fn is_size_rejection(&self) -> bool {
		matches!(self, Self::SizeRejection { .. })
	}

	pub fn is_timeout(&self) -> bool {
		matches!(self, Self::Transport(err) if err.is_timeout())
	}
}

fn mentions_size(body: &str) -> bool {
	let lowered = body.to_ascii_lowercase();

	["too large", "payload", "request entity", "row is too big"]
		.iter()
		.any(|needle| lowered.contains(needle))
}

fn truncate(body: &str) -> String {
	let trimmed = body.trim();

	match trimmed.char_indices().nth(MAX_ERROR_BODY_CHARS) {
		Some((index, _)) => format!("{}...", &trimmed[..index]),
		None => trimmed.to_string(),
	}
}
