use std::{fmt, str::FromStr};

use crate::{Error, Result};

/// A `Content-Range` value such as `0-999/4200`, `*/0` or `1000-1999/*`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ContentRange {
	pub start: Option<u64>,
	pub end: Option<u64>,
	pub total: Option<u64>,
}
impl ContentRange {
	pub fn window(start: u64, end: u64, total: Option<u64>) -> Self {
		Self { start: Some(start), end: Some(end), total }
	}

	pub fn empty(total: Option<u64>) -> Self {
		Self { start: None, end: None, total }
	}

	/// One past the last served row, when the window is known.
	pub fn served_end(&self) -> Option<u64> {
		self.end.map(|end| end + 1)
	}
}
impl FromStr for ContentRange {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		let invalid = || Error::InvalidResponse {
			message: format!("Malformed Content-Range header: {raw:?}."),
		};
		// Tolerate a leading unit, e.g. `items 0-9/10`.
		let value = raw.trim().rsplit(' ').next().unwrap_or_default();
		let (window, total) = value.split_once('/').ok_or_else(invalid)?;
		let total = match total {
			"*" => None,
			total => Some(total.parse::<u64>().map_err(|_| invalid())?),
		};

		if window == "*" {
			return Ok(Self::empty(total));
		}

		let (start, end) = window.split_once('-').ok_or_else(invalid)?;
		let start = start.parse::<u64>().map_err(|_| invalid())?;
		let end = end.parse::<u64>().map_err(|_| invalid())?;

		if end < start {
			return Err(invalid());
		}

		Ok(Self::window(start, end, total))
	}
}
impl fmt::Display for ContentRange {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match (self.start, self.end) {
			(Some(start), Some(end)) => write!(f, "{start}-{end}")?,
			_ => write!(f, "*")?,
		}
		match self.total {
			Some(total) => write!(f, "/{total}"),
			None => write!(f, "/*"),
		}
	}
}
