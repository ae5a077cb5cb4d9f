//! Raw row normalisation.
//!
//! Source files and remote tables disagree on column names and casing (`userId` vs `user_id`,
//! `rating` vs `value`). Each canonical field is resolved from an ordered list of candidate keys:
//! exact matches are tried first in list order, then an ASCII case-insensitive match against the
//! same list. Null and blank values count as absent, so resolution falls through to the next key.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{
	record::{InteractionRecord, ItemRecord, LinkRecord},
	time_serde,
};

pub type RawRow = Map<String, Value>;

pub const USER_ID_KEYS: &[&str] = &["user_id", "userId"];
pub const ITEM_ID_KEYS: &[&str] = &["item_id", "movie_id", "itemId", "movieId"];
pub const VALUE_KEYS: &[&str] = &["value", "rating", "score"];
pub const TIMESTAMP_KEYS: &[&str] = &["ts", "timestamp"];
pub const TITLE_KEYS: &[&str] = &["title"];
pub const GENRES_KEYS: &[&str] = &["genres"];
pub const IMDB_ID_KEYS: &[&str] = &["imdb_id", "imdbId"];
pub const TMDB_ID_KEYS: &[&str] = &["tmdb_id", "tmdbId", "external_id"];

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum SkipReason {
	MissingUserId,
	InvalidUserId,
	MissingItemId,
	InvalidItemId,
	MissingValue,
	InvalidValue,
	MissingTimestamp,
}
impl SkipReason {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::MissingUserId => "missing_user_id",
			Self::InvalidUserId => "invalid_user_id",
			Self::MissingItemId => "missing_item_id",
			Self::InvalidItemId => "invalid_item_id",
			Self::MissingValue => "missing_value",
			Self::InvalidValue => "invalid_value",
			Self::MissingTimestamp => "missing_timestamp",
		}
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NormalizePolicy {
	pub require_timestamp: bool,
}
impl Default for NormalizePolicy {
	fn default() -> Self {
		Self { require_timestamp: recsync_config::REQUIRE_TIMESTAMP }
	}
}

/// Counters observed while normalising one input.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NormalizeStats {
	pub accepted: u64,
	pub skipped: u64,
	pub null_timestamps: u64,
	pub reasons: BTreeMap<SkipReason, u64>,
}
impl NormalizeStats {
	pub fn observe<T>(&mut self, outcome: Result<T, SkipReason>) -> Option<T> {
		match outcome {
			Ok(value) => {
				self.accepted += 1;

				Some(value)
			},
			Err(reason) => {
				self.skipped += 1;
				*self.reasons.entry(reason).or_default() += 1;

				tracing::debug!(reason = reason.as_str(), "Skipped row.");

				None
			},
		}
	}
}

/// Turns raw rows into [`InteractionRecord`]s, counting the rows it drops.
#[derive(Debug, Default)]
pub struct Normalizer {
	policy: NormalizePolicy,
	stats: NormalizeStats,
}
impl Normalizer {
	pub fn new(policy: NormalizePolicy) -> Self {
		Self { policy, stats: NormalizeStats::default() }
	}

	pub fn normalize(&mut self, row: &RawRow) -> Option<InteractionRecord> {
		let record = self.stats.observe(interaction_from_row(row, self.policy))?;

		if record.timestamp.is_none() {
			self.stats.null_timestamps += 1;
		}

		Some(record)
	}

	pub fn normalize_all<'a, I>(&mut self, rows: I) -> Vec<InteractionRecord>
	where
		I: IntoIterator<Item = &'a RawRow>,
	{
		rows.into_iter().filter_map(|row| self.normalize(row)).collect()
	}

	pub fn stats(&self) -> &NormalizeStats {
		&self.stats
	}

	pub fn into_stats(self) -> NormalizeStats {
		self.stats
	}
}

pub fn interaction_from_row(
	row: &RawRow,
	policy: NormalizePolicy,
) -> Result<InteractionRecord, SkipReason> {
	let user_id = resolve(row, USER_ID_KEYS).ok_or(SkipReason::MissingUserId)?;
	let user_id = parse_id(user_id).ok_or(SkipReason::InvalidUserId)?;
	let item_id = resolve(row, ITEM_ID_KEYS).ok_or(SkipReason::MissingItemId)?;
	let item_id = parse_id(item_id).ok_or(SkipReason::InvalidItemId)?;
	let value = resolve(row, VALUE_KEYS).ok_or(SkipReason::MissingValue)?;
	let value = parse_value(value).ok_or(SkipReason::InvalidValue)?;
	let timestamp = resolve(row, TIMESTAMP_KEYS).and_then(parse_timestamp);

	if policy.require_timestamp && timestamp.is_none() {
		return Err(SkipReason::MissingTimestamp);
	}

	Ok(InteractionRecord { user_id, item_id, value, timestamp })
}

pub fn item_from_row(row: &RawRow) -> Result<ItemRecord, SkipReason> {
	let item_id = resolve(row, ITEM_ID_KEYS).ok_or(SkipReason::MissingItemId)?;
	let item_id = parse_id(item_id).ok_or(SkipReason::InvalidItemId)?;

	Ok(ItemRecord {
		item_id,
		title: resolve_text(row, TITLE_KEYS).unwrap_or_default(),
		genres: resolve_text(row, GENRES_KEYS).unwrap_or_default(),
	})
}

pub fn link_from_row(row: &RawRow) -> Result<LinkRecord, SkipReason> {
	let item_id = resolve(row, ITEM_ID_KEYS).ok_or(SkipReason::MissingItemId)?;
	let item_id = parse_id(item_id).ok_or(SkipReason::InvalidItemId)?;

	Ok(LinkRecord {
		item_id,
		imdb_id: resolve_text(row, IMDB_ID_KEYS),
		tmdb_id: resolve(row, TMDB_ID_KEYS).and_then(parse_id),
	})
}

pub fn resolve<'a>(row: &'a RawRow, keys: &[&str]) -> Option<&'a Value> {
	let present = |value: &&Value| !is_blank(value);

	keys.iter().find_map(|key| row.get(*key).filter(present)).or_else(|| {
		keys.iter().find_map(|key| {
			row.iter()
				.find(|(name, value)| name.eq_ignore_ascii_case(key) && !is_blank(value))
				.map(|(_, value)| value)
		})
	})
}

/// Strict positive integer parse. `"12"` and `12` pass; `"12.0"`, `12.5` and `-3` do not.
pub fn parse_id(value: &Value) -> Option<i64> {
	let id = match value {
		Value::Number(number) => number.as_i64()?,
		Value::String(text) => text.trim().parse::<i64>().ok()?,
		_ => return None,
	};

	(id > 0).then_some(id)
}

pub fn parse_value(value: &Value) -> Option<f64> {
	let parsed = match value {
		Value::Number(number) => number.as_f64()?,
		Value::String(text) => text.trim().parse::<f64>().ok()?,
		_ => return None,
	};

	parsed.is_finite().then_some(parsed)
}

/// Accepts epoch seconds (integer or float notation, fractions truncated toward zero), or an
/// RFC 3339 instant as written back by this system.
pub fn parse_timestamp(value: &Value) -> Option<OffsetDateTime> {
	match value {
		Value::Number(number) => match number.as_i64() {
			Some(seconds) => epoch_to_instant(seconds),
			None => number.as_f64().and_then(float_epoch_to_instant),
		},
		Value::String(text) => {
			let text = text.trim();

			if let Ok(seconds) = text.parse::<i64>() {
				return epoch_to_instant(seconds);
			}
			if let Ok(seconds) = text.parse::<f64>() {
				return float_epoch_to_instant(seconds);
			}

			OffsetDateTime::parse(text, &Rfc3339).ok().map(time_serde::to_utc_seconds)
		},
		_ => None,
	}
}

pub fn epoch_to_instant(seconds: i64) -> Option<OffsetDateTime> {
	OffsetDateTime::from_unix_timestamp(seconds).ok()
}

fn float_epoch_to_instant(seconds: f64) -> Option<OffsetDateTime> {
	let seconds = seconds.trunc();

	if !seconds.is_finite() || seconds < i64::MIN as f64 || seconds >= i64::MAX as f64 {
		return None;
	}

	epoch_to_instant(seconds as i64)
}

fn resolve_text(row: &RawRow, keys: &[&str]) -> Option<String> {
	match resolve(row, keys)? {
		Value::String(text) => Some(text.trim().to_string()),
		Value::Number(number) => Some(number.to_string()),
		_ => None,
	}
}

fn is_blank(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::String(text) => text.trim().is_empty(),
		_ => false,
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn row(value: Value) -> RawRow {
		value.as_object().cloned().expect("Test row must be an object.")
	}

	#[test]
	fn source_spelling_resolves_to_canonical_fields() {
		let raw = row(json!({
			"userId": "1",
			"movieId": "31",
			"rating": "2.5",
			"timestamp": "1260759144"
		}));
		let record = interaction_from_row(&raw, NormalizePolicy::default())
			.expect("Row must normalise.");

		assert_eq!(record.user_id, 1);
		assert_eq!(record.item_id, 31);
		assert_eq!(record.value, 2.5);
		assert_eq!(
			time_serde::format_utc_seconds(record.timestamp.expect("Timestamp must parse."))
				.expect("Timestamp must format."),
			"2009-12-14T02:52:24Z"
		);
	}

	#[test]
	fn canonical_key_wins_over_alias() {
		let raw = row(json!({ "user_id": 7, "userId": 8, "item_id": 3, "value": 4.0 }));
		let record = interaction_from_row(&raw, NormalizePolicy::default())
			.expect("Row must normalise.");

		assert_eq!(record.user_id, 7);
	}

	#[test]
	fn blank_value_falls_through_to_next_key() {
		let raw = row(json!({ "user_id": 1, "item_id": 2, "value": "", "rating": "3.5" }));
		let record = interaction_from_row(&raw, NormalizePolicy::default())
			.expect("Row must normalise.");

		assert_eq!(record.value, 3.5);
	}

	#[test]
	fn keys_match_case_insensitively_after_exact_lookup() {
		let raw = row(json!({ "USER_ID": "4", "MovieId": "9", "Rating": "1" }));
		let record = interaction_from_row(&raw, NormalizePolicy::default())
			.expect("Row must normalise.");

		assert_eq!((record.user_id, record.item_id), (4, 9));
	}

	#[test]
	fn ids_are_parsed_strictly() {
		assert_eq!(parse_id(&json!("12")), Some(12));
		assert_eq!(parse_id(&json!(" 12 ")), Some(12));
		assert_eq!(parse_id(&json!("12.0")), None);
		assert_eq!(parse_id(&json!(12.5)), None);
		assert_eq!(parse_id(&json!(0)), None);
		assert_eq!(parse_id(&json!(-3)), None);
		assert_eq!(parse_id(&json!(true)), None);
	}

	#[test]
	fn non_finite_values_are_rejected() {
		assert_eq!(parse_value(&json!("NaN")), None);
		assert_eq!(parse_value(&json!("inf")), None);
		assert_eq!(parse_value(&json!("4.5")), Some(4.5));
	}

	#[test]
	fn unparseable_timestamp_is_null_unless_required() {
		let raw = row(json!({ "user_id": 1, "item_id": 2, "value": 3, "ts": "yesterday" }));
		let kept = interaction_from_row(&raw, NormalizePolicy { require_timestamp: false })
			.expect("Row must be kept with a null timestamp.");

		assert!(kept.timestamp.is_none());
		assert_eq!(
			interaction_from_row(&raw, NormalizePolicy { require_timestamp: true }),
			Err(SkipReason::MissingTimestamp)
		);
	}

	#[test]
	fn rfc3339_timestamps_round_trip_from_artifacts() {
		let parsed = parse_timestamp(&json!("2000-07-30T18:45:03Z")).expect("Must parse.");

		assert_eq!(parsed.unix_timestamp(), 964_982_703);
	}

	#[test]
	fn float_epochs_truncate_like_integer_epochs() {
		let expected = parse_timestamp(&json!(1_260_759_144)).expect("Integer epoch must parse.");

		assert_eq!(parse_timestamp(&json!("1260759144.0")), Some(expected));
		assert_eq!(parse_timestamp(&json!(" 1260759144.9 ")), Some(expected));
		assert_eq!(parse_timestamp(&json!(1_260_759_144.0)), Some(expected));
		assert_eq!(parse_timestamp(&json!(1_260_759_144.75)), Some(expected));
		assert_eq!(expected.unix_timestamp(), 1_260_759_144);

		let raw = row(json!({
			"userId": "1",
			"movieId": "31",
			"rating": "2.5",
			"timestamp": "1260759144.0"
		}));
		let record = interaction_from_row(&raw, NormalizePolicy { require_timestamp: true })
			.expect("Float epoch must satisfy a required timestamp.");

		assert_eq!(record.timestamp, Some(expected));
	}

	#[test]
	fn non_finite_float_epochs_are_unparseable() {
		assert_eq!(parse_timestamp(&json!("NaN")), None);
		assert_eq!(parse_timestamp(&json!("inf")), None);
		assert_eq!(parse_timestamp(&json!("1e300")), None);
	}

	#[test]
	fn normalizer_counts_skips_by_reason() {
		let rows = vec![
			row(json!({ "user_id": 1, "item_id": 2, "value": 3 })),
			row(json!({ "user_id": "x", "item_id": 2, "value": 3 })),
			row(json!({ "item_id": 2, "value": 3 })),
			row(json!({ "user_id": 1, "item_id": 2, "value": "bad" })),
		];
		let mut normalizer = Normalizer::new(NormalizePolicy::default());
		let records = normalizer.normalize_all(&rows);
		let stats = normalizer.into_stats();

		assert_eq!(records.len(), 1);
		assert_eq!(stats.accepted, 1);
		assert_eq!(stats.skipped, 3);
		assert_eq!(stats.null_timestamps, 1);
		assert_eq!(stats.reasons.get(&SkipReason::InvalidUserId), Some(&1));
		assert_eq!(stats.reasons.get(&SkipReason::MissingUserId), Some(&1));
		assert_eq!(stats.reasons.get(&SkipReason::InvalidValue), Some(&1));
	}

	#[test]
	fn link_rows_map_empty_external_ids_to_null() {
		let raw = row(json!({ "movieId": "1", "imdbId": "", "tmdbId": "" }));
		let link = link_from_row(&raw).expect("Link must normalise.");

		assert_eq!(link, LinkRecord { item_id: 1, imdb_id: None, tmdb_id: None });
	}

	#[test]
	fn item_rows_trim_text() {
		let raw = row(json!({ "movieId": "1", "title": " Toy Story (1995) ", "genres": "Animation" }));
		let item = item_from_row(&raw).expect("Item must normalise.");

		assert_eq!(item.title, "Toy Story (1995)");
		assert_eq!(item.genres, "Animation");
	}
}
