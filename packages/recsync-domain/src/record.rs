use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// One unit of user feedback on an item.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct InteractionRecord {
	pub user_id: i64,
	pub item_id: i64,
	pub value: f64,
	#[serde(rename = "ts", default, with = "crate::time_serde::option")]
	pub timestamp: Option<OffsetDateTime>,
}

/// The source-faithful mirror of an interaction, keeping the `rating` column name.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RawRatingRecord {
	pub user_id: i64,
	pub item_id: i64,
	pub rating: f64,
	#[serde(rename = "ts", default, with = "crate::time_serde::option")]
	pub timestamp: Option<OffsetDateTime>,
}
impl From<&InteractionRecord> for RawRatingRecord {
	fn from(record: &InteractionRecord) -> Self {
		Self {
			user_id: record.user_id,
			item_id: record.item_id,
			rating: record.value,
			timestamp: record.timestamp,
		}
	}
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ItemRecord {
	pub item_id: i64,
	pub title: String,
	pub genres: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct LinkRecord {
	pub item_id: i64,
	pub imdb_id: Option<String>,
	pub tmdb_id: Option<i64>,
}

/// Display data joined into recommendations. Read-only for this system.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ItemMetadata {
	pub item_id: i64,
	pub title: Option<String>,
	pub external_id: Option<i64>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RecommendedItem {
	pub item_id: i64,
	pub score: f64,
	pub title: Option<String>,
	pub external_id: Option<i64>,
}

/// The full list for one user. Upserting it replaces any previous list for that user.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Recommendation {
	pub user_id: i64,
	pub items: Vec<RecommendedItem>,
	#[serde(with = "crate::time_serde")]
	pub generated_at: OffsetDateTime,
}
