pub mod option;

use serde::{Deserialize, Deserializer, Serializer};
use time::{OffsetDateTime, UtcOffset, format_description::well_known::Rfc3339};

pub fn serialize<S>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	let formatted = format_utc_seconds(*value).map_err(serde::ser::Error::custom)?;

	serializer.serialize_str(&formatted)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = String::deserialize(deserializer)?;

	OffsetDateTime::parse(&raw, &Rfc3339).map_err(serde::de::Error::custom)
}

/// Drops sub-second precision and shifts to UTC.
pub fn to_utc_seconds(value: OffsetDateTime) -> OffsetDateTime {
	value.to_offset(UtcOffset::UTC).replace_nanosecond(0).unwrap_or(value)
}

/// Renders `2000-07-30T18:45:03Z`.
pub fn format_utc_seconds(value: OffsetDateTime) -> Result<String, time::error::Format> {
	to_utc_seconds(value).format(&Rfc3339)
}
