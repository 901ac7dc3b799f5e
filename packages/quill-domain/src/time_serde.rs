//! RFC 3339 serde adapter for `OffsetDateTime` fields.

use serde::{Deserialize, Deserializer, Serializer, de, ser};
use time::OffsetDateTime;

use crate::entry;

pub fn serialize<S>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	serializer.serialize_str(&entry::format_timestamp(*value).map_err(ser::Error::custom)?)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = String::deserialize(deserializer)?;

	entry::parse_timestamp(&raw).map_err(de::Error::custom)
}
