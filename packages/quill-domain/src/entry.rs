use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct JournalEntry {
	pub id: String,
	pub owner_id: String,
	pub content: String,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentMetadata {
	pub entry_id: String,
	pub timestamp: String,
	pub source_tag: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmbeddableDocument {
	pub text: String,
	pub metadata: DocumentMetadata,
	pub content_hash: String,
}

/// Stable vector-store key for an entry inside one namespace.
///
/// Re-indexing the same entry always lands on the same point, so upserts overwrite. The namespace
/// is length-prefixed so no (namespace, entry id) pair can spell another pair's key.
pub fn point_key(namespace: &str, entry_id: &str) -> Uuid {
	let name = format!("{}:{namespace}{entry_id}", namespace.len());

	Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
}

pub fn content_hash(text: &str) -> String {
	blake3::hash(text.as_bytes()).to_hex().to_string()
}

pub fn format_timestamp(ts: OffsetDateTime) -> Result<String> {
	ts.format(&Rfc3339).map_err(|err| Error::Timestamp { message: err.to_string() })
}

pub fn parse_timestamp(raw: &str) -> Result<OffsetDateTime> {
	OffsetDateTime::parse(raw.trim(), &Rfc3339)
		.map_err(|err| Error::Timestamp { message: format!("{raw:?} is not RFC 3339: {err}") })
}

pub fn build_document(entry: &JournalEntry, source_tag: &str) -> Result<EmbeddableDocument> {
	Ok(EmbeddableDocument {
		content_hash: content_hash(&entry.content),
		text: entry.content.clone(),
		metadata: DocumentMetadata {
			entry_id: entry.id.clone(),
			timestamp: format_timestamp(entry.created_at)?,
			source_tag: source_tag.to_string(),
		},
	})
}

pub fn build_documents(entries: &[JournalEntry], source_tag: &str) -> Result<Vec<EmbeddableDocument>> {
	entries.iter().map(|entry| build_document(entry, source_tag)).collect()
}

/// Returns the single owner shared by every entry, or `None` when owners differ or the set is
/// empty.
pub fn shared_owner(entries: &[JournalEntry]) -> Option<&str> {
	let first = entries.first()?.owner_id.as_str();

	entries.iter().all(|entry| entry.owner_id == first).then_some(first)
}
