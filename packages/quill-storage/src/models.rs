use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct JournalEntryRow {
	pub entry_id: Uuid,
	pub user_id: String,
	pub content: String,
	pub mood: Option<String>,
	pub color: Option<String>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct EntryAnalysisRow {
	pub entry_id: Uuid,
	pub record: Value,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
