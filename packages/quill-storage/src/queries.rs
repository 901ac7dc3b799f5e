use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Error, Result,
	db::Db,
	models::{EntryAnalysisRow, JournalEntryRow},
};

pub async fn insert_entry(db: &Db, entry: &JournalEntryRow) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO journal_entries (
	entry_id,
	user_id,
	content,
	mood,
	color,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7)",
	)
	.bind(entry.entry_id)
	.bind(entry.user_id.as_str())
	.bind(entry.content.as_str())
	.bind(entry.mood.as_deref())
	.bind(entry.color.as_deref())
	.bind(entry.created_at)
	.bind(entry.updated_at)
	.execute(&db.pool)
	.await?;

	Ok(())
}

/// Lists a user's entries, oldest first.
pub async fn list_entries(db: &Db, user_id: &str) -> Result<Vec<JournalEntryRow>> {
	let rows = sqlx::query_as::<_, JournalEntryRow>(
		"\
SELECT entry_id, user_id, content, mood, color, created_at, updated_at
FROM journal_entries
WHERE user_id = $1
ORDER BY created_at ASC, entry_id ASC",
	)
	.bind(user_id)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

pub async fn fetch_entry(db: &Db, user_id: &str, entry_id: Uuid) -> Result<Option<JournalEntryRow>> {
	let row = sqlx::query_as::<_, JournalEntryRow>(
		"\
SELECT entry_id, user_id, content, mood, color, created_at, updated_at
FROM journal_entries
WHERE user_id = $1 AND entry_id = $2",
	)
	.bind(user_id)
	.bind(entry_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(row)
}

/// Stores the first analysis for an entry. Fails with [`Error::Conflict`] when one exists.
pub async fn insert_analysis(
	db: &Db,
	entry_id: Uuid,
	record: &Value,
	now: OffsetDateTime,
) -> Result<EntryAnalysisRow> {
	let row = sqlx::query_as::<_, EntryAnalysisRow>(
		"\
INSERT INTO entry_analyses (entry_id, record, created_at, updated_at)
VALUES ($1, $2, $3, $3)
ON CONFLICT (entry_id) DO NOTHING
RETURNING entry_id, record, created_at, updated_at",
	)
	.bind(entry_id)
	.bind(record)
	.bind(now)
	.fetch_optional(&db.pool)
	.await?;

	row.ok_or_else(|| Error::Conflict(format!("Analysis already exists for entry {entry_id}.")))
}

/// Replaces an existing analysis. Fails with [`Error::NotFound`] when none exists yet.
pub async fn update_analysis(
	db: &Db,
	entry_id: Uuid,
	record: &Value,
	now: OffsetDateTime,
) -> Result<EntryAnalysisRow> {
	let row = sqlx::query_as::<_, EntryAnalysisRow>(
		"\
UPDATE entry_analyses
SET record = $2, updated_at = $3
WHERE entry_id = $1
RETURNING entry_id, record, created_at, updated_at",
	)
	.bind(entry_id)
	.bind(record)
	.bind(now)
	.fetch_optional(&db.pool)
	.await?;

	row.ok_or_else(|| Error::NotFound(format!("No analysis exists for entry {entry_id}.")))
}

pub async fn fetch_analysis(db: &Db, entry_id: Uuid) -> Result<Option<EntryAnalysisRow>> {
	let row = sqlx::query_as::<_, EntryAnalysisRow>(
		"\
SELECT entry_id, record, created_at, updated_at
FROM entry_analyses
WHERE entry_id = $1",
	)
	.bind(entry_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(row)
}
