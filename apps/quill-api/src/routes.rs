use axum::{
	Json, Router,
	extract::{Path, State},
	http::{HeaderMap, StatusCode},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use quill_domain::{analysis::AnalysisRecord, entry::JournalEntry, qa::QaResult};
use quill_providers::Capability;
use quill_service::Error as ServiceError;
use quill_storage::{
	Error as StorageError,
	models::{EntryAnalysisRow, JournalEntryRow},
	queries,
};

use crate::state::AppState;

pub const USER_ID_HEADER: &str = "x-quill-user-id";
pub const PROVIDER_HEADER: &str = "x-quill-provider";
pub const API_KEY_HEADER: &str = "x-quill-api-key";

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/entries", post(create_entry).get(list_entries))
		.route("/v1/chat", post(chat))
		.route(
			"/v1/entries/{entry_id}/analysis",
			post(create_analysis).put(update_analysis).get(get_analysis),
		)
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

#[derive(Debug, Deserialize)]
pub struct CreateEntryRequest {
	pub content: String,
}

#[derive(Debug, Serialize)]
pub struct EntryResponse {
	pub entry_id: Uuid,
	pub content: String,
	pub mood: Option<String>,
	pub color: Option<String>,
	#[serde(with = "quill_domain::time_serde")]
	pub created_at: OffsetDateTime,
}
impl From<JournalEntryRow> for EntryResponse {
	fn from(row: JournalEntryRow) -> Self {
		Self {
			entry_id: row.entry_id,
			content: row.content,
			mood: row.mood,
			color: row.color,
			created_at: row.created_at,
		}
	}
}

#[derive(Debug, Serialize)]
pub struct EntryListResponse {
	pub entries: Vec<EntryResponse>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
	pub question: String,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
	pub entry_id: Uuid,
	pub analysis: AnalysisRecord,
	#[serde(with = "quill_domain::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "quill_domain::time_serde")]
	pub updated_at: OffsetDateTime,
}
impl TryFrom<EntryAnalysisRow> for AnalysisResponse {
	type Error = ApiError;

	fn try_from(row: EntryAnalysisRow) -> Result<Self, Self::Error> {
		let analysis = serde_json::from_value(row.record).map_err(|err| {
			tracing::error!(error = %err, entry_id = %row.entry_id, "Stored analysis is malformed.");

			json_error(
				StatusCode::INTERNAL_SERVER_ERROR,
				"storage_error",
				"Stored analysis could not be read.",
			)
		})?;

		Ok(Self {
			entry_id: row.entry_id,
			analysis,
			created_at: row.created_at,
			updated_at: row.updated_at,
		})
	}
}

/// The caller's provider choice, taken from request headers.
struct ProviderHeaders {
	provider_id: String,
	api_key: String,
}

async fn create_entry(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(payload): Json<CreateEntryRequest>,
) -> Result<(StatusCode, Json<EntryResponse>), ApiError> {
	let user_id = required_user(&headers)?;
	let content = payload.content.trim();

	if content.is_empty() {
		return Err(json_error(
			StatusCode::BAD_REQUEST,
			"invalid_request",
			"Entry content must not be empty.",
		));
	}

	let mut mood = None;
	let mut color = None;

	// Mood tagging is optional and never blocks saving the entry.
	if let Some(provider) = optional_provider(&headers)? {
		match state.service.tag_mood(content, &provider.provider_id, &provider.api_key).await {
			Ok(tag) => {
				mood = Some(tag.mood);
				color = Some(tag.color);
			},
			Err(err) => {
				tracing::warn!(error = %err, user_id = %user_id, "Mood tagging failed. Saving entry untagged.");
			},
		}
	}

	let now = OffsetDateTime::now_utc();
	let row = JournalEntryRow {
		entry_id: Uuid::new_v4(),
		user_id: user_id.to_string(),
		content: content.to_string(),
		mood,
		color,
		created_at: now,
		updated_at: now,
	};

	queries::insert_entry(&state.db, &row).await?;

	Ok((StatusCode::CREATED, Json(row.into())))
}

async fn list_entries(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<EntryListResponse>, ApiError> {
	let user_id = required_user(&headers)?;
	let rows = queries::list_entries(&state.db, user_id).await?;

	Ok(Json(EntryListResponse { entries: rows.into_iter().map(EntryResponse::from).collect() }))
}

async fn chat(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(payload): Json<ChatRequest>,
) -> Result<Json<QaResult>, ApiError> {
	let user_id = required_user(&headers)?;
	let provider = required_provider(&headers)?;

	state.service.select_provider(
		&provider.provider_id,
		&provider.api_key,
		&[Capability::Embeddings, Capability::Completion],
	)?;

	let entries = queries::list_entries(&state.db, user_id)
		.await?
		.into_iter()
		.map(journal_entry)
		.collect::<Vec<_>>();
	let result = state
		.service
		.answer_question(&payload.question, &entries, &provider.provider_id, &provider.api_key)
		.await?;

	Ok(Json(result))
}

async fn create_analysis(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(entry_id): Path<String>,
) -> Result<(StatusCode, Json<AnalysisResponse>), ApiError> {
	let user_id = required_user(&headers)?;
	let provider = required_provider(&headers)?;
	let entry_id = parse_entry_id(&entry_id)?;
	let entry = owned_entry(&state, user_id, entry_id).await?;

	if queries::fetch_analysis(&state.db, entry_id).await?.is_some() {
		return Err(json_error(
			StatusCode::CONFLICT,
			"conflict",
			"An analysis already exists for this entry. Use PUT to regenerate it.",
		));
	}

	let record = state.service.analyze(&entry.content, &provider.provider_id, &provider.api_key).await?;
	let row =
		queries::insert_analysis(&state.db, entry_id, &to_json(&record)?, OffsetDateTime::now_utc())
			.await?;

	Ok((StatusCode::CREATED, Json(row.try_into()?)))
}

async fn update_analysis(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(entry_id): Path<String>,
) -> Result<Json<AnalysisResponse>, ApiError> {
	let user_id = required_user(&headers)?;
	let provider = required_provider(&headers)?;
	let entry_id = parse_entry_id(&entry_id)?;
	let entry = owned_entry(&state, user_id, entry_id).await?;

	if queries::fetch_analysis(&state.db, entry_id).await?.is_none() {
		return Err(json_error(
			StatusCode::NOT_FOUND,
			"not_found",
			"No analysis exists for this entry yet. Use POST to create one.",
		));
	}

	let record = state.service.analyze(&entry.content, &provider.provider_id, &provider.api_key).await?;
	let row =
		queries::update_analysis(&state.db, entry_id, &to_json(&record)?, OffsetDateTime::now_utc())
			.await?;

	Ok(Json(row.try_into()?))
}

async fn get_analysis(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(entry_id): Path<String>,
) -> Result<Json<AnalysisResponse>, ApiError> {
	let user_id = required_user(&headers)?;
	let entry_id = parse_entry_id(&entry_id)?;

	owned_entry(&state, user_id, entry_id).await?;

	let row = queries::fetch_analysis(&state.db, entry_id).await?.ok_or_else(|| {
		json_error(StatusCode::NOT_FOUND, "not_found", "No analysis exists for this entry.")
	})?;

	Ok(Json(row.try_into()?))
}

async fn owned_entry(
	state: &AppState,
	user_id: &str,
	entry_id: Uuid,
) -> Result<JournalEntryRow, ApiError> {
	queries::fetch_entry(&state.db, user_id, entry_id)
		.await?
		.ok_or_else(|| json_error(StatusCode::NOT_FOUND, "not_found", "Entry not found."))
}

fn journal_entry(row: JournalEntryRow) -> JournalEntry {
	JournalEntry {
		id: row.entry_id.to_string(),
		owner_id: row.user_id,
		content: row.content,
		created_at: row.created_at,
	}
}

fn to_json(record: &AnalysisRecord) -> Result<serde_json::Value, ApiError> {
	serde_json::to_value(record).map_err(|err| {
		json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", err.to_string())
	})
}

fn parse_entry_id(raw: &str) -> Result<Uuid, ApiError> {
	Uuid::parse_str(raw).map_err(|_| {
		json_error(StatusCode::BAD_REQUEST, "invalid_request", "entry_id must be a UUID.")
	})
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, ApiError> {
	let Some(raw) = headers.get(name) else {
		return Ok(None);
	};
	let value = raw.to_str().map_err(|_| {
		json_error(StatusCode::BAD_REQUEST, "invalid_request", format!("{name} must be valid text."))
	})?;
	let value = value.trim();

	Ok((!value.is_empty()).then_some(value))
}

fn required_user(headers: &HeaderMap) -> Result<&str, ApiError> {
	header_value(headers, USER_ID_HEADER)?.ok_or_else(|| {
		json_error(
			StatusCode::BAD_REQUEST,
			"invalid_request",
			format!("{USER_ID_HEADER} header is required."),
		)
	})
}

fn optional_provider(headers: &HeaderMap) -> Result<Option<ProviderHeaders>, ApiError> {
	let provider_id = header_value(headers, PROVIDER_HEADER)?;
	let api_key = header_value(headers, API_KEY_HEADER)?;

	match (provider_id, api_key) {
		(Some(provider_id), Some(api_key)) => Ok(Some(ProviderHeaders {
			provider_id: provider_id.to_string(),
			api_key: api_key.to_string(),
		})),
		(None, None) => Ok(None),
		_ => Err(json_error(
			StatusCode::BAD_REQUEST,
			"configuration_error",
			format!("{PROVIDER_HEADER} and {API_KEY_HEADER} must be sent together."),
		)),
	}
}

fn required_provider(headers: &HeaderMap) -> Result<ProviderHeaders, ApiError> {
	optional_provider(headers)?.ok_or_else(|| {
		json_error(
			StatusCode::BAD_REQUEST,
			"configuration_error",
			format!("{PROVIDER_HEADER} and {API_KEY_HEADER} headers are required."),
		)
	})
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}

pub fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
	ApiError::new(status, code, message)
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		let (status, code) = match &err {
			ServiceError::Configuration { .. } => (StatusCode::BAD_REQUEST, "configuration_error"),
			ServiceError::InvalidRequest { .. } => (StatusCode::BAD_REQUEST, "invalid_request"),
			ServiceError::Authentication => (StatusCode::UNAUTHORIZED, "authentication_failed"),
			ServiceError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
			ServiceError::Extraction { .. } => (StatusCode::BAD_GATEWAY, "extraction_failed"),
			ServiceError::UpstreamUnavailable { .. } =>
				(StatusCode::BAD_GATEWAY, "upstream_unavailable"),
			ServiceError::Provider { .. } => (StatusCode::BAD_GATEWAY, "provider_error"),
		};

		if status.is_server_error() {
			tracing::error!(error = %err, error_code = code, "Request failed upstream.");
		}

		json_error(status, code, err.to_string())
	}
}

impl From<StorageError> for ApiError {
	fn from(err: StorageError) -> Self {
		match err {
			StorageError::NotFound(message) => json_error(StatusCode::NOT_FOUND, "not_found", message),
			StorageError::Conflict(message) => json_error(StatusCode::CONFLICT, "conflict", message),
			err => {
				tracing::error!(error = %err, "Storage request failed.");

				json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", "Storage request failed.")
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
