use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub indexing: Indexing,
	#[serde(default)]
	pub qa: Qa,
	#[serde(default)]
	pub analysis: Analysis,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection_prefix: String,
	/// Hard deadline for a freshly created collection to report ready.
	pub ready_timeout_ms: u64,
	#[serde(default = "default_ready_poll_interval_ms")]
	pub ready_poll_interval_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Providers {
	#[serde(default)]
	pub retry: Retry,
	pub openai: ProviderConfig,
	pub anthropic: ProviderConfig,
	pub gemini: ProviderConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Retry {
	pub max_attempts: u32,
	pub base_backoff_ms: u64,
	pub max_backoff_ms: u64,
}
impl Default for Retry {
	fn default() -> Self {
		Self { max_attempts: 3, base_backoff_ms: 500, max_backoff_ms: 8_000 }
	}
}

/// Settings for one provider family.
///
/// `completion_path` and `embedding_path` may contain a `{model}` placeholder, which is replaced
/// by the matching model name before the request is sent.
#[derive(Clone, Debug, Deserialize)]
pub struct ProviderConfig {
	pub api_base: String,
	pub completion_path: String,
	pub completion_model: String,
	/// Optional. Defaults to `api_base` when the embedding endpoint lives on the same host.
	pub embedding_api_base: Option<String>,
	pub embedding_path: String,
	pub embedding_model: String,
	pub embedding_dimensions: u32,
	/// Optional. Used when embeddings are served by a different vendor than completions.
	pub embedding_api_key: Option<String>,
	pub api_version: Option<String>,
	pub batch_size: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Indexing {
	pub max_concurrent_batches: u32,
	pub source_tag: String,
}
impl Default for Indexing {
	fn default() -> Self {
		Self { max_concurrent_batches: 1, source_tag: "journal".to_string() }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Qa {
	pub top_k: u32,
	/// Cosine similarity below which a match is not considered relevant.
	pub min_score: f32,
	pub max_question_chars: u32,
	pub max_tokens: u32,
}
impl Default for Qa {
	fn default() -> Self {
		Self { top_k: 5, min_score: 0.25, max_question_chars: 2_000, max_tokens: 500 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Analysis {
	pub max_tokens: u32,
	pub temperature: f32,
	pub max_entry_chars: u32,
}
impl Default for Analysis {
	fn default() -> Self {
		Self { max_tokens: 1_500, temperature: 0.2, max_entry_chars: 20_000 }
	}
}

fn default_ready_poll_interval_ms() -> u64 {
	1_000
}
