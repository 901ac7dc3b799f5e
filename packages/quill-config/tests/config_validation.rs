use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use quill_config::{Config, Error};

const SAMPLE_CONFIG_TOML: &str = include_str!("fixtures/sample_config.toml");

fn sample_with(section: &[&str], key: &str, value: Value) -> String {
	let mut root: Value = toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse sample config.");
	let mut table = root.as_table_mut().expect("Sample config must be a table.");

	for name in section {
		table = table
			.get_mut(*name)
			.and_then(Value::as_table_mut)
			.unwrap_or_else(|| panic!("Sample config must include [{name}]."));
	}

	table.insert(key.to_string(), value);

	toml::to_string(&root).expect("Failed to render sample config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("quill_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn load_payload(payload: String) -> quill_config::Result<Config> {
	let path = write_temp_config(payload);
	let result = quill_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result
}

fn expect_validation(payload: String, needle: &str) {
	let err = load_payload(payload).expect_err("Expected validation error.");
	let message = err.to_string();

	assert!(matches!(err, Error::Validation { .. }), "Unexpected error kind: {err:?}");
	assert!(message.contains(needle), "Unexpected error message: {message}");
}

#[test]
fn sample_config_loads_and_normalizes() {
	let cfg = load_payload(SAMPLE_CONFIG_TOML.to_string()).expect("Sample config must load.");

	assert_eq!(cfg.providers.openai.api_base, "https://api.openai.com");
	assert_eq!(cfg.providers.anthropic.embedding_api_key, None);
	assert_eq!(
		cfg.providers.anthropic.embedding_api_base.as_deref(),
		Some("https://api.voyageai.com")
	);
	assert_eq!(cfg.qa.top_k, 5);
	assert_eq!(cfg.indexing.max_concurrent_batches, 2);
}

#[test]
fn optional_sections_fall_back_to_defaults() {
	let mut root: Value = toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse sample config.");
	let table = root.as_table_mut().expect("Sample config must be a table.");

	table.remove("qa");
	table.remove("analysis");
	table.remove("indexing");

	let cfg = load_payload(toml::to_string(&root).expect("Failed to render config."))
		.expect("Config without optional sections must load.");

	assert_eq!(cfg.qa.top_k, 5);
	assert_eq!(cfg.qa.max_tokens, 500);
	assert_eq!(cfg.analysis.max_tokens, 1_500);
	assert_eq!(cfg.indexing.source_tag, "journal");
}

#[test]
fn missing_file_reports_read_error() {
	let path = env::temp_dir().join("quill_config_test_missing_file.toml");
	let err = quill_config::load(&path).expect_err("Expected read error.");

	assert!(matches!(err, Error::ReadConfig { .. }), "Unexpected error kind: {err:?}");
}

#[test]
fn malformed_toml_reports_parse_error() {
	let err = load_payload("[service\nhttp_bind = 1".to_string()).expect_err("Expected parse error.");

	assert!(matches!(err, Error::ParseConfig { .. }), "Unexpected error kind: {err:?}");
}

#[test]
fn top_k_must_be_positive() {
	expect_validation(sample_with(&["qa"], "top_k", Value::Integer(0)), "qa.top_k");
}

#[test]
fn min_score_must_be_a_similarity() {
	expect_validation(sample_with(&["qa"], "min_score", Value::Float(1.5)), "qa.min_score");
}

#[test]
fn embedding_dimensions_must_be_positive() {
	expect_validation(
		sample_with(&["providers", "gemini"], "embedding_dimensions", Value::Integer(0)),
		"providers.gemini.embedding_dimensions",
	);
}

#[test]
fn provider_batch_size_must_be_positive() {
	expect_validation(
		sample_with(&["providers", "openai"], "batch_size", Value::Integer(0)),
		"providers.openai.batch_size",
	);
}

#[test]
fn poll_interval_cannot_exceed_ready_timeout() {
	expect_validation(
		sample_with(&["storage", "qdrant"], "ready_poll_interval_ms", Value::Integer(60_000)),
		"ready_poll_interval_ms must not exceed",
	);
}

#[test]
fn retry_needs_at_least_one_attempt() {
	expect_validation(
		sample_with(&["providers", "retry"], "max_attempts", Value::Integer(0)),
		"providers.retry.max_attempts",
	);
}

#[test]
fn collection_prefix_rejects_unsafe_characters() {
	expect_validation(
		sample_with(&["storage", "qdrant"], "collection_prefix", Value::String("a b".to_string())),
		"storage.qdrant.collection_prefix",
	);
}

#[test]
fn default_header_values_must_be_strings() {
	let mut headers = toml::map::Map::new();

	headers.insert("x-trace".to_string(), Value::Integer(1));

	expect_validation(
		sample_with(&["providers", "anthropic"], "default_headers", Value::Table(headers)),
		"providers.anthropic.default_headers",
	);
}
