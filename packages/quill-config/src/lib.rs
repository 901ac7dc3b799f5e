mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Analysis, Config, Indexing, Postgres, ProviderConfig, Providers, Qa, Qdrant, Retry, Service,
	Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.qdrant.collection_prefix.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.collection_prefix must be non-empty.".to_string(),
		});
	}
	if !cfg
		.storage
		.qdrant
		.collection_prefix
		.chars()
		.all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
	{
		return Err(Error::Validation {
			message: "storage.qdrant.collection_prefix may only contain ASCII letters, digits, '_' or '-'."
				.to_string(),
		});
	}
	if cfg.storage.qdrant.ready_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "storage.qdrant.ready_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.qdrant.ready_poll_interval_ms == 0 {
		return Err(Error::Validation {
			message: "storage.qdrant.ready_poll_interval_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.qdrant.ready_poll_interval_ms > cfg.storage.qdrant.ready_timeout_ms {
		return Err(Error::Validation {
			message: "storage.qdrant.ready_poll_interval_ms must not exceed storage.qdrant.ready_timeout_ms."
				.to_string(),
		});
	}
	if cfg.providers.retry.max_attempts == 0 {
		return Err(Error::Validation {
			message: "providers.retry.max_attempts must be at least one.".to_string(),
		});
	}
	if cfg.providers.retry.base_backoff_ms > cfg.providers.retry.max_backoff_ms {
		return Err(Error::Validation {
			message: "providers.retry.base_backoff_ms must not exceed providers.retry.max_backoff_ms."
				.to_string(),
		});
	}

	for (label, provider) in [
		("openai", &cfg.providers.openai),
		("anthropic", &cfg.providers.anthropic),
		("gemini", &cfg.providers.gemini),
	] {
		validate_provider(label, provider)?;
	}

	if cfg.indexing.max_concurrent_batches == 0 {
		return Err(Error::Validation {
			message: "indexing.max_concurrent_batches must be greater than zero.".to_string(),
		});
	}
	if cfg.indexing.source_tag.trim().is_empty() {
		return Err(Error::Validation {
			message: "indexing.source_tag must be non-empty.".to_string(),
		});
	}
	if cfg.qa.top_k == 0 {
		return Err(Error::Validation { message: "qa.top_k must be greater than zero.".to_string() });
	}
	if !cfg.qa.min_score.is_finite() {
		return Err(Error::Validation { message: "qa.min_score must be a finite number.".to_string() });
	}
	if !(0.0..=1.0).contains(&cfg.qa.min_score) {
		return Err(Error::Validation {
			message: "qa.min_score must be in the range 0.0-1.0.".to_string(),
		});
	}
	if cfg.qa.max_question_chars == 0 {
		return Err(Error::Validation {
			message: "qa.max_question_chars must be greater than zero.".to_string(),
		});
	}
	if cfg.qa.max_tokens == 0 {
		return Err(Error::Validation {
			message: "qa.max_tokens must be greater than zero.".to_string(),
		});
	}
	if cfg.analysis.max_tokens == 0 {
		return Err(Error::Validation {
			message: "analysis.max_tokens must be greater than zero.".to_string(),
		});
	}
	if !cfg.analysis.temperature.is_finite() || cfg.analysis.temperature < 0.0 {
		return Err(Error::Validation {
			message: "analysis.temperature must be a finite number, zero or greater.".to_string(),
		});
	}
	if cfg.analysis.max_entry_chars == 0 {
		return Err(Error::Validation {
			message: "analysis.max_entry_chars must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn validate_provider(label: &str, provider: &ProviderConfig) -> Result<()> {
	for (field, value) in [
		("api_base", &provider.api_base),
		("completion_path", &provider.completion_path),
		("completion_model", &provider.completion_model),
		("embedding_path", &provider.embedding_path),
		("embedding_model", &provider.embedding_model),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("providers.{label}.{field} must be non-empty."),
			});
		}
	}

	if provider.embedding_dimensions == 0 {
		return Err(Error::Validation {
			message: format!("providers.{label}.embedding_dimensions must be greater than zero."),
		});
	}
	if provider.batch_size == 0 {
		return Err(Error::Validation {
			message: format!("providers.{label}.batch_size must be greater than zero."),
		});
	}
	if provider.timeout_ms == 0 {
		return Err(Error::Validation {
			message: format!("providers.{label}.timeout_ms must be greater than zero."),
		});
	}
	if provider.default_headers.values().any(|value| !value.is_string()) {
		return Err(Error::Validation {
			message: format!("providers.{label}.default_headers values must be strings."),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for provider in
		[&mut cfg.providers.openai, &mut cfg.providers.anthropic, &mut cfg.providers.gemini]
	{
		for slot in [
			&mut provider.embedding_api_base,
			&mut provider.embedding_api_key,
			&mut provider.api_version,
		] {
			if slot.as_deref().map(|value| value.trim().is_empty()).unwrap_or(false) {
				*slot = None;
			}
		}

		provider.api_base = provider.api_base.trim_end_matches('/').to_string();
	}

	cfg.storage.qdrant.collection_prefix = cfg.storage.qdrant.collection_prefix.trim().to_string();
}
