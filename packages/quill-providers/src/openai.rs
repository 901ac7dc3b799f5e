use reqwest::Client;
use serde_json::Value;

use quill_config::ProviderConfig;

use crate::{AuthScheme, CompletionOptions, Error, Result};

pub async fn embed(
	client: &Client,
	cfg: &ProviderConfig,
	api_base: &str,
	api_key: &str,
	texts: &[String],
) -> Result<Vec<Vec<f32>>> {
	let url = crate::endpoint(api_base, &cfg.embedding_path, &cfg.embedding_model);
	let body = serde_json::json!({
		"model": cfg.embedding_model,
		"input": texts,
		"dimensions": cfg.embedding_dimensions,
	});
	let json = crate::send_json(
		client
			.post(url)
			.headers(crate::auth_headers(AuthScheme::Bearer(api_key), &cfg.default_headers)?)
			.json(&body),
	)
	.await?;

	parse_embedding_response(json)
}

pub async fn complete(
	client: &Client,
	cfg: &ProviderConfig,
	api_key: &str,
	prompt: &str,
	options: CompletionOptions,
) -> Result<String> {
	let url = crate::endpoint(&cfg.api_base, &cfg.completion_path, &cfg.completion_model);
	let body = serde_json::json!({
		"model": cfg.completion_model,
		"temperature": options.temperature,
		"max_tokens": options.max_tokens,
		"messages": [{ "role": "user", "content": prompt }],
	});
	let json = crate::send_json(
		client
			.post(url)
			.headers(crate::auth_headers(AuthScheme::Bearer(api_key), &cfg.default_headers)?)
			.json(&body),
	)
	.await?;

	parse_completion_response(&json)
}

/// Parses the `data[].embedding` shape shared by OpenAI-compatible embedding endpoints.
pub(crate) fn parse_embedding_response(json: Value) -> Result<Vec<Vec<f32>>> {
	let data = json
		.get("data")
		.and_then(|v| v.as_array())
		.ok_or_else(|| Error::invalid_response("Embedding response is missing data array."))?;

	let mut indexed = data
		.iter()
		.enumerate()
		.map(|(position, item)| {
			let index = item
				.get("index")
				.and_then(|v| v.as_u64())
				.map_or(position, |v| v as usize);
			let embedding = item
				.get("embedding")
				.and_then(|v| v.as_array())
				.ok_or_else(|| Error::invalid_response("Embedding item missing embedding array."))?;

			Ok((index, crate::parse_f32_array(embedding)?))
		})
		.collect::<Result<Vec<(usize, Vec<f32>)>>>()?;

	indexed.sort_by_key(|(index, _)| *index);

	Ok(indexed.into_iter().map(|(_, vec)| vec).collect())
}

fn parse_completion_response(json: &Value) -> Result<String> {
	json.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.map(str::to_string)
		.ok_or_else(|| Error::invalid_response("Completion response is missing message content."))
}
