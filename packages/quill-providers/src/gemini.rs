use reqwest::Client;
use serde_json::Value;

use quill_config::ProviderConfig;

use crate::{AuthScheme, CompletionOptions, EmbedPurpose, Error, Result};

const API_KEY_HEADER: &str = "x-goog-api-key";

pub async fn embed(
	client: &Client,
	cfg: &ProviderConfig,
	api_base: &str,
	api_key: &str,
	texts: &[String],
	purpose: EmbedPurpose,
) -> Result<Vec<Vec<f32>>> {
	let url = crate::endpoint(api_base, &cfg.embedding_path, &cfg.embedding_model);
	let model = format!("models/{}", cfg.embedding_model);
	let requests = texts
		.iter()
		.map(|text| {
			serde_json::json!({
				"model": model,
				"content": { "parts": [{ "text": text }] },
				"taskType": task_type(purpose),
				"outputDimensionality": cfg.embedding_dimensions,
			})
		})
		.collect::<Vec<_>>();
	let body = serde_json::json!({ "requests": requests });
	let json = crate::send_json(
		client
			.post(url)
			.headers(crate::auth_headers(
				AuthScheme::Header(API_KEY_HEADER, api_key),
				&cfg.default_headers,
			)?)
			.json(&body),
	)
	.await?;

	parse_batch_embeddings(&json)
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
		"contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
		"generationConfig": {
			"temperature": options.temperature,
			"maxOutputTokens": options.max_tokens,
		},
	});
	let json = crate::send_json(
		client
			.post(url)
			.headers(crate::auth_headers(
				AuthScheme::Header(API_KEY_HEADER, api_key),
				&cfg.default_headers,
			)?)
			.json(&body),
	)
	.await?;

	parse_generate_response(&json)
}

fn task_type(purpose: EmbedPurpose) -> &'static str {
	match purpose {
		EmbedPurpose::Document => "RETRIEVAL_DOCUMENT",
		EmbedPurpose::Query => "RETRIEVAL_QUERY",
	}
}

fn parse_batch_embeddings(json: &Value) -> Result<Vec<Vec<f32>>> {
	let embeddings = json
		.get("embeddings")
		.and_then(|v| v.as_array())
		.ok_or_else(|| Error::invalid_response("Embedding response is missing embeddings array."))?;
	let mut out = Vec::with_capacity(embeddings.len());

	for item in embeddings {
		let values = item
			.get("values")
			.and_then(|v| v.as_array())
			.ok_or_else(|| Error::invalid_response("Embedding item missing values array."))?;

		out.push(crate::parse_f32_array(values)?);
	}

	Ok(out)
}

fn parse_generate_response(json: &Value) -> Result<String> {
	let parts = json
		.get("candidates")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|candidate| candidate.get("content"))
		.and_then(|content| content.get("parts"))
		.and_then(|parts| parts.as_array())
		.ok_or_else(|| Error::invalid_response("Generate response is missing candidate parts."))?;
	let text = parts
		.iter()
		.filter_map(|part| part.get("text").and_then(|t| t.as_str()))
		.collect::<Vec<_>>()
		.join("");

	if text.is_empty() {
		return Err(Error::invalid_response("Generate response has no text parts."));
	}

	Ok(text)
}
