use reqwest::{Client, header::HeaderName};
use serde_json::Value;

use quill_config::ProviderConfig;

use crate::{AuthScheme, CompletionOptions, Error, Result};

const DEFAULT_API_VERSION: &str = "2023-06-01";

pub async fn complete(
	client: &Client,
	cfg: &ProviderConfig,
	api_key: &str,
	prompt: &str,
	options: CompletionOptions,
) -> Result<String> {
	let url = crate::endpoint(&cfg.api_base, &cfg.completion_path, &cfg.completion_model);
	let mut headers =
		crate::auth_headers(AuthScheme::Header("x-api-key", api_key), &cfg.default_headers)?;

	headers.insert(
		HeaderName::from_static("anthropic-version"),
		cfg.api_version.as_deref().unwrap_or(DEFAULT_API_VERSION).parse()?,
	);

	let body = serde_json::json!({
		"model": cfg.completion_model,
		"max_tokens": options.max_tokens,
		"temperature": options.temperature,
		"messages": [{ "role": "user", "content": prompt }],
	});
	let json = crate::send_json(client.post(url).headers(headers).json(&body)).await?;

	parse_message_response(&json)
}

fn parse_message_response(json: &Value) -> Result<String> {
	let blocks = json
		.get("content")
		.and_then(|v| v.as_array())
		.ok_or_else(|| Error::invalid_response("Message response is missing content blocks."))?;
	let text = blocks
		.iter()
		.filter(|block| block.get("type").and_then(|t| t.as_str()) == Some("text"))
		.filter_map(|block| block.get("text").and_then(|t| t.as_str()))
		.collect::<Vec<_>>()
		.join("");

	if text.is_empty() {
		return Err(Error::invalid_response("Message response has no text content."));
	}

	Ok(text)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn joins_text_blocks() {
		let json = serde_json::json!({
			"content": [
				{ "type": "text", "text": "Running " },
				{ "type": "tool_use", "id": "t1" },
				{ "type": "text", "text": "made you proud." }
			]
		});

		assert_eq!(parse_message_response(&json).expect("parse failed"), "Running made you proud.");
	}

	#[test]
	fn empty_content_is_invalid() {
		let json = serde_json::json!({ "content": [] });

		assert!(matches!(parse_message_response(&json), Err(Error::InvalidResponse { .. })));
	}
}
