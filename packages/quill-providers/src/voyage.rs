//! Voyage AI embeddings, used for the Anthropic family.

use reqwest::Client;

use quill_config::ProviderConfig;

use crate::{AuthScheme, EmbedPurpose, Result};

pub async fn embed(
	client: &Client,
	cfg: &ProviderConfig,
	api_base: &str,
	api_key: &str,
	texts: &[String],
	purpose: EmbedPurpose,
) -> Result<Vec<Vec<f32>>> {
	let url = crate::endpoint(api_base, &cfg.embedding_path, &cfg.embedding_model);
	let body = serde_json::json!({
		"model": cfg.embedding_model,
		"input": texts,
		"input_type": input_type(purpose),
		"output_dimension": cfg.embedding_dimensions,
	});
	let json = crate::send_json(
		client
			.post(url)
			.headers(crate::auth_headers(AuthScheme::Bearer(api_key), &cfg.default_headers)?)
			.json(&body),
	)
	.await?;

	crate::openai::parse_embedding_response(json)
}

fn input_type(purpose: EmbedPurpose) -> &'static str {
	match purpose {
		EmbedPurpose::Document => "document",
		EmbedPurpose::Query => "query",
	}
}
