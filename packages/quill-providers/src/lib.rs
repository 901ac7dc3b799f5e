pub mod anthropic;
pub mod gemini;
pub mod openai;
pub mod voyage;

mod error;

pub use error::{Error, Result};

use std::{fmt, str::FromStr, time::Duration};

use reqwest::{
	Client, RequestBuilder, Response,
	header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, RETRY_AFTER},
};
use serde_json::{Map, Value};

use quill_config::{ProviderConfig, Providers};

/// The closed set of provider families a user can pick from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderKind {
	OpenAi,
	Anthropic,
	Gemini,
}
impl ProviderKind {
	pub const ALL: [Self; 3] = [Self::OpenAi, Self::Anthropic, Self::Gemini];

	pub fn family(self) -> &'static str {
		match self {
			Self::OpenAi => "openai",
			Self::Anthropic => "anthropic",
			Self::Gemini => "gemini",
		}
	}

	pub fn settings(self, providers: &Providers) -> &ProviderConfig {
		match self {
			Self::OpenAi => &providers.openai,
			Self::Anthropic => &providers.anthropic,
			Self::Gemini => &providers.gemini,
		}
	}
}
impl FromStr for ProviderKind {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		let normalized = raw.trim().to_ascii_lowercase();

		Self::ALL.into_iter().find(|kind| kind.family() == normalized).ok_or_else(|| {
			Error::configuration(format!(
				"Unknown provider {raw:?}. Expected one of openai, anthropic, or gemini."
			))
		})
	}
}
impl fmt::Display for ProviderKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.family())
	}
}

/// A user's provider choice for one request.
#[derive(Clone)]
pub struct ProviderSelection {
	pub kind: ProviderKind,
	api_key: String,
}
impl ProviderSelection {
	pub fn new(provider_id: &str, api_key: impl Into<String>) -> Result<Self> {
		let kind = provider_id.parse()?;

		Self::with_kind(kind, api_key)
	}

	pub fn with_kind(kind: ProviderKind, api_key: impl Into<String>) -> Result<Self> {
		let api_key = api_key.into().trim().to_string();

		if api_key.is_empty() {
			return Err(Error::configuration(format!("An API key is required for {kind}.")));
		}

		Ok(Self { kind, api_key })
	}

	pub fn api_key(&self) -> &str {
		&self.api_key
	}
}
impl fmt::Debug for ProviderSelection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ProviderSelection")
			.field("kind", &self.kind)
			.field("api_key", &"[REDACTED]")
			.finish()
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
	Completion,
	Embeddings,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbedPurpose {
	Document,
	Query,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompletionOptions {
	pub temperature: f32,
	pub max_tokens: u32,
}

/// Checks that `selection` can serve `capability` without touching the network.
pub fn validate(
	providers: &Providers,
	selection: &ProviderSelection,
	capability: Capability,
) -> Result<()> {
	match capability {
		Capability::Completion => Ok(()),
		Capability::Embeddings => embedding_credentials(providers, selection).map(|_| ()),
	}
}

/// Binds one provider family's settings to the caller's key.
pub struct ProviderAdapter<'a> {
	kind: ProviderKind,
	settings: &'a ProviderConfig,
	providers: &'a Providers,
	selection: &'a ProviderSelection,
	client: Client,
}
impl<'a> ProviderAdapter<'a> {
	pub fn new(providers: &'a Providers, selection: &'a ProviderSelection) -> Result<Self> {
		let settings = selection.kind.settings(providers);
		let client =
			Client::builder().timeout(Duration::from_millis(settings.timeout_ms)).build()?;

		Ok(Self { kind: selection.kind, settings, providers, selection, client })
	}

	pub fn kind(&self) -> ProviderKind {
		self.kind
	}

	pub fn family(&self) -> &'static str {
		self.kind.family()
	}

	pub fn dimensions(&self) -> u32 {
		self.settings.embedding_dimensions
	}

	pub fn batch_size(&self) -> usize {
		self.settings.batch_size as usize
	}

	pub async fn embed(&self, texts: &[String], purpose: EmbedPurpose) -> Result<Vec<Vec<f32>>> {
		if texts.is_empty() {
			return Ok(Vec::new());
		}

		let (api_base, api_key) = embedding_credentials(self.providers, self.selection)?;
		let vectors = match self.kind {
			ProviderKind::OpenAi =>
				openai::embed(&self.client, self.settings, api_base, api_key, texts).await?,
			ProviderKind::Anthropic =>
				voyage::embed(&self.client, self.settings, api_base, api_key, texts, purpose)
					.await?,
			ProviderKind::Gemini =>
				gemini::embed(&self.client, self.settings, api_base, api_key, texts, purpose)
					.await?,
		};

		check_vectors(&vectors, texts.len(), self.dimensions())?;

		Ok(vectors)
	}

	pub async fn complete(&self, prompt: &str, options: CompletionOptions) -> Result<String> {
		let api_key = self.selection.api_key();

		match self.kind {
			ProviderKind::OpenAi =>
				openai::complete(&self.client, self.settings, api_key, prompt, options).await,
			ProviderKind::Anthropic =>
				anthropic::complete(&self.client, self.settings, api_key, prompt, options).await,
			ProviderKind::Gemini =>
				gemini::complete(&self.client, self.settings, api_key, prompt, options).await,
		}
	}
}

pub enum AuthScheme<'a> {
	Bearer(&'a str),
	Header(&'static str, &'a str),
}

pub fn auth_headers(auth: AuthScheme<'_>, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	match auth {
		AuthScheme::Bearer(api_key) => {
			let mut value: HeaderValue = format!("Bearer {api_key}").parse()?;

			value.set_sensitive(true);
			headers.insert(AUTHORIZATION, value);
		},
		AuthScheme::Header(name, api_key) => {
			let mut value: HeaderValue = api_key.parse()?;

			value.set_sensitive(true);
			headers.insert(HeaderName::from_static(name), value);
		},
	}

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::configuration("Default header values must be strings."));
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

pub(crate) fn endpoint(api_base: &str, path: &str, model: &str) -> String {
	format!("{}{}", api_base.trim_end_matches('/'), path.replace("{model}", model))
}

pub(crate) async fn send_json(request: RequestBuilder) -> Result<Value> {
	let res = request.send().await?;

	read_json(res).await
}

async fn read_json(res: Response) -> Result<Value> {
	let status = res.status();

	if status.is_success() {
		return Ok(res.json().await?);
	}

	let retry_after_ms = res
		.headers()
		.get(RETRY_AFTER)
		.and_then(|value| value.to_str().ok())
		.and_then(|value| value.trim().parse::<u64>().ok())
		.map(|seconds| seconds.saturating_mul(1_000));
	let body = res.text().await.unwrap_or_default();

	tracing::debug!(status = status.as_u16(), "Provider request failed.");

	Err(Error::from_status(status, retry_after_ms, &body))
}

fn embedding_credentials<'a>(
	providers: &'a Providers,
	selection: &'a ProviderSelection,
) -> Result<(&'a str, &'a str)> {
	let settings = selection.kind.settings(providers);
	let api_base = settings.embedding_api_base.as_deref().unwrap_or(settings.api_base.as_str());

	match selection.kind {
		ProviderKind::OpenAi | ProviderKind::Gemini => Ok((api_base, selection.api_key())),
		ProviderKind::Anthropic => {
			let key = settings.embedding_api_key.as_deref().ok_or_else(|| {
				Error::configuration(
					"Anthropic embeddings require providers.anthropic.embedding_api_key.",
				)
			})?;

			Ok((api_base, key))
		},
	}
}

fn check_vectors(vectors: &[Vec<f32>], expected_count: usize, dimensions: u32) -> Result<()> {
	if vectors.len() != expected_count {
		return Err(Error::invalid_response(format!(
			"Embedding provider returned {} vectors for {} inputs.",
			vectors.len(),
			expected_count
		)));
	}
	if let Some(vector) = vectors.iter().find(|vector| vector.len() != dimensions as usize) {
		return Err(Error::invalid_response(format!(
			"Embedding dimension {} does not match configured embedding_dimensions {}.",
			vector.len(),
			dimensions
		)));
	}

	Ok(())
}

pub(crate) fn parse_f32_array(values: &[Value]) -> Result<Vec<f32>> {
	let mut vec = Vec::with_capacity(values.len());

	for value in values {
		let number =
			value.as_f64().ok_or_else(|| Error::invalid_response("Embedding value must be numeric."))?;

		vec.push(number as f32);
	}

	Ok(vec)
}
