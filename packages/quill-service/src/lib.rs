pub mod analysis;
pub mod index;
pub mod indexer;
pub mod qa;

mod error;
mod retry;

pub use error::{Error, Result};
pub use index::IndexHandle;
pub use indexer::IndexReport;

use std::{
	collections::{HashMap, HashSet},
	future::Future,
	pin::Pin,
	sync::{Arc, Mutex},
};

use uuid::Uuid;

use quill_config::Config;
use quill_providers::{
	Capability, CompletionOptions, EmbedPurpose, ProviderAdapter, ProviderSelection,
};
use quill_storage::qdrant::{IndexedPoint, QdrantStore, SearchRequest, StoredMatch};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		providers: &'a quill_config::Providers,
		selection: &'a ProviderSelection,
		texts: &'a [String],
		purpose: EmbedPurpose,
	) -> BoxFuture<'a, quill_providers::Result<Vec<Vec<f32>>>>;
}

pub trait CompletionProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		providers: &'a quill_config::Providers,
		selection: &'a ProviderSelection,
		prompt: &'a str,
		options: CompletionOptions,
	) -> BoxFuture<'a, quill_providers::Result<String>>;
}

/// The vector-store operations the index manager and indexer rely on.
pub trait VectorStore
where
	Self: Send + Sync,
{
	fn list_collections(&self) -> BoxFuture<'_, quill_storage::Result<Vec<String>>>;

	fn create_collection<'a>(
		&'a self,
		name: &'a str,
		dimensions: u32,
	) -> BoxFuture<'a, quill_storage::Result<()>>;

	fn collection_ready<'a>(&'a self, name: &'a str) -> BoxFuture<'a, quill_storage::Result<bool>>;

	fn upsert<'a>(
		&'a self,
		name: &'a str,
		points: Vec<IndexedPoint>,
	) -> BoxFuture<'a, quill_storage::Result<()>>;

	fn content_hashes<'a>(
		&'a self,
		name: &'a str,
		keys: &'a [Uuid],
	) -> BoxFuture<'a, quill_storage::Result<HashMap<Uuid, String>>>;

	fn search<'a>(
		&'a self,
		name: &'a str,
		request: SearchRequest<'a>,
	) -> BoxFuture<'a, quill_storage::Result<Vec<StoredMatch>>>;
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		providers: &'a quill_config::Providers,
		selection: &'a ProviderSelection,
		texts: &'a [String],
		purpose: EmbedPurpose,
	) -> BoxFuture<'a, quill_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(async move {
			let adapter = ProviderAdapter::new(providers, selection)?;

			adapter.embed(texts, purpose).await
		})
	}
}
impl CompletionProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		providers: &'a quill_config::Providers,
		selection: &'a ProviderSelection,
		prompt: &'a str,
		options: CompletionOptions,
	) -> BoxFuture<'a, quill_providers::Result<String>> {
		Box::pin(async move {
			let adapter = ProviderAdapter::new(providers, selection)?;

			adapter.complete(prompt, options).await
		})
	}
}

impl VectorStore for QdrantStore {
	fn list_collections(&self) -> BoxFuture<'_, quill_storage::Result<Vec<String>>> {
		Box::pin(QdrantStore::list_collections(self))
	}

	fn create_collection<'a>(
		&'a self,
		name: &'a str,
		dimensions: u32,
	) -> BoxFuture<'a, quill_storage::Result<()>> {
		Box::pin(QdrantStore::create_collection(self, name, dimensions))
	}

	fn collection_ready<'a>(&'a self, name: &'a str) -> BoxFuture<'a, quill_storage::Result<bool>> {
		Box::pin(QdrantStore::collection_ready(self, name))
	}

	fn upsert<'a>(
		&'a self,
		name: &'a str,
		points: Vec<IndexedPoint>,
	) -> BoxFuture<'a, quill_storage::Result<()>> {
		Box::pin(QdrantStore::upsert(self, name, points))
	}

	fn content_hashes<'a>(
		&'a self,
		name: &'a str,
		keys: &'a [Uuid],
	) -> BoxFuture<'a, quill_storage::Result<HashMap<Uuid, String>>> {
		Box::pin(QdrantStore::content_hashes(self, name, keys))
	}

	fn search<'a>(
		&'a self,
		name: &'a str,
		request: SearchRequest<'a>,
	) -> BoxFuture<'a, quill_storage::Result<Vec<StoredMatch>>> {
		Box::pin(QdrantStore::search(self, name, request))
	}
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub completion: Arc<dyn CompletionProvider>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		completion: Arc<dyn CompletionProvider>,
	) -> Self {
		Self { embedding, completion }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), completion: provider }
	}
}

pub struct QuillService {
	pub cfg: Config,
	pub providers: Providers,
	pub vectors: Arc<dyn VectorStore>,
	ready_indexes: Mutex<HashSet<String>>,
}
impl QuillService {
	pub fn new(cfg: Config, qdrant: QdrantStore) -> Self {
		Self::with_parts(cfg, Providers::default(), Arc::new(qdrant))
	}

	pub fn with_parts(cfg: Config, providers: Providers, vectors: Arc<dyn VectorStore>) -> Self {
		Self { cfg, providers, vectors, ready_indexes: Mutex::new(HashSet::new()) }
	}

	/// Resolves the caller's provider choice and checks it can serve `capabilities`.
	///
	/// Never touches the network.
	pub fn select_provider(
		&self,
		provider_id: &str,
		api_key: &str,
		capabilities: &[Capability],
	) -> Result<ProviderSelection> {
		let selection = ProviderSelection::new(provider_id, api_key)?;

		for capability in capabilities {
			quill_providers::validate(&self.cfg.providers, &selection, *capability)?;
		}

		Ok(selection)
	}

	pub(crate) async fn embed_texts(
		&self,
		selection: &ProviderSelection,
		texts: &[String],
		purpose: EmbedPurpose,
		dimensions: u32,
	) -> Result<Vec<Vec<f32>>> {
		let embedding = self.providers.embedding.as_ref();
		let providers = &self.cfg.providers;
		let vectors = retry::with_retry(&providers.retry, "embed", move || {
			embedding.embed(providers, selection, texts, purpose)
		})
		.await?;

		if vectors.len() != texts.len() {
			return Err(Error::Provider {
				message: format!(
					"Embedding count mismatch: expected {}, got {}.",
					texts.len(),
					vectors.len()
				),
			});
		}
		if vectors.iter().any(|vector| vector.len() != dimensions as usize) {
			return Err(Error::Provider { message: "Embedding vector dimension mismatch.".to_string() });
		}

		Ok(vectors)
	}

	pub(crate) async fn complete_prompt(
		&self,
		selection: &ProviderSelection,
		prompt: &str,
		options: CompletionOptions,
	) -> Result<String> {
		let completion = self.providers.completion.as_ref();
		let providers = &self.cfg.providers;
		let text = retry::with_retry(&providers.retry, "complete", move || {
			completion.complete(providers, selection, prompt, options)
		})
		.await?;

		Ok(text)
	}
}
