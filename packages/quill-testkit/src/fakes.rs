//! In-process stand-ins for the provider and vector-store seams.
//!
//! Every fake counts its calls so tests can assert that a code path stayed off the network.

use std::{
	collections::{HashMap, HashSet},
	sync::{
		Mutex,
		atomic::{AtomicUsize, Ordering},
	},
};

use uuid::Uuid;

use quill_providers::{CompletionOptions, EmbedPurpose, ProviderSelection};
use quill_service::{BoxFuture, CompletionProvider, EmbeddingProvider, VectorStore};
use quill_storage::qdrant::{IndexedPoint, SearchRequest, StoredMatch};

/// Keyword-topic embeddings.
///
/// Component `i` counts occurrences of topic `i`'s keywords. Text matching no topic lands on the
/// last component, so unrelated text is orthogonal to every topic.
pub struct ScriptedEmbedding {
	topics: Vec<Vec<String>>,
	fail_marker: Option<String>,
	rate_limits_left: AtomicUsize,
	calls: AtomicUsize,
	texts: Mutex<Vec<String>>,
}
impl ScriptedEmbedding {
	pub fn new(topics: &[&[&str]]) -> Self {
		Self {
			topics: topics
				.iter()
				.map(|words| words.iter().map(|w| w.to_ascii_lowercase()).collect())
				.collect(),
			fail_marker: None,
			rate_limits_left: AtomicUsize::new(0),
			calls: AtomicUsize::new(0),
			texts: Mutex::new(Vec::new()),
		}
	}

	/// Fails any call whose input contains `marker`, as an upstream 500 would.
	pub fn failing_on(mut self, marker: &str) -> Self {
		self.fail_marker = Some(marker.to_string());

		self
	}

	/// Answers the first `times` calls with a rate-limit error.
	pub fn rate_limited(self, times: usize) -> Self {
		self.rate_limits_left.store(times, Ordering::SeqCst);

		self
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	/// Every text embedded so far, in call order.
	pub fn embedded_texts(&self) -> Vec<String> {
		self.texts.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	pub fn vector_for(&self, text: &str, dimensions: usize) -> Vec<f32> {
		let lowered = text.to_ascii_lowercase();
		let mut vector = vec![0.0_f32; dimensions];

		for (index, words) in self.topics.iter().enumerate().take(dimensions.saturating_sub(1)) {
			vector[index] = words.iter().map(|word| lowered.matches(word.as_str()).count()).sum::<usize>()
				as f32;
		}

		if vector.iter().all(|value| *value == 0.0)
			&& let Some(last) = vector.last_mut()
		{
			*last = 1.0;
		}

		vector
	}

	fn respond(
		&self,
		dimensions: usize,
		texts: &[String],
	) -> quill_providers::Result<Vec<Vec<f32>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		if self
			.rate_limits_left
			.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
			.is_ok()
		{
			return Err(quill_providers::Error::RateLimited { status: 429, retry_after_ms: None });
		}
		if let Some(marker) = &self.fail_marker
			&& texts.iter().any(|text| text.contains(marker.as_str()))
		{
			return Err(quill_providers::Error::Unavailable {
				message: "status 500: simulated upstream failure".to_string(),
			});
		}

		self.texts.lock().unwrap_or_else(|err| err.into_inner()).extend(texts.iter().cloned());

		Ok(texts.iter().map(|text| self.vector_for(text, dimensions)).collect())
	}
}
impl EmbeddingProvider for ScriptedEmbedding {
	fn embed<'a>(
		&'a self,
		providers: &'a quill_config::Providers,
		selection: &'a ProviderSelection,
		texts: &'a [String],
		_: EmbedPurpose,
	) -> BoxFuture<'a, quill_providers::Result<Vec<Vec<f32>>>> {
		let dimensions = selection.kind.settings(providers).embedding_dimensions as usize;

		Box::pin(async move { self.respond(dimensions, texts) })
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionFailure {
	Authentication,
	RateLimited,
	Unavailable,
}

/// Replies with a fixed text and records every prompt it receives.
pub struct ScriptedCompletion {
	reply: String,
	failure: Option<CompletionFailure>,
	calls: AtomicUsize,
	prompts: Mutex<Vec<String>>,
	options: Mutex<Vec<CompletionOptions>>,
}
impl ScriptedCompletion {
	pub fn replying(reply: &str) -> Self {
		Self {
			reply: reply.to_string(),
			failure: None,
			calls: AtomicUsize::new(0),
			prompts: Mutex::new(Vec::new()),
			options: Mutex::new(Vec::new()),
		}
	}

	pub fn failing(failure: CompletionFailure) -> Self {
		Self { failure: Some(failure), ..Self::replying("") }
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn prompts(&self) -> Vec<String> {
		self.prompts.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	pub fn options(&self) -> Vec<CompletionOptions> {
		self.options.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}
}
impl CompletionProvider for ScriptedCompletion {
	fn complete<'a>(
		&'a self,
		_: &'a quill_config::Providers,
		_: &'a ProviderSelection,
		prompt: &'a str,
		options: CompletionOptions,
	) -> BoxFuture<'a, quill_providers::Result<String>> {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);
			self.prompts.lock().unwrap_or_else(|err| err.into_inner()).push(prompt.to_string());
			self.options.lock().unwrap_or_else(|err| err.into_inner()).push(options);

			match self.failure {
				None => Ok(self.reply.clone()),
				Some(CompletionFailure::Authentication) =>
					Err(quill_providers::Error::Authentication { status: 401 }),
				Some(CompletionFailure::RateLimited) =>
					Err(quill_providers::Error::RateLimited { status: 429, retry_after_ms: None }),
				Some(CompletionFailure::Unavailable) => Err(quill_providers::Error::Unavailable {
					message: "connection refused".to_string(),
				}),
			}
		})
	}
}

#[derive(Default)]
struct Collection {
	dimensions: u32,
	points: HashMap<Uuid, IndexedPoint>,
}

/// Cosine-similarity vector store held in memory.
#[derive(Default)]
pub struct InMemoryVectorStore {
	collections: Mutex<HashMap<String, Collection>>,
	not_ready_polls: AtomicUsize,
	never_ready: bool,
	fail_upserts_for: Mutex<HashSet<String>>,
	list_calls: AtomicUsize,
	create_calls: AtomicUsize,
	ready_calls: AtomicUsize,
	upsert_calls: AtomicUsize,
	search_calls: AtomicUsize,
}
impl InMemoryVectorStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Reports "not ready" for the first `polls` readiness checks.
	pub fn ready_after(self, polls: usize) -> Self {
		self.not_ready_polls.store(polls, Ordering::SeqCst);

		self
	}

	pub fn never_ready() -> Self {
		Self { never_ready: true, ..Self::default() }
	}

	/// Fails any upsert that contains `entry_id`.
	pub fn fail_upserts_for(&self, entry_id: &str) {
		self.fail_upserts_for
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.insert(entry_id.to_string());
	}

	pub fn collection_names(&self) -> Vec<String> {
		let mut names = self
			.collections
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.keys()
			.cloned()
			.collect::<Vec<_>>();

		names.sort();

		names
	}

	pub fn collection_dimensions(&self, name: &str) -> Option<u32> {
		self.collections.lock().unwrap_or_else(|err| err.into_inner()).get(name).map(|c| c.dimensions)
	}

	/// Stored points sorted by entry id.
	pub fn points(&self, name: &str) -> Vec<IndexedPoint> {
		let collections = self.collections.lock().unwrap_or_else(|err| err.into_inner());
		let mut points = collections
			.get(name)
			.map(|c| c.points.values().cloned().collect::<Vec<_>>())
			.unwrap_or_default();

		points.sort_by(|a, b| (&a.namespace, &a.entry_id).cmp(&(&b.namespace, &b.entry_id)));

		points
	}

	pub fn create_calls(&self) -> usize {
		self.create_calls.load(Ordering::SeqCst)
	}

	pub fn ready_calls(&self) -> usize {
		self.ready_calls.load(Ordering::SeqCst)
	}

	pub fn upsert_calls(&self) -> usize {
		self.upsert_calls.load(Ordering::SeqCst)
	}

	pub fn search_calls(&self) -> usize {
		self.search_calls.load(Ordering::SeqCst)
	}

	pub fn total_calls(&self) -> usize {
		self.list_calls.load(Ordering::SeqCst)
			+ self.create_calls()
			+ self.ready_calls()
			+ self.upsert_calls()
			+ self.search_calls()
	}

	fn missing(name: &str) -> quill_storage::Error {
		quill_storage::Error::NotFound(format!("Collection {name:?} does not exist."))
	}
}
impl VectorStore for InMemoryVectorStore {
	fn list_collections(&self) -> BoxFuture<'_, quill_storage::Result<Vec<String>>> {
		Box::pin(async move {
			self.list_calls.fetch_add(1, Ordering::SeqCst);

			Ok(self.collection_names())
		})
	}

	fn create_collection<'a>(
		&'a self,
		name: &'a str,
		dimensions: u32,
	) -> BoxFuture<'a, quill_storage::Result<()>> {
		Box::pin(async move {
			self.create_calls.fetch_add(1, Ordering::SeqCst);

			let mut collections = self.collections.lock().unwrap_or_else(|err| err.into_inner());

			if collections.contains_key(name) {
				return Err(quill_storage::Error::Conflict(format!(
					"Collection {name:?} already exists."
				)));
			}

			collections.insert(name.to_string(), Collection { dimensions, points: HashMap::new() });

			Ok(())
		})
	}

	fn collection_ready<'a>(&'a self, name: &'a str) -> BoxFuture<'a, quill_storage::Result<bool>> {
		Box::pin(async move {
			self.ready_calls.fetch_add(1, Ordering::SeqCst);

			if !self.collections.lock().unwrap_or_else(|err| err.into_inner()).contains_key(name) {
				return Err(Self::missing(name));
			}
			if self.never_ready {
				return Ok(false);
			}

			let still_waiting = self
				.not_ready_polls
				.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
				.is_ok();

			Ok(!still_waiting)
		})
	}

	fn upsert<'a>(
		&'a self,
		name: &'a str,
		points: Vec<IndexedPoint>,
	) -> BoxFuture<'a, quill_storage::Result<()>> {
		Box::pin(async move {
			self.upsert_calls.fetch_add(1, Ordering::SeqCst);

			{
				let failing = self.fail_upserts_for.lock().unwrap_or_else(|err| err.into_inner());

				if points.iter().any(|point| failing.contains(&point.entry_id)) {
					return Err(quill_storage::Error::Conflict(
						"Simulated upsert failure.".to_string(),
					));
				}
			}

			let mut collections = self.collections.lock().unwrap_or_else(|err| err.into_inner());
			let collection = collections.get_mut(name).ok_or_else(|| Self::missing(name))?;

			for point in points {
				collection.points.insert(point.key, point);
			}

			Ok(())
		})
	}

	fn content_hashes<'a>(
		&'a self,
		name: &'a str,
		keys: &'a [Uuid],
	) -> BoxFuture<'a, quill_storage::Result<HashMap<Uuid, String>>> {
		Box::pin(async move {
			let collections = self.collections.lock().unwrap_or_else(|err| err.into_inner());
			let collection = collections.get(name).ok_or_else(|| Self::missing(name))?;

			Ok(keys
				.iter()
				.filter_map(|key| {
					collection.points.get(key).map(|point| (*key, point.content_hash.clone()))
				})
				.collect())
		})
	}

	fn search<'a>(
		&'a self,
		name: &'a str,
		request: SearchRequest<'a>,
	) -> BoxFuture<'a, quill_storage::Result<Vec<StoredMatch>>> {
		Box::pin(async move {
			self.search_calls.fetch_add(1, Ordering::SeqCst);

			let collections = self.collections.lock().unwrap_or_else(|err| err.into_inner());
			let collection = collections.get(name).ok_or_else(|| Self::missing(name))?;
			let mut matches = collection
				.points
				.values()
				.filter(|point| point.namespace == request.namespace)
				.filter(|point| request.entry_ids.contains(&point.entry_id))
				.map(|point| (cosine(&request.vector, &point.vector), point))
				.filter(|(score, _)| *score >= request.min_score)
				.collect::<Vec<_>>();

			matches.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.entry_id.cmp(&b.1.entry_id)));

			Ok(matches
				.into_iter()
				.take(request.top_k as usize)
				.map(|(score, point)| StoredMatch {
					entry_id: point.entry_id.clone(),
					score,
					timestamp: point.timestamp.clone(),
					source_tag: point.source_tag.clone(),
					text: point.text.clone(),
				})
				.collect())
		})
	}
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
	let dot = a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();
	let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
	let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

	if norm_a == 0.0 || norm_b == 0.0 {
		return 0.0;
	}

	dot / (norm_a * norm_b)
}
