use std::sync::Arc;

use time::{OffsetDateTime, macros::datetime};

use quill_domain::{analysis::DEFAULT_TRAIT_SCORE, entry::JournalEntry};
use quill_providers::{Capability, ProviderKind};
use quill_service::{Error, Providers, QuillService};
use quill_testkit::fakes::{
	CompletionFailure, InMemoryVectorStore, ScriptedCompletion, ScriptedEmbedding,
};

const TOPICS: &[&[&str]] = &[
	&["run", "exercise", "workout", "gym"],
	&["feel", "felt"],
	&["sleep", "slept", "tired"],
];

struct Harness {
	service: QuillService,
	embedding: Arc<ScriptedEmbedding>,
	completion: Arc<ScriptedCompletion>,
	store: Arc<InMemoryVectorStore>,
}

fn harness_with(
	cfg: quill_config::Config,
	embedding: ScriptedEmbedding,
	completion: ScriptedCompletion,
	store: InMemoryVectorStore,
) -> Harness {
	let embedding = Arc::new(embedding);
	let completion = Arc::new(completion);
	let store = Arc::new(store);
	let service = QuillService::with_parts(
		cfg,
		Providers::new(embedding.clone(), completion.clone()),
		store.clone(),
	);

	Harness { service, embedding, completion, store }
}

fn harness(reply: &str) -> Harness {
	harness_with(
		quill_testkit::test_config(),
		ScriptedEmbedding::new(TOPICS),
		ScriptedCompletion::replying(reply),
		InMemoryVectorStore::new(),
	)
}

fn entry(id: &str, owner: &str, content: &str, created_at: OffsetDateTime) -> JournalEntry {
	JournalEntry {
		id: id.to_string(),
		owner_id: owner.to_string(),
		content: content.to_string(),
		created_at,
	}
}

fn sample(id: &str, content: &str) -> JournalEntry {
	entry(id, "u1", content, datetime!(2024-05-01 09:00 UTC))
}

#[tokio::test]
async fn answers_from_the_matching_entry() {
	let h = harness("You felt accomplished after your run.");
	let entries = vec![entry(
		"e1",
		"u1",
		"Had a great run today, felt accomplished.",
		datetime!(2024-05-04 07:15 UTC),
	)];
	let result = h
		.service
		.answer_question("How did I feel about exercise?", &entries, "openai", "sk-test")
		.await
		.expect("Failed to answer question.");

	assert_eq!(result.answer, "You felt accomplished after your run.");
	assert_eq!(result.relevant_entries.len(), 1);
	assert_eq!(result.relevant_entries[0].id, "e1");
	assert_eq!(result.relevant_entries[0].date, "2024-05-04T07:15:00Z");
	assert_eq!(h.completion.calls(), 1);

	let prompt = &h.completion.prompts()[0];

	assert!(prompt.contains("Had a great run today, felt accomplished."));
	assert!(prompt.contains("How did I feel about exercise?"));

	let options = h.completion.options()[0];

	assert_eq!(options.temperature, 0.0);
	assert_eq!(options.max_tokens, 500);
}

#[tokio::test]
async fn unmatched_question_skips_completion() {
	let h = harness("unused");
	let entries = vec![
		sample("e1", "Had a great run today, felt accomplished."),
		sample("e2", "Slept badly, tired all day."),
	];
	let result = h
		.service
		.answer_question("What is the capital of France?", &entries, "gemini", "g-key")
		.await
		.expect("Failed to answer question.");

	assert_eq!(result.answer, "No relevant entries found for your question.");
	assert!(result.relevant_entries.is_empty());
	assert_eq!(h.completion.calls(), 0);
	assert_eq!(h.store.search_calls(), 1);
}

#[tokio::test]
async fn empty_entries_short_circuit_without_network() {
	let h = harness("unused");
	let result = h
		.service
		.answer_question("How did I sleep?", &[], "anthropic", "sk-ant")
		.await
		.expect("Failed to answer question.");

	assert_eq!(result.answer, "no entries");
	assert!(result.relevant_entries.is_empty());
	assert_eq!(h.embedding.calls(), 0);
	assert_eq!(h.completion.calls(), 0);
	assert_eq!(h.store.total_calls(), 0);
}

#[tokio::test]
async fn unknown_provider_fails_before_any_call() {
	let h = harness("unused");
	let entries = vec![sample("e1", "Had a great run today.")];
	let err = h
		.service
		.answer_question("How did I feel?", &entries, "foo", "key")
		.await
		.expect_err("Expected configuration error.");

	assert!(matches!(err, Error::Configuration { .. }));
	assert_eq!(h.embedding.calls(), 0);
	assert_eq!(h.completion.calls(), 0);
	assert_eq!(h.store.total_calls(), 0);
}

#[tokio::test]
async fn anthropic_without_embedding_key_is_a_configuration_error() {
	let mut cfg = quill_testkit::test_config();

	cfg.providers.anthropic.embedding_api_key = None;

	let h = harness_with(
		cfg,
		ScriptedEmbedding::new(TOPICS),
		ScriptedCompletion::replying("unused"),
		InMemoryVectorStore::new(),
	);
	let entries = vec![sample("e1", "Had a great run today.")];
	let err = h
		.service
		.answer_question("How did I feel?", &entries, "anthropic", "sk-ant")
		.await
		.expect_err("Expected configuration error.");

	assert!(matches!(err, Error::Configuration { .. }));
	assert_eq!(h.store.total_calls(), 0);
}

#[tokio::test]
async fn relevant_entries_are_unique_and_ranked() {
	let h = harness("Answer.");
	let entries = vec![
		sample("e1", "Morning run."),
		sample("e2", "Felt tired after the gym."),
		sample("e3", "Quiet day reading."),
		sample("e1", "Morning run."),
	];
	let result = h
		.service
		.answer_question("workout and how I felt", &entries, "openai", "sk-test")
		.await
		.expect("Failed to answer question.");
	let ids = result.relevant_entries.iter().map(|entry| entry.id.as_str()).collect::<Vec<_>>();

	assert_eq!(ids, vec!["e2", "e1"]);
}

#[tokio::test]
async fn rejects_invalid_requests() {
	let h = harness("unused");
	let mixed = vec![
		entry("e1", "u1", "Morning run.", datetime!(2024-05-01 09:00 UTC)),
		entry("e2", "u2", "Evening run.", datetime!(2024-05-02 09:00 UTC)),
	];
	let err = h
		.service
		.answer_question("Did I run?", &mixed, "openai", "sk-test")
		.await
		.expect_err("Expected invalid request.");

	assert!(matches!(err, Error::InvalidRequest { .. }));

	let err = h
		.service
		.answer_question("   ", &mixed[..1], "openai", "sk-test")
		.await
		.expect_err("Expected invalid request.");

	assert!(matches!(err, Error::InvalidRequest { .. }));

	let long = "run ".repeat(100);
	let err = h
		.service
		.answer_question(&long, &mixed[..1], "openai", "sk-test")
		.await
		.expect_err("Expected invalid request.");

	assert!(matches!(err, Error::InvalidRequest { .. }));
	assert_eq!(h.store.total_calls(), 0);
}

#[tokio::test]
async fn retrieval_never_crosses_users() {
	let h = harness("Answer.");
	let mine = vec![entry("e1", "u1", "Had a great run today.", datetime!(2024-05-01 09:00 UTC))];
	let theirs = vec![entry("e9", "u2", "Went for a run.", datetime!(2024-05-02 09:00 UTC))];

	h.service
		.answer_question("Did I exercise?", &mine, "openai", "sk-test")
		.await
		.expect("Failed to answer question.");

	let result = h
		.service
		.answer_question("Did I exercise?", &theirs, "openai", "sk-test")
		.await
		.expect("Failed to answer question.");
	let ids = result.relevant_entries.iter().map(|entry| entry.id.as_str()).collect::<Vec<_>>();

	assert_eq!(ids, vec!["e9"]);
	assert!(!h.completion.prompts()[1].contains("Had a great run today."));
	assert_eq!(h.store.points("quill_test_openai_8").len(), 2);
}

#[tokio::test]
async fn stale_points_do_not_crowd_out_live_entries() {
	let h = harness("You ran.");
	let stale = ["a1", "a2", "a3", "a4", "a5", "a6"]
		.into_iter()
		.map(|id| entry(id, "u1", "Went for a run.", datetime!(2024-05-01 09:00 UTC)))
		.collect::<Vec<_>>();

	h.service
		.answer_question("Did I run?", &stale, "openai", "sk-test")
		.await
		.expect("Failed to answer question.");

	// Same owner, but the earlier entries have since been deleted.
	let live = vec![entry("z1", "u1", "Another run today.", datetime!(2024-05-03 09:00 UTC))];
	let result = h
		.service
		.answer_question("Did I run?", &live, "openai", "sk-test")
		.await
		.expect("Failed to answer question.");
	let ids = result.relevant_entries.iter().map(|entry| entry.id.as_str()).collect::<Vec<_>>();

	assert_eq!(ids, vec!["z1"]);
	assert_eq!(result.answer, "You ran.");
	assert_eq!(h.store.points("quill_test_openai_8").len(), 7);
}

#[tokio::test]
async fn owners_with_delimiter_ids_keep_separate_points() {
	let h = harness("Answer.");
	let first = vec![entry("b:c", "a", "Had a great run today.", datetime!(2024-05-01 09:00 UTC))];
	let second = vec![entry("c", "a:b", "Went for a run.", datetime!(2024-05-02 09:00 UTC))];

	for entries in [&first, &second] {
		h.service
			.answer_question("Did I exercise?", entries, "openai", "sk-test")
			.await
			.expect("Failed to answer question.");
	}

	let points = h.store.points("quill_test_openai_8");

	assert_eq!(points.len(), 2);
	assert_eq!(points[0].namespace, "a");
	assert_eq!(points[1].namespace, "a:b");

	let before = h.store.upsert_calls();

	h.service
		.answer_question("Did I exercise?", &first, "openai", "sk-test")
		.await
		.expect("Failed to answer question.");

	assert_eq!(h.store.upsert_calls(), before);
}

#[tokio::test]
async fn indexing_twice_is_idempotent() {
	let h = harness("unused");
	let handle = h.service.ensure_index(ProviderKind::OpenAi).await.expect("Failed to ensure index.");
	let selection = h
		.service
		.select_provider("openai", "sk-test", &[Capability::Embeddings])
		.expect("Failed to select provider.");
	let mut entries = vec![
		sample("e1", "Morning run."),
		sample("e2", "Slept well."),
		sample("e3", "Felt calm."),
	];
	let first = h
		.service
		.index_entries(&handle, &selection, "u1", &entries)
		.await
		.expect("Failed to index entries.");
	let points_after_first = h.store.points(&handle.name);
	let embed_calls = h.embedding.calls();
	let second = h
		.service
		.index_entries(&handle, &selection, "u1", &entries)
		.await
		.expect("Failed to index entries.");

	assert_eq!(first.indexed, 3);
	assert_eq!(second.indexed, 0);
	assert_eq!(second.skipped_unchanged, 3);
	assert_eq!(h.embedding.calls(), embed_calls);
	assert_eq!(h.store.points(&handle.name), points_after_first);

	entries[1].content = "Slept badly.".to_string();

	let third = h
		.service
		.index_entries(&handle, &selection, "u1", &entries)
		.await
		.expect("Failed to index entries.");
	let points = h.store.points(&handle.name);

	assert_eq!(third.indexed, 1);
	assert_eq!(third.skipped_unchanged, 2);
	assert_eq!(points.len(), 3);
	assert_eq!(points[1].text, "Slept badly.");
}

#[tokio::test]
async fn failed_batch_does_not_stop_the_others() {
	let h = harness_with(
		quill_testkit::test_config(),
		ScriptedEmbedding::new(TOPICS).failing_on("POISON"),
		ScriptedCompletion::replying("unused"),
		InMemoryVectorStore::new(),
	);
	let handle = h.service.ensure_index(ProviderKind::OpenAi).await.expect("Failed to ensure index.");
	let selection = h
		.service
		.select_provider("openai", "sk-test", &[Capability::Embeddings])
		.expect("Failed to select provider.");
	let entries = vec![
		sample("e1", "Morning run."),
		sample("e2", "Slept well."),
		sample("e3", "POISON"),
		sample("e4", "Felt calm."),
		sample("e5", "Gym session."),
	];
	let report = h
		.service
		.index_entries(&handle, &selection, "u1", &entries)
		.await
		.expect("A failed batch must not fail indexing.");
	let ids = h.store.points(&handle.name).into_iter().map(|p| p.entry_id).collect::<Vec<_>>();

	assert_eq!(report.failed_batches, 1);
	assert_eq!(report.failed_entries, 2);
	assert_eq!(report.indexed, 3);
	assert_eq!(ids, vec!["e1", "e2", "e5"]);
}

#[tokio::test]
async fn failed_upsert_does_not_stop_the_others() {
	let h = harness("unused");
	let handle = h.service.ensure_index(ProviderKind::Gemini).await.expect("Failed to ensure index.");
	let selection = h
		.service
		.select_provider("gemini", "g-key", &[Capability::Embeddings])
		.expect("Failed to select provider.");
	let entries = vec![
		sample("e1", "Morning run."),
		sample("e2", "Slept well."),
		sample("e3", "Felt calm."),
	];

	h.store.fail_upserts_for("e1");

	let report = h
		.service
		.index_entries(&handle, &selection, "u1", &entries)
		.await
		.expect("A failed batch must not fail indexing.");

	assert_eq!(report.failed_batches, 1);
	assert_eq!(report.indexed, 1);
	assert_eq!(h.store.points(&handle.name).len(), 1);
}

#[tokio::test]
async fn ensure_index_creates_once_and_waits_for_readiness() {
	let h = harness_with(
		quill_testkit::test_config(),
		ScriptedEmbedding::new(TOPICS),
		ScriptedCompletion::replying("unused"),
		InMemoryVectorStore::new().ready_after(3),
	);
	let handle = h.service.ensure_index(ProviderKind::Gemini).await.expect("Failed to ensure index.");

	assert_eq!(handle.name, "quill_test_gemini_8");
	assert_eq!(handle.dimensions, 8);
	assert_eq!(h.store.collection_dimensions(&handle.name), Some(8));
	assert_eq!(h.store.ready_calls(), 4);

	let again = h.service.ensure_index(ProviderKind::Gemini).await.expect("Failed to ensure index.");

	assert_eq!(again, handle);
	assert_eq!(h.store.create_calls(), 1);
	assert_eq!(h.store.ready_calls(), 4);

	h.service.ensure_index(ProviderKind::OpenAi).await.expect("Failed to ensure index.");

	assert_eq!(h.store.collection_names(), vec!["quill_test_gemini_8", "quill_test_openai_8"]);
}

#[tokio::test]
async fn readiness_wait_is_bounded() {
	let h = harness_with(
		quill_testkit::test_config(),
		ScriptedEmbedding::new(TOPICS),
		ScriptedCompletion::replying("unused"),
		InMemoryVectorStore::never_ready(),
	);
	let err = h
		.service
		.ensure_index(ProviderKind::OpenAi)
		.await
		.expect_err("Expected the readiness wait to time out.");

	assert!(matches!(err, Error::UpstreamUnavailable { .. }));
}

#[tokio::test]
async fn rate_limited_embeddings_are_retried() {
	let h = harness_with(
		quill_testkit::test_config(),
		ScriptedEmbedding::new(TOPICS).rate_limited(2),
		ScriptedCompletion::replying("Answer."),
		InMemoryVectorStore::new(),
	);
	let entries = vec![sample("e1", "Had a great run today.")];
	let result = h
		.service
		.answer_question("Did I exercise?", &entries, "openai", "sk-test")
		.await
		.expect("Retries should recover from rate limits.");

	assert_eq!(result.relevant_entries.len(), 1);
	assert_eq!(h.embedding.calls(), 4);
}

#[tokio::test]
async fn completion_failures_surface() {
	let h = harness_with(
		quill_testkit::test_config(),
		ScriptedEmbedding::new(TOPICS),
		ScriptedCompletion::failing(CompletionFailure::Authentication),
		InMemoryVectorStore::new(),
	);
	let entries = vec![sample("e1", "Had a great run today.")];
	let err = h
		.service
		.answer_question("Did I exercise?", &entries, "openai", "sk-bad")
		.await
		.expect_err("Expected authentication error.");

	assert!(matches!(err, Error::Authentication));
	assert_eq!(h.completion.calls(), 1);

	let h = harness_with(
		quill_testkit::test_config(),
		ScriptedEmbedding::new(TOPICS),
		ScriptedCompletion::failing(CompletionFailure::RateLimited),
		InMemoryVectorStore::new(),
	);
	let err = h
		.service
		.analyze("Had a great run today.", "openai", "sk-test")
		.await
		.expect_err("Expected rate limit error.");

	assert!(matches!(err, Error::RateLimited));
	assert_eq!(h.completion.calls(), 3);
}

#[tokio::test]
async fn analysis_defaults_keep_traits_in_range() {
	let h = harness("```json\n{\"openness\": 140, \"neuroticism\": -10, \"mbti_type\": \"entp\"}\n```");
	let record = h
		.service
		.analyze("Started a new painting class.", "anthropic", "sk-ant")
		.await
		.expect("Failed to analyze entry.");
	let traits = [
		record.traits.openness,
		record.traits.conscientiousness,
		record.traits.extraversion,
		record.traits.agreeableness,
		record.traits.neuroticism,
	];

	assert!(traits.iter().all(|score| *score <= 100));
	assert_eq!(record.traits.openness, 100);
	assert_eq!(record.traits.neuroticism, 0);
	assert_eq!(record.traits.agreeableness, DEFAULT_TRAIT_SCORE);
	assert_eq!(record.mbti_type, "ENTP");
	assert!(h.completion.prompts()[0].contains("Started a new painting class."));
	assert_eq!(h.embedding.calls(), 0);
}

#[tokio::test]
async fn analysis_without_json_is_an_extraction_error() {
	let h = harness("You are clearly a creative and open person.");
	let err = h
		.service
		.analyze("Started a new painting class.", "openai", "sk-test")
		.await
		.expect_err("Expected extraction error.");

	assert!(matches!(err, Error::Extraction { .. }));
}

#[tokio::test]
async fn analysis_with_unfenced_json_is_an_extraction_error() {
	let h = harness("Sure, here is my take: {\"openness\": 80} hope that helps");
	let err = h
		.service
		.analyze("Started a new painting class.", "openai", "sk-test")
		.await
		.expect_err("Expected extraction error.");

	assert!(matches!(err, Error::Extraction { .. }));
	assert_eq!(h.completion.calls(), 1);
}

#[tokio::test]
async fn mood_tags_fall_back_to_neutral() {
	let h = harness("```json\n{\"mood\": \"Grateful\", \"color\": \"#ffcc00\"}\n```");
	let tag = h
		.service
		.tag_mood("Thankful for my friends.", "openai", "sk-test")
		.await
		.expect("Failed to tag mood.");

	assert_eq!(tag.mood, "grateful");
	assert_eq!(tag.color, "#FFCC00");

	let h = harness("```json\n{\"mood\": \"flabbergasted\"}\n```");
	let tag = h
		.service
		.tag_mood("Strange day.", "openai", "sk-test")
		.await
		.expect("Failed to tag mood.");

	assert_eq!(tag.mood, "neutral");
}
