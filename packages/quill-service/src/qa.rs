use std::collections::HashMap;

use quill_domain::{
	entry::{self, JournalEntry},
	qa::{self, QaResult, RetrievedMatch},
};
use quill_providers::{Capability, CompletionOptions, EmbedPurpose, ProviderSelection};
use quill_storage::qdrant::SearchRequest;

use crate::{Error, IndexHandle, QuillService, Result};

impl QuillService {
	/// Answers `question` from the caller's own journal entries.
	///
	/// `entries` must all belong to one owner; that owner is the vector-store namespace, so
	/// retrieval never crosses users. Empty entry sets and questions with no match above
	/// `qa.min_score` are answered with fixed messages, and the completion model is not called.
	pub async fn answer_question(
		&self,
		question: &str,
		entries: &[JournalEntry],
		provider_id: &str,
		api_key: &str,
	) -> Result<QaResult> {
		let selection = self.select_provider(
			provider_id,
			api_key,
			&[Capability::Embeddings, Capability::Completion],
		)?;
		let question = self.validate_question(question)?;

		if entries.is_empty() {
			return Ok(QaResult::no_entries());
		}

		let namespace = entry::shared_owner(entries).ok_or_else(|| Error::InvalidRequest {
			message: "All entries must belong to the same user.".to_string(),
		})?;
		let handle = self.ensure_index(selection.kind).await?;

		self.index_entries(&handle, &selection, namespace, entries).await?;

		let matches = self.retrieve(&handle, &selection, namespace, question, entries).await?;

		if matches.is_empty() {
			tracing::info!(provider = %selection.kind, "No relevant entries for question.");

			return Ok(QaResult::no_relevant_entries());
		}

		let prompt = qa::build_qa_prompt(question, &matches);
		let answer = self
			.complete_prompt(
				&selection,
				&prompt,
				CompletionOptions { temperature: 0.0, max_tokens: self.cfg.qa.max_tokens },
			)
			.await?;

		Ok(QaResult { answer, relevant_entries: qa::dedup_relevant_entries(&matches) })
	}

	fn validate_question<'a>(&self, question: &'a str) -> Result<&'a str> {
		let trimmed = question.trim();

		if trimmed.is_empty() {
			return Err(Error::InvalidRequest { message: "Question must not be empty.".to_string() });
		}

		let max_chars = self.cfg.qa.max_question_chars as usize;

		if trimmed.chars().count() > max_chars {
			return Err(Error::InvalidRequest {
				message: format!("Question must be at most {max_chars} characters."),
			});
		}

		Ok(trimmed)
	}

	/// Top-K matches for `question`, restricted to entries in the current set.
	///
	/// The restriction is part of the store query, so points left over from deleted entries never
	/// take a top-K slot.
	async fn retrieve(
		&self,
		handle: &IndexHandle,
		selection: &ProviderSelection,
		namespace: &str,
		question: &str,
		entries: &[JournalEntry],
	) -> Result<Vec<RetrievedMatch>> {
		let query = [question.to_string()];
		let mut vectors =
			self.embed_texts(selection, &query, EmbedPurpose::Query, handle.dimensions).await?;
		let Some(vector) = vectors.pop() else {
			return Ok(Vec::new());
		};
		let entry_ids = entries.iter().map(|entry| entry.id.clone()).collect::<Vec<_>>();
		let hits = self
			.vectors
			.search(
				&handle.name,
				SearchRequest {
					vector,
					namespace,
					entry_ids: &entry_ids,
					top_k: self.cfg.qa.top_k,
					min_score: self.cfg.qa.min_score,
				},
			)
			.await?;
		let by_id = entries.iter().map(|entry| (entry.id.as_str(), entry)).collect::<HashMap<_, _>>();
		let mut matches = Vec::with_capacity(hits.len());

		for hit in hits {
			let Some(entry) = by_id.get(hit.entry_id.as_str()) else {
				tracing::debug!(entry_id = %hit.entry_id, "Dropping match outside the current entry set.");

				continue;
			};

			matches.push(RetrievedMatch {
				similarity_rank: matches.len(),
				entry_id: hit.entry_id,
				score: hit.score,
				timestamp: entry::format_timestamp(entry.created_at)?,
				source_tag: hit.source_tag,
				text: entry.content.clone(),
			});
		}

		Ok(matches)
	}
}
