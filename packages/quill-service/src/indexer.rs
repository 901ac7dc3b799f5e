use futures::{StreamExt, stream};
use serde::Serialize;

use quill_domain::entry::{self, EmbeddableDocument, JournalEntry};
use quill_providers::{EmbedPurpose, ProviderSelection};
use quill_storage::qdrant::IndexedPoint;

use crate::{IndexHandle, QuillService, Result};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
	pub indexed: usize,
	pub skipped_unchanged: usize,
	pub failed_batches: usize,
	pub failed_entries: usize,
}

impl QuillService {
	/// Upserts `entries` into `namespace`, batch by batch, skipping entries whose content is
	/// already indexed.
	///
	/// A failed batch is logged and counted; it never fails the call.
	pub async fn index_entries(
		&self,
		handle: &IndexHandle,
		selection: &ProviderSelection,
		namespace: &str,
		entries: &[JournalEntry],
	) -> Result<IndexReport> {
		let documents = entry::build_documents(entries, &self.cfg.indexing.source_tag)?;
		let keys = documents
			.iter()
			.map(|doc| entry::point_key(namespace, &doc.metadata.entry_id))
			.collect::<Vec<_>>();
		let stored = match self.vectors.content_hashes(&handle.name, &keys).await {
			Ok(stored) => stored,
			Err(err) => {
				tracing::warn!(
					error = %err,
					collection = %handle.name,
					"Failed to read stored content hashes. Reindexing every entry."
				);

				Default::default()
			},
		};
		let mut report = IndexReport::default();
		let mut pending = Vec::with_capacity(documents.len());

		for (doc, key) in documents.into_iter().zip(keys) {
			if stored.get(&key) == Some(&doc.content_hash) {
				report.skipped_unchanged += 1;
			} else {
				pending.push(doc);
			}
		}

		let batch_size = selection.kind.settings(&self.cfg.providers).batch_size.max(1) as usize;
		let concurrency = self.cfg.indexing.max_concurrent_batches.max(1) as usize;
		let batches = pending
			.chunks(batch_size)
			.enumerate()
			.map(move |(batch_index, batch)| async move {
				let outcome = self.index_batch(handle, selection, namespace, batch).await;

				(batch_index, batch.len(), outcome)
			})
			.collect::<Vec<_>>();
		let outcomes = stream::iter(batches)
			.buffer_unordered(concurrency)
			.collect::<Vec<_>>()
			.await;

		for (batch_index, size, outcome) in outcomes {
			match outcome {
				Ok(()) => report.indexed += size,
				Err(err) => {
					tracing::warn!(
						error = %err,
						collection = %handle.name,
						batch_index,
						batch_size = size,
						"Indexing batch failed. Continuing with remaining batches."
					);

					report.failed_batches += 1;
					report.failed_entries += size;
				},
			}
		}

		tracing::info!(
			collection = %handle.name,
			indexed = report.indexed,
			skipped_unchanged = report.skipped_unchanged,
			failed_batches = report.failed_batches,
			"Indexed journal entries."
		);

		Ok(report)
	}

	async fn index_batch(
		&self,
		handle: &IndexHandle,
		selection: &ProviderSelection,
		namespace: &str,
		batch: &[EmbeddableDocument],
	) -> Result<()> {
		let texts = batch.iter().map(|doc| doc.text.clone()).collect::<Vec<_>>();
		let vectors =
			self.embed_texts(selection, &texts, EmbedPurpose::Document, handle.dimensions).await?;
		let points = batch
			.iter()
			.zip(vectors)
			.map(|(doc, vector)| IndexedPoint {
				key: entry::point_key(namespace, &doc.metadata.entry_id),
				vector,
				namespace: namespace.to_string(),
				entry_id: doc.metadata.entry_id.clone(),
				timestamp: doc.metadata.timestamp.clone(),
				source_tag: doc.metadata.source_tag.clone(),
				text: doc.text.clone(),
				content_hash: doc.content_hash.clone(),
			})
			.collect::<Vec<_>>();

		self.vectors.upsert(&handle.name, points).await?;

		Ok(())
	}
}
