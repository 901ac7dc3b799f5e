//! Vector index lifecycle: one collection per provider family and dimensionality.

use std::time::Duration;

use tokio::time::{self, Instant};

use quill_providers::ProviderKind;

use crate::{Error, QuillService, Result};

/// A ready collection in the vector store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexHandle {
	pub name: String,
	pub dimensions: u32,
}

pub fn index_name(prefix: &str, kind: ProviderKind, dimensions: u32) -> String {
	format!("{prefix}_{}_{dimensions}", kind.family())
}

impl QuillService {
	/// Returns a ready index for `kind`, creating it on first use.
	///
	/// Readiness is polled every `ready_poll_interval_ms` until `ready_timeout_ms` elapses, after
	/// which the call fails with [`Error::UpstreamUnavailable`]. Ready indexes are remembered for
	/// the life of the service.
	pub async fn ensure_index(&self, kind: ProviderKind) -> Result<IndexHandle> {
		let dimensions = kind.settings(&self.cfg.providers).embedding_dimensions;
		let handle = IndexHandle {
			name: index_name(&self.cfg.storage.qdrant.collection_prefix, kind, dimensions),
			dimensions,
		};

		if self.is_known_ready(&handle.name) {
			return Ok(handle);
		}

		let existing = self.vectors.list_collections().await?;

		if !existing.contains(&handle.name) {
			tracing::info!(collection = %handle.name, dimensions, "Creating vector index.");

			if let Err(err) = self.vectors.create_collection(&handle.name, dimensions).await {
				// Another process may have created it between the list and the create.
				let existing = self.vectors.list_collections().await?;

				if !existing.contains(&handle.name) {
					return Err(err.into());
				}
			}
		}

		self.wait_until_ready(&handle.name).await?;
		self.ready_indexes.lock().unwrap_or_else(|err| err.into_inner()).insert(handle.name.clone());

		Ok(handle)
	}

	fn is_known_ready(&self, name: &str) -> bool {
		self.ready_indexes.lock().unwrap_or_else(|err| err.into_inner()).contains(name)
	}

	async fn wait_until_ready(&self, name: &str) -> Result<()> {
		let cfg = &self.cfg.storage.qdrant;
		let interval = Duration::from_millis(cfg.ready_poll_interval_ms);
		let deadline = Instant::now() + Duration::from_millis(cfg.ready_timeout_ms);

		loop {
			let ready = time::timeout_at(deadline, self.vectors.collection_ready(name))
				.await
				.map_err(|_| not_ready(name, cfg.ready_timeout_ms))??;

			if ready {
				return Ok(());
			}

			let now = Instant::now();

			if now >= deadline {
				return Err(not_ready(name, cfg.ready_timeout_ms));
			}

			tracing::debug!(collection = %name, "Vector index not ready yet.");
			time::sleep(interval.min(deadline - now)).await;
		}
	}
}

fn not_ready(name: &str, timeout_ms: u64) -> Error {
	Error::UpstreamUnavailable {
		message: format!("Vector index {name:?} was not ready within {timeout_ms} ms."),
	}
}
