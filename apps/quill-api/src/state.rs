use std::sync::Arc;

use quill_service::QuillService;
use quill_storage::{db::Db, qdrant::QdrantStore};

#[derive(Clone)]
pub struct AppState {
	pub db: Arc<Db>,
	pub service: Arc<QuillService>,
}
impl AppState {
	pub async fn new(config: quill_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let qdrant = QdrantStore::new(&config.storage.qdrant)?;
		let service = QuillService::new(config, qdrant);

		Ok(Self::with_parts(db, service))
	}

	pub fn with_parts(db: Db, service: QuillService) -> Self {
		Self { db: Arc::new(db), service: Arc::new(service) }
	}
}
