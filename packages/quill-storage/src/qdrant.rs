use std::collections::HashMap;

use qdrant_client::{
	Qdrant,
	client::Payload,
	qdrant::{
		CollectionStatus, Condition, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder,
		Distance, FieldType, Filter, GetPointsBuilder, PointId, PointStruct, Query,
		QueryPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder,
		point_id::PointIdOptions, value::Kind,
	},
};
use uuid::Uuid;

use crate::Result;

pub const NAMESPACE_FIELD: &str = "namespace";
pub const ENTRY_ID_FIELD: &str = "entry_id";
pub const TIMESTAMP_FIELD: &str = "timestamp";
pub const SOURCE_TAG_FIELD: &str = "source_tag";
pub const TEXT_FIELD: &str = "text";
pub const CONTENT_HASH_FIELD: &str = "content_hash";

/// One embedded journal entry ready to be written.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexedPoint {
	pub key: Uuid,
	pub vector: Vec<f32>,
	pub namespace: String,
	pub entry_id: String,
	pub timestamp: String,
	pub source_tag: String,
	pub text: String,
	pub content_hash: String,
}

#[derive(Clone, Debug)]
pub struct SearchRequest<'a> {
	pub vector: Vec<f32>,
	pub namespace: &'a str,
	/// Only points for these entries are eligible.
	pub entry_ids: &'a [String],
	pub top_k: u32,
	pub min_score: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StoredMatch {
	pub entry_id: String,
	pub score: f32,
	pub timestamp: String,
	pub source_tag: String,
	pub text: String,
}

pub struct QdrantStore {
	pub client: Qdrant,
}
impl QdrantStore {
	pub fn new(cfg: &quill_config::Qdrant) -> Result<Self> {
		let client = Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client })
	}

	pub async fn list_collections(&self) -> Result<Vec<String>> {
		let response = self.client.list_collections().await?;

		Ok(response.collections.into_iter().map(|c| c.name).collect())
	}

	/// Creates a cosine collection plus keyword indexes on the fields every search filters on.
	pub async fn create_collection(&self, name: &str, dimensions: u32) -> Result<()> {
		self.client
			.create_collection(
				CreateCollectionBuilder::new(name)
					.vectors_config(VectorParamsBuilder::new(dimensions.into(), Distance::Cosine)),
			)
			.await?;
		for field in [NAMESPACE_FIELD, ENTRY_ID_FIELD] {
			self.client
				.create_field_index(
					CreateFieldIndexCollectionBuilder::new(name, field, FieldType::Keyword).wait(true),
				)
				.await?;
		}

		Ok(())
	}

	pub async fn collection_ready(&self, name: &str) -> Result<bool> {
		let response = self.client.collection_info(name).await?;

		Ok(response.result.is_some_and(|info| info.status == CollectionStatus::Green as i32))
	}

	pub async fn upsert(&self, name: &str, points: Vec<IndexedPoint>) -> Result<()> {
		if points.is_empty() {
			return Ok(());
		}

		let points = points.into_iter().map(point_struct).collect::<Vec<_>>();

		self.client.upsert_points(UpsertPointsBuilder::new(name, points).wait(true)).await?;

		Ok(())
	}

	/// Returns the stored content hash for each key that already has a point.
	pub async fn content_hashes(&self, name: &str, keys: &[Uuid]) -> Result<HashMap<Uuid, String>> {
		if keys.is_empty() {
			return Ok(HashMap::new());
		}

		let ids = keys.iter().map(|key| PointId::from(key.to_string())).collect::<Vec<_>>();
		let response =
			self.client.get_points(GetPointsBuilder::new(name, ids).with_payload(true)).await?;
		let mut out = HashMap::with_capacity(response.result.len());

		for point in response.result {
			let Some(key) = point_uuid(point.id.as_ref()) else {
				continue;
			};
			let Some(hash) = payload_string(&point.payload, CONTENT_HASH_FIELD) else {
				continue;
			};

			out.insert(key, hash);
		}

		Ok(out)
	}

	/// Nearest-neighbor search confined to one namespace and a set of entries.
	pub async fn search(&self, name: &str, request: SearchRequest<'_>) -> Result<Vec<StoredMatch>> {
		if request.entry_ids.is_empty() {
			return Ok(Vec::new());
		}

		let filter = Filter::must([
			Condition::matches(NAMESPACE_FIELD, request.namespace.to_string()),
			Condition::matches(ENTRY_ID_FIELD, request.entry_ids.to_vec()),
		]);
		let response = self
			.client
			.query(
				QueryPointsBuilder::new(name)
					.query(Query::new_nearest(request.vector))
					.filter(filter)
					.limit(request.top_k.into())
					.score_threshold(request.min_score)
					.with_payload(true),
			)
			.await?;

		Ok(response
			.result
			.into_iter()
			.filter_map(|point| {
				Some(StoredMatch {
					entry_id: payload_string(&point.payload, ENTRY_ID_FIELD)?,
					score: point.score,
					timestamp: payload_string(&point.payload, TIMESTAMP_FIELD).unwrap_or_default(),
					source_tag: payload_string(&point.payload, SOURCE_TAG_FIELD)
						.unwrap_or_default(),
					text: payload_string(&point.payload, TEXT_FIELD).unwrap_or_default(),
				})
			})
			.collect())
	}
}

fn point_struct(point: IndexedPoint) -> PointStruct {
	let mut payload = Payload::new();

	payload.insert(NAMESPACE_FIELD, point.namespace);
	payload.insert(ENTRY_ID_FIELD, point.entry_id);
	payload.insert(TIMESTAMP_FIELD, point.timestamp);
	payload.insert(SOURCE_TAG_FIELD, point.source_tag);
	payload.insert(TEXT_FIELD, point.text);
	payload.insert(CONTENT_HASH_FIELD, point.content_hash);

	PointStruct::new(point.key.to_string(), point.vector, payload)
}

fn point_uuid(id: Option<&PointId>) -> Option<Uuid> {
	match id.and_then(|id| id.point_id_options.as_ref()) {
		Some(PointIdOptions::Uuid(raw)) => Uuid::parse_str(raw).ok(),
		_ => None,
	}
}

fn payload_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	match &payload.get(key)?.kind {
		Some(Kind::StringValue(text)) => Some(text.clone()),
		_ => None,
	}
}
