//! Qdrant vector database integration
//!
//! Wraps the Qdrant client as the vector backend:
//! - Collection management
//! - Point upsert and per-document delete
//! - Filtered vector search

mod payload;

pub use payload::*;

use crate::error::{Error, Result};
use crate::model::{Chunk, SearchHit, SectionType};
use crate::search::{DocumentAttrs, SearchFilter, VectorBackend};
use async_trait::async_trait;
use qdrant_client::qdrant::{
    Condition, CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter,
    PointId, PointStruct, SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

/// Qdrant store handle
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl QdrantStore {
    /// Connect to Qdrant
    pub async fn new(url: &str, collection: &str, dimension: usize) -> Result<Self> {
        debug!("Connecting to Qdrant at {}", url);

        let client = Qdrant::from_url(url)
            .skip_compatibility_check()
            .build()
            .map_err(|e| Error::Qdrant(e.to_string()))?;

        Ok(Self {
            client,
            collection: collection.to_string(),
            dimension,
        })
    }

    /// Ensure the collection exists with correct configuration
    pub async fn ensure_collection(&self) -> Result<()> {
        if self.client.collection_exists(&self.collection).await? {
            debug!("Collection {} already exists", self.collection);
            return Ok(());
        }

        info!(
            "Creating collection {} with dimension {}",
            self.collection, self.dimension
        );

        let vectors_config = VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine);
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection).vectors_config(vectors_config),
            )
            .await?;

        Ok(())
    }

    /// Delete the collection if it exists
    pub async fn delete_collection(&self) -> Result<bool> {
        if !self.client.collection_exists(&self.collection).await? {
            return Ok(false);
        }

        info!("Deleting collection {}", self.collection);
        self.client.delete_collection(&self.collection).await?;
        Ok(true)
    }

    async fn count_document_points(&self, document_id: &str) -> Result<u64> {
        let response = self
            .client
            .count(
                CountPointsBuilder::new(&self.collection)
                    .filter(document_filter(document_id))
                    .exact(true),
            )
            .await?;
        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }
}

fn document_filter(document_id: &str) -> Filter {
    Filter {
        must: vec![Condition::matches(
            "document_id",
            document_id.to_string(),
        )],
        should: vec![],
        must_not: vec![],
        min_should: None,
    }
}

fn to_qdrant_filter(filter: &SearchFilter) -> Option<Filter> {
    let mut must: Vec<Condition> = Vec::new();

    if let Some(party) = &filter.party {
        must.push(Condition::matches("parties", party.clone()));
    }
    if let Some(law) = &filter.governing_law {
        must.push(Condition::matches("governing_law", law.clone()));
    }
    if let Some(mutual) = filter.is_mutual {
        must.push(Condition::matches("is_mutual", mutual));
    }

    if must.is_empty() {
        return None;
    }

    Some(Filter {
        must,
        should: vec![],
        must_not: vec![],
        min_should: None,
    })
}

#[async_trait]
impl VectorBackend for QdrantStore {
    async fn search(
        &self,
        vector: Vec<f32>,
        k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<SearchHit>> {
        debug!(
            "Searching collection {} with limit {}",
            self.collection, k
        );

        let mut builder =
            SearchPointsBuilder::new(&self.collection, vector, k as u64).with_payload(true);
        if let Some(qdrant_filter) = to_qdrant_filter(filter) {
            builder = builder.filter(qdrant_filter);
        }

        let response = self.client.search_points(builder).await?;

        let hits = response
            .result
            .into_iter()
            .filter_map(|p| {
                let chunk_id = p.id.as_ref().and_then(point_id_to_uuid)?;
                let payload: ChunkPayload = p
                    .payload
                    .into_iter()
                    .map(|(k, v)| (k, json_from_qdrant_value(v)))
                    .collect::<serde_json::Map<String, Value>>()
                    .into();

                Some(SearchHit {
                    chunk_id,
                    document_id: payload.document_id,
                    text: payload.text,
                    section_type: payload
                        .section_type
                        .parse()
                        .unwrap_or(SectionType::Clause),
                    clause_number: payload.clause_number,
                    page_num: payload.page_num as u32,
                    span_start: payload.span_start as usize,
                    span_end: payload.span_end as usize,
                    source_uri: payload.source_uri,
                    score: p.score,
                })
            })
            .collect();

        Ok(hits)
    }

    async fn index_chunks(
        &self,
        chunks: &[Chunk],
        vectors: Vec<Vec<f32>>,
        attrs: &DocumentAttrs,
    ) -> Result<()> {
        if chunks.len() != vectors.len() {
            return Err(Error::Qdrant(format!(
                "Chunk/vector count mismatch: {} chunks, {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }
        if chunks.is_empty() {
            return Ok(());
        }

        debug!(
            "Upserting {} points to collection {}",
            chunks.len(),
            self.collection
        );

        let points: Vec<PointStruct> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| ChunkPoint::from_chunk(chunk, vector, attrs).to_point_struct())
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points))
            .await?;
        Ok(())
    }

    async fn delete_document(&self, document_id: &str) -> Result<u64> {
        let count = self.count_document_points(document_id).await?;
        if count == 0 {
            return Ok(0);
        }

        debug!(
            "Deleting {} points for document {} from {}",
            count, document_id, self.collection
        );
        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection).points(document_filter(document_id)),
            )
            .await?;
        Ok(count)
    }
}

fn point_id_to_uuid(id: &PointId) -> Option<Uuid> {
    match &id.point_id_options {
        Some(qdrant_client::qdrant::point_id::PointIdOptions::Uuid(uuid_str)) => {
            Uuid::try_parse(uuid_str).ok()
        }
        _ => None,
    }
}

/// Convert Qdrant value to serde_json Value
fn json_from_qdrant_value(v: qdrant_client::qdrant::Value) -> Value {
    use qdrant_client::qdrant::value::Kind;

    match v.kind {
        Some(Kind::NullValue(_)) => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(b),
        Some(Kind::IntegerValue(i)) => Value::Number(i.into()),
        Some(Kind::DoubleValue(d)) => serde_json::Number::from_f64(d)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Some(Kind::StringValue(s)) => Value::String(s),
        Some(Kind::ListValue(list)) => {
            Value::Array(list.values.into_iter().map(json_from_qdrant_value).collect())
        }
        Some(Kind::StructValue(s)) => Value::Object(
            s.fields
                .into_iter()
                .map(|(k, v)| (k, json_from_qdrant_value(v)))
                .collect(),
        ),
        None => Value::Null,
    }
}
