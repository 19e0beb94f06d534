//! Payload schema for Qdrant points

use crate::model::Chunk;
use crate::search::DocumentAttrs;
use qdrant_client::qdrant::{PointStruct, Value as QdrantValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// A point ready to be upserted to Qdrant
#[derive(Debug, Clone)]
pub struct ChunkPoint {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: ChunkPayload,
}

impl ChunkPoint {
    pub fn from_chunk(chunk: &Chunk, vector: Vec<f32>, attrs: &DocumentAttrs) -> Self {
        Self {
            id: chunk.chunk_id,
            vector,
            payload: ChunkPayload {
                document_id: chunk.document_id.clone(),
                section_type: chunk.section_type.to_string(),
                clause_number: chunk.clause_number.clone(),
                clause_title: chunk.clause_title.clone(),
                text: chunk.text.clone(),
                page_num: chunk.page_num as i64,
                span_start: chunk.span_start as i64,
                span_end: chunk.span_end as i64,
                source_uri: chunk.source_uri.clone(),
                content_hash: chunk.content_hash.clone(),
                parties: attrs.parties.clone(),
                governing_law: attrs.governing_law.clone(),
                is_mutual: attrs.is_mutual,
            },
        }
    }

    /// Convert to qdrant-client PointStruct
    pub fn to_point_struct(self) -> PointStruct {
        let payload_map = self.payload.to_qdrant_payload();
        PointStruct::new(self.id.to_string(), self.vector, payload_map)
    }
}

/// Payload stored with each chunk in Qdrant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkPayload {
    pub document_id: String,

    /// Section kind ("title", "recital", "parties", "clause")
    pub section_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub clause_number: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub clause_title: Option<String>,

    pub text: String,

    pub page_num: i64,
    pub span_start: i64,
    pub span_end: i64,

    pub source_uri: String,

    /// Blake3 hash of the chunk content
    pub content_hash: String,

    /// Document-level attributes used for filtering
    pub parties: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub governing_law: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_mutual: Option<bool>,
}

impl ChunkPayload {
    /// Convert to Qdrant payload format
    pub fn to_qdrant_payload(self) -> HashMap<String, QdrantValue> {
        let mut map = HashMap::new();

        map.insert("document_id".to_string(), string_to_qdrant(&self.document_id));
        map.insert("section_type".to_string(), string_to_qdrant(&self.section_type));
        map.insert("text".to_string(), string_to_qdrant(&self.text));
        map.insert("page_num".to_string(), int_to_qdrant(self.page_num));
        map.insert("span_start".to_string(), int_to_qdrant(self.span_start));
        map.insert("span_end".to_string(), int_to_qdrant(self.span_end));
        map.insert("source_uri".to_string(), string_to_qdrant(&self.source_uri));
        map.insert("content_hash".to_string(), string_to_qdrant(&self.content_hash));

        if let Some(ref number) = self.clause_number {
            map.insert("clause_number".to_string(), string_to_qdrant(number));
        }
        if let Some(ref title) = self.clause_title {
            map.insert("clause_title".to_string(), string_to_qdrant(title));
        }

        let parties: Vec<QdrantValue> = self.parties.iter().map(|s| string_to_qdrant(s)).collect();
        map.insert(
            "parties".to_string(),
            QdrantValue {
                kind: Some(qdrant_client::qdrant::value::Kind::ListValue(
                    qdrant_client::qdrant::ListValue { values: parties },
                )),
            },
        );

        if let Some(ref law) = self.governing_law {
            map.insert("governing_law".to_string(), string_to_qdrant(law));
        }
        if let Some(mutual) = self.is_mutual {
            map.insert("is_mutual".to_string(), bool_to_qdrant(mutual));
        }

        map
    }
}

fn string_to_qdrant(s: &str) -> QdrantValue {
    QdrantValue {
        kind: Some(qdrant_client::qdrant::value::Kind::StringValue(s.to_string())),
    }
}

fn int_to_qdrant(i: i64) -> QdrantValue {
    QdrantValue {
        kind: Some(qdrant_client::qdrant::value::Kind::IntegerValue(i)),
    }
}

fn bool_to_qdrant(b: bool) -> QdrantValue {
    QdrantValue {
        kind: Some(qdrant_client::qdrant::value::Kind::BoolValue(b)),
    }
}

impl From<Map<String, Value>> for ChunkPayload {
    fn from(map: Map<String, Value>) -> Self {
        serde_json::from_value(Value::Object(map)).unwrap_or_else(|_| ChunkPayload {
            document_id: String::new(),
            section_type: "clause".to_string(),
            clause_number: None,
            clause_title: None,
            text: String::new(),
            page_num: 0,
            span_start: 0,
            span_end: 0,
            source_uri: String::new(),
            content_hash: String::new(),
            parties: Vec::new(),
            governing_law: None,
            is_mutual: None,
        })
    }
}
