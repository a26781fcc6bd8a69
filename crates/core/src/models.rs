use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Text extracted from a single PDF page. `number` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

impl PageText {
    pub fn new(number: u32, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

/// A stored chunk of page text together with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub page: u32,
    pub embedding: Vec<f32>,
}

/// Summary of an ingested document, returned to the caller of an ingest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFingerprint {
    pub document_id: String,
    pub title: String,
    pub checksum: String,
    pub page_count: usize,
    pub chunk_count: usize,
    pub ingested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub page: u32,
    pub excerpt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    pub answer: String,
    pub sources: Vec<Source>,
}

impl QueryResult {
    pub const NO_DOCUMENTS: &'static str = "No documents loaded";

    pub fn no_documents() -> Self {
        Self {
            answer: Self::NO_DOCUMENTS.to_string(),
            sources: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Upper bound on generated output, in model generation units.
    pub max_length: usize,
    /// Greedy decoding when true.
    pub deterministic: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_length: 512,
            deterministic: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub excerpt_chars: usize,
    pub max_answer_length: usize,
}

impl Default for RagOptions {
    fn default() -> Self {
        Self {
            chunk_size: 1_000,
            chunk_overlap: 200,
            top_k: 3,
            excerpt_chars: 200,
            max_answer_length: 512,
        }
    }
}
