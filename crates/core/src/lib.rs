pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod prompt;
pub mod providers;
pub mod retriever;
pub mod store;
pub mod traits;

pub use chunking::{chunk_text, ChunkingConfig};
pub use embeddings::{CharacterNgramEmbedder, Embedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{IngestError, ModelError, QueryError};
pub use extractor::{ensure_pdf, extract_from_bytes, LopdfExtractor, PdfExtractor};
pub use ingest::{discover_pdf_files, digest_bytes, embed_pages};
pub use models::{
    Chunk, DocumentFingerprint, GenerationOptions, PageText, QueryResult, RagOptions, Source,
};
pub use orchestrator::RagCoordinator;
pub use prompt::{build_context, build_prompt, INSUFFICIENT_CONTEXT_ANSWER};
pub use providers::{OllamaConfig, OllamaEmbedder, OllamaGenerator};
pub use retriever::{cosine_similarity, retrieve, RankedChunk};
pub use store::DocumentStore;
pub use traits::AnswerGenerator;
