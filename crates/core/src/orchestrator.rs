use crate::chunking::ChunkingConfig;
use crate::embeddings::Embedder;
use crate::error::{IngestError, ModelError, QueryError};
use crate::extractor::{ensure_pdf, extract_from_bytes, LopdfExtractor, PdfExtractor};
use crate::ingest::{build_document_fingerprint, embed_pages};
use crate::models::{
    DocumentFingerprint, GenerationOptions, PageText, QueryResult, RagOptions, Source,
};
use crate::prompt::{build_context, build_prompt, excerpt};
use crate::retriever::retrieve;
use crate::store::DocumentStore;
use crate::traits::AnswerGenerator;

/// Owns a document store and answers questions against it.
///
/// Each instance is isolated. Ingestion appends to whatever is already
/// loaded; a second upload never replaces the first. `ingest_*` and `clear`
/// need `&mut self`, so sharing one coordinator across threads requires an
/// outer lock.
pub struct RagCoordinator<E, G, X = LopdfExtractor>
where
    E: Embedder,
    G: AnswerGenerator,
    X: PdfExtractor,
{
    embedder: E,
    generator: G,
    extractor: X,
    chunking: ChunkingConfig,
    options: RagOptions,
    store: DocumentStore,
}

impl<E, G> RagCoordinator<E, G, LopdfExtractor>
where
    E: Embedder,
    G: AnswerGenerator,
{
    pub fn new(embedder: E, generator: G, options: RagOptions) -> Result<Self, IngestError> {
        Self::with_extractor(embedder, generator, LopdfExtractor, options)
    }
}

impl<E, G, X> RagCoordinator<E, G, X>
where
    E: Embedder,
    G: AnswerGenerator,
    X: PdfExtractor,
{
    pub fn with_extractor(
        embedder: E,
        generator: G,
        extractor: X,
        options: RagOptions,
    ) -> Result<Self, IngestError> {
        let chunking = ChunkingConfig::try_from(&options)?;
        if options.top_k == 0 {
            return Err(IngestError::InvalidArgument(
                "top_k must be positive".to_string(),
            ));
        }

        Ok(Self {
            embedder,
            generator,
            extractor,
            chunking,
            options,
            store: DocumentStore::new(),
        })
    }

    pub fn options(&self) -> &RagOptions {
        &self.options
    }

    pub fn has_documents(&self) -> bool {
        !self.store.is_empty()
    }

    pub fn chunk_count(&self) -> usize {
        self.store.len()
    }

    pub fn clear(&mut self) {
        let dropped = self.store.len();
        self.store.clear();
        tracing::info!(dropped_chunks = dropped, "document store cleared");
    }

    /// Validates, extracts, chunks and embeds an uploaded PDF, then appends
    /// its chunks. On any error the store is left as it was.
    pub fn ingest_pdf(
        &mut self,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<DocumentFingerprint, IngestError> {
        ensure_pdf(file_name, bytes)?;
        let pages = extract_from_bytes(&self.extractor, bytes)?;
        let chunk_count = self.ingest_pages(&pages)?;

        let fingerprint = build_document_fingerprint(file_name, bytes, pages.len(), chunk_count);
        tracing::info!(
            document = %fingerprint.title,
            document_id = %fingerprint.document_id,
            pages = fingerprint.page_count,
            chunks = fingerprint.chunk_count,
            "ingested pdf"
        );
        Ok(fingerprint)
    }

    /// Appends the chunks of already-extracted pages and returns how many
    /// were stored. Either every chunk of `pages` lands or none does.
    pub fn ingest_pages(&mut self, pages: &[PageText]) -> Result<usize, IngestError> {
        let staged = embed_pages(pages, self.chunking, &self.embedder)?;
        for chunk in &staged {
            self.check_width(&chunk.embedding)?;
        }
        let added = staged.len();
        self.store.append(staged)?;

        tracing::debug!(
            pages = pages.len(),
            added,
            total = self.store.len(),
            "appended chunks"
        );
        Ok(added)
    }

    pub fn query(&self, question: &str) -> Result<QueryResult, QueryError> {
        if self.store.is_empty() {
            return Ok(QueryResult::no_documents());
        }

        let question_vector = self.embedder.embed(question)?;
        self.check_width(&question_vector)?;
        let ranked = retrieve(&self.store, &question_vector, self.options.top_k)?;

        let context = build_context(&ranked);
        let prompt = build_prompt(&context, question);
        let answer = self.generator.generate(
            &prompt,
            GenerationOptions {
                max_length: self.options.max_answer_length,
                deterministic: true,
            },
        )?;

        let sources = ranked
            .iter()
            .map(|hit| Source {
                page: hit.chunk.page,
                excerpt: excerpt(&hit.chunk.text, self.options.excerpt_chars),
            })
            .collect::<Vec<_>>();

        tracing::info!(
            retrieved = ranked.len(),
            top_score = ranked.first().map(|hit| hit.score).unwrap_or_default(),
            "answered question"
        );
        Ok(QueryResult { answer, sources })
    }

    /// An embedder that disagrees with its own `dimensions()` is misconfigured.
    fn check_width(&self, vector: &[f32]) -> Result<(), ModelError> {
        let expected = self.embedder.dimensions();
        if vector.len() != expected {
            return Err(ModelError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}
