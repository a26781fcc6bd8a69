use crate::chunking::{chunk_text, ChunkingConfig};
use crate::embeddings::Embedder;
use crate::error::IngestError;
use crate::models::{Chunk, DocumentFingerprint, PageText};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Chunks and embeds every page, returning the chunks in reading order.
///
/// Nothing is committed here; the first failing embedding aborts the whole
/// document.
pub fn embed_pages<E>(
    pages: &[PageText],
    config: ChunkingConfig,
    embedder: &E,
) -> Result<Vec<Chunk>, IngestError>
where
    E: Embedder + ?Sized,
{
    let mut staged = Vec::new();

    for page in pages {
        if page.number == 0 {
            return Err(IngestError::InvalidArgument(
                "page numbers are 1-based".to_string(),
            ));
        }

        for text in chunk_text(&page.text, config) {
            if text.trim().is_empty() {
                continue;
            }

            let embedding = embedder.embed(&text)?;
            staged.push(Chunk {
                text,
                page: page.number,
                embedding,
            });
        }
    }

    Ok(staged)
}

/// The document id is the content checksum, so re-uploading the same bytes
/// under another name yields the same id.
pub fn build_document_fingerprint(
    title: &str,
    bytes: &[u8],
    page_count: usize,
    chunk_count: usize,
) -> DocumentFingerprint {
    let checksum = digest_bytes(bytes);
    DocumentFingerprint {
        document_id: checksum.clone(),
        title: title.to_string(),
        checksum,
        page_count,
        chunk_count,
        ingested_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::CharacterNgramEmbedder;
    use std::cell::Cell;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    struct FailingAfter {
        remaining: Cell<usize>,
    }

    impl Embedder for FailingAfter {
        fn dimensions(&self) -> usize {
            2
        }

        fn embed(&self, _text: &str) -> Result<Vec<f32>, ModelError> {
            if self.remaining.get() == 0 {
                return Err(ModelError::Malformed("empty embedding".to_string()));
            }
            self.remaining.set(self.remaining.get() - 1);
            Ok(vec![1.0, 0.0])
        }
    }

    #[test]
    fn discover_pdf_files_is_recursive() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let base = dir.path();
        let nested = base.join("nested");
        fs::create_dir(&nested)?;

        File::create(base.join("a.pdf")).and_then(|mut file| file.write_all(b"%PDF-1.4\n%fake"))?;
        File::create(nested.join("b.PDF"))
            .and_then(|mut file| file.write_all(b"%PDF-1.4\n%fake"))?;
        File::create(base.join("notes.txt")).and_then(|mut file| file.write_all(b"text"))?;

        let files = discover_pdf_files(base);
        assert_eq!(files.len(), 2);
        Ok(())
    }

    #[test]
    fn checksum_is_reproducible() {
        assert_eq!(digest_bytes(b"abc"), digest_bytes(b"abc"));
        assert_ne!(digest_bytes(b"abc"), digest_bytes(b"abd"));
    }

    #[test]
    fn blank_chunks_and_empty_pages_are_skipped() {
        let pages = vec![
            PageText::new(1, "alpha beta"),
            PageText::new(2, ""),
            PageText::new(3, "gamma     "),
        ];
        let config = ChunkingConfig::new(5, 0).unwrap();
        let chunks = embed_pages(&pages, config, &CharacterNgramEmbedder::default()).unwrap();

        let summary: Vec<(u32, &str)> = chunks
            .iter()
            .map(|chunk| (chunk.page, chunk.text.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![(1, "alpha"), (1, " beta"), (3, "gamma")]
        );
    }

    #[test]
    fn embedding_failure_aborts_document() {
        let pages = vec![PageText::new(1, "one two three four")];
        let config = ChunkingConfig::new(4, 0).unwrap();
        let embedder = FailingAfter {
            remaining: Cell::new(2),
        };

        let result = embed_pages(&pages, config, &embedder);
        assert!(matches!(
            result,
            Err(IngestError::Model(ModelError::Malformed(_)))
        ));
    }

    #[test]
    fn zero_page_number_is_rejected() {
        let pages = vec![PageText::new(0, "text")];
        let result = embed_pages(
            &pages,
            ChunkingConfig::default(),
            &CharacterNgramEmbedder::default(),
        );
        assert!(matches!(result, Err(IngestError::InvalidArgument(_))));
    }

    #[test]
    fn fingerprint_is_stable_for_same_upload() {
        let first = build_document_fingerprint("a.pdf", b"%PDF-1.4", 2, 5);
        let second = build_document_fingerprint("a.pdf", b"%PDF-1.4", 2, 5);
        assert_eq!(first.document_id, second.document_id);
        assert_eq!(first.checksum, digest_bytes(b"%PDF-1.4"));
        assert_eq!(first.document_id, first.checksum);
        assert_eq!(first.page_count, 2);
        assert_eq!(first.chunk_count, 5);
    }

    #[test]
    fn document_id_ignores_upload_name() {
        let original = build_document_fingerprint("a.pdf", b"%PDF-1.4 same", 1, 1);
        let renamed = build_document_fingerprint("renamed.pdf", b"%PDF-1.4 same", 1, 1);
        let edited = build_document_fingerprint("a.pdf", b"%PDF-1.4 other", 1, 1);

        assert_eq!(original.document_id, renamed.document_id);
        assert_ne!(original.document_id, edited.document_id);
    }
}
