use crate::error::IngestError;
use crate::models::PageText;
use lopdf::Document;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

const PDF_MAGIC: &[u8] = b"%PDF-";
// Readers tolerate leading junk before the header within the first KiB.
const MAGIC_SEARCH_WINDOW: usize = 1024;

pub trait PdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError>;
}

impl<X: PdfExtractor + ?Sized> PdfExtractor for Box<X> {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError> {
        (**self).extract_pages(path)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError> {
        let document =
            Document::load(path).map_err(|error| IngestError::Extraction(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| IngestError::Extraction(format!("page {page_no}: {error}")))?;

            pages.push(PageText {
                number: page_no,
                text,
            });
        }

        tracing::debug!(path = %path.display(), pages = pages.len(), "extracted pdf pages");
        Ok(pages)
    }
}

/// Rejects uploads that are not PDFs before any parser sees them.
pub fn ensure_pdf(file_name: &str, bytes: &[u8]) -> Result<(), IngestError> {
    let has_pdf_extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    if !has_pdf_extension {
        return Err(IngestError::UnsupportedInput(format!(
            "only PDF files are allowed: {file_name}"
        )));
    }

    let window = &bytes[..bytes.len().min(MAGIC_SEARCH_WINDOW)];
    if !window.windows(PDF_MAGIC.len()).any(|slice| slice == PDF_MAGIC) {
        return Err(IngestError::UnsupportedInput(format!(
            "{file_name} has no PDF header"
        )));
    }

    Ok(())
}

/// Stages `bytes` in a temporary file and runs `extractor` over it.
///
/// The staged file is removed when this returns, whatever the outcome.
pub fn extract_from_bytes<X>(extractor: &X, bytes: &[u8]) -> Result<Vec<PageText>, IngestError>
where
    X: PdfExtractor + ?Sized,
{
    let mut staged = tempfile::Builder::new()
        .prefix("pdf-rag-upload-")
        .suffix(".pdf")
        .tempfile()?;
    write_staged(&mut staged, bytes)?;
    extractor.extract_pages(staged.path())
}

fn write_staged(staged: &mut NamedTempFile, bytes: &[u8]) -> Result<(), IngestError> {
    staged.write_all(bytes)?;
    staged.flush()?;
    Ok(())
}
