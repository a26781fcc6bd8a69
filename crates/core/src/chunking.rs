use crate::error::IngestError;
use crate::models::RagOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    size: usize,
    overlap: usize,
}

impl ChunkingConfig {
    pub const DEFAULT_SIZE: usize = 1_000;
    pub const DEFAULT_OVERLAP: usize = 200;

    /// Window `size` and `overlap` are counted in chars. `overlap` must be
    /// strictly smaller than `size`, otherwise the window would never advance.
    pub fn new(size: usize, overlap: usize) -> Result<Self, IngestError> {
        if size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk size must be positive".to_string(),
            ));
        }
        if overlap >= size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap {overlap} must be smaller than chunk size {size}"
            )));
        }
        Ok(Self { size, overlap })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn stride(&self) -> usize {
        self.size - self.overlap
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            size: Self::DEFAULT_SIZE,
            overlap: Self::DEFAULT_OVERLAP,
        }
    }
}

impl TryFrom<&RagOptions> for ChunkingConfig {
    type Error = IngestError;

    fn try_from(value: &RagOptions) -> Result<Self, Self::Error> {
        Self::new(value.chunk_size, value.chunk_overlap)
    }
}

/// Splits `text` into overlapping fixed-size windows.
///
/// Windows start at 0 and advance by `size - overlap` while the start is
/// still inside the text, so the last window may be shorter than `size` and
/// may lie entirely inside the previous one. Blank windows are kept; callers
/// decide what to drop.
pub fn chunk_text(text: &str, config: ChunkingConfig) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + config.size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        start += config.stride();
    }

    chunks
}
