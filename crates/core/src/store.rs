use crate::error::ModelError;
use crate::models::Chunk;

/// In-memory chunk collection in reading order.
///
/// All embeddings share one dimension, fixed by the first committed chunk and
/// released again by [`DocumentStore::clear`].
#[derive(Debug, Default)]
pub struct DocumentStore {
    chunks: Vec<Chunk>,
    dimension: Option<usize>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a whole batch or nothing.
    pub fn append(&mut self, batch: Vec<Chunk>) -> Result<(), ModelError> {
        let Some(first) = batch.first() else {
            return Ok(());
        };

        let expected = self.dimension.unwrap_or(first.embedding.len());
        if let Some(mismatch) = batch
            .iter()
            .find(|chunk| chunk.embedding.len() != expected)
        {
            return Err(ModelError::DimensionMismatch {
                expected,
                actual: mismatch.embedding.len(),
            });
        }

        self.dimension = Some(expected);
        self.chunks.extend(batch);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
        self.dimension = None;
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, page: u32, embedding: Vec<f32>) -> Chunk {
        Chunk {
            text: text.to_string(),
            page,
            embedding,
        }
    }

    #[test]
    fn appends_preserve_order_across_batches() {
        let mut store = DocumentStore::new();
        store
            .append(vec![chunk("a", 1, vec![1.0, 0.0]), chunk("b", 2, vec![0.0, 1.0])])
            .unwrap();
        store.append(vec![chunk("c", 1, vec![1.0, 1.0])]).unwrap();

        let texts: Vec<&str> = store.chunks().iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
        assert_eq!(store.dimension(), Some(2));
    }

    #[test]
    fn mismatched_batch_is_rejected_whole() {
        let mut store = DocumentStore::new();
        store.append(vec![chunk("a", 1, vec![1.0, 0.0])]).unwrap();

        let result = store.append(vec![
            chunk("b", 1, vec![1.0, 0.0]),
            chunk("c", 1, vec![1.0, 0.0, 0.0]),
        ]);

        assert!(matches!(
            result,
            Err(ModelError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn clear_releases_dimension() {
        let mut store = DocumentStore::new();
        store.append(vec![chunk("a", 1, vec![1.0, 0.0])]).unwrap();
        store.clear();

        assert!(store.is_empty());
        assert_eq!(store.dimension(), None);
        store.append(vec![chunk("b", 1, vec![1.0, 0.0, 0.0])]).unwrap();
        assert_eq!(store.dimension(), Some(3));
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let mut store = DocumentStore::new();
        store.append(Vec::new()).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.dimension(), None);
    }
}
