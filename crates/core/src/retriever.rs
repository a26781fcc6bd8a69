use crate::error::ModelError;
use crate::models::Chunk;
use crate::store::DocumentStore;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedChunk<'a> {
    pub chunk: &'a Chunk,
    pub score: f32,
}

/// Cosine similarity of two equal-length vectors.
///
/// Zero-norm inputs and non-finite results score `0.0` so they rank as
/// unrelated instead of poisoning the ordering with NaN.
pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
    let dot = left
        .iter()
        .zip(right)
        .map(|(a, b)| a * b)
        .sum::<f32>();
    let left_norm = left.iter().map(|value| value * value).sum::<f32>().sqrt();
    let right_norm = right.iter().map(|value| value * value).sum::<f32>().sqrt();

    if left_norm == 0.0 || right_norm == 0.0 {
        return 0.0;
    }

    let similarity = dot / (left_norm * right_norm);
    if similarity.is_finite() {
        similarity
    } else {
        0.0
    }
}

/// Returns the `k` stored chunks most similar to `query_vector`, best first.
///
/// Equal scores keep insertion order.
pub fn retrieve<'a>(
    store: &'a DocumentStore,
    query_vector: &[f32],
    k: usize,
) -> Result<Vec<RankedChunk<'a>>, ModelError> {
    if let Some(expected) = store.dimension() {
        if expected != query_vector.len() {
            return Err(ModelError::DimensionMismatch {
                expected,
                actual: query_vector.len(),
            });
        }
    }

    let mut ranked: Vec<RankedChunk<'a>> = store
        .chunks()
        .iter()
        .map(|chunk| RankedChunk {
            chunk,
            score: cosine_similarity(&chunk.embedding, query_vector),
        })
        .collect();

    // `sort_by` is stable, which is what keeps ties in insertion order.
    ranked.sort_by(|left, right| right.score.total_cmp(&left.score));
    ranked.truncate(k);
    Ok(ranked)
}
