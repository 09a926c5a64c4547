use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::traits::{Embedder, EmbeddingError};
use crate::chunker::Chunk;
use crate::parse::ProgressReporter;

/// Embed `chunks` in batches of `batch_size`, returning one vector per chunk
/// in chunk order.
///
/// The token is checked before each batch and aborts the batch in flight.
/// Progress counts chunks embedded so far.
pub async fn embed_chunks(
    embedder: &dyn Embedder,
    chunks: &[Chunk],
    batch_size: usize,
    cancel: &CancellationToken,
    progress: &mut ProgressReporter,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let batch_size = batch_size.max(1);
    let total = chunks.len();
    let mut vectors = Vec::with_capacity(total);
    progress.report(0, total);

    for batch in chunks.chunks(batch_size) {
        if cancel.is_cancelled() {
            return Err(EmbeddingError::Cancelled);
        }
        let texts: Vec<&str> = batch.iter().map(|c| c.content.as_str()).collect();
        let embedded = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(EmbeddingError::Cancelled),
            result = embedder.embed_batch(&texts) => result?,
        };
        if embedded.len() != batch.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: batch.len(),
                actual: embedded.len(),
            });
        }
        vectors.extend(embedded);
        debug!(done = vectors.len(), total, "embedded batch");
        progress.report(vectors.len(), total);
    }
    Ok(vectors)
}
