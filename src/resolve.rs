//! Parallel offset resolution.
//!
//! Filename parsing is instant, but a probe call spawns ffprobe, so every
//! segment is resolved on the blocking pool behind a semaphore. Results come
//! back in input order regardless of completion order.

use crate::ingest::IngestedSegment;
use segmerge_core::{resolve_offset, ResolvedOffset, Segment, StartTimeProbe};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Resolve offsets for every ingested segment using at most `workers`
/// concurrent probe calls.
pub async fn resolve_all(
    segments: Vec<IngestedSegment>,
    probe: Arc<dyn StartTimeProbe>,
    workers: usize,
) -> Vec<Segment> {
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut handles = Vec::with_capacity(segments.len());

    for segment in segments {
        let sem = semaphore.clone();
        let probe = probe.clone();
        let path = segment.path.clone();

        let handle = tokio::spawn(async move {
            // The semaphore is never closed
            let _permit = sem.acquire_owned().await.ok();
            tokio::task::spawn_blocking(move || resolve_offset(&path, probe.as_ref())).await
        });
        handles.push((segment, handle));
    }

    let mut resolved = Vec::with_capacity(handles.len());
    for (segment, handle) in handles {
        let offset = match handle.await {
            Ok(Ok(offset)) => offset,
            Ok(Err(e)) | Err(e) => {
                tracing::warn!("Offset task for {:?} failed: {}", segment.path, e);
                ResolvedOffset::unresolved()
            }
        };
        resolved.push(Segment::new(segment.path, segment.group, offset));
    }

    let unresolved = resolved.iter().filter(|s| !s.is_resolved()).count();
    if unresolved > 0 {
        tracing::warn!(
            "{} segment(s) have no start time and were placed at offset 0",
            unresolved
        );
    }

    resolved
}
