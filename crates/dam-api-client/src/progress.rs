//! Byte-level progress for multipart uploads.
//!
//! Each file part is streamed in fixed-size chunks; every chunk handed to the
//! transport advances a shared counter and notifies the caller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures::stream;
use serde::Serialize;

/// Chunk size used when streaming a file part.
pub const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferProgress {
    pub loaded: u64,
    pub total: u64,
}

impl TransferProgress {
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.loaded >= self.total
    }
}

pub type ProgressCallback = Arc<dyn Fn(TransferProgress) + Send + Sync>;

/// Shared across all parts of one request.
pub struct ProgressTracker {
    loaded: AtomicU64,
    total: u64,
    callback: Option<ProgressCallback>,
}

impl ProgressTracker {
    pub fn new(total: u64, callback: Option<ProgressCallback>) -> Arc<Self> {
        Arc::new(Self {
            loaded: AtomicU64::new(0),
            total,
            callback,
        })
    }

    pub fn advance(&self, bytes: u64) -> TransferProgress {
        let loaded = (self.loaded.fetch_add(bytes, Ordering::SeqCst) + bytes).min(self.total);
        let progress = TransferProgress {
            loaded,
            total: self.total,
        };
        if let Some(callback) = &self.callback {
            callback(progress);
        }
        progress
    }

    pub fn loaded(&self) -> u64 {
        self.loaded.load(Ordering::SeqCst).min(self.total)
    }
}

/// Streaming request body over `content` that reports each chunk to `tracker`.
pub fn tracked_body(content: Bytes, tracker: Arc<ProgressTracker>) -> reqwest::Body {
    let chunks = stream::iter(split_chunks(&content).into_iter().map(move |chunk| {
        tracker.advance(chunk.len() as u64);
        Ok::<Bytes, std::io::Error>(chunk)
    }));

    reqwest::Body::wrap_stream(chunks)
}

fn split_chunks(content: &Bytes) -> Vec<Bytes> {
    (0..content.len())
        .step_by(UPLOAD_CHUNK_SIZE)
        .map(|start| content.slice(start..(start + UPLOAD_CHUNK_SIZE).min(content.len())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_tracker_reports_running_total() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let tracker = ProgressTracker::new(
            100,
            Some(Arc::new(move |p: TransferProgress| {
                sink.lock().unwrap().push(p.loaded);
            })),
        );

        tracker.advance(40);
        tracker.advance(40);
        let last = tracker.advance(40);

        assert_eq!(*seen.lock().unwrap(), vec![40, 80, 100]);
        assert!(last.is_complete());
        assert_eq!(tracker.loaded(), 100);
    }

    #[test]
    fn test_chunks_cover_whole_payload() {
        let content = Bytes::from(vec![7u8; UPLOAD_CHUNK_SIZE * 2 + 10]);
        let sizes: Vec<usize> = split_chunks(&content).iter().map(Bytes::len).collect();
        assert_eq!(sizes, vec![UPLOAD_CHUNK_SIZE, UPLOAD_CHUNK_SIZE, 10]);

        assert!(split_chunks(&Bytes::new()).is_empty());
    }
}
