//! Per-revision offset cache, shared between the writer and the companion
//! reader. Safe for concurrent readers plus a single writer: reads take a
//! shared lock, the writer's inserts take an exclusive one, and the writer
//! never commits the next revision until its own insert has completed —
//! so, per spec.md §9, a plain lock-protected map is equivalent to the
//! future-based cache insert the original implementation used, at the
//! cost of blocking concurrent readers for the (very short) duration of an
//! insert rather than letting them race a future to resolution.

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::RwLock;

use crate::error::{WriterError, WriterResult};

/// `(offset, timestamp)` for a committed revision's root page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevisionFileData {
    pub offset: u64,
    pub timestamp_millis: i64,
}

impl RevisionFileData {
    pub fn new(offset: u64, timestamp_millis: i64) -> Self {
        Self {
            offset,
            timestamp_millis,
        }
    }

    pub fn timestamp(&self) -> SystemTime {
        if self.timestamp_millis >= 0 {
            UNIX_EPOCH + Duration::from_millis(self.timestamp_millis as u64)
        } else {
            UNIX_EPOCH - Duration::from_millis((-self.timestamp_millis) as u64)
        }
    }
}

#[derive(Debug, Default)]
pub struct OffsetCache {
    inner: RwLock<HashMap<u64, RevisionFileData>>,
}

impl OffsetCache {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub async fn insert(&self, revision: u64, data: RevisionFileData) {
        self.inner.write().await.insert(revision, data);
    }

    pub async fn get(&self, revision: u64) -> Option<RevisionFileData> {
        self.inner.read().await.get(&revision).copied()
    }

    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }

    /// Looks up `revision` with a hard timeout, surfacing both a cache miss
    /// and a timeout as `WriterError::IllegalState` per spec.md §4.7/§7.
    pub async fn get_with_timeout(&self, revision: u64, timeout: Duration) -> WriterResult<RevisionFileData> {
        match tokio::time::timeout(timeout, self.get(revision)).await {
            Ok(Some(data)) => Ok(data),
            Ok(None) => Err(WriterError::IllegalState(format!(
                "no cached offset for revision {revision}"
            ))),
            Err(_) => Err(WriterError::IllegalState(format!(
                "timed out resolving offset for revision {revision}"
            ))),
        }
    }
}
