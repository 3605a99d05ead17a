//! The companion page reader's interface. The writer forwards every read
//! operation to it verbatim and keeps it alive for its entire lifetime so
//! the two share a cache and a hash function — the reader's actual
//! page-decoding logic is out of scope for this crate (spec.md §1).

use std::sync::Arc;

use async_trait::async_trait;

use crate::cache::OffsetCache;
use crate::error::WriterResult;
use crate::page::{Page, PageReference};
use crate::serialize::ByteHandler;

#[async_trait(?Send)]
pub trait PageReader {
    async fn read_page(&self, reference: &PageReference) -> WriterResult<Arc<dyn Page>>;

    async fn read_revision_root(&self, revision: u64) -> WriterResult<Arc<dyn Page>>;

    /// The byte-transform chain the writer reuses for every payload it
    /// produces.
    fn byte_handler(&self) -> &dyn ByteHandler;

    /// The per-revision offset cache, shared between reader and writer.
    fn offset_cache(&self) -> &OffsetCache;

    async fn close(&self) -> WriterResult<()>;
}
