//! Commit Coordinator — orchestrates buffered page writes, the dual
//! uber-page commit sequence, offset-cache updates, and durable sync on
//! close. This is the top-level state machine spec.md §4.6 describes.
//!
//! Single-writer discipline: mutation methods here are not reentrant or
//! thread-safe. Concurrent use of one `PageWriter` is a caller bug, not a
//! condition this crate detects.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument, trace};

use crate::align::{self, Placement, WriterConfig};
use crate::buffer::Buffer;
use crate::cache::RevisionFileData;
use crate::error::{WriterError, WriterResult};
use crate::file::AsyncFile;
use crate::hash::hash_bytes;
use crate::page::{Page, PageKind, PageReference, SerializationType};
use crate::reader::PageReader;
use crate::serialize::{self, PagePersister};
use crate::transaction::Transaction;

/// How long `truncate_to` will wait on a cache miss before giving up.
const REVISION_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Explicit state the commit sequence moves through. Kept as a field on
/// the writer rather than the ambient mutable boolean spec.md §9 flags as
/// fragile — the REDESIGN FLAG this crate follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterPhase {
    Steady,
    UberFirst,
    UberSecond,
    Committed,
}

/// Capability consumed by transactions: `write`, `write_uber_page_reference`,
/// `truncate`, `truncate_to`, `close`.
#[async_trait(?Send)]
pub trait Writer {
    async fn write(
        &mut self,
        trx: &dyn Transaction,
        page_ref: &mut PageReference,
        page: &dyn Page,
        buffer: Buffer,
    ) -> WriterResult<Buffer>;

    async fn write_uber_page_reference(
        &mut self,
        trx: &dyn Transaction,
        page_ref: &mut PageReference,
        page: &dyn Page,
        buffer: Buffer,
    ) -> WriterResult<Buffer>;

    async fn truncate(&mut self) -> WriterResult<()>;

    async fn truncate_to(&mut self, revision: u64) -> WriterResult<()>;

    async fn close(&mut self) -> WriterResult<()>;
}

pub struct PageWriter {
    data_file: Box<dyn AsyncFile>,
    revisions_file: Box<dyn AsyncFile>,
    persister: Box<dyn PagePersister>,
    reader: Box<dyn PageReader>,
    config: WriterConfig,
    serialization_type: SerializationType,
    phase: WriterPhase,
    closed: bool,
}

impl PageWriter {
    pub fn new(
        data_file: Box<dyn AsyncFile>,
        revisions_file: Box<dyn AsyncFile>,
        persister: Box<dyn PagePersister>,
        reader: Box<dyn PageReader>,
        config: WriterConfig,
        serialization_type: SerializationType,
    ) -> Self {
        Self {
            data_file,
            revisions_file,
            persister,
            reader,
            config,
            serialization_type,
            phase: WriterPhase::Steady,
            closed: false,
        }
    }

    fn check_open(&self) -> WriterResult<()> {
        if self.closed {
            return Err(WriterError::IllegalState("writer is closed".to_string()));
        }
        Ok(())
    }

    /// Shared implementation behind both `write` and the two uber-page
    /// appends inside `write_uber_page_reference`. Returns the buffer
    /// (possibly a fresh instance, if a flush happened along the way).
    async fn write_internal(
        &mut self,
        trx: &dyn Transaction,
        page_ref: &mut PageReference,
        page: &dyn Page,
        mut buffer: Buffer,
        ty: SerializationType,
    ) -> WriterResult<Buffer> {
        let file_size = self.data_file.size().await?;
        // The file stays empty on disk (`file_size == 0`) until its first
        // flush happens, however many pages have already accumulated in the
        // buffer — every one of those still needs the FIRST_BEACON-relative
        // base, not just the very first.
        let is_first_append = file_size == 0;
        let candidate_offset = file_size + buffer.write_position() as u64;

        let mut scratch = Buffer::new();
        let payload = serialize::serialize(
            self.persister.as_ref(),
            self.reader.byte_handler(),
            trx,
            &mut scratch,
            page,
            ty,
        )
        .await?;

        let Placement {
            write_offset,
            padding_before,
            padding_after,
        } = align::next_offset(
            candidate_offset,
            page.kind(),
            payload.len() as u64,
            ty,
            is_first_append,
            &self.config,
        );

        if padding_before > 0 {
            buffer.reserve(padding_before as usize);
        }

        buffer.write_u32(payload.len() as u32);
        buffer.write_bytes(&payload);

        let mut framed = Vec::with_capacity(4 + payload.len());
        framed.extend_from_slice(&(payload.len() as u32).to_ne_bytes());
        framed.extend_from_slice(&payload);

        if page.kind() == PageKind::UberPage && padding_after > 0 {
            buffer.reserve(padding_after as usize);
        }

        if buffer.write_position() as u64 > align::FLUSH_SIZE {
            buffer = self.flush_buffer(trx, buffer).await?;
        }

        match ty {
            SerializationType::Data => page_ref.key = Some(write_offset),
            SerializationType::TransactionIntentLog => page_ref.persistent_log_key = Some(write_offset),
        }

        page_ref.hash = Some(if page.kind() == PageKind::UnorderedKeyValuePage {
            page.content_hash()
        } else {
            hash_bytes(&payload)
        });

        if ty == SerializationType::Data {
            if page.kind() == PageKind::RevisionRootPage {
                self.index_revision_root(trx, write_offset).await?;
            }
            if page.kind() == PageKind::UberPage && self.phase == WriterPhase::UberFirst {
                self.write_dual_beacon(&framed).await?;
            }
        }

        Ok(buffer)
    }

    /// §4.3: flushes the buffer's bytes to the data file at the normal
    /// append position, then hands back whatever fresh instance the
    /// transaction manufactures. The flushed buffer is never reused — an
    /// in-flight async write may still be reading its storage.
    async fn flush_buffer(&mut self, trx: &dyn Transaction, buffer: Buffer) -> WriterResult<Buffer> {
        let file_size = self.data_file.size().await?;
        let dest = if file_size == 0 {
            align::round_up_pow2(self.config.first_beacon, align::PAGE_FRAGMENT_BYTE_ALIGN)
        } else {
            file_size
        };
        self.flush_buffer_to(trx, buffer, dest).await
    }

    /// §4.6 step 4 / scenario B: the uber-page commit's closing flush lands
    /// the buffer in the data file's reserved beacon region at offset 0,
    /// the same reserved-prefix treatment `write_dual_beacon` gives the
    /// revisions file, rather than appending past the current end of file.
    async fn flush_commit_buffer(&mut self, trx: &dyn Transaction, buffer: Buffer) -> WriterResult<Buffer> {
        self.flush_buffer_to(trx, buffer, 0).await
    }

    #[instrument(skip(self, trx, buffer))]
    async fn flush_buffer_to(&mut self, trx: &dyn Transaction, buffer: Buffer, dest: u64) -> WriterResult<Buffer> {
        let bytes = buffer.into_vec();
        if !bytes.is_empty() {
            trace!(dest, len = bytes.len(), "flushing write buffer to data file");
            let (res, _buf) = self.data_file.write(bytes, dest).await;
            res?;
        }

        Ok(trx.new_buffered_bytes_instance())
    }

    /// §4.5, first half: appends a 16-byte `(offset, timestamp_millis)`
    /// record to the revisions file and populates the offset cache.
    async fn index_revision_root(&mut self, trx: &dyn Transaction, offset: u64) -> WriterResult<()> {
        let revision = trx.revision_number();
        let timestamp_millis = trx.revision_timestamp_millis();

        let mut record = [0u8; 16];
        record[0..8].copy_from_slice(&offset.to_ne_bytes());
        record[8..16].copy_from_slice(&timestamp_millis.to_ne_bytes());

        let dest = if revision == 0 {
            self.revisions_file.size().await? + self.config.first_beacon
        } else {
            self.revisions_file.size().await?
        };

        let (res, _buf) = self.revisions_file.write(record.to_vec(), dest).await;
        res?;

        let data = RevisionFileData::new(offset, timestamp_millis);
        self.reader.offset_cache().insert(revision, data).await;
        debug!(revision, offset, "indexed revision root");
        Ok(())
    }

    /// §4.5, second half: writes two `FIRST_BEACON/2`-byte copies of the
    /// serialized uber page into the revisions file's reserved prefix and
    /// syncs it.
    async fn write_dual_beacon(&mut self, framed_payload: &[u8]) -> WriterResult<()> {
        let half = (self.config.first_beacon / 2) as usize;

        let mut first = vec![0u8; half];
        let n = framed_payload.len().min(half);
        first[..n].copy_from_slice(&framed_payload[..n]);
        let second = first.clone();

        let (res, _) = self.revisions_file.write(first, 0).await;
        res?;
        let (res, _) = self.revisions_file.write(second, half as u64).await;
        res?;

        self.revisions_file.data_sync().await?;
        debug!("wrote dual uber-page beacon");
        Ok(())
    }

    async fn lookup_revision(&self, revision: u64) -> WriterResult<RevisionFileData> {
        if let Some(data) = self.reader.offset_cache().get(revision).await {
            return Ok(data);
        }
        // Cache miss: ask the reader to resolve it (§4.7 step 1's "inverse
        // lookup"), which should populate the cache as a side effect.
        self.reader.read_revision_root(revision).await?;
        self.reader
            .offset_cache()
            .get(revision)
            .await
            .ok_or_else(|| WriterError::IllegalState(format!("revision {revision} not found")))
    }
}

#[async_trait(?Send)]
impl Writer for PageWriter {
    #[instrument(skip(self, trx, page, buffer))]
    async fn write(
        &mut self,
        trx: &dyn Transaction,
        page_ref: &mut PageReference,
        page: &dyn Page,
        buffer: Buffer,
    ) -> WriterResult<Buffer> {
        self.check_open()?;
        let ty = self.serialization_type;
        let buffer = self.write_internal(trx, page_ref, page, buffer, ty).await?;
        self.phase = WriterPhase::Steady;
        Ok(buffer)
    }

    #[instrument(skip(self, trx, page, buffer))]
    async fn write_uber_page_reference(
        &mut self,
        trx: &dyn Transaction,
        page_ref: &mut PageReference,
        page: &dyn Page,
        mut buffer: Buffer,
    ) -> WriterResult<Buffer> {
        self.check_open()?;

        if !buffer.is_empty() {
            buffer = self.flush_buffer(trx, buffer).await?;
        }

        self.phase = WriterPhase::UberFirst;
        buffer = self
            .write_internal(trx, page_ref, page, buffer, SerializationType::Data)
            .await?;

        self.phase = WriterPhase::UberSecond;
        buffer = self
            .write_internal(trx, page_ref, page, buffer, SerializationType::Data)
            .await?;

        if !buffer.is_empty() {
            buffer = self.flush_commit_buffer(trx, buffer).await?;
        }
        self.data_file.data_sync().await?;

        self.phase = WriterPhase::Committed;
        debug!("uber page reference committed");
        let fresh = trx.new_buffered_bytes_instance();
        self.phase = WriterPhase::Steady;
        Ok(fresh)
    }

    async fn truncate(&mut self) -> WriterResult<()> {
        self.check_open()?;
        self.data_file.truncate(0).await?;
        self.revisions_file.truncate(0).await?;
        self.reader.offset_cache().clear().await;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn truncate_to(&mut self, revision: u64) -> WriterResult<()> {
        self.check_open()?;

        let data = tokio::time::timeout(REVISION_LOOKUP_TIMEOUT, self.lookup_revision(revision))
            .await
            .map_err(|_| WriterError::IllegalState(format!("timed out resolving revision {revision}")))??;

        let head_len = self.config.other_beacon as usize;
        let (res, head) = self.data_file.read(vec![0u8; head_len], data.offset).await;
        let n = res?;
        if (n as u64) < self.config.other_beacon || head.len() < 4 {
            return Err(WriterError::IllegalState(
                "short read of length prefix during truncate_to".to_string(),
            ));
        }
        let data_length = u32::from_ne_bytes(head[0..4].try_into().unwrap()) as u64;

        let new_len = data.offset + self.config.other_beacon + data_length;
        self.data_file.truncate(new_len).await?;
        debug!(revision, new_len, "truncated data file");
        Ok(())
    }

    async fn close(&mut self) -> WriterResult<()> {
        if self.closed {
            return Ok(());
        }
        self.data_file.data_sync().await?;
        self.revisions_file.data_sync().await?;
        self.reader.close().await?;
        self.closed = true;
        Ok(())
    }
}
