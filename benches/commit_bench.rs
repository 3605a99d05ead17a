//! Throughput benchmark for committing a sequence of revisions: each
//! iteration writes a revision-root page and then commits the uber-page
//! reference. Uses the teacher crate's benchmark dev-dependencies
//! (`cpu-time`, `memory-stats`) rather than a criterion-style harness,
//! hence `harness = false` in Cargo.toml.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use cpu_time::ProcessTime;
use strata::{
    Buffer, ByteHandler, IdentityByteHandler, OffsetCache, Page, PageKind, PageReader,
    PagePersister, PageReference, PageWriter, SerializationType, Transaction, UringFile, Writer,
    WriterConfig, WriterResult,
};

struct BenchPage {
    kind: PageKind,
}

impl Page for BenchPage {
    fn kind(&self) -> PageKind {
        self.kind
    }
}

struct FixedBytesPersister(Vec<u8>);

#[async_trait(?Send)]
impl PagePersister for FixedBytesPersister {
    async fn serialize_page(
        &self,
        _trx: &dyn Transaction,
        scratch: &mut Buffer,
        _page: &dyn Page,
        _mode: SerializationType,
    ) -> WriterResult<()> {
        scratch.write_bytes(&self.0);
        Ok(())
    }
}

struct BenchReader {
    cache: OffsetCache,
    handler: IdentityByteHandler,
}

#[async_trait(?Send)]
impl PageReader for BenchReader {
    async fn read_page(&self, _reference: &PageReference) -> WriterResult<Arc<dyn Page>> {
        unimplemented!()
    }
    async fn read_revision_root(&self, _revision: u64) -> WriterResult<Arc<dyn Page>> {
        unimplemented!()
    }
    fn byte_handler(&self) -> &dyn ByteHandler {
        &self.handler
    }
    fn offset_cache(&self) -> &OffsetCache {
        &self.cache
    }
    async fn close(&self) -> WriterResult<()> {
        Ok(())
    }
}

struct BenchTrx {
    revision: u64,
}

impl Transaction for BenchTrx {
    fn new_buffered_bytes_instance(&self) -> Buffer {
        Buffer::new()
    }
    fn revision_number(&self) -> u64 {
        self.revision
    }
    fn revision_timestamp_millis(&self) -> i64 {
        self.revision as i64
    }
}

const REVISIONS: u64 = 200;

fn main() {
    tokio_uring::start(async {
        let dir = tempfile::tempdir().expect("tempdir");
        let data = Box::new(UringFile::open(dir.path().join("data")).await.expect("open data file"));
        let rev = Box::new(UringFile::open(dir.path().join("rev")).await.expect("open revisions file"));
        let persister = Box::new(FixedBytesPersister(vec![0xAB; 256]));
        let reader = Box::new(BenchReader {
            cache: OffsetCache::new(),
            handler: IdentityByteHandler,
        });
        let cfg = WriterConfig::new(512, 4);
        let mut writer = PageWriter::new(data, rev, persister, reader, cfg, SerializationType::Data);

        let wall_start = Instant::now();
        let cpu_start = ProcessTime::now();
        let mem_start = memory_stats::memory_stats().map(|m| m.physical_mem);

        for revision in 0..REVISIONS {
            let trx = BenchTrx { revision };

            let mut root_ref = PageReference::new();
            let root_page = BenchPage {
                kind: PageKind::RevisionRootPage,
            };
            writer
                .write(&trx, &mut root_ref, &root_page, Buffer::new())
                .await
                .expect("write revision root");

            let mut uber_ref = PageReference::new();
            let uber_page = BenchPage {
                kind: PageKind::UberPage,
            };
            writer
                .write_uber_page_reference(&trx, &mut uber_ref, &uber_page, Buffer::new())
                .await
                .expect("commit uber page reference");
        }

        writer.close().await.expect("close");

        let wall = wall_start.elapsed();
        let cpu = cpu_start.elapsed();
        let mem_end = memory_stats::memory_stats().map(|m| m.physical_mem);

        println!("committed {REVISIONS} revisions in {wall:?} (cpu {cpu:?})");
        if let (Some(start), Some(end)) = (mem_start, mem_end) {
            println!("physical memory delta: {} bytes", end as i64 - start as i64);
        }
    });
}
