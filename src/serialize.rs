//! Serialization Pipeline — turns an in-memory page into the byte-transform-
//! filtered payload that gets length-prefixed and appended by the writer.
//! Neither the persister nor the byte-transform chain is interpreted here;
//! the writer only length-prefixes and aligns whatever comes out.

use async_trait::async_trait;

use crate::buffer::Buffer;
use crate::error::WriterResult;
use crate::page::{Page, SerializationType};
use crate::transaction::Transaction;

/// Pluggable capability that knows how to turn a page into bytes. Appends
/// into the caller-provided scratch buffer rather than returning an owned
/// array, matching how the write buffer itself is built up.
#[async_trait(?Send)]
pub trait PagePersister {
    async fn serialize_page(
        &self,
        trx: &dyn Transaction,
        scratch: &mut Buffer,
        page: &dyn Page,
        mode: SerializationType,
    ) -> WriterResult<()>;
}

/// The reader's byte-transform chain (compression/encryption), wrapped
/// around every payload the writer produces. Symmetric with the reverse
/// transform the reader applies when decoding.
pub trait ByteHandler {
    fn transform(&self, payload: &[u8]) -> WriterResult<Vec<u8>>;
}

/// A transform that performs no compression or encryption; the default for
/// embedders (and tests) that don't need one.
pub struct IdentityByteHandler;

impl ByteHandler for IdentityByteHandler {
    fn transform(&self, payload: &[u8]) -> WriterResult<Vec<u8>> {
        Ok(payload.to_vec())
    }
}

/// Runs a page through the persister, then the byte-transform chain, and
/// clears the scratch buffer so it can be reused for the next page.
pub async fn serialize(
    persister: &dyn PagePersister,
    byte_handler: &dyn ByteHandler,
    trx: &dyn Transaction,
    scratch: &mut Buffer,
    page: &dyn Page,
    mode: SerializationType,
) -> WriterResult<Vec<u8>> {
    persister.serialize_page(trx, scratch, page, mode).await?;
    let payload = byte_handler.transform(scratch.as_bytes())?;
    scratch.clear();
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::PageKind;

    struct EchoPersister(Vec<u8>);

    #[async_trait(?Send)]
    impl PagePersister for EchoPersister {
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

    struct DummyPage;
    impl Page for DummyPage {
        fn kind(&self) -> PageKind {
            PageKind::Other
        }
    }

    struct DummyTrx;
    impl Transaction for DummyTrx {
        fn new_buffered_bytes_instance(&self) -> Buffer {
            Buffer::new()
        }
        fn revision_number(&self) -> u64 {
            0
        }
        fn revision_timestamp_millis(&self) -> i64 {
            0
        }
    }

    #[tokio::test]
    async fn identity_handler_passes_bytes_through_and_clears_scratch() {
        let persister = EchoPersister(vec![9, 9, 9]);
        let handler = IdentityByteHandler;
        let mut scratch = Buffer::new();
        let trx = DummyTrx;
        let page = DummyPage;

        let out = serialize(
            &persister,
            &handler,
            &trx,
            &mut scratch,
            &page,
            SerializationType::Data,
        )
        .await
        .unwrap();

        assert_eq!(out, vec![9, 9, 9]);
        assert!(scratch.is_empty());
    }
}
