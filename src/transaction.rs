//! The transaction-side surface the writer is consumed through. The
//! node-level transaction API itself lives outside this crate; this trait
//! is the minimal read-only slice of it the writer needs.

use crate::buffer::Buffer;

pub trait Transaction {
    /// Supplies a fresh elastic buffer after a flush. Must never return the
    /// same underlying storage twice in a row — an in-flight async write
    /// may still be reading the old one.
    fn new_buffered_bytes_instance(&self) -> Buffer;

    /// The revision this transaction is committing. Consulted only when
    /// persisting a `RevisionRootPage` in `Data` mode.
    fn revision_number(&self) -> u64;

    /// Wall-clock commit timestamp, in milliseconds, stored alongside the
    /// revision's offset in the revisions index.
    fn revision_timestamp_millis(&self) -> i64;
}
