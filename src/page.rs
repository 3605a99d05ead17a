//! Page-level types the writer operates on. The actual in-memory
//! representation and the persistence codec both live outside this crate;
//! the writer only needs to know a page's variant (for alignment and commit
//! behavior) and, for key-value pages, a self-reported hash.

/// Which alignment/commit rules a page is subject to. The writer treats
/// this purely as a tag — the serialized bytes themselves are opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKind {
    UberPage,
    RevisionRootPage,
    UnorderedKeyValuePage,
    Other,
}

/// A page belonging to the in-memory tree of some revision. Everything
/// beyond `kind` and `content_hash` is owned by the persistence layer this
/// crate delegates to.
pub trait Page: Send + Sync {
    fn kind(&self) -> PageKind;

    /// Self-reported content hash, consulted only for
    /// `PageKind::UnorderedKeyValuePage` (spec.md §8 invariant 3). Other
    /// page kinds are hashed by the writer itself over their serialized
    /// bytes with the shared hash function.
    fn content_hash(&self) -> u32 {
        0
    }
}

/// Selects which field of `PageReference` receives the write offset, and
/// whether revision-indexing side effects fire (`Data` only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializationType {
    Data,
    TransactionIntentLog,
}

/// Mutable descriptor the writer updates as a side effect of persisting a
/// page. A `PageReference` is owned by the caller (typically a
/// transaction); the writer never reads `key`/`persistent_log_key`/`hash`
/// before populating them.
#[derive(Debug, Clone, Default)]
pub struct PageReference {
    /// Absolute byte offset in the data file. Set when serialization mode
    /// is `Data`.
    pub key: Option<u64>,
    /// Absolute byte offset in the transaction-intent log. Set when
    /// serialization mode is `TransactionIntentLog`.
    pub persistent_log_key: Option<u64>,
    /// Content hash: the page's own hash for key-value pages, or the
    /// global hash function over the serialized bytes for everything else.
    pub hash: Option<u32>,
}

impl PageReference {
    pub fn new() -> Self {
        Self::default()
    }
}
