//! Alignment & Layout Policy — pure functions computing the next valid byte
//! offset for a page class. No I/O, no allocation beyond the returned
//! struct; everything here is unit-testable without a runtime.

use crate::page::PageKind;
use crate::page::SerializationType;

/// Alignment modulus for uber pages. Not a power of two — computed with
/// plain modulo arithmetic, unlike the other two constants below.
pub const UBER_PAGE_BYTE_ALIGN: u64 = 100;

/// Power-of-two alignment for revision-root pages.
pub const REVISION_ROOT_PAGE_BYTE_ALIGN: u64 = 256;

/// Power-of-two alignment for every other DATA page (fragments).
pub const PAGE_FRAGMENT_BYTE_ALIGN: u64 = 8;

/// Buffer byte threshold that triggers a flush.
pub const FLUSH_SIZE: u64 = 64_000;

/// Sizes handed to the writer by its embedder rather than hard-coded:
/// the reserved dual-uber-page prefix of the revisions (and data) file,
/// and the per-entry length-prefix header size.
#[derive(Debug, Clone, Copy)]
pub struct WriterConfig {
    pub first_beacon: u64,
    pub other_beacon: u64,
}

impl WriterConfig {
    pub fn new(first_beacon: u64, other_beacon: u64) -> Self {
        debug_assert!(first_beacon % 2 == 0, "FIRST_BEACON must be even");
        Self {
            first_beacon,
            other_beacon,
        }
    }
}

/// Result of applying the layout policy to a candidate offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub write_offset: u64,
    pub padding_before: u64,
    pub padding_after: u64,
}

/// Smallest multiple of `align` that is >= `x`. `align` must be a power of
/// two; callers that need modulo alignment (the uber-page case) don't call
/// this.
pub fn round_up_pow2(x: u64, align: u64) -> u64 {
    debug_assert!(align.is_power_of_two());
    (x + align - 1) & !(align - 1)
}

/// Computes where the next page should land, and how much padding (before
/// and/or after the payload) that requires.
///
/// `is_first_append` means this is the very first byte ever written to the
/// file in this session — both the data file and the revisions file
/// reserve `FIRST_BEACON` bytes at their start, so the first real append
/// lands just past that reserved prefix.
pub fn next_offset(
    current_offset: u64,
    kind: PageKind,
    serialized_length: u64,
    ty: SerializationType,
    is_first_append: bool,
    cfg: &WriterConfig,
) -> Placement {
    if ty != SerializationType::Data {
        return Placement {
            write_offset: current_offset,
            padding_before: 0,
            padding_after: 0,
        };
    }

    // `current_offset` while the file is still empty is measured from 0
    // (it's just the buffer's write position so far) — add the beacon
    // base rather than replace it, so a second page buffered before the
    // first flush still lands past the reserved prefix instead of inside it.
    let base = if is_first_append {
        round_up_pow2(cfg.first_beacon, PAGE_FRAGMENT_BYTE_ALIGN) + current_offset
    } else {
        current_offset
    };

    match kind {
        PageKind::UberPage => {
            let total = serialized_length + cfg.other_beacon;
            let rem = total % UBER_PAGE_BYTE_ALIGN;
            let padding_after = if rem == 0 { 0 } else { UBER_PAGE_BYTE_ALIGN - rem };
            Placement {
                write_offset: base,
                padding_before: 0,
                padding_after,
            }
        }
        PageKind::RevisionRootPage => {
            let aligned = round_up_pow2(base, REVISION_ROOT_PAGE_BYTE_ALIGN);
            Placement {
                write_offset: aligned,
                padding_before: aligned - base,
                padding_after: 0,
            }
        }
        PageKind::UnorderedKeyValuePage | PageKind::Other => {
            let aligned = round_up_pow2(base, PAGE_FRAGMENT_BYTE_ALIGN);
            Placement {
                write_offset: aligned,
                padding_before: aligned - base,
                padding_after: 0,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_up_already_aligned_is_identity() {
        assert_eq!(round_up_pow2(512, 8), 512);
        assert_eq!(round_up_pow2(256, 256), 256);
    }

    #[test]
    fn round_up_advances_to_next_multiple() {
        assert_eq!(round_up_pow2(600, 256), 768);
        assert_eq!(round_up_pow2(513, 8), 520);
    }

    #[test]
    fn fragment_page_on_empty_file_lands_past_beacon() {
        let cfg = WriterConfig::new(512, 4);
        let p = next_offset(0, PageKind::Other, 13, SerializationType::Data, true, &cfg);
        assert_eq!(p.write_offset, 512);
        assert_eq!(p.padding_before, 0);
    }

    #[test]
    fn revision_root_pads_before_to_256_scenario_c() {
        let cfg = WriterConfig::new(512, 4);
        let p = next_offset(
            600,
            PageKind::RevisionRootPage,
            900,
            SerializationType::Data,
            false,
            &cfg,
        );
        assert_eq!(p.write_offset, 768);
        assert_eq!(p.padding_before, 168);
    }

    #[test]
    fn uber_page_pads_after_to_modulo_100() {
        let cfg = WriterConfig::new(512, 4);
        // serialized_length 40 + OTHER_BEACON 4 == 44, needs 56 more to hit 100.
        let p = next_offset(0, PageKind::UberPage, 40, SerializationType::Data, false, &cfg);
        assert_eq!(p.padding_after, 56);
        assert_eq!((40 + 4 + p.padding_after) % UBER_PAGE_BYTE_ALIGN, 0);
    }

    #[test]
    fn uber_page_needs_no_padding_when_already_aligned() {
        let cfg = WriterConfig::new(512, 4);
        let p = next_offset(0, PageKind::UberPage, 96, SerializationType::Data, false, &cfg);
        assert_eq!(p.padding_after, 0);
    }

    #[test]
    fn transaction_intent_log_mode_never_pads() {
        let cfg = WriterConfig::new(512, 4);
        let p = next_offset(
            777,
            PageKind::RevisionRootPage,
            50,
            SerializationType::TransactionIntentLog,
            false,
            &cfg,
        );
        assert_eq!(p.write_offset, 777);
        assert_eq!(p.padding_before, 0);
        assert_eq!(p.padding_after, 0);
    }
}
