//! Forward merge unit.
//!
//! Loads can obtain bytes from buffers other than the cache: uncommitted
//! stores, the store buffer, the miss-handling buffer and data in flight on the
//! refill network. Each source answers a [`ForwardQuery`] with a per-byte
//! [`ForwardContribution`], and [`merge`] combines them in source priority
//! order. The merged bank is later overlaid on the cache data by the writeback.

use crate::common::PhysAddr;
use crate::core::pipeline::request::Age;

/// Forwarding sources, in lookup priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ForwardSource {
    /// Uncommitted stores older than the load.
    StoreQueue,
    /// Committed stores waiting to drain.
    StoreBuffer,
    /// Miss-handling buffer holding a partially refilled line.
    MissBuffer,
    /// Refill data broadcast this cycle.
    RefillNetwork,
}

impl ForwardSource {
    /// Number of sources.
    pub const COUNT: usize = 4;

    /// Sources in lookup priority order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::StoreQueue,
        Self::StoreBuffer,
        Self::MissBuffer,
        Self::RefillNetwork,
    ];
}

/// Query sent to every forwarding source from Stage1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ForwardQuery {
    /// Load age; only older stores may forward.
    pub age: Age,
    /// Physical address.
    pub paddr: PhysAddr,
    /// Bytes read within the bank.
    pub mask: u16,
    /// Miss-handling slot of the previous attempt, if any.
    pub mshr_id: Option<u8>,
}

/// One source's answer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ForwardContribution {
    /// Bytes this source supplies.
    pub valid: u16,
    /// Byte values; only lanes in `valid` are meaningful.
    pub data: [u8; 16],
    /// A matching entry exists but its data is not ready yet.
    pub data_pending: bool,
    /// An older store's address is still unknown.
    pub addr_ambiguous: bool,
    /// The source matched on a stale virtual/physical pairing; the forwarded
    /// bytes cannot be trusted.
    pub match_invalid: bool,
}

impl ForwardContribution {
    /// A contribution supplying `valid` lanes of `data`.
    pub const fn bytes(valid: u16, data: [u8; 16]) -> Self {
        Self {
            valid,
            data,
            data_pending: false,
            addr_ambiguous: false,
            match_invalid: false,
        }
    }
}

/// Contributions from every source, indexed in [`ForwardSource::ALL`] order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ForwardResponses {
    /// One entry per source.
    pub by_source: [ForwardContribution; ForwardSource::COUNT],
}

impl ForwardResponses {
    /// Contribution of `source`.
    pub const fn get(&self, source: ForwardSource) -> &ForwardContribution {
        &self.by_source[source as usize]
    }

    /// Replaces the contribution of `source`.
    pub const fn set(&mut self, source: ForwardSource, c: ForwardContribution) {
        self.by_source[source as usize] = c;
    }
}

/// Result of merging every contribution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ForwardMerge {
    /// Bytes that received a contribution.
    pub valid: u16,
    /// Merged byte values.
    pub data: [u8; 16],
    /// Every masked byte is valid and no source reported pending data.
    pub full: bool,
    /// Some source has the data but cannot deliver it yet.
    pub fail: bool,
    /// An older store address is unknown.
    pub ambiguous: bool,
    /// A source matched on stale address information.
    pub match_invalid: bool,
}

impl ForwardMerge {
    /// Returns true if byte lane `i` was forwarded.
    #[inline]
    pub const fn lane(&self, i: usize) -> bool {
        self.valid & (1 << i) != 0
    }
}

/// Merges every source's contribution for the bytes in `mask`.
///
/// For each masked byte the first source in [`ForwardSource::ALL`] order that
/// marks it valid wins. Bytes outside `mask` are ignored.
pub fn merge(mask: u16, responses: &ForwardResponses) -> ForwardMerge {
    let mut out = ForwardMerge::default();
    for c in ForwardSource::ALL.map(|s| responses.get(s)) {
        out.fail |= c.data_pending;
        out.ambiguous |= c.addr_ambiguous;
        out.match_invalid |= c.match_invalid;
        let fresh = c.valid & mask & !out.valid;
        if fresh == 0 {
            continue;
        }
        for (i, byte) in out.data.iter_mut().enumerate() {
            if fresh & (1 << i) != 0 {
                *byte = c.data[i];
            }
        }
        out.valid |= fresh;
    }
    out.full = mask != 0 && out.valid & mask == mask && !out.fail;
    out
}
