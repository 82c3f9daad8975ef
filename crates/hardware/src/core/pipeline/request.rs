//! Canonical in-flight load record.
//!
//! A [`LoadRequest`] is created when the arbiter selects a source and lives
//! until Stage3 hands it to the commit port, a replay queue, or a rollback.
//! It provides:
//! 1. **Ordering:** The [`Age`] total order used by every hazard and flush decision.
//! 2. **Origin:** The [`RequestSource`] priority list the arbiter walks.
//! 3. **Speculation State:** Flags and carried tokens from earlier attempts.

use crate::common::{ExceptionVector, LoadOp, PhysAddr, VirtAddr};

/// Sequence identifier of a load in program order. Smaller is older.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Age(pub u64);

impl Age {
    /// Returns true if `self` precedes `other` in program order.
    #[inline]
    pub const fn is_older_than(self, other: Self) -> bool {
        self.0 < other.0
    }
}

impl std::fmt::Display for Age {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Origin of a load request, listed from highest to lowest arbitration priority.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestSource {
    /// Aligned part of a split misaligned load, re-issued by the misalignment handler.
    MisalignReplay,
    /// Queued replay woken by a refill; jumps ahead of other replays.
    SuperReplay,
    /// Immediate retry from this pipeline's own fast-replay buffer.
    FastReplay,
    /// Completion of an uncached MMIO access, carrying its data.
    MmioResponse,
    /// Completion of a non-cacheable access, carrying its data.
    NcResponse,
    /// Ordinary replay from the queued-replay store.
    QueuedReplay,
    /// Hardware prefetch with high confidence.
    PrefetchHigh,
    /// Wide/vector-lane issue.
    VectorIssue,
    /// Scalar issue from the issue queue.
    ScalarIssue,
    /// Dependent load issued off a producer's speculative data.
    PointerChase,
    /// Hardware prefetch with low confidence.
    PrefetchLow,
}

impl RequestSource {
    /// Number of sources.
    pub const COUNT: usize = 11;

    /// All sources in priority order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::MisalignReplay,
        Self::SuperReplay,
        Self::FastReplay,
        Self::MmioResponse,
        Self::NcResponse,
        Self::QueuedReplay,
        Self::PrefetchHigh,
        Self::VectorIssue,
        Self::ScalarIssue,
        Self::PointerChase,
        Self::PrefetchLow,
    ];

    /// Position in the priority list; 0 is highest.
    #[inline]
    pub const fn priority(self) -> usize {
        self as usize
    }

    /// Sources that already hold a physical address and skip translation.
    pub const fn is_translation_exempt(self) -> bool {
        matches!(
            self,
            Self::FastReplay
                | Self::MmioResponse
                | Self::NcResponse
                | Self::PrefetchHigh
                | Self::PrefetchLow
        )
    }

    /// Sources that deliver already-fetched uncached data.
    pub const fn carries_data(self) -> bool {
        matches!(self, Self::MmioResponse | Self::NcResponse)
    }

    /// Hardware prefetch sources.
    pub const fn is_prefetch(self) -> bool {
        matches!(self, Self::PrefetchHigh | Self::PrefetchLow)
    }

    /// Replay sources (the request has been through the pipeline before).
    pub const fn is_replay(self) -> bool {
        matches!(
            self,
            Self::MisalignReplay | Self::SuperReplay | Self::FastReplay | Self::QueuedReplay
        )
    }
}

/// What the alignment pre-check decided for a misaligned candidate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MisalignAction {
    /// Aligned, or misaligned but serviceable inside one bank.
    #[default]
    None,
    /// Hand to the misalignment handler for splitting.
    ForceSplit,
    /// Raise an address-misaligned exception.
    ForceFault,
}

/// Speculation and routing flags of a request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RequestFlags {
    /// Hardware prefetch; produces no architectural result.
    pub prefetch: bool,
    /// Re-issued after an earlier failed attempt.
    pub replay: bool,
    /// Re-issued through the immediate (fast) replay path.
    pub fast_replay: bool,
    /// Address was formed off a producer's speculative result.
    pub pointer_chase: bool,
    /// Wide (16-byte) or vector-lane access.
    pub wide: bool,
    /// Aligned part of a split misaligned load.
    pub misalign_part: bool,
    /// Uncached MMIO access.
    pub mmio: bool,
    /// Non-cacheable access.
    pub non_cacheable: bool,
}

impl RequestFlags {
    /// Returns true if the access bypasses the data cache.
    #[inline]
    pub const fn uncached(self) -> bool {
        self.mmio || self.non_cacheable
    }
}

/// Token handed back by the cache for the next attempt of a replayed load.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplayCarry {
    /// The way hint is meaningful.
    pub valid: bool,
    /// Way that holds (or will hold) the line.
    pub way: u8,
}

/// Link from a dependent load to the producer whose data formed its address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChaseLink {
    /// Age of the producer load.
    pub producer: Age,
    /// Immediate added to the producer's value.
    pub offset: i64,
    /// Issue logic's prediction that the producer will route its result here next cycle.
    pub fast_match: bool,
}

/// Data carried untouched to the final writeback.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadPayload {
    /// Destination register; `None` for prefetches.
    pub dest: Option<usize>,
    /// Exceptions accumulated so far.
    pub exceptions: ExceptionVector,
}

/// Canonical in-flight load record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadRequest {
    /// Program-order age.
    pub age: Age,
    /// Source the arbiter selected it from.
    pub source: Option<RequestSource>,
    /// Load operation.
    pub op: LoadOp,
    /// Virtual address.
    pub vaddr: VirtAddr,
    /// Physical address once known.
    pub paddr: Option<PhysAddr>,
    /// Bytes read, relative to the 16-byte bank.
    pub mask: u16,
    /// Speculation and routing flags.
    pub flags: RequestFlags,
    /// Alignment pre-check verdict.
    pub misalign: MisalignAction,
    /// Destination and exceptions.
    pub payload: LoadPayload,
    /// Cache token from the previous attempt.
    pub carry: ReplayCarry,
    /// Ordering violation observed on an earlier attempt.
    pub carried_nuke: bool,
    /// Miss-handling slot from the previous attempt.
    pub mshr_id: Option<u8>,
    /// Data already delivered by the uncached path.
    pub uncached_data: Option<u64>,
    /// Pointer-chase linkage.
    pub chase: Option<ChaseLink>,
}

impl LoadRequest {
    /// Returns true if the request has recorded an exception.
    #[inline]
    pub const fn has_exception(&self) -> bool {
        !self.payload.exceptions.is_empty()
    }

    /// Returns true if uncached data has already been delivered.
    #[inline]
    pub const fn uncached_satisfied(&self) -> bool {
        self.uncached_data.is_some()
    }
}
