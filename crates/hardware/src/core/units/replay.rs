//! Replay classification.
//!
//! Several failure causes can be raised for the same request in the same
//! cycle. The classifier priority-encodes them into a single selected
//! [`ReplayCause`] and decides the retry path. It provides:
//! 1. **Raw Causes:** A bit set accumulated by Stage1 and Stage2.
//! 2. **Troublesome Gate:** Requests that must never replay bypass selection entirely.
//! 3. **Routing:** Immediate retry, queued replay, or program-order rollback.

use std::fmt;

use crate::core::pipeline::request::LoadRequest;

/// Reasons a load may have to be retried, in selection priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReplayCause {
    /// An older store's address is unknown.
    AddressAmbiguous,
    /// Translation missed.
    TranslationMiss,
    /// Forwarding source holds the data but cannot deliver it yet.
    ForwardFail,
    /// Cache refused the access for structural reasons.
    CacheNack,
    /// Cache miss.
    CacheMiss,
    /// Lost data-bank arbitration.
    BankConflict,
    /// Way predictor picked the wrong way.
    WayMispredict,
    /// Read-after-read ordering queue full.
    RarNack,
    /// Read-after-write ordering queue full.
    RawNack,
    /// Misaligned access the misalignment handler could not take.
    MisalignNeedsSplit,
    /// An older overlapping store resolved after the load read memory.
    Nuke,
}

impl ReplayCause {
    /// Number of causes.
    pub const COUNT: usize = 11;

    /// All causes in selection priority order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::AddressAmbiguous,
        Self::TranslationMiss,
        Self::ForwardFail,
        Self::CacheNack,
        Self::CacheMiss,
        Self::BankConflict,
        Self::WayMispredict,
        Self::RarNack,
        Self::RawNack,
        Self::MisalignNeedsSplit,
        Self::Nuke,
    ];

    /// Position in the selection order; 0 wins.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Causes that clear within a few cycles and are retried without leaving the pipeline.
    ///
    /// The only hazard-related member is a Stage2 ordering violation. RAR and
    /// RAW queue nacks wait for the queues to drain, which takes an unbounded
    /// number of cycles, so they are always queued.
    pub const fn is_immediate(self) -> bool {
        matches!(
            self,
            Self::CacheNack | Self::BankConflict | Self::WayMispredict | Self::Nuke
        )
    }

    /// Event the queued replay store must wait for before re-issuing.
    pub const fn wait_event(self) -> WaitEvent {
        match self {
            Self::AddressAmbiguous => WaitEvent::StoreAddress,
            Self::TranslationMiss => WaitEvent::TranslationRefill,
            Self::ForwardFail => WaitEvent::StoreData,
            Self::CacheMiss => WaitEvent::CacheRefill,
            Self::RarNack | Self::RawNack => WaitEvent::HazardQueueDrain,
            Self::MisalignNeedsSplit => WaitEvent::MisalignBufferFree,
            Self::CacheNack | Self::BankConflict | Self::WayMispredict | Self::Nuke => {
                WaitEvent::None
            }
        }
    }
}

impl fmt::Display for ReplayCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AddressAmbiguous => "addr_ambiguous",
            Self::TranslationMiss => "tlb_miss",
            Self::ForwardFail => "forward_fail",
            Self::CacheNack => "dcache_nack",
            Self::CacheMiss => "dcache_miss",
            Self::BankConflict => "bank_conflict",
            Self::WayMispredict => "way_mispredict",
            Self::RarNack => "rar_nack",
            Self::RawNack => "raw_nack",
            Self::MisalignNeedsSplit => "misalign_split",
            Self::Nuke => "nuke",
        };
        f.write_str(s)
    }
}

/// Event that releases a queued replay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitEvent {
    /// Re-issue as soon as a slot is free.
    None,
    /// An older store resolves its address.
    StoreAddress,
    /// An older store's data becomes available.
    StoreData,
    /// The translator finishes its refill.
    TranslationRefill,
    /// The miss-handling slot finishes its refill.
    CacheRefill,
    /// The ordering queues drain below their limit.
    HazardQueueDrain,
    /// The misalignment handler frees an entry.
    MisalignBufferFree,
}

/// Raw causes raised for one request, one bit per [`ReplayCause`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RawCauses(u16);

impl RawCauses {
    /// No cause raised.
    pub const NONE: Self = Self(0);

    /// Raises `cause`.
    #[inline]
    pub const fn raise(&mut self, cause: ReplayCause) {
        self.0 |= 1 << cause.index();
    }

    /// Raises `cause` if `cond` holds.
    #[inline]
    pub const fn raise_if(&mut self, cause: ReplayCause, cond: bool) {
        if cond {
            self.raise(cause);
        }
    }

    /// Returns true if `cause` is raised.
    #[inline]
    pub const fn has(self, cause: ReplayCause) -> bool {
        self.0 & (1 << cause.index()) != 0
    }

    /// Returns true if nothing is raised.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Lowest-enumerated raised cause.
    pub fn lowest(self) -> Option<ReplayCause> {
        ReplayCause::ALL.into_iter().find(|c| self.has(*c))
    }

    /// Raw bit pattern.
    pub const fn bits(self) -> u16 {
        self.0
    }
}

impl FromIterator<ReplayCause> for RawCauses {
    fn from_iter<I: IntoIterator<Item = ReplayCause>>(iter: I) -> Self {
        let mut r = Self::NONE;
        for c in iter {
            r.raise(c);
        }
        r
    }
}

/// Retry path chosen for a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplayRoute {
    /// Re-enter through the fast-replay source after a short delay.
    Immediate,
    /// Record in the queued-replay store and wait for an event.
    Queued,
    /// Discard the load and everything younger and re-fetch from it.
    Rollback,
}

/// Conditions under which a request must not be replayed at all.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TroubleGate {
    /// The request carries an architectural exception.
    pub exception: bool,
    /// Uncached data was already delivered.
    pub uncached_satisfied: bool,
    /// Pure prefetch.
    pub prefetch: bool,
    /// An error was already delivered for this request.
    pub error_delivered: bool,
}

impl TroubleGate {
    /// Derives the gate from a request.
    pub const fn of(req: &LoadRequest) -> Self {
        Self {
            exception: req.has_exception(),
            uncached_satisfied: req.uncached_satisfied(),
            prefetch: req.flags.prefetch,
            error_delivered: false,
        }
    }

    /// The master predicate: replay selection applies only if this holds.
    #[inline]
    pub const fn troublesome(self) -> bool {
        !self.exception && !self.uncached_satisfied && !self.prefetch && !self.error_delivered
    }
}

/// Observations that turn a selected cause into a rollback.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RollbackHints {
    /// A forwarding source matched on stale address information.
    pub stale_forward: bool,
    /// The ordering violation was observed after the load's result escaped.
    pub late_nuke: bool,
}

/// Outcome of classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Classification {
    /// Selected cause.
    pub cause: ReplayCause,
    /// Retry path.
    pub route: ReplayRoute,
}

/// Selects one cause out of `raw` and routes it.
///
/// # Arguments
///
/// * `raw` - Every cause raised for the request.
/// * `gate` - The troublesome predicate inputs.
/// * `hints` - Observations that escalate a cause to rollback.
///
/// # Returns
///
/// `None` when the request is not troublesome or nothing was raised,
/// otherwise the lowest-enumerated cause and its route.
pub fn classify(raw: RawCauses, gate: TroubleGate, hints: RollbackHints) -> Option<Classification> {
    if !gate.troublesome() {
        return None;
    }
    let cause = raw.lowest()?;
    let route = match cause {
        ReplayCause::AddressAmbiguous if hints.stale_forward => ReplayRoute::Rollback,
        ReplayCause::Nuke if hints.late_nuke => ReplayRoute::Rollback,
        c if c.is_immediate() => ReplayRoute::Immediate,
        _ => ReplayRoute::Queued,
    };
    Some(Classification { cause, route })
}

/// Entry written to the queued-replay store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplayRecord {
    /// The request, ready to be re-offered as a replay.
    pub request: LoadRequest,
    /// Selected cause.
    pub cause: ReplayCause,
    /// Every cause that was raised.
    pub raw: RawCauses,
    /// Event to wait for.
    pub wait: WaitEvent,
}
