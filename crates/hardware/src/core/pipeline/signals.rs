//! Pipeline control signals and per-cycle records.
//!
//! This module defines the values exchanged between the load pipeline and its
//! surroundings every cycle:
//! 1. **Redirects:** Mis-speculation recovery boundaries consumed by every stage.
//! 2. **Wakeups:** Early notification to dependents, with late cancellation.
//! 3. **Commit Records:** The single-slot result channel.
//! 4. **Cycle I/O:** Inputs sampled and outputs produced by one `tick`.

use crate::common::{ExceptionKind, ExceptionVector, LoadException};
use crate::core::pipeline::request::{Age, RequestSource};
use crate::core::units::hazard::StoreHazardQuery;
use crate::core::units::replay::{ReplayCause, ReplayRoute};
use crate::core::units::writeback::ChaseCancel;

/// How far a redirect reaches relative to its boundary age.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RedirectLevel {
    /// Discard everything strictly younger than the boundary.
    #[default]
    FlushAfter,
    /// Discard the boundary instruction as well.
    FlushItself,
}

/// Mis-speculation recovery point announced to every stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Redirect {
    /// Boundary age.
    pub age: Age,
    /// Reach relative to the boundary.
    pub level: RedirectLevel,
}

impl Redirect {
    /// Redirect that keeps `age` and discards everything younger.
    pub const fn after(age: Age) -> Self {
        Self {
            age,
            level: RedirectLevel::FlushAfter,
        }
    }

    /// Redirect that discards `age` and everything younger.
    pub const fn itself(age: Age) -> Self {
        Self {
            age,
            level: RedirectLevel::FlushItself,
        }
    }

    /// Returns true if an occupant of age `age` is provably after the boundary.
    #[inline]
    pub const fn kills(self, age: Age) -> bool {
        match self.level {
            RedirectLevel::FlushAfter => age.0 > self.age.0,
            RedirectLevel::FlushItself => age.0 >= self.age.0,
        }
    }
}

/// Returns true if any of the given redirects kills `age`.
pub fn needs_flush(age: Age, redirects: &[Option<Redirect>]) -> bool {
    redirects.iter().flatten().any(|r| r.kills(age))
}

/// Early wakeup for instructions waiting on a load's destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Wakeup {
    /// Load being woken on.
    pub age: Age,
    /// Destination register.
    pub dest: usize,
}

/// Final disposition of a request leaving Stage3.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitStatus {
    /// Value delivered.
    Done,
    /// Architectural exception surfaced.
    Exception(LoadException),
    /// Request will be retried; carries the selected cause and route.
    Retry {
        /// Selected cause.
        cause: ReplayCause,
        /// Retry path taken.
        route: ReplayRoute,
    },
    /// Sent to the uncached path; completes later through an uncached response source.
    Uncached,
    /// Aligned parts are being produced by the misalignment handler.
    Split,
}

/// Record on the single-slot commit/writeback port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommitRecord {
    /// Request age.
    pub age: Age,
    /// Source the request was selected from.
    pub source: RequestSource,
    /// Destination register; `None` for prefetches.
    pub dest: Option<usize>,
    /// Lane-selected, width-extended value.
    pub value: u64,
    /// Raw bank bytes for wide accesses.
    pub bank_data: [u8; 16],
    /// Every exception recorded for the request.
    pub exceptions: ExceptionVector,
    /// Disposition.
    pub status: CommitStatus,
}

impl CommitRecord {
    /// Retry indicator for the issue logic.
    pub const fn retry(&self) -> bool {
        matches!(
            self.status,
            CommitStatus::Retry { .. } | CommitStatus::Uncached | CommitStatus::Split
        )
    }

    /// Surfaced exception kind, if any.
    pub const fn exception(&self) -> Option<ExceptionKind> {
        match self.status {
            CommitStatus::Exception(e) => Some(e.kind),
            _ => None,
        }
    }
}

/// Inputs sampled by the load pipeline at the start of a cycle.
#[derive(Clone, Debug)]
pub struct CycleInputs {
    /// Redirect announced this cycle.
    pub redirect: Option<Redirect>,
    /// Hazard queries from the concurrent store pipeline.
    pub store_queries: Vec<StoreHazardQuery>,
    /// The commit port can take a record this cycle.
    pub commit_ready: bool,
}

impl Default for CycleInputs {
    fn default() -> Self {
        Self {
            redirect: None,
            store_queries: Vec::new(),
            commit_ready: true,
        }
    }
}

/// Outputs produced by one cycle of the load pipeline.
#[derive(Clone, Debug, Default)]
pub struct CycleOutputs {
    /// Source that received acceptance this cycle.
    pub grant: Option<RequestSource>,
    /// Record placed on the commit port.
    pub commit: Option<CommitRecord>,
    /// Early wakeup for dependents of the load in Stage2.
    pub wakeup: Option<Wakeup>,
    /// Retraction of a wakeup sent the previous cycle.
    pub wakeup_cancel: Option<Age>,
    /// Program-order rollback requested by Stage3.
    pub rollback: Option<Redirect>,
    /// Pointer-chase speculation cancelled in Stage1.
    pub chase_cancel: Option<ChaseCancel>,
    /// Slots discarded by redirects this cycle.
    pub flushed: usize,
}
