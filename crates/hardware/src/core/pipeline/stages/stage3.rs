//! Stage3: commit, replay routing and writeback.
//!
//! Every request leaves the pipeline here exactly once: on the commit port,
//! through the immediate-retry path, into the queued-replay store, to the
//! misalignment handler or uncached path, or as a program-order rollback.

use tracing::{debug, trace};

use crate::common::ExceptionKind;
use crate::config::Config;
use crate::core::pipeline::latches::S3Slot;
use crate::core::pipeline::request::{Age, LoadRequest, MisalignAction, RequestSource};
use crate::core::pipeline::signals::{CommitRecord, CommitStatus, Redirect};
use crate::core::ports::{DataCache, ReplaySink};
use crate::core::units::replay::{
    self, RawCauses, ReplayCause, ReplayRecord, ReplayRoute, RollbackHints, TroubleGate,
};
use crate::core::units::writeback::{self, ChaseBase, ProducerVerdict};

/// Everything Stage3 produced for one request.
#[derive(Clone, Debug, Default)]
pub struct Stage3Outcome {
    /// Record for the commit port; absent only for a rollback.
    pub commit: Option<CommitRecord>,
    /// Program-order rollback starting at the request itself.
    pub rollback: Option<Redirect>,
    /// Request to hold in the fast-replay buffer.
    pub fast_replay: Option<LoadRequest>,
    /// Retraction of the early wakeup sent from Stage2.
    pub wakeup_cancel: Option<Age>,
    /// Actual result of the request, for chained dependents.
    pub verdict: Option<ProducerVerdict>,
}

/// Value the request would write back.
fn result_value(slot: &S3Slot) -> u64 {
    let req = &slot.req;
    match req.uncached_data {
        Some(data) => writeback::uncached_value(data, req.vaddr, req.op),
        None => writeback::select_value(&slot.bank, req.vaddr, req.op),
    }
}

/// Speculative base the Stage3 occupant offers to a chained dependent.
///
/// Only a load whose data looked good in Stage2 offers a base; the offer is
/// still speculative until the occupant commits.
pub fn offer_base(slot: &S3Slot) -> Option<ChaseBase> {
    let req = &slot.req;
    let offered = slot.woke && req.payload.dest.is_some();
    offered.then(|| ChaseBase {
        producer: req.age,
        value: result_value(slot),
    })
}

/// Copy of `req` for its next attempt.
///
/// An ordering violation masked by the selected cause is carried so the next
/// Stage2 check raises it again.
fn retry_of(req: &LoadRequest, cause: ReplayCause, raw: RawCauses) -> LoadRequest {
    let mut retry = req.clone();
    retry.flags.replay = true;
    retry.carried_nuke = raw.has(ReplayCause::Nuke) && cause != ReplayCause::Nuke;
    retry
}

fn queue(env: &mut (impl ReplaySink + ?Sized), req: &LoadRequest, cause: ReplayCause, raw: RawCauses) {
    env.enqueue_replay(ReplayRecord {
        request: retry_of(req, cause, raw),
        cause,
        raw,
        wait: cause.wait_event(),
    });
}

/// Retires the Stage3 occupant.
///
/// # Arguments
///
/// * `slot` - Stage3 occupant. The commit port must be free.
/// * `env` - Cache (for the delayed error) and replay destinations.
/// * `cfg` - Model configuration.
///
/// # Returns
///
/// The commit record or rollback, plus side outputs for the controller.
pub fn stage3<E>(slot: S3Slot, env: &mut E, cfg: &Config) -> Stage3Outcome
where
    E: DataCache + ReplaySink + ?Sized,
{
    let mut slot = slot;
    let mut out = Stage3Outcome::default();
    let mut gate = TroubleGate::of(&slot.req);

    if slot.accessed && !slot.req.flags.prefetch && env.delayed_error(slot.req.age) {
        slot.req
            .payload
            .exceptions
            .raise(ExceptionKind::HardwareError);
        gate.exception = true;
        gate.error_delivered = true;
        debug!(age = slot.req.age.0, "S3 delayed hardware error");
    }
    // A translation miss supersedes faults computed without an authoritative address.
    if slot.raw.has(ReplayCause::TranslationMiss) && !gate.error_delivered {
        gate.exception = false;
    }

    let mut raw = slot.raw;
    raw.raise_if(ReplayCause::Nuke, slot.late_nuke);
    let hints = RollbackHints {
        stale_forward: slot.forward.match_invalid,
        late_nuke: slot.late_nuke && cfg.hazard.late_nuke_rollback,
    };

    let req = &slot.req;
    let status = if let Some(cls) = replay::classify(raw, gate, hints) {
        match cls.route {
            ReplayRoute::Immediate => out.fast_replay = Some(retry_of(req, cls.cause, raw)),
            ReplayRoute::Queued => queue(env, req, cls.cause, raw),
            ReplayRoute::Rollback => {
                debug!(age = req.age.0, cause = %cls.cause, "S3 rollback");
                out.rollback = Some(Redirect::itself(req.age));
            }
        }
        if cls.route != ReplayRoute::Rollback {
            debug!(age = req.age.0, cause = %cls.cause, route = ?cls.route, "S3 replay");
        }
        CommitStatus::Retry {
            cause: cls.cause,
            route: cls.route,
        }
    } else if let Some(e) = writeback::surface(req.payload.exceptions, req.vaddr) {
        CommitStatus::Exception(e)
    } else if req.misalign == MisalignAction::ForceSplit && !req.flags.prefetch {
        if env.enqueue_misalign(req.clone()) {
            CommitStatus::Split
        } else {
            let mut split = RawCauses::NONE;
            split.raise(ReplayCause::MisalignNeedsSplit);
            queue(env, req, ReplayCause::MisalignNeedsSplit, split);
            CommitStatus::Retry {
                cause: ReplayCause::MisalignNeedsSplit,
                route: ReplayRoute::Queued,
            }
        }
    } else if req.flags.uncached() && !req.uncached_satisfied() && !req.flags.prefetch {
        env.enqueue_uncached(req.clone());
        CommitStatus::Uncached
    } else {
        CommitStatus::Done
    };

    let value = if status == CommitStatus::Done {
        result_value(&slot)
    } else {
        0
    };
    if slot.woke && status != CommitStatus::Done {
        out.wakeup_cancel = Some(req.age);
    }
    if req.payload.dest.is_some() && !req.flags.prefetch {
        out.verdict = Some(ProducerVerdict {
            age: req.age,
            value,
            success: status == CommitStatus::Done,
        });
    }
    trace!(age = req.age.0, ?status, value, "S3");

    if out.rollback.is_none() {
        out.commit = Some(CommitRecord {
            age: req.age,
            source: req.source.unwrap_or(RequestSource::ScalarIssue),
            dest: req.payload.dest,
            value,
            bank_data: slot.bank,
            exceptions: req.payload.exceptions,
            status,
        });
    }
    out
}
