//! Stage pipeline controller.
//!
//! Owns the three registered stage slots (Stage0 is the combinational
//! arbitration winner) and advances them once per cycle. The controller:
//! 1. **Flush:** Applies the current redirect to every slot, port and buffer,
//!    and the one-cycle-delayed redirect to chained (pointer-chase) slots.
//! 2. **Back-pressure:** Evaluates Stage3 down to Stage0 so a slot only moves
//!    into a successor that is empty or being vacated this cycle.
//! 3. **Soft Cancel:** Removes a mis-speculated chained load from Stage1 and
//!    hands it back to its origin without a flush.
//! 4. **Fast Replay:** Holds immediate retries for a configured delay before
//!    offering them on the fast-replay source.

use std::collections::VecDeque;

use tracing::debug;

use crate::common::VirtAddr;
use crate::config::Config;
use crate::core::pipeline::latches::{S1Slot, S2Slot, S3Slot};
use crate::core::pipeline::request::{Age, LoadRequest, RequestSource};
use crate::core::pipeline::signals::{
    CommitStatus, CycleInputs, CycleOutputs, Redirect, needs_flush,
};
use crate::core::pipeline::stages::{self, stage1::probe, stage3::offer_base};
use crate::core::pipeline::traits::PipelineLatch;
use crate::core::ports::LoadEnvironment;
use crate::core::units::arbiter::{LoadCandidate, SourceArbiter, SourcePorts};
use crate::core::units::hazard::{self, HazardState, StoreHazardQuery};
use crate::core::units::replay::ReplayRoute;
use crate::core::units::writeback::{ChaseCancel, ChaseCancelReason, ChaseCheck, FastPath, check_chase};
use crate::stats::LoadUnitStats;

/// Immediate retries waiting to re-enter through the fast-replay source.
#[derive(Clone, Debug, Default)]
pub struct FastReplayBuffer {
    entries: VecDeque<(u32, LoadRequest)>,
}

impl FastReplayBuffer {
    /// Holds `req` for `delay` cycles.
    pub fn push(&mut self, req: LoadRequest, delay: u32) {
        self.entries.push_back((delay, req));
    }

    /// Advances one cycle and returns the requests whose delay elapsed.
    pub fn advance(&mut self) -> Vec<LoadRequest> {
        let mut ready = Vec::new();
        let mut waiting = VecDeque::with_capacity(self.entries.len());
        for (remaining, req) in self.entries.drain(..) {
            let remaining = remaining.saturating_sub(1);
            if remaining == 0 {
                ready.push(req);
            } else {
                waiting.push_back((remaining, req));
            }
        }
        self.entries = waiting;
        ready
    }

    /// Drops entries killed by `redirects`.
    pub fn flush(&mut self, redirects: &[Option<Redirect>]) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(_, r)| !needs_flush(r.age, redirects));
        before - self.entries.len()
    }

    /// Number of requests held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is held.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The Stage1..Stage3 slots and the state shared between them.
#[derive(Clone, Debug, Default)]
pub struct StagePipeline {
    s1: Option<S1Slot>,
    s2: Option<S2Slot>,
    s3: Option<S3Slot>,
    fast_replay: FastReplayBuffer,
    fast_path: FastPath,
    delayed_redirect: Option<Redirect>,
}

impl StagePipeline {
    /// Creates an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ages of the Stage1, Stage2 and Stage3 occupants.
    pub fn occupancy(&self) -> [Option<Age>; 3] {
        [self.s1.age(), self.s2.age(), self.s3.age()]
    }

    /// Returns true if no slot is occupied and no retry is pending.
    pub fn is_empty(&self) -> bool {
        self.s1.is_empty() && self.s2.is_empty() && self.s3.is_empty() && self.fast_replay.is_empty()
    }

    /// Requests waiting in the fast-replay buffer.
    pub fn fast_replay_pending(&self) -> usize {
        self.fast_replay.len()
    }

    fn flush_all(&mut self, ports: &mut SourcePorts, current: Option<Redirect>, delayed: Option<Redirect>) -> usize {
        let both = [current, delayed];
        let mut killed = 0;
        // Stage1 chained slots see the delayed redirect through the chase check instead.
        killed += usize::from(self.s1.flush(&[current]));
        let chained2 = self.s2.as_ref().is_some_and(|s| s.req.flags.pointer_chase);
        killed += usize::from(self.s2.flush(if chained2 { &both[..] } else { &both[..1] }));
        let chained3 = self.s3.as_ref().is_some_and(|s| s.req.flags.pointer_chase);
        killed += usize::from(self.s3.flush(if chained3 { &both[..] } else { &both[..1] }));
        killed += self.fast_replay.flush(&[current]);
        killed += ports.flush(&[current]);
        killed
    }

    /// Records ordering violations against occupants that already read memory.
    fn observe_hazards(&mut self, queries: &[StoreHazardQuery], line_shift: u32) {
        if let Some(s2) = self.s2.as_mut()
            && let Some(p) = probe(&s2.req)
            && hazard::detect(&p, queries, line_shift)
        {
            s2.hazard = HazardState::Violation;
        }
        if let Some(s3) = self.s3.as_mut()
            && let Some(p) = probe(&s3.req)
            && hazard::detect(&p, queries, line_shift)
        {
            debug!(age = s3.req.age.0, "S3 late ordering violation");
            s3.late_nuke = true;
        }
    }

    /// Runs the pointer-chase check on a chained Stage1 occupant.
    ///
    /// Returns the cancel notice and, unless the dependent is no longer live,
    /// the port and candidate it is handed back to. A dependent whose producer
    /// committed cleanly goes to scalar issue with the real address; otherwise
    /// it waits on the pointer-chase port for the producer's next offer.
    fn check_chained(
        &mut self,
        delayed: Option<Redirect>,
        cfg: &Config,
    ) -> Option<(ChaseCancel, Option<(RequestSource, LoadCandidate)>)> {
        let slot = self.s1.as_mut()?;
        let link = slot.req.chase?;
        let base = slot.chase_base.take()?;
        let live = !(cfg.pipeline.delayed_redirect_check && needs_flush(slot.req.age, &[delayed]));
        let verdict = self.fast_path.verdict_for(link.producer).copied();
        let reason = check_chase(&ChaseCheck {
            base,
            link: &link,
            op: slot.req.op,
            live,
            producer: verdict.as_ref(),
            set_bit: cfg.pipeline.chase_set_bit,
        })?;

        let req = self.s1.take()?.req;
        let handback = match verdict.filter(|v| v.success) {
            _ if reason == ChaseCancelReason::NotLive => None,
            Some(v) => Some((
                RequestSource::ScalarIssue,
                LoadRequest {
                    age: req.age,
                    op: req.op,
                    vaddr: VirtAddr(v.value).offset(link.offset),
                    payload: req.payload,
                    ..LoadRequest::default()
                },
            )),
            None => Some((
                RequestSource::PointerChase,
                LoadRequest {
                    age: req.age,
                    op: req.op,
                    payload: req.payload,
                    chase: Some(link),
                    ..LoadRequest::default()
                },
            )),
        }
        .map(|(source, request)| {
            (
                source,
                LoadCandidate {
                    request,
                    wake_blocked: false,
                },
            )
        });
        debug!(
            age = req.age.0,
            producer = link.producer.0,
            ?reason,
            to = ?handback.as_ref().map(|(s, _)| *s),
            "S1 chase cancel"
        );
        let cancel = ChaseCancel {
            age: req.age,
            producer: link.producer,
            reason,
            represented: handback.is_some(),
        };
        Some((cancel, handback))
    }

    /// Advances the pipeline by one cycle.
    ///
    /// # Arguments
    ///
    /// * `ports` - Request sources competing for Stage0.
    /// * `env` - External collaborators.
    /// * `inputs` - Redirect, store hazard queries and commit-port readiness.
    /// * `cfg` - Model configuration.
    /// * `stats` - Counters to update.
    ///
    /// # Returns
    ///
    /// Everything the pipeline signalled this cycle.
    pub fn tick<E: LoadEnvironment + ?Sized>(
        &mut self,
        ports: &mut SourcePorts,
        env: &mut E,
        inputs: &CycleInputs,
        cfg: &Config,
        stats: &mut LoadUnitStats,
    ) -> CycleOutputs {
        let mut out = CycleOutputs::default();
        stats.cycles += 1;

        let n = inputs.store_queries.len().min(cfg.hazard.store_query_ports);
        let queries = &inputs.store_queries[..n];
        let line_shift = cfg.memory.line_shift();
        let delayed = self
            .delayed_redirect
            .filter(|_| cfg.pipeline.delayed_redirect_check);

        out.flushed = self.flush_all(ports, inputs.redirect, delayed);
        stats.flush_kills += out.flushed as u64;
        if out.flushed > 0 {
            debug!(flushed = out.flushed, redirect = ?inputs.redirect, "flush");
        }
        self.observe_hazards(queries, line_shift);

        for req in self.fast_replay.advance() {
            ports.offer(
                RequestSource::FastReplay,
                LoadCandidate {
                    request: req,
                    wake_blocked: false,
                },
            );
        }

        let chase = self.s3.as_ref().and_then(offer_base);

        // Stage3
        if let Some(slot) = self.s3.take() {
            if inputs.commit_ready {
                let outcome = stages::stage3(slot, env, cfg);
                self.retire(outcome, ports, cfg, stats, &mut out);
            } else {
                self.s3 = Some(slot);
                stats.stall_s3 += 1;
            }
        }

        // Stage2
        if let Some(slot) = self.s2.take() {
            if self.s3.is_none() {
                let (next, wakeup) = stages::stage2(slot, env, queries, cfg);
                if wakeup.is_some() {
                    stats.wakeups += 1;
                }
                out.wakeup = wakeup;
                self.s3 = Some(next);
            } else {
                self.s2 = Some(slot);
                stats.stall_s2 += 1;
            }
        }

        // Stage1
        let mut represent = None;
        if let Some((cancel, handback)) = self.check_chained(delayed, cfg) {
            stats.chase_cancelled += 1;
            out.chase_cancel = Some(cancel);
            represent = handback;
        }
        if let Some(slot) = self.s1.take() {
            if self.s2.is_none() {
                self.s2 = Some(stages::stage1(slot, env, queries, cfg));
            } else {
                self.s1 = Some(slot);
                stats.stall_s1 += 1;
            }
        }

        // Stage0
        let accept = self.s1.is_none();
        if !accept && ports.pending() > 0 {
            stats.stall_s0 += 1;
        }
        if let Some((source, req)) = SourceArbiter::arbitrate(ports, accept, chase, cfg) {
            stats.grants[source.priority()] += 1;
            let base = if source == RequestSource::PointerChase {
                stats.chase_issued += 1;
                chase.map(|b| b.value)
            } else {
                None
            };
            self.s1 = Some(stages::stage0(source, req, base, env));
            out.grant = Some(source);
        }

        if let Some((source, candidate)) = represent {
            ports.port_mut(source).represent(candidate);
        }
        self.delayed_redirect = inputs.redirect;
        out
    }

    fn retire(
        &mut self,
        outcome: stages::Stage3Outcome,
        ports: &mut SourcePorts,
        cfg: &Config,
        stats: &mut LoadUnitStats,
        out: &mut CycleOutputs,
    ) {
        if let Some(verdict) = outcome.verdict {
            self.fast_path.record(verdict);
        }
        if let Some(age) = outcome.wakeup_cancel {
            stats.wakeup_cancels += 1;
            out.wakeup_cancel = Some(age);
        }
        if let Some(req) = outcome.fast_replay {
            self.fast_replay.push(req, cfg.pipeline.fast_replay_delay);
        }
        if let Some(redirect) = outcome.rollback {
            stats.rollbacks += 1;
            let killed = self.flush_all(ports, Some(redirect), None);
            stats.flush_kills += killed as u64;
            out.flushed += killed;
            out.rollback = Some(redirect);
        }
        if let Some(record) = outcome.commit {
            stats.commits += 1;
            match record.status {
                CommitStatus::Done if record.dest.is_none() => stats.prefetches += 1,
                CommitStatus::Done => stats.completed += 1,
                CommitStatus::Exception(_) => stats.exceptions += 1,
                CommitStatus::Retry {
                    route: ReplayRoute::Immediate,
                    ..
                } => stats.immediate_replays += 1,
                CommitStatus::Retry { cause, .. } => stats.queued_replays[cause.index()] += 1,
                CommitStatus::Uncached => stats.uncached += 1,
                CommitStatus::Split => stats.splits += 1,
            }
            out.commit = Some(record);
        }
    }
}
