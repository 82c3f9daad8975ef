//! Source arbiter.
//!
//! Many producers want to start a load every cycle. Each owns one
//! [`SourcePort`]; the arbiter grants exactly one of them per cycle by strict
//! descending priority and turns the winner into a canonical [`LoadRequest`].
//! It provides:
//! 1. **Providers:** The `(has_pending, take)` capability each port exposes.
//! 2. **Selection:** A pure first-match priority encoder with wakeup override.
//! 3. **Normalization:** Flags, byte mask, alignment verdict and chase address.

use std::collections::VecDeque;

use tracing::trace;

use crate::common::data::gen_mask;
use crate::common::{ExceptionKind, LoadOp, PhysAddr, VirtAddr};
use crate::config::Config;
use crate::core::pipeline::request::{
    Age, ChaseLink, LoadPayload, LoadRequest, MisalignAction, RequestSource,
};
use crate::core::pipeline::signals::Redirect;
use crate::core::units::lsu::unaligned;
use crate::core::units::replay::ReplayRecord;
use crate::core::units::writeback::{ChaseBase, speculative_vaddr};

/// A request offered by a source, not yet normalized.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadCandidate {
    /// Request fields as known to the source.
    pub request: LoadRequest,
    /// Completes a blocked misaligned access; wins over the priority order.
    pub wake_blocked: bool,
}

impl LoadCandidate {
    /// Fresh load from an issue port.
    pub fn issue(age: u64, op: LoadOp, vaddr: u64, dest: usize) -> Self {
        Self {
            request: LoadRequest {
                age: Age(age),
                op,
                vaddr: VirtAddr(vaddr),
                payload: LoadPayload {
                    dest: Some(dest),
                    ..LoadPayload::default()
                },
                ..LoadRequest::default()
            },
            wake_blocked: false,
        }
    }

    /// Hardware prefetch of a physical line.
    pub fn prefetch(age: u64, paddr: u64) -> Self {
        Self {
            request: LoadRequest {
                age: Age(age),
                op: LoadOp::Ld,
                vaddr: VirtAddr(paddr),
                paddr: Some(PhysAddr(paddr)),
                ..LoadRequest::default()
            },
            wake_blocked: false,
        }
    }

    /// Dependent load whose address is `producer`'s result plus `offset`.
    pub fn chase(age: u64, dest: usize, producer: u64, offset: i64) -> Self {
        let mut c = Self::issue(age, LoadOp::Ld, 0, dest);
        c.request.chase = Some(ChaseLink {
            producer: Age(producer),
            offset,
            fast_match: true,
        });
        c
    }

    /// Completion of an uncached access, carrying its data.
    pub fn uncached_response(mut request: LoadRequest, data: u64) -> Self {
        request.uncached_data = Some(data);
        Self {
            request,
            wake_blocked: false,
        }
    }

    /// Re-issue of a queued replay.
    pub fn replay(record: ReplayRecord) -> Self {
        Self {
            request: record.request,
            wake_blocked: false,
        }
    }
}

/// Capability every request source exposes to the arbiter.
pub trait RequestProvider {
    /// The source is asserting a request this cycle.
    fn has_pending(&self) -> bool;

    /// Hands over the pending request; called only for the granted source.
    fn take(&mut self) -> Option<LoadCandidate>;
}

/// One source's valid/hold channel. Ungranted requests stay put.
#[derive(Clone, Debug, Default)]
pub struct SourcePort {
    queue: VecDeque<LoadCandidate>,
}

impl SourcePort {
    /// Appends a request behind any already waiting.
    pub fn offer(&mut self, candidate: LoadCandidate) {
        self.queue.push_back(candidate);
    }

    /// Puts a request back at the head so it is presented next cycle.
    pub fn represent(&mut self, candidate: LoadCandidate) {
        self.queue.push_front(candidate);
    }

    /// Request at the head of the port.
    pub fn peek(&self) -> Option<&LoadCandidate> {
        self.queue.front()
    }

    /// Number of requests waiting.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true if nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drops every request killed by `redirects`. Returns how many were dropped.
    pub fn flush(&mut self, redirects: &[Option<Redirect>]) -> usize {
        let before = self.queue.len();
        self.queue
            .retain(|c| !crate::core::pipeline::signals::needs_flush(c.request.age, redirects));
        before - self.queue.len()
    }
}

impl RequestProvider for SourcePort {
    fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    fn take(&mut self) -> Option<LoadCandidate> {
        self.queue.pop_front()
    }
}

/// Every source's port, indexed by priority.
#[derive(Clone, Debug)]
pub struct SourcePorts {
    ports: [SourcePort; RequestSource::COUNT],
}

impl Default for SourcePorts {
    fn default() -> Self {
        Self {
            ports: std::array::from_fn(|_| SourcePort::default()),
        }
    }
}

impl SourcePorts {
    /// Port of `source`.
    pub const fn port(&self, source: RequestSource) -> &SourcePort {
        &self.ports[source.priority()]
    }

    /// Mutable port of `source`.
    pub const fn port_mut(&mut self, source: RequestSource) -> &mut SourcePort {
        &mut self.ports[source.priority()]
    }

    /// Offers a candidate on `source`.
    pub fn offer(&mut self, source: RequestSource, candidate: LoadCandidate) {
        self.port_mut(source).offer(candidate);
    }

    /// Drops flushed candidates from every port.
    pub fn flush(&mut self, redirects: &[Option<Redirect>]) -> usize {
        self.ports.iter_mut().map(|p| p.flush(redirects)).sum()
    }

    /// Total requests waiting across all ports.
    pub fn pending(&self) -> usize {
        self.ports.iter().map(SourcePort::len).sum()
    }
}

/// Acceptance vector: source `i` is ready iff no higher-priority source is valid.
pub fn ready_vector(valid: &[bool; RequestSource::COUNT]) -> [bool; RequestSource::COUNT] {
    let mut ready = [false; RequestSource::COUNT];
    let mut higher = false;
    for (r, v) in ready.iter_mut().zip(valid) {
        *r = !higher;
        higher |= *v;
    }
    ready
}

/// Selects the granted source.
///
/// A valid source whose request wakes a blocked access wins outright (the
/// highest such one); otherwise the highest-priority valid source wins.
pub fn select(
    valid: &[bool; RequestSource::COUNT],
    wake: &[bool; RequestSource::COUNT],
) -> Option<RequestSource> {
    let woken = valid.iter().zip(wake).position(|(v, w)| *v && *w);
    let ready = ready_vector(valid);
    let index = woken.or_else(|| valid.iter().zip(ready).position(|(v, r)| *v && r))?;
    Some(RequestSource::ALL[index])
}

/// Stateless arbiter over a set of source ports.
#[derive(Clone, Copy, Debug, Default)]
pub struct SourceArbiter;

impl SourceArbiter {
    /// Samples the valid and wakeup vectors of every port.
    ///
    /// The pointer-chase port is valid only when the fast path is enabled and
    /// the Stage3 occupant is the producer its head request chains off.
    pub fn sample(
        ports: &SourcePorts,
        chase: Option<ChaseBase>,
        cfg: &Config,
    ) -> ([bool; RequestSource::COUNT], [bool; RequestSource::COUNT]) {
        let mut valid = [false; RequestSource::COUNT];
        let mut wake = [false; RequestSource::COUNT];
        for source in RequestSource::ALL {
            let port = ports.port(source);
            let head = port.peek();
            let i = source.priority();
            valid[i] = match source {
                RequestSource::PointerChase => {
                    cfg.pipeline.enable_pointer_chase
                        && head
                            .and_then(|c| c.request.chase)
                            .zip(chase)
                            .is_some_and(|(link, base)| link.producer == base.producer)
                }
                _ => port.has_pending(),
            };
            wake[i] = valid[i] && head.is_some_and(|c| c.wake_blocked);
        }
        (valid, wake)
    }

    /// Grants one source and normalizes its request.
    ///
    /// # Arguments
    ///
    /// * `ports` - Every source port.
    /// * `accept` - Stage0 can take a request this cycle.
    /// * `chase` - Speculative base offered by the Stage3 occupant.
    /// * `cfg` - Model configuration.
    ///
    /// # Returns
    ///
    /// The granted source and the canonical request, or `None` when nothing
    /// was granted. Ungranted sources keep their requests.
    pub fn arbitrate(
        ports: &mut SourcePorts,
        accept: bool,
        chase: Option<ChaseBase>,
        cfg: &Config,
    ) -> Option<(RequestSource, LoadRequest)> {
        if !accept {
            return None;
        }
        let (valid, wake) = Self::sample(ports, chase, cfg);
        let source = select(&valid, &wake)?;
        let candidate = ports.port_mut(source).take()?;
        let request = normalize(source, candidate, chase, cfg);
        trace!(
            age = request.age.0,
            ?source,
            vaddr = request.vaddr.val(),
            "S0 grant"
        );
        Some((source, request))
    }
}

/// Turns a granted candidate into the canonical request record.
pub fn normalize(
    source: RequestSource,
    candidate: LoadCandidate,
    chase: Option<ChaseBase>,
    cfg: &Config,
) -> LoadRequest {
    let mut req = candidate.request;
    req.source = Some(source);

    if source == RequestSource::PointerChase
        && let (Some(link), Some(base)) = (req.chase, chase)
    {
        req.vaddr = speculative_vaddr(base.value, link.offset, cfg.pipeline.chase_set_bit);
    } else {
        req.chase = None;
    }

    req.flags.prefetch = source.is_prefetch();
    req.flags.replay = source.is_replay() || req.flags.replay;
    req.flags.fast_replay = source == RequestSource::FastReplay;
    req.flags.pointer_chase = source == RequestSource::PointerChase;
    req.flags.wide = req.op.is_wide() || source == RequestSource::VectorIssue;
    req.flags.misalign_part = source == RequestSource::MisalignReplay;
    match source {
        RequestSource::MmioResponse => req.flags.mmio = true,
        RequestSource::NcResponse => req.flags.non_cacheable = true,
        _ => {}
    }

    if !source.is_translation_exempt() {
        req.paddr = None;
    }
    if !source.carries_data() {
        req.uncached_data = None;
    }
    req.payload.exceptions.clear();
    req.mask = gen_mask(req.vaddr.val(), req.op.width());
    req.misalign = if req.flags.misalign_part {
        MisalignAction::None
    } else {
        unaligned::precheck(req.vaddr, req.op, source.carries_data(), &cfg.memory)
    };
    if req.misalign == MisalignAction::ForceFault {
        req.payload.exceptions.raise(ExceptionKind::AddressMisaligned);
    }
    req
}
