//! Stage1: translation resolution and hazard pre-check.
//!
//! The latched translation response decides the physical address, the page
//! attributes and the translation faults. Once the address is known the stage
//! consults the access policy, runs the provisional ordering check, completes
//! the cache access and queries every forwarding source.

use tracing::trace;

use crate::common::ExceptionKind;
use crate::config::Config;
use crate::core::pipeline::latches::{S1Slot, S2Slot};
use crate::core::pipeline::request::{LoadRequest, MisalignAction};
use crate::core::ports::{AccessPolicy, DataCache, ForwardNetwork, TranslationResponse};
use crate::core::units::forward::{ForwardQuery, ForwardResponses};
use crate::core::units::hazard::{self, LoadProbe, StoreHazardQuery};
use crate::core::units::lsu::unaligned;
use crate::core::units::replay::{RawCauses, ReplayCause};

/// Hazard probe for a request with a known physical address.
pub fn probe(req: &LoadRequest) -> Option<LoadProbe> {
    req.paddr.map(|paddr| LoadProbe {
        age: req.age,
        paddr,
        mask: req.mask,
        wide: req.flags.wide,
    })
}

fn apply_translation(req: &mut LoadRequest, t: &TranslationResponse, raw: &mut RawCauses, cfg: &Config) {
    if t.miss {
        raw.raise(ReplayCause::TranslationMiss);
        req.paddr = None;
        return;
    }
    req.paddr = Some(t.paddr);
    if t.page_fault {
        req.payload.exceptions.raise(ExceptionKind::PageFault);
    }
    if t.access_fault {
        req.payload.exceptions.raise(ExceptionKind::AccessFault);
    }
    req.flags.mmio |= t.mmio || cfg.memory.is_mmio(t.paddr.val());
    req.flags.non_cacheable |= t.non_cacheable;
}

/// Resolves translation and issues the cache and forwarding lookups.
///
/// # Arguments
///
/// * `slot` - Stage1 occupant.
/// * `env` - Cache, forwarding network and access policy.
/// * `queries` - Store hazard queries visible this cycle.
/// * `cfg` - Model configuration.
///
/// # Returns
///
/// The Stage2 slot for the request.
pub fn stage1<E>(slot: S1Slot, env: &mut E, queries: &[StoreHazardQuery], cfg: &Config) -> S2Slot
where
    E: DataCache + ForwardNetwork + AccessPolicy + ?Sized,
{
    let S1Slot {
        mut req, tlb, access, ..
    } = slot;
    let mut raw = RawCauses::NONE;
    if let Some(t) = tlb {
        apply_translation(&mut req, &t, &mut raw, cfg);
    }

    if req.flags.prefetch {
        // Prefetches never fault: a denied target just ends the prefetch.
        let denied = req.has_exception() || req.paddr.is_some_and(|p| !env.permits(p));
        req.payload.exceptions.clear();
        if denied {
            req.paddr = None;
        }
    } else {
        if let Some(paddr) = req.paddr
            && !env.permits(paddr)
        {
            req.payload.exceptions.raise(ExceptionKind::AccessFault);
        }
        if env.breakpoint(req.vaddr) {
            req.payload.exceptions.raise(ExceptionKind::Breakpoint);
        }
        if req.flags.uncached() && !req.uncached_satisfied() {
            req.misalign = unaligned::reconcile_uncached(req.misalign, req.vaddr, req.op);
            if req.misalign == MisalignAction::ForceFault {
                req.payload.exceptions.raise(ExceptionKind::AddressMisaligned);
            }
        }
    }

    let line_shift = cfg.memory.line_shift();
    let p = probe(&req);
    let state = hazard::provisional(p.as_ref(), queries, line_shift);

    let reads_cache = req.paddr.is_some()
        && !req.has_exception()
        && !req.flags.uncached()
        && req.misalign != MisalignAction::ForceSplit;
    let cache = match req.paddr {
        Some(paddr) if reads_cache => Some(env.access(&access.with_paddr(paddr))),
        _ => None,
    };
    let forward = match req.paddr {
        Some(paddr) if reads_cache && !req.flags.prefetch => env.forward(&ForwardQuery {
            age: req.age,
            paddr,
            mask: req.mask,
            mshr_id: req.mshr_id,
        }),
        _ => ForwardResponses::default(),
    };

    trace!(
        age = req.age.0,
        paddr = req.paddr.map(|p| p.val()),
        hazard = ?state,
        exceptions = ?req.payload.exceptions,
        accessed = cache.is_some(),
        "S1"
    );
    S2Slot {
        req,
        cache,
        forward,
        raw,
        hazard: state,
    }
}
