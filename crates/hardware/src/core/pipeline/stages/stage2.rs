//! Stage2: cache resolution, forward merge and final hazard check.
//!
//! The cache response and the forwarding answers are combined into the bank
//! the writeback will read. Every raw replay cause that can be known at this
//! point is raised, the load registers with the ordering queues, and a load
//! predicted to succeed wakes its dependents one cycle early.

use tracing::trace;

use crate::config::Config;
use crate::core::pipeline::latches::{S2Slot, S3Slot};
use crate::core::pipeline::request::MisalignAction;
use crate::core::pipeline::signals::Wakeup;
use crate::core::pipeline::stages::stage1::probe;
use crate::core::ports::{LoadHazardQuery, OrderingQueues};
use crate::core::units::forward;
use crate::core::units::hazard::{self, StoreHazardQuery};
use crate::core::units::replay::ReplayCause;
use crate::core::units::writeback::overlay;

/// Evaluates a Stage2 occupant and builds its Stage3 slot.
///
/// # Arguments
///
/// * `slot` - Stage2 occupant.
/// * `env` - Ordering queues the load registers with.
/// * `queries` - Store hazard queries visible this cycle.
/// * `cfg` - Model configuration.
///
/// # Returns
///
/// The Stage3 slot and, for a load predicted to succeed, the early wakeup.
pub fn stage2<E: OrderingQueues + ?Sized>(
    slot: S2Slot,
    env: &mut E,
    queries: &[StoreHazardQuery],
    cfg: &Config,
) -> (S3Slot, Option<Wakeup>) {
    let S2Slot {
        mut req,
        cache,
        forward: responses,
        mut raw,
        hazard: stage1_state,
    } = slot;

    let merged = forward::merge(req.mask, &responses);
    raw.raise_if(ReplayCause::AddressAmbiguous, merged.ambiguous);
    raw.raise_if(ReplayCause::ForwardFail, merged.fail);

    let mut bank = [0u8; 16];
    let mut data_ok = req.uncached_satisfied();
    if let Some(c) = cache {
        let structural = c.nack || c.bank_conflict || c.way_mispredict;
        raw.raise_if(ReplayCause::CacheNack, c.nack);
        raw.raise_if(ReplayCause::BankConflict, c.bank_conflict);
        raw.raise_if(ReplayCause::WayMispredict, c.way_mispredict);
        raw.raise_if(
            ReplayCause::CacheMiss,
            !c.hit && !merged.full && !structural && !req.flags.prefetch,
        );
        req.carry = c.carry;
        if c.mshr_id.is_some() {
            req.mshr_id = c.mshr_id;
        }
        if c.hit {
            bank = c.data;
        }
        bank = overlay(&bank, &merged);
        data_ok = !structural && (c.hit || merged.full);
    }

    let p = probe(&req);
    let nuke = hazard::final_check(
        p.as_ref(),
        queries,
        cfg.memory.line_shift(),
        stage1_state,
        req.carried_nuke,
    );
    raw.raise_if(ReplayCause::Nuke, nuke);
    req.carried_nuke = false;

    if let Some(paddr) = req.paddr
        && !req.flags.prefetch
        && !req.flags.uncached()
        && !req.has_exception()
    {
        let ack = env.register_load(&LoadHazardQuery {
            age: req.age,
            paddr,
            mask: req.mask,
            data_valid: data_ok,
        });
        raw.raise_if(ReplayCause::RarNack, ack.rar_nack);
        raw.raise_if(ReplayCause::RawNack, ack.raw_nack);
    }

    let predicted_ok = data_ok
        && raw.is_empty()
        && !req.has_exception()
        && !req.flags.prefetch
        && req.misalign == MisalignAction::None;
    let wakeup = req
        .payload
        .dest
        .filter(|_| predicted_ok)
        .map(|dest| Wakeup { age: req.age, dest });

    trace!(
        age = req.age.0,
        raw = raw.bits(),
        hit = cache.map(|c| c.hit),
        forwarded = merged.valid,
        woke = wakeup.is_some(),
        "S2"
    );
    let slot = S3Slot {
        accessed: cache.is_some(),
        req,
        raw,
        bank,
        forward: merged,
        late_nuke: false,
        woke: wakeup.is_some(),
    };
    (slot, wakeup)
}
