//! Unaligned load pre-check.
//!
//! A misaligned load is never rejected at arbitration. Instead it is tagged so
//! that later stages either send it to the misalignment handler for splitting
//! or raise an address-misaligned exception.

use crate::common::data::crosses_bank;
use crate::common::{LoadOp, VirtAddr};
use crate::config::MemoryConfig;
use crate::core::pipeline::request::MisalignAction;

/// Checks whether a memory access at `addr` with `size` bytes is naturally aligned.
///
/// # Arguments
///
/// * `addr` - The byte address of the access.
/// * `size` - The access width in bytes (1, 2, 4, 8 or 16).
///
/// # Returns
///
/// `true` if the access is naturally aligned.
pub const fn is_aligned(addr: u64, size: u64) -> bool {
    if size <= 1 {
        return true;
    }
    (addr & (size - 1)) == 0
}

/// Decides how a candidate load's alignment will be handled.
///
/// # Arguments
///
/// * `vaddr` - Virtual address of the load.
/// * `op` - Load operation.
/// * `uncached` - The access is already known to bypass the cache.
/// * `cfg` - Memory configuration.
///
/// # Returns
///
/// [`MisalignAction::None`] for aligned loads and for misaligned loads that
/// stay inside one bank when that is allowed; otherwise `ForceSplit` for
/// cacheable loads when splitting is enabled and `ForceFault` for the rest.
pub const fn precheck(vaddr: VirtAddr, op: LoadOp, uncached: bool, cfg: &MemoryConfig) -> MisalignAction {
    let width = op.width();
    if is_aligned(vaddr.val(), width.bytes()) {
        return MisalignAction::None;
    }
    if uncached {
        return MisalignAction::ForceFault;
    }
    if !crosses_bank(vaddr.val(), width) && cfg.allow_unaligned_in_bank {
        return MisalignAction::None;
    }
    if cfg.split_misaligned {
        MisalignAction::ForceSplit
    } else {
        MisalignAction::ForceFault
    }
}

/// Re-evaluates a verdict once translation reveals the access is uncached.
///
/// Misaligned uncached accesses cannot be split or serviced in-bank.
pub const fn reconcile_uncached(action: MisalignAction, vaddr: VirtAddr, op: LoadOp) -> MisalignAction {
    if is_aligned(vaddr.val(), op.width().bytes()) {
        action
    } else {
        MisalignAction::ForceFault
    }
}
