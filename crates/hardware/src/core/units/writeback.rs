//! Result writeback and pointer-chase fast path.
//!
//! This module produces the committed value of a load and decides whether a
//! dependent load may use that value one stage early. It provides:
//! 1. **Data Merge:** Forwarded bytes overlaid on cache data, or uncached data.
//! 2. **Lane Selection:** Byte-lane alignment and sign/zero extension.
//! 3. **Outcome:** The surfaced exception for a faulting load.
//! 4. **Fast Path:** Speculative address formation and its cancellation checks.

use crate::common::constants::CHASE_IMM_BITS;
use crate::common::{ExceptionVector, LoadException, LoadOp, VirtAddr};
use crate::core::pipeline::request::{Age, ChaseLink};
use crate::core::units::forward::ForwardMerge;

/// Overlays forwarded bytes on the cache's bank data.
pub fn overlay(cache: &[u8; 16], fwd: &ForwardMerge) -> [u8; 16] {
    let mut out = *cache;
    for (i, byte) in out.iter_mut().enumerate() {
        if fwd.lane(i) {
            *byte = fwd.data[i];
        }
    }
    out
}

/// Sign- or zero-extends the low bytes of `raw` according to `op`.
pub const fn extend(raw: u64, op: LoadOp) -> u64 {
    match op {
        LoadOp::Lb => raw as u8 as i8 as i64 as u64,
        LoadOp::Lh => raw as u16 as i16 as i64 as u64,
        LoadOp::Lw => raw as u32 as i32 as i64 as u64,
        LoadOp::Lbu => raw as u8 as u64,
        LoadOp::Lhu => raw as u16 as u64,
        LoadOp::Lwu => raw as u32 as u64,
        LoadOp::Ld | LoadOp::Lq => raw,
    }
}

/// Selects the bytes addressed by `vaddr` from a bank and extends them.
///
/// Wide loads return the low doubleword; the full bank travels separately.
pub fn select_value(bank: &[u8; 16], vaddr: VirtAddr, op: LoadOp) -> u64 {
    let offset = if op.is_wide() {
        0
    } else {
        vaddr.bank_offset() as usize
    };
    let len = (op.width().bytes() as usize).min(8);
    let mut raw = 0u64;
    for i in 0..len {
        let byte = bank.get(offset + i).copied().unwrap_or(0);
        raw |= u64::from(byte) << (i * 8);
    }
    extend(raw, op)
}

/// Selects the addressed bytes from a doubleword delivered by the uncached path.
pub const fn uncached_value(data: u64, vaddr: VirtAddr, op: LoadOp) -> u64 {
    let shift = (vaddr.val() & 7) * 8;
    extend(data >> shift, op)
}

/// Surfaced exception for a request, if any.
pub fn surface(exceptions: ExceptionVector, vaddr: VirtAddr) -> Option<LoadException> {
    exceptions.first().map(|kind| LoadException {
        kind,
        vaddr: vaddr.val(),
    })
}

/// Why a pointer-chase speculation was cancelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChaseCancelReason {
    /// Base low bits plus offset carried across the set boundary.
    SetOverflow,
    /// Final address not doubleword aligned.
    Misaligned,
    /// Dependent op is not a plain doubleword load.
    NotPlainLoad,
    /// Dependent was flushed.
    NotLive,
    /// Issue-side routing prediction or the producer's result disagreed.
    FastMismatch,
}

/// Notice that a chained load was cancelled and handed back to its origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChaseCancel {
    /// Dependent load.
    pub age: Age,
    /// Producer it chained off.
    pub producer: Age,
    /// Reason.
    pub reason: ChaseCancelReason,
    /// The dependent went back to a source port: scalar issue once the
    /// producer committed cleanly, the pointer-chase port while its result is
    /// still outstanding. Only a dependent that is no longer live is dropped.
    pub represented: bool,
}

/// Speculative base offered by the load in Stage3 to a dependent in arbitration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChaseBase {
    /// Producer age.
    pub producer: Age,
    /// Predicted value.
    pub value: u64,
}

/// What actually happened to a producer at commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProducerVerdict {
    /// Producer age.
    pub age: Age,
    /// Committed value.
    pub value: u64,
    /// Committed without exception or retry.
    pub success: bool,
}

/// Speculative address formed from a producer's predicted value.
///
/// Only the bits below `set_bit` take the offset; the upper bits keep the
/// base so the cache set index can be driven before the full add completes.
pub const fn speculative_vaddr(base: u64, offset: i64, set_bit: u32) -> VirtAddr {
    let low = (1u64 << set_bit) - 1;
    VirtAddr((base & !low) | (base.wrapping_add_signed(offset) & low))
}

/// Returns true if the speculative address differs from the real one.
pub const fn set_overflow(base: u64, offset: i64, set_bit: u32) -> bool {
    let low = (1u64 << set_bit) - 1;
    let imm = (offset as u64) & ((1u64 << CHASE_IMM_BITS) - 1);
    let carry = ((base & low) + (imm & low)) >> set_bit != 0;
    carry || (imm >> set_bit) != 0
}

/// Inputs to the Stage1 pointer-chase check.
#[derive(Clone, Copy, Debug)]
pub struct ChaseCheck<'a> {
    /// Base value the address was formed from.
    pub base: u64,
    /// Link to the producer.
    pub link: &'a ChaseLink,
    /// Dependent's operation.
    pub op: LoadOp,
    /// Dependent survived the current and delayed redirects.
    pub live: bool,
    /// Producer's commit verdict, if it has committed.
    pub producer: Option<&'a ProducerVerdict>,
    /// Set boundary bit.
    pub set_bit: u32,
}

/// Decides whether a chained load must be cancelled.
///
/// Checked in order: liveness, op type, set overflow, alignment, and finally
/// the routing prediction and the producer's actual result.
pub fn check_chase(c: &ChaseCheck<'_>) -> Option<ChaseCancelReason> {
    if !c.live {
        return Some(ChaseCancelReason::NotLive);
    }
    if !c.op.is_plain() {
        return Some(ChaseCancelReason::NotPlainLoad);
    }
    if set_overflow(c.base, c.link.offset, c.set_bit) {
        return Some(ChaseCancelReason::SetOverflow);
    }
    if c.base.wrapping_add_signed(c.link.offset) & 7 != 0 {
        return Some(ChaseCancelReason::Misaligned);
    }
    let producer_ok = c
        .producer
        .is_some_and(|p| p.age == c.link.producer && p.success && p.value == c.base);
    if !c.link.fast_match || !producer_ok {
        return Some(ChaseCancelReason::FastMismatch);
    }
    None
}

/// Fast-path state: the most recent producer verdict.
#[derive(Clone, Copy, Debug, Default)]
pub struct FastPath {
    verdict: Option<ProducerVerdict>,
}

impl FastPath {
    /// Records the commit verdict of a load that fed (or could feed) a dependent.
    pub const fn record(&mut self, verdict: ProducerVerdict) {
        self.verdict = Some(verdict);
    }

    /// Verdict for `producer`, if it is the one recorded.
    pub fn verdict_for(&self, producer: Age) -> Option<&ProducerVerdict> {
        self.verdict.as_ref().filter(|v| v.age == producer)
    }

}
