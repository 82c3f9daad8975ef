//! Unaligned access Unit Tests.
//!
//! Verifies alignment checks and the split/fault pre-check.

use ldpipe_core::common::{LoadOp, VirtAddr};
use ldpipe_core::config::MemoryConfig;
use ldpipe_core::core::pipeline::request::MisalignAction;
use ldpipe_core::core::units::lsu::unaligned;
use rstest::rstest;

// ══════════════════════════════════════════════════════════
// 1. Alignment checking
// ══════════════════════════════════════════════════════════

#[test]
fn byte_access_always_aligned() {
    for addr in [0u64, 1, 2, 3, 7, 0xFF, 0x1001, u64::MAX] {
        assert!(unaligned::is_aligned(addr, 1), "addr={addr:#x}");
    }
}

#[test]
fn doubleword_alignment() {
    assert!(unaligned::is_aligned(0, 8));
    assert!(unaligned::is_aligned(0x1000, 8));
    assert!(!unaligned::is_aligned(4, 8));
    assert!(!unaligned::is_aligned(0x1001, 8));
}

// ══════════════════════════════════════════════════════════
// 2. Pre-check verdicts
// ══════════════════════════════════════════════════════════

#[rstest]
#[case(LoadOp::Ld, 0x1008, false, MisalignAction::None)]
#[case(LoadOp::Lw, 0x1002, false, MisalignAction::None)]
#[case(LoadOp::Ld, 0x100C, false, MisalignAction::ForceSplit)]
#[case(LoadOp::Lh, 0x100F, false, MisalignAction::ForceSplit)]
#[case(LoadOp::Lw, 0x1002, true, MisalignAction::ForceFault)]
#[case(LoadOp::Lq, 0x1008, false, MisalignAction::ForceSplit)]
fn precheck_defaults(
    #[case] op: LoadOp,
    #[case] vaddr: u64,
    #[case] uncached: bool,
    #[case] expected: MisalignAction,
) {
    let cfg = MemoryConfig::default();
    assert_eq!(unaligned::precheck(VirtAddr(vaddr), op, uncached, &cfg), expected);
}

#[test]
fn in_bank_misalignment_can_be_disallowed() {
    let cfg = MemoryConfig {
        allow_unaligned_in_bank: false,
        ..MemoryConfig::default()
    };
    assert_eq!(
        unaligned::precheck(VirtAddr(0x1002), LoadOp::Lw, false, &cfg),
        MisalignAction::ForceSplit
    );
}

#[test]
fn uncached_reconcile_faults_misaligned_only() {
    assert_eq!(
        unaligned::reconcile_uncached(MisalignAction::None, VirtAddr(0x1004), LoadOp::Ld),
        MisalignAction::ForceFault
    );
    assert_eq!(
        unaligned::reconcile_uncached(MisalignAction::None, VirtAddr(0x1008), LoadOp::Ld),
        MisalignAction::None
    );
}
