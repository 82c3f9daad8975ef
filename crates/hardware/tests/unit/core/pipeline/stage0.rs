//! Stage0 Tests.
//!
//! Verifies which granted requests consult the translator and what the
//! Stage1 slot carries forward.

use ldpipe_core::Config;
use ldpipe_core::common::{AccessKind, PhysAddr, VirtAddr};
use ldpipe_core::core::pipeline::request::{Age, RequestSource};
use ldpipe_core::core::pipeline::stages::stage0;
use ldpipe_core::core::ports::TranslationResponse;
use ldpipe_core::core::units::arbiter::{LoadCandidate, normalize};
use ldpipe_core::core::units::writeback::ChaseBase;
use pretty_assertions::assert_eq;

use crate::common::builder::request::{DRAM, fast_replay, load};
use crate::common::mocks::translator::MockTlb;

#[test]
fn exempt_source_with_address_skips_translation() {
    let cfg = Config::default();
    let mut tlb = MockTlb::new();
    tlb.expect_translate().times(0);

    let req = normalize(
        RequestSource::FastReplay,
        fast_replay(5, DRAM + 0x40),
        None,
        &cfg,
    );
    let slot = stage0(RequestSource::FastReplay, req, None, &mut tlb);
    assert!(slot.tlb.is_none());
    assert_eq!(slot.req.paddr, Some(PhysAddr(DRAM + 0x40)));
    assert_eq!(slot.access.age, Age(5));
}

#[test]
fn issued_load_is_translated_once() {
    let cfg = Config::default();
    let mut tlb = MockTlb::new();
    tlb.expect_translate()
        .withf(|q| {
            q.age == Age(7) && q.vaddr == VirtAddr(DRAM + 0x88) && q.kind == AccessKind::Load
        })
        .times(1)
        .returning(|q| TranslationResponse::hit(q.vaddr.val() + 0x1000));

    let req = normalize(RequestSource::ScalarIssue, load(7, DRAM + 0x88), None, &cfg);
    let slot = stage0(RequestSource::ScalarIssue, req, None, &mut tlb);
    assert_eq!(slot.tlb.map(|t| t.paddr), Some(PhysAddr(DRAM + 0x1088)));
    // The physical address is only adopted in Stage1.
    assert_eq!(slot.req.paddr, None);
    assert_eq!(slot.access.vaddr, VirtAddr(DRAM + 0x88));
    assert_eq!(slot.access.mask, 0xFF00);
    assert!(!slot.access.is_prefetch);
}

#[test]
fn prefetch_without_address_is_translated_as_prefetch() {
    let cfg = Config::default();
    let mut tlb = MockTlb::new();
    tlb.expect_translate()
        .withf(|q| q.kind == AccessKind::Prefetch)
        .times(1)
        .returning(|q| TranslationResponse::hit(q.vaddr.val()));

    let mut candidate = LoadCandidate::prefetch(9, DRAM + 0x200);
    candidate.request.paddr = None;
    let req = normalize(RequestSource::PrefetchLow, candidate, None, &cfg);
    let slot = stage0(RequestSource::PrefetchLow, req, None, &mut tlb);
    assert!(slot.tlb.is_some());
    assert!(slot.access.is_prefetch);
}

#[test]
fn chained_request_keeps_its_base() {
    let cfg = Config::default();
    let mut tlb = MockTlb::new();
    tlb.expect_translate()
        .times(1)
        .returning(|q| TranslationResponse::hit(q.vaddr.val()));

    let base = ChaseBase {
        producer: Age(1),
        value: DRAM + 0x2020,
    };
    let req = normalize(
        RequestSource::PointerChase,
        LoadCandidate::chase(2, 5, 1, 0x10),
        Some(base),
        &cfg,
    );
    let slot = stage0(RequestSource::PointerChase, req, Some(base.value), &mut tlb);
    assert_eq!(slot.chase_base, Some(DRAM + 0x2020));
    assert_eq!(slot.req.vaddr, VirtAddr(DRAM + 0x2030));
    assert!(slot.req.flags.pointer_chase);
}
