//! Replay Classifier Unit Tests.
//!
//! Verifies lowest-cause selection, the troublesome gate, routing to the
//! three retry paths and the wait event recorded for queued replays.

use ldpipe_core::core::units::replay::{
    Classification, RawCauses, ReplayCause, ReplayRoute, RollbackHints, TroubleGate, WaitEvent,
    classify,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;

fn raw(causes: &[ReplayCause]) -> RawCauses {
    causes.iter().copied().collect()
}

fn from_bits(bits: u16) -> RawCauses {
    ReplayCause::ALL
        .into_iter()
        .filter(|c| bits & (1 << c.index()) != 0)
        .collect()
}

// ══════════════════════════════════════════════════════════
// 1. Routing
// ══════════════════════════════════════════════════════════

#[rstest]
#[case(ReplayCause::AddressAmbiguous, ReplayRoute::Queued, WaitEvent::StoreAddress)]
#[case(ReplayCause::TranslationMiss, ReplayRoute::Queued, WaitEvent::TranslationRefill)]
#[case(ReplayCause::ForwardFail, ReplayRoute::Queued, WaitEvent::StoreData)]
#[case(ReplayCause::CacheNack, ReplayRoute::Immediate, WaitEvent::None)]
#[case(ReplayCause::CacheMiss, ReplayRoute::Queued, WaitEvent::CacheRefill)]
#[case(ReplayCause::BankConflict, ReplayRoute::Immediate, WaitEvent::None)]
#[case(ReplayCause::WayMispredict, ReplayRoute::Immediate, WaitEvent::None)]
#[case(ReplayCause::RarNack, ReplayRoute::Queued, WaitEvent::HazardQueueDrain)]
#[case(ReplayCause::RawNack, ReplayRoute::Queued, WaitEvent::HazardQueueDrain)]
#[case(ReplayCause::MisalignNeedsSplit, ReplayRoute::Queued, WaitEvent::MisalignBufferFree)]
#[case(ReplayCause::Nuke, ReplayRoute::Immediate, WaitEvent::None)]
fn single_cause_routing(
    #[case] cause: ReplayCause,
    #[case] route: ReplayRoute,
    #[case] wait: WaitEvent,
) {
    let c = classify(raw(&[cause]), TroubleGate::default(), RollbackHints::default());
    assert_eq!(c, Some(Classification { cause, route }));
    assert_eq!(cause.wait_event(), wait);
}

#[test]
fn stale_forward_only_escalates_ambiguity() {
    let hints = RollbackHints {
        stale_forward: true,
        late_nuke: false,
    };
    let c = classify(raw(&[ReplayCause::ForwardFail]), TroubleGate::default(), hints);
    assert_eq!(c.map(|c| c.route), Some(ReplayRoute::Queued));
    let c = classify(raw(&[ReplayCause::AddressAmbiguous]), TroubleGate::default(), hints);
    assert_eq!(c.map(|c| c.route), Some(ReplayRoute::Rollback));
}

#[test]
fn late_nuke_rolls_back_only_when_selected() {
    let hints = RollbackHints {
        stale_forward: false,
        late_nuke: true,
    };
    let c = classify(raw(&[ReplayCause::Nuke]), TroubleGate::default(), hints);
    assert_eq!(c.map(|c| c.route), Some(ReplayRoute::Rollback));

    // A lower cause wins selection, so the late violation replays with it.
    let c = classify(
        raw(&[ReplayCause::CacheMiss, ReplayCause::Nuke]),
        TroubleGate::default(),
        hints,
    );
    assert_eq!(
        c,
        Some(Classification {
            cause: ReplayCause::CacheMiss,
            route: ReplayRoute::Queued
        })
    );
}

// ══════════════════════════════════════════════════════════
// 2. Troublesome gate
// ══════════════════════════════════════════════════════════

#[rstest]
#[case(TroubleGate { exception: true, ..TroubleGate::default() })]
#[case(TroubleGate { uncached_satisfied: true, ..TroubleGate::default() })]
#[case(TroubleGate { prefetch: true, ..TroubleGate::default() })]
#[case(TroubleGate { error_delivered: true, ..TroubleGate::default() })]
fn gate_suppresses_every_cause(#[case] gate: TroubleGate) {
    let all: RawCauses = ReplayCause::ALL.into_iter().collect();
    assert!(!gate.troublesome());
    assert_eq!(classify(all, gate, RollbackHints::default()), None);
}

#[test]
fn nothing_raised_selects_nothing() {
    assert_eq!(
        classify(RawCauses::NONE, TroubleGate::default(), RollbackHints::default()),
        None
    );
}

// ══════════════════════════════════════════════════════════
// 3. Properties
// ══════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn lowest_raised_cause_is_selected(bits in 1u16..(1 << ReplayCause::COUNT)) {
        let r = from_bits(bits);
        let c = classify(r, TroubleGate::default(), RollbackHints::default()).unwrap();
        prop_assert_eq!(c.cause.index(), bits.trailing_zeros() as usize);
        prop_assert!(r.has(c.cause));
    }

    #[test]
    fn gated_request_never_selects(
        bits in any::<u16>(),
        exception in any::<bool>(),
        uncached in any::<bool>(),
        prefetch in any::<bool>(),
        error in any::<bool>(),
    ) {
        let gate = TroubleGate {
            exception,
            uncached_satisfied: uncached,
            prefetch,
            error_delivered: error,
        };
        prop_assume!(!gate.troublesome());
        prop_assert_eq!(classify(from_bits(bits), gate, RollbackHints::default()), None);
    }
}
