//! Pipeline Flow Tests.
//!
//! Cycle-level scenarios for the happy path, back-pressure, redirects,
//! source arbitration through the unit, and prefetches.

use ldpipe_core::Config;
use ldpipe_core::common::LoadOp;
use ldpipe_core::core::pipeline::request::{Age, RequestSource};
use ldpipe_core::core::pipeline::signals::{CommitStatus, CycleInputs, Redirect, Wakeup};
use ldpipe_core::core::ports::CacheResponse;
use ldpipe_core::core::units::arbiter::LoadCandidate;
use ldpipe_core::core::units::replay::{ReplayCause, ReplayRoute};
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::builder::request::{DRAM, fast_replay, load, load_op, store};
use crate::common::harness::TestContext;

fn offer_loads(ctx: &mut TestContext, ages: impl IntoIterator<Item = u64>) {
    for age in ages {
        ctx.unit
            .offer(RequestSource::ScalarIssue, load(age, DRAM + age * 0x40));
    }
}

// ══════════════════════════════════════════════════════════
// 1. Happy path
// ══════════════════════════════════════════════════════════

#[test]
fn hit_wakes_in_stage2_and_commits_in_stage3() {
    let mut ctx = TestContext::new();
    ctx.env.write(DRAM + 0x100, 0xDEAD_BEEF_0123_4567);
    ctx.unit.offer(RequestSource::ScalarIssue, load(1, DRAM + 0x100));

    let outs = ctx.run(4);
    assert_eq!(outs[0].grant, Some(RequestSource::ScalarIssue));
    assert_eq!(outs[1].wakeup, None);
    assert_eq!(outs[2].wakeup, Some(Wakeup { age: Age(1), dest: 1 }));
    assert!(outs[..3].iter().all(|o| o.commit.is_none()));

    let c = outs[3].commit.unwrap();
    assert_eq!(c.age, Age(1));
    assert_eq!(c.status, CommitStatus::Done);
    assert_eq!(c.value, 0xDEAD_BEEF_0123_4567);
    assert_eq!(c.dest, Some(1));
    assert_eq!(c.source, RequestSource::ScalarIssue);
    assert!(!c.retry());
    assert_eq!(outs[3].wakeup_cancel, None);

    assert!(ctx.unit.is_idle());
    assert_eq!(ctx.env.translations.len(), 1);
    assert_eq!(ctx.env.registered.len(), 1);
    assert!(ctx.env.registered[0].data_valid);
    assert_eq!(ctx.unit.stats().completed, 1);
    assert_eq!(ctx.unit.stats().wakeups, 1);
}

#[test]
fn back_to_back_loads_commit_one_per_cycle() {
    let mut ctx = TestContext::new();
    offer_loads(&mut ctx, 1..=3);
    let outs = ctx.run(6);
    let committed: Vec<Option<u64>> = outs.iter().map(|o| o.commit.map(|c| c.age.0)).collect();
    assert_eq!(committed, vec![None, None, None, Some(1), Some(2), Some(3)]);
}

#[rstest]
#[case(LoadOp::Lb, 0xFFFF_FFFF_FFFF_FF88)]
#[case(LoadOp::Lhu, 0x7788)]
#[case(LoadOp::Lw, 0x5566_7788)]
fn committed_value_is_extended(#[case] op: LoadOp, #[case] expected: u64) {
    let mut ctx = TestContext::new();
    ctx.env.write(DRAM + 0x80, 0x1122_3344_5566_7788);
    ctx.unit
        .offer(RequestSource::ScalarIssue, load_op(1, op, DRAM + 0x80));
    let (_, c) = ctx.run_until_commit(8).unwrap();
    assert_eq!(c.value, expected);
}

// ══════════════════════════════════════════════════════════
// 2. Back-pressure
// ══════════════════════════════════════════════════════════

#[test]
fn busy_commit_port_stalls_every_stage() {
    let mut ctx = TestContext::new();
    offer_loads(&mut ctx, 1..=4);
    let _ = ctx.run(3);
    assert_eq!(ctx.occupancy(), [Some(3), Some(2), Some(1)]);

    let busy = CycleInputs {
        commit_ready: false,
        ..CycleInputs::default()
    };
    let out = ctx.tick_with(&busy);
    assert!(out.commit.is_none());
    assert!(out.grant.is_none());
    assert_eq!(ctx.occupancy(), [Some(3), Some(2), Some(1)]);
    assert_eq!(ctx.unit.ports().port(RequestSource::ScalarIssue).len(), 1);

    let stats = ctx.unit.stats();
    assert_eq!(
        (stats.stall_s3, stats.stall_s2, stats.stall_s1, stats.stall_s0),
        (1, 1, 1, 1)
    );

    // Every slot moves again as soon as the port frees up.
    let out = ctx.tick();
    assert_eq!(out.commit.map(|c| c.age), Some(Age(1)));
    assert_eq!(out.grant, Some(RequestSource::ScalarIssue));
    assert_eq!(ctx.occupancy(), [Some(4), Some(3), Some(2)]);
}

#[test]
fn stalled_load_is_not_evaluated_twice() {
    let mut ctx = TestContext::new();
    offer_loads(&mut ctx, [1]);
    let _ = ctx.run(3);
    let busy = CycleInputs {
        commit_ready: false,
        ..CycleInputs::default()
    };
    for _ in 0..3 {
        let _ = ctx.tick_with(&busy);
    }
    let c = ctx.tick().commit.unwrap();
    assert_eq!(c.status, CommitStatus::Done);
    assert_eq!(ctx.env.accesses.len(), 1);
    assert_eq!(ctx.env.registered.len(), 1);
}

// ══════════════════════════════════════════════════════════
// 3. Redirects
// ══════════════════════════════════════════════════════════

#[test]
fn flush_after_keeps_the_boundary_load() {
    let mut ctx = TestContext::new();
    offer_loads(&mut ctx, 1..=4);
    let _ = ctx.run(3);

    let out = ctx.tick_with(&CycleInputs {
        redirect: Some(Redirect::after(Age(1))),
        ..CycleInputs::default()
    });
    assert_eq!(out.flushed, 3);
    assert_eq!(out.commit.map(|c| (c.age, c.status)), Some((Age(1), CommitStatus::Done)));
    assert_eq!(ctx.occupancy(), [None, None, None]);
    assert!(ctx.unit.is_idle());
    assert_eq!(ctx.unit.stats().flush_kills, 3);
}

#[test]
fn flush_itself_discards_the_boundary_load() {
    let mut ctx = TestContext::new();
    offer_loads(&mut ctx, 1..=4);
    let _ = ctx.run(3);

    let out = ctx.tick_with(&CycleInputs {
        redirect: Some(Redirect::itself(Age(1))),
        ..CycleInputs::default()
    });
    assert_eq!(out.flushed, 4);
    assert!(out.commit.is_none());
    assert!(ctx.unit.is_idle());
    assert!(ctx.run(4).iter().all(|o| o.commit.is_none()));
}

#[test]
fn older_redirect_spares_everything() {
    let mut ctx = TestContext::new();
    offer_loads(&mut ctx, 5..=6);
    let _ = ctx.run(1);
    let out = ctx.tick_with(&CycleInputs {
        redirect: Some(Redirect::after(Age(7))),
        ..CycleInputs::default()
    });
    assert_eq!(out.flushed, 0);
    assert_eq!(ctx.occupancy(), [Some(6), Some(5), None]);
}

// ══════════════════════════════════════════════════════════
// 4. Arbitration through the unit
// ══════════════════════════════════════════════════════════

#[test]
fn fast_replay_wins_and_skips_translation() {
    let mut ctx = TestContext::new();
    ctx.unit
        .offer(RequestSource::FastReplay, fast_replay(5, DRAM + 0x40));
    ctx.unit.offer(RequestSource::ScalarIssue, load(7, DRAM + 0x80));

    let out = ctx.tick();
    assert_eq!(out.grant, Some(RequestSource::FastReplay));
    assert!(ctx.env.translations.is_empty());

    let out = ctx.tick();
    assert_eq!(out.grant, Some(RequestSource::ScalarIssue));
    assert_eq!(ctx.env.translations.len(), 1);
    assert_eq!(ctx.env.translations[0].age, Age(7));

    let ages: Vec<u64> = ctx
        .run(4)
        .iter()
        .filter_map(|o| o.commit.map(|c| c.age.0))
        .collect();
    assert_eq!(ages, vec![5, 7]);
    assert_eq!(ctx.unit.stats().grants_for(RequestSource::FastReplay), 1);
    assert_eq!(ctx.unit.stats().grants_for(RequestSource::ScalarIssue), 1);
}

// ══════════════════════════════════════════════════════════
// 5. Store hazard ports
// ══════════════════════════════════════════════════════════

#[rstest]
#[case(2, CommitStatus::Done)]
#[case(3, CommitStatus::Retry { cause: ReplayCause::Nuke, route: ReplayRoute::Immediate })]
fn only_configured_store_ports_are_checked(#[case] ports: usize, #[case] expected: CommitStatus) {
    let mut cfg = Config::default();
    cfg.hazard.store_query_ports = ports;
    let mut ctx = TestContext::with_config(cfg);
    ctx.unit.offer(RequestSource::ScalarIssue, load(10, DRAM + 0x200));
    let _ = ctx.tick();

    // The conflicting store sits on the third port.
    let _ = ctx.tick_with(&CycleInputs {
        store_queries: vec![
            store(20, DRAM + 0x200, 0xFF),
            store(21, DRAM + 0x200, 0xFF),
            store(8, DRAM + 0x200, 0xFF),
        ],
        ..CycleInputs::default()
    });
    let c = ctx.commit_of(10, 4).unwrap();
    assert_eq!(c.status, expected);
}

// ══════════════════════════════════════════════════════════
// 6. Prefetch
// ══════════════════════════════════════════════════════════

#[test]
fn prefetch_completes_without_a_result() {
    let mut ctx = TestContext::new();
    ctx.unit
        .offer(RequestSource::PrefetchHigh, LoadCandidate::prefetch(3, DRAM + 0x300));

    let outs = ctx.run(4);
    assert!(outs.iter().all(|o| o.wakeup.is_none()));
    let c = outs[3].commit.unwrap();
    assert_eq!(c.status, CommitStatus::Done);
    assert_eq!(c.dest, None);
    assert_eq!(c.source, RequestSource::PrefetchHigh);

    assert!(ctx.env.translations.is_empty());
    assert_eq!(ctx.env.accesses.len(), 1);
    assert!(ctx.env.accesses[0].is_prefetch);
    assert!(ctx.env.forwards.is_empty());
    assert!(ctx.env.registered.is_empty());
    assert_eq!(ctx.unit.stats().prefetches, 1);
}

#[test]
fn denied_prefetch_ends_quietly() {
    let mut ctx = TestContext::new();
    ctx.env.denied.insert(DRAM + 0x300);
    ctx.unit
        .offer(RequestSource::PrefetchLow, LoadCandidate::prefetch(3, DRAM + 0x300));
    let (_, c) = ctx.run_until_commit(6).unwrap();
    assert_eq!(c.status, CommitStatus::Done);
    assert!(c.exceptions.is_empty());
    assert!(ctx.env.accesses.is_empty());
}

#[test]
fn prefetch_miss_does_not_replay() {
    let mut ctx = TestContext::new();
    ctx.env
        .script_cache(3, CacheResponse::miss(1));
    ctx.unit
        .offer(RequestSource::PrefetchHigh, LoadCandidate::prefetch(3, DRAM + 0x300));
    let (_, c) = ctx.run_until_commit(6).unwrap();
    assert_eq!(c.status, CommitStatus::Done);
    assert!(ctx.env.replays.is_empty());
}
