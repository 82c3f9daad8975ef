//! Load pipeline statistics collection and reporting.
//!
//! This module tracks performance counters for the load unit. It provides:
//! 1. **Throughput:** Cycles, grants per source, and commits.
//! 2. **Outcomes:** Exceptions, immediate retries, queued replays per cause, and rollbacks.
//! 3. **Speculation:** Flush kills, pointer-chase issue/cancel, early wakeups and their cancels.
//! 4. **Back-pressure:** Stall cycles per stage.

use crate::core::pipeline::request::RequestSource;
use crate::core::units::replay::ReplayCause;

/// Counters collected by a [`crate::core::LoadUnit`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadUnitStats {
    /// Cycles ticked.
    pub cycles: u64,
    /// Requests granted, indexed by source priority.
    pub grants: [u64; RequestSource::COUNT],
    /// Records placed on the commit port.
    pub commits: u64,
    /// Loads that delivered a value.
    pub completed: u64,
    /// Prefetches that finished.
    pub prefetches: u64,
    /// Exceptions surfaced at commit.
    pub exceptions: u64,
    /// Requests sent to the uncached path.
    pub uncached: u64,
    /// Requests handed to the misalignment handler.
    pub splits: u64,
    /// Immediate (fast) retries.
    pub immediate_replays: u64,
    /// Queued replays, indexed by cause.
    pub queued_replays: [u64; ReplayCause::COUNT],
    /// Program-order rollbacks requested.
    pub rollbacks: u64,
    /// Slots and queued requests discarded by redirects.
    pub flush_kills: u64,
    /// Pointer-chase requests granted.
    pub chase_issued: u64,
    /// Pointer-chase speculations cancelled.
    pub chase_cancelled: u64,
    /// Early wakeups sent from Stage2.
    pub wakeups: u64,
    /// Wakeups retracted from Stage3.
    pub wakeup_cancels: u64,
    /// Cycles a source was pending but Stage1 could not accept.
    pub stall_s0: u64,
    /// Cycles Stage1 held its occupant.
    pub stall_s1: u64,
    /// Cycles Stage2 held its occupant.
    pub stall_s2: u64,
    /// Cycles Stage3 held its occupant because the commit port was busy.
    pub stall_s3: u64,
}

impl LoadUnitStats {
    /// Grants recorded for `source`.
    pub const fn grants_for(&self, source: RequestSource) -> u64 {
        self.grants[source.priority()]
    }

    /// Queued replays recorded for `cause`.
    pub const fn replays_for(&self, cause: ReplayCause) -> u64 {
        self.queued_replays[cause.index()]
    }

    /// Total queued replays across every cause.
    pub fn total_queued_replays(&self) -> u64 {
        self.queued_replays.iter().sum()
    }

    /// Prints the sections named in `sections`, or every section if empty.
    ///
    /// Known sections: `summary`, `sources`, `replay`, `speculation`, `stalls`.
    pub fn print_sections(&self, sections: &[String]) {
        let want = |s: &str| sections.is_empty() || sections.iter().any(|x| x == s);
        let cyc = self.cycles.max(1);

        if want("summary") {
            let throughput = self.completed as f64 / cyc as f64;
            println!("\n==========================================================");
            println!("LOAD PIPELINE STATISTICS");
            println!("==========================================================");
            println!("cycles                   {}", self.cycles);
            println!("commits                  {}", self.commits);
            println!("completed                {}", self.completed);
            println!("loads_per_cycle          {throughput:.4}");
            println!("prefetches               {}", self.prefetches);
            println!("exceptions               {}", self.exceptions);
            println!("uncached                 {}", self.uncached);
            println!("splits                   {}", self.splits);
            println!("----------------------------------------------------------");
        }
        if want("sources") {
            println!("SOURCE GRANTS");
            for source in RequestSource::ALL {
                let name = format!("{source:?}");
                println!("  {name:<22} {}", self.grants_for(source));
            }
            println!("----------------------------------------------------------");
        }
        if want("replay") {
            println!("REPLAY");
            println!("  replay.immediate       {}", self.immediate_replays);
            println!("  replay.queued          {}", self.total_queued_replays());
            for cause in ReplayCause::ALL {
                let n = self.replays_for(cause);
                if n > 0 {
                    println!("    {:<20} {n}", cause.to_string());
                }
            }
            println!("  rollbacks              {}", self.rollbacks);
            println!("----------------------------------------------------------");
        }
        if want("speculation") {
            println!("SPECULATION");
            println!("  flush.kills            {}", self.flush_kills);
            println!("  chase.issued           {}", self.chase_issued);
            println!("  chase.cancelled        {}", self.chase_cancelled);
            println!("  wakeup.sent            {}", self.wakeups);
            println!("  wakeup.cancelled       {}", self.wakeup_cancels);
            println!("----------------------------------------------------------");
        }
        if want("stalls") {
            println!("BACK-PRESSURE");
            for (stage, n) in [
                ("s0", self.stall_s0),
                ("s1", self.stall_s1),
                ("s2", self.stall_s2),
                ("s3", self.stall_s3),
            ] {
                println!(
                    "  stall.{stage}               {n} ({:.2}%)",
                    (n as f64 / cyc as f64) * 100.0
                );
            }
        }
        println!("==========================================================");
    }

    /// Prints every section.
    pub fn print(&self) {
        self.print_sections(&[]);
    }
}
