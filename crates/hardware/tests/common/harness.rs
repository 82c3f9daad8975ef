use ldpipe_core::Config;
use ldpipe_core::LoadUnit;
use ldpipe_core::core::pipeline::request::Age;
use ldpipe_core::core::pipeline::signals::{CommitRecord, CycleInputs, CycleOutputs};

use crate::common::init_tracing;
use crate::common::mocks::env::MockEnv;

pub struct TestContext {
    pub unit: LoadUnit,
    pub env: MockEnv,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        init_tracing();
        Self {
            unit: LoadUnit::new(config).unwrap(),
            env: MockEnv::new(),
        }
    }

    /// One cycle with no redirect, no store traffic and a free commit port.
    pub fn tick(&mut self) -> CycleOutputs {
        self.unit.tick(&mut self.env, &CycleInputs::default())
    }

    pub fn tick_with(&mut self, inputs: &CycleInputs) -> CycleOutputs {
        self.unit.tick(&mut self.env, inputs)
    }

    /// Runs `n` idle cycles and returns every cycle's outputs.
    pub fn run(&mut self, n: usize) -> Vec<CycleOutputs> {
        (0..n).map(|_| self.tick()).collect()
    }

    /// Ticks until a commit record appears; returns it with the 1-based cycle count.
    pub fn run_until_commit(&mut self, max: usize) -> Option<(usize, CommitRecord)> {
        (1..=max).find_map(|i| self.tick().commit.map(|c| (i, c)))
    }

    /// Ticks until a record for `age` appears.
    pub fn commit_of(&mut self, age: u64, max: usize) -> Option<CommitRecord> {
        (0..max).find_map(|_| self.tick().commit.filter(|c| c.age == Age(age)))
    }

    pub fn occupancy(&self) -> [Option<u64>; 3] {
        self.unit.occupancy().map(|a| a.map(|a| a.0))
    }
}
