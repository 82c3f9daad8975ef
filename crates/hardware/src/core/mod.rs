//! Load unit core.
//!
//! This module contains the load pipeline, its functional units, the
//! collaborator interfaces, and the [`LoadUnit`] that ties them together.

/// Load pipeline implementation (request, latches, signals, stages, engine).
pub mod pipeline;

/// External collaborator interfaces (translator, cache, forwarding, queues).
pub mod ports;

/// Functional units (arbiter, hazard, forward, replay, writeback, LSU helpers).
pub mod units;

use tracing::info;

use crate::common::LoadPipeError;
use crate::config::Config;
use crate::core::pipeline::engine::StagePipeline;
use crate::core::pipeline::request::{Age, RequestSource};
use crate::core::pipeline::signals::{CycleInputs, CycleOutputs};
use crate::core::ports::LoadEnvironment;
use crate::core::units::arbiter::{LoadCandidate, SourcePorts};
use crate::stats::LoadUnitStats;

/// One load execution pipeline.
///
/// Owns the source ports, the stage slots and the statistics. Everything
/// outside the pipeline is reached through a [`LoadEnvironment`] passed to
/// [`LoadUnit::tick`].
#[derive(Debug)]
pub struct LoadUnit {
    config: Config,
    ports: SourcePorts,
    pipeline: StagePipeline,
    stats: LoadUnitStats,
}

impl LoadUnit {
    /// Creates a load unit after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadPipeError::InvalidConfig`] if a setting is out of range.
    pub fn new(config: Config) -> Result<Self, LoadPipeError> {
        config.validate()?;
        info!(
            fast_replay_delay = config.pipeline.fast_replay_delay,
            pointer_chase = config.pipeline.enable_pointer_chase,
            store_query_ports = config.hazard.store_query_ports,
            "load unit created"
        );
        Ok(Self {
            config,
            ports: SourcePorts::default(),
            pipeline: StagePipeline::new(),
            stats: LoadUnitStats::default(),
        })
    }

    /// Offers a request on `source`; it waits there until granted or flushed.
    pub fn offer(&mut self, source: RequestSource, candidate: LoadCandidate) {
        self.ports.offer(source, candidate);
    }

    /// Source ports, for producers that manage their own queue.
    pub const fn ports_mut(&mut self) -> &mut SourcePorts {
        &mut self.ports
    }

    /// Source ports.
    pub const fn ports(&self) -> &SourcePorts {
        &self.ports
    }

    /// Advances the unit by one cycle.
    ///
    /// # Arguments
    ///
    /// * `env` - Translator, cache, forwarding network, access policy,
    ///   ordering queues and replay destinations.
    /// * `inputs` - Redirect, store hazard queries and commit-port readiness.
    ///
    /// # Returns
    ///
    /// Grant, commit record, wakeups, rollback and chase cancellation for this cycle.
    pub fn tick<E: LoadEnvironment + ?Sized>(&mut self, env: &mut E, inputs: &CycleInputs) -> CycleOutputs {
        self.pipeline
            .tick(&mut self.ports, env, inputs, &self.config, &mut self.stats)
    }

    /// Ages of the Stage1, Stage2 and Stage3 occupants.
    pub fn occupancy(&self) -> [Option<Age>; 3] {
        self.pipeline.occupancy()
    }

    /// Returns true if no request is in flight or waiting anywhere in the unit.
    pub fn is_idle(&self) -> bool {
        self.pipeline.is_empty() && self.ports.pending() == 0
    }

    /// Requests waiting in the fast-replay buffer.
    pub fn fast_replay_pending(&self) -> usize {
        self.pipeline.fast_replay_pending()
    }

    /// Configuration in effect.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Collected statistics.
    pub const fn stats(&self) -> &LoadUnitStats {
        &self.stats
    }
}
