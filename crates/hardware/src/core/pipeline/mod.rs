//! Load pipeline implementation.
//!
//! This module contains the four-stage speculative load pipeline.
//! It includes the following components:
//! 1. **Request:** The canonical in-flight load record and its source tags.
//! 2. **Latches:** Single-entry stage slots with stage-local derived state.
//! 3. **Signals:** Redirects, wakeups, commit records and per-cycle I/O.
//! 4. **Stages:** Stage0 through Stage3 evaluation functions.
//! 5. **Engine:** The stage controller that advances every slot each cycle.
//! 6. **Traits:** Common interface for stage slots.

/// Stage pipeline controller.
pub mod engine;

/// Stage slots (S1, S2, S3).
pub mod latches;

/// Canonical load request record.
pub mod request;

/// Redirects, wakeups, commit records and cycle I/O.
pub mod signals;

/// Stage implementations (stage0 through stage3).
pub mod stages;

/// Traits for stage slots.
pub mod traits;
