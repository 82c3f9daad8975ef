//! Out-of-order load pipeline model.
//!
//! This crate implements the control logic of a speculative load execution
//! pipeline with the following:
//! 1. **Arbitration:** Strict-priority selection among many request sources.
//! 2. **Pipeline:** Four stages with back-pressure, redirect flush and soft cancel.
//! 3. **Hazards:** Store-to-load ordering checks and byte-level forwarding merge.
//! 4. **Replay:** Cause selection and immediate, queued or rollback routing.
//! 5. **Writeback:** Result selection, early wakeup and the pointer-chase fast path.

/// Common types and constants (addresses, widths, masks, exceptions, errors).
pub mod common;
/// Model configuration (defaults and hierarchical config structures).
pub mod config;
/// Load unit core (pipeline, units, ports).
pub mod core;
/// Load unit statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// Main load unit type; holds source ports, stage slots and stats.
pub use crate::core::LoadUnit;
