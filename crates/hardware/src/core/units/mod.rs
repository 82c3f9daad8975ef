//! Functional units of the load pipeline.
//!
//! This module contains the units the stage controller invokes each cycle:
//! the source arbiter, the ordering hazard detector, the forward merge unit,
//! the replay classifier, the result writeback with its pointer-chase fast
//! path, and the load/store alignment helpers.

/// Source arbitration and request normalization.
pub mod arbiter;

/// Byte-level forwarding merge.
pub mod forward;

/// Store-to-load ordering hazard detection.
pub mod hazard;

/// Load/Store Unit helpers for alignment handling.
pub mod lsu;

/// Replay cause selection and routing.
pub mod replay;

/// Result selection and the pointer-chase fast path.
pub mod writeback;
