//! Load/Store Unit (LSU) helpers.
//!
//! - [`unaligned`]: Alignment pre-check applied to every arbitration candidate.

/// Misaligned access classification.
pub mod unaligned;
