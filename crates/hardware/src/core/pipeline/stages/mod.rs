//! Load pipeline stage implementations.
//!
//! Each stage is a function from its slot (plus this cycle's inputs) to the
//! next stage's slot. It includes:
//! 1. **Stage0:** Address generation and translation/cache query issue.
//! 2. **Stage1:** Translation resolution, access checks and hazard pre-check.
//! 3. **Stage2:** Cache resolution, forward merge, final hazard check and early wakeup.
//! 4. **Stage3:** Commit, replay routing and writeback.

/// Address generation and query issue.
pub mod stage0;

/// Translation resolution and hazard pre-check.
pub mod stage1;

/// Cache resolution and forward merge.
pub mod stage2;

/// Commit and replay routing.
pub mod stage3;

pub use stage0::stage0;
pub use stage1::stage1;
pub use stage2::stage2;
pub use stage3::{Stage3Outcome, stage3};
