//! Common types and constants shared by every unit of the load pipeline.
//!
//! This module provides the fundamental building blocks used across the model:
//! 1. **Address Types:** Strong types for virtual and physical addresses.
//! 2. **Constants:** Bank geometry and field widths.
//! 3. **Load Operations:** Widths, extension rules and byte-mask generation.
//! 4. **Error Handling:** Architectural exception vector and the crate error type.

/// Address type definitions (physical and virtual addresses).
pub mod addr;

/// Bank geometry constants.
pub mod constants;

/// Load operation, width, and byte-mask definitions.
pub mod data;

/// Exception taxonomy and error types.
pub mod error;

pub use addr::{PhysAddr, VirtAddr};
pub use data::{AccessKind, LoadOp, MemWidth};
pub use error::{ExceptionKind, ExceptionVector, LoadException, LoadPipeError};
