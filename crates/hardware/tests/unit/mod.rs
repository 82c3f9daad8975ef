//! # Unit Components
//!
//! This module organizes tests for the configuration layer, each functional
//! unit, and cycle-level scenarios of the assembled pipeline.

/// Unit tests for configuration parsing and validation.
pub mod config;
