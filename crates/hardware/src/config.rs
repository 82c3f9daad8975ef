//! Configuration system for the load pipeline model.
//!
//! This module defines the structures used to parameterize the pipeline. It provides:
//! 1. **Defaults:** Baseline constants for replay timing, bank geometry and hazard ports.
//! 2. **Structures:** Hierarchical config for the pipeline, memory view and hazard checks.
//! 3. **Validation:** Range checks reported through [`LoadPipeError`].
//!
//! Configuration is supplied as JSON (`Config::from_json`) or built with `Config::default()`.

use serde::Deserialize;

use crate::common::LoadPipeError;

/// Default configuration constants for the model.
mod defaults {
    /// Cycles an immediate retry waits before it is offered on the fast-replay source.
    pub const FAST_REPLAY_DELAY: u32 = 1;

    /// Bit index of the cache-set boundary checked by the pointer-chase fast path.
    ///
    /// With 64-byte lines the set index starts at bit 6; a carry into this bit
    /// means the speculative address picked the wrong set.
    pub const CHASE_SET_BIT: u32 = 6;

    /// Cache line size in bytes.
    pub const LINE_BYTES: u64 = 64;

    /// Base of the MMIO window used when translation does not classify an address.
    pub const MMIO_BASE: u64 = 0x0000_0000;

    /// Size of the MMIO window (2 GiB below the start of RAM).
    pub const MMIO_SIZE: u64 = 0x8000_0000;

    /// Number of concurrent store hazard queries checked per cycle.
    pub const STORE_QUERY_PORTS: usize = 2;
}

/// Root configuration structure containing all model settings.
///
/// # Examples
///
/// ```
/// use ldpipe_core::config::Config;
///
/// let config = Config::default();
/// assert_eq!(config.pipeline.fast_replay_delay, 1);
/// assert!(config.pipeline.enable_pointer_chase);
/// ```
///
/// Deserializing from JSON; omitted fields take their defaults:
///
/// ```
/// use ldpipe_core::config::Config;
///
/// let json = r#"{
///     "pipeline": { "fast_replay_delay": 3, "enable_pointer_chase": false },
///     "hazard": { "store_query_ports": 4 }
/// }"#;
///
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.pipeline.fast_replay_delay, 3);
/// assert!(!config.pipeline.enable_pointer_chase);
/// assert_eq!(config.hazard.store_query_ports, 4);
/// assert_eq!(config.memory.line_bytes, 64);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Stage pipeline and fast-path settings
    pub pipeline: PipelineConfig,
    /// Address-space view of the load unit
    pub memory: MemoryConfig,
    /// Ordering hazard detection settings
    pub hazard: HazardConfig,
}

impl Config {
    /// Parses a configuration from a JSON document and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`LoadPipeError::ConfigParse`] on malformed JSON and
    /// [`LoadPipeError::InvalidConfig`] if a value is out of range.
    pub fn from_json(json: &str) -> Result<Self, LoadPipeError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every field for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`LoadPipeError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<(), LoadPipeError> {
        if self.pipeline.fast_replay_delay == 0 {
            return Err(LoadPipeError::InvalidConfig {
                field: "pipeline.fast_replay_delay",
                reason: "must be at least one cycle".into(),
            });
        }
        if !self.memory.line_bytes.is_power_of_two() || self.memory.line_bytes < 16 {
            return Err(LoadPipeError::InvalidConfig {
                field: "memory.line_bytes",
                reason: format!(
                    "{} is not a power of two of at least 16",
                    self.memory.line_bytes
                ),
            });
        }
        if self.pipeline.chase_set_bit == 0 || self.pipeline.chase_set_bit >= 12 {
            return Err(LoadPipeError::InvalidConfig {
                field: "pipeline.chase_set_bit",
                reason: format!(
                    "{} is outside the page offset",
                    self.pipeline.chase_set_bit
                ),
            });
        }
        if self.hazard.store_query_ports == 0 {
            return Err(LoadPipeError::InvalidConfig {
                field: "hazard.store_query_ports",
                reason: "at least one store hazard port is required".into(),
            });
        }
        Ok(())
    }
}

/// Stage pipeline and fast-path configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Cycles before an immediate retry is re-presented to the arbiter.
    pub fast_replay_delay: u32,
    /// Allow dependent loads to issue speculatively off a producer's data.
    pub enable_pointer_chase: bool,
    /// Bit index of the set boundary the chase address must not carry into.
    pub chase_set_bit: u32,
    /// Also apply last cycle's redirect to chained (pointer-chase) slots.
    pub delayed_redirect_check: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fast_replay_delay: defaults::FAST_REPLAY_DELAY,
            enable_pointer_chase: true,
            chase_set_bit: defaults::CHASE_SET_BIT,
            delayed_redirect_check: true,
        }
    }
}

/// Address-space view of the load unit.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Cache line size in bytes.
    pub line_bytes: u64,
    /// Base of the fallback MMIO window.
    pub mmio_base: u64,
    /// Size of the fallback MMIO window.
    pub mmio_size: u64,
    /// Misaligned loads that stay inside one bank proceed without a split.
    pub allow_unaligned_in_bank: bool,
    /// Cross-bank misaligned cacheable loads go to the misalignment handler
    /// instead of faulting.
    pub split_misaligned: bool,
}

impl MemoryConfig {
    /// log2 of the line size.
    pub const fn line_shift(&self) -> u32 {
        self.line_bytes.trailing_zeros()
    }

    /// Returns true if `paddr` falls in the fallback MMIO window.
    pub const fn is_mmio(&self, paddr: u64) -> bool {
        paddr >= self.mmio_base && paddr - self.mmio_base < self.mmio_size
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            line_bytes: defaults::LINE_BYTES,
            mmio_base: defaults::MMIO_BASE,
            mmio_size: defaults::MMIO_SIZE,
            allow_unaligned_in_bank: true,
            split_misaligned: true,
        }
    }
}

/// Ordering hazard detection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HazardConfig {
    /// Number of store hazard queries inspected per cycle; extras are ignored.
    pub store_query_ports: usize,
    /// A violation seen while the load sits in Stage3 rolls the pipeline back
    /// instead of retrying the load immediately.
    pub late_nuke_rollback: bool,
}

impl Default for HazardConfig {
    fn default() -> Self {
        Self {
            store_query_ports: defaults::STORE_QUERY_PORTS,
            late_nuke_rollback: true,
        }
    }
}
