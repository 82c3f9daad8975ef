//! Load exception taxonomy and crate error type.
//!
//! This module defines the two kinds of failure the load pipeline deals with:
//! 1. **Architectural Exceptions:** Faults that are recorded in the request's
//!    exception vector and always surfaced at commit.
//! 2. **Model Errors:** Failures of the model itself (bad configuration),
//!    reported through [`LoadPipeError`].

use std::fmt;

use thiserror::Error;

/// Architectural exception kinds a load can raise.
///
/// The declaration order is the reporting priority: when several kinds are
/// recorded for the same request, the earliest one is surfaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    /// Delayed hardware/bus error. Overrides everything else once observed.
    HardwareError,
    /// Debug trigger matched the load address.
    Breakpoint,
    /// Load address misaligned and not serviceable by a split.
    AddressMisaligned,
    /// Translation reported a page fault.
    PageFault,
    /// Translation or access policy denied the access.
    AccessFault,
}

impl ExceptionKind {
    /// All kinds in reporting priority order.
    pub const ALL: [Self; 5] = [
        Self::HardwareError,
        Self::Breakpoint,
        Self::AddressMisaligned,
        Self::PageFault,
        Self::AccessFault,
    ];

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::HardwareError => "HardwareError",
            Self::Breakpoint => "Breakpoint",
            Self::AddressMisaligned => "LoadAddressMisaligned",
            Self::PageFault => "LoadPageFault",
            Self::AccessFault => "LoadAccessFault",
        };
        f.write_str(name)
    }
}

/// Set of exception kinds accumulated by a request as it moves down the pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ExceptionVector(u8);

impl ExceptionVector {
    /// An empty vector.
    pub const NONE: Self = Self(0);

    /// Records an exception kind.
    #[inline]
    pub const fn raise(&mut self, kind: ExceptionKind) {
        self.0 |= kind.bit();
    }

    /// Returns true if `kind` has been recorded.
    #[inline]
    pub const fn has(self, kind: ExceptionKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// Returns true if no exception has been recorded.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Clears every recorded kind.
    #[inline]
    pub const fn clear(&mut self) {
        self.0 = 0;
    }

    /// Highest-priority recorded kind, if any.
    pub fn first(self) -> Option<ExceptionKind> {
        ExceptionKind::ALL.into_iter().find(|k| self.has(*k))
    }

    /// Iterates over every recorded kind in priority order.
    pub fn iter(self) -> impl Iterator<Item = ExceptionKind> {
        ExceptionKind::ALL.into_iter().filter(move |k| self.has(*k))
    }
}

impl FromIterator<ExceptionKind> for ExceptionVector {
    fn from_iter<I: IntoIterator<Item = ExceptionKind>>(iter: I) -> Self {
        let mut v = Self::NONE;
        for k in iter {
            v.raise(k);
        }
        v
    }
}

/// An exception as surfaced on the commit port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadException {
    /// What went wrong.
    pub kind: ExceptionKind,
    /// Faulting virtual address.
    pub vaddr: u64,
}

impl fmt::Display for LoadException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:#x})", self.kind, self.vaddr)
    }
}

impl std::error::Error for LoadException {}

/// Errors produced by the model itself.
#[derive(Debug, Error)]
pub enum LoadPipeError {
    /// A configuration value is out of range.
    #[error("invalid configuration: {field}: {reason}")]
    InvalidConfig {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The configuration document could not be parsed.
    #[error("failed to parse configuration")]
    ConfigParse(#[from] serde_json::Error),
}
