//! Load operation and byte-mask definitions.
//!
//! This module defines how a load names its width and extension, and how a
//! width plus address turns into a per-byte mask inside a 16-byte bank.

use super::constants::{BANK_BYTES, FULL_BANK_MASK};

/// Width of a memory access.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MemWidth {
    /// 1 byte.
    Byte,
    /// 2 bytes.
    Half,
    /// 4 bytes.
    Word,
    /// 8 bytes.
    #[default]
    Double,
    /// 16 bytes (wide/vector access, one full bank).
    Quad,
}

impl MemWidth {
    /// Number of bytes moved by an access of this width.
    #[inline]
    pub const fn bytes(self) -> u64 {
        match self {
            Self::Byte => 1,
            Self::Half => 2,
            Self::Word => 4,
            Self::Double => 8,
            Self::Quad => 16,
        }
    }
}

/// Decoded load operation.
///
/// Signed variants sign-extend the selected bytes to 64 bits, unsigned
/// variants zero-extend. `Lq` is the wide (vector-lane) access whose
/// formatting is left to the consumer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LoadOp {
    /// Load byte, sign-extended.
    Lb,
    /// Load halfword, sign-extended.
    Lh,
    /// Load word, sign-extended.
    Lw,
    /// Load doubleword.
    #[default]
    Ld,
    /// Load byte, zero-extended.
    Lbu,
    /// Load halfword, zero-extended.
    Lhu,
    /// Load word, zero-extended.
    Lwu,
    /// Load a full 16-byte bank.
    Lq,
}

impl LoadOp {
    /// Access width of the operation.
    pub const fn width(self) -> MemWidth {
        match self {
            Self::Lb | Self::Lbu => MemWidth::Byte,
            Self::Lh | Self::Lhu => MemWidth::Half,
            Self::Lw | Self::Lwu => MemWidth::Word,
            Self::Ld => MemWidth::Double,
            Self::Lq => MemWidth::Quad,
        }
    }

    /// Returns true if the loaded value is sign-extended.
    pub const fn is_signed(self) -> bool {
        matches!(self, Self::Lb | Self::Lh | Self::Lw)
    }

    /// Returns true for the plain doubleword load, the only operation the
    /// pointer-chase fast path may speculate on.
    pub const fn is_plain(self) -> bool {
        matches!(self, Self::Ld)
    }

    /// Returns true for the wide (16-byte) access.
    pub const fn is_wide(self) -> bool {
        matches!(self, Self::Lq)
    }
}

/// Kind of access presented to the translator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AccessKind {
    /// Demand load.
    #[default]
    Load,
    /// Hardware prefetch (never faults, never replays).
    Prefetch,
}

/// Generates the byte mask of an access relative to its 16-byte bank.
///
/// Bytes that would fall past the end of the bank are dropped; callers detect
/// that case with [`crosses_bank`] before relying on the mask.
///
/// # Arguments
///
/// * `addr` - Byte address of the access.
/// * `width` - Access width.
///
/// # Returns
///
/// Bit `i` is set when byte `i` of the bank is read.
pub const fn gen_mask(addr: u64, width: MemWidth) -> u16 {
    let bytes = width.bytes();
    let lanes: u32 = if bytes >= BANK_BYTES {
        FULL_BANK_MASK as u32
    } else {
        (1u32 << bytes) - 1
    };
    let shifted = lanes << (addr & (BANK_BYTES - 1));
    (shifted & FULL_BANK_MASK as u32) as u16
}

/// Returns true if an access of `width` at `addr` touches two banks.
pub const fn crosses_bank(addr: u64, width: MemWidth) -> bool {
    (addr & (BANK_BYTES - 1)) + width.bytes() > BANK_BYTES
}
