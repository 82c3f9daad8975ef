//! Load pipeline geometry constants.
//!
//! The data path is organised around a 16-byte bank: byte masks, forwarding
//! contributions and cache read data are all expressed relative to the bank
//! that holds the access.

/// Width of one data bank in bytes.
pub const BANK_BYTES: u64 = 16;

/// log2 of [`BANK_BYTES`].
pub const BANK_SHIFT: u32 = 4;

/// log2 of the native doubleword granule used for word-granularity hazard matches.
pub const WORD_SHIFT: u32 = 3;

/// Byte mask covering a whole bank.
pub const FULL_BANK_MASK: u16 = 0xFFFF;

/// Number of bits in the pointer-chase immediate field.
pub const CHASE_IMM_BITS: u32 = 12;
