//! Physical and Virtual Address types.
//!
//! This module defines strong types for physical and virtual addresses so the
//! pipeline cannot hand an untranslated address to a physical-address consumer.
//! It provides the following:
//! 1. **Type Safety:** Distinguishes between virtual and physical address spaces at compile time.
//! 2. **Bank Geometry:** Helpers for the 16-byte data bank and cache-line views of an address.
//! 3. **Coverage Matching:** Granule comparison used by the hazard detector.

use super::constants::BANK_BYTES;

/// A virtual address as produced by address generation.
///
/// Virtual addresses must be translated before they can be compared against
/// store addresses or handed to the cache tag check.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtAddr(pub u64);

/// A physical address as returned by the translator.
///
/// Hazard checks, forwarding queries and cache tag compares only ever see
/// physical addresses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhysAddr(pub u64);

impl VirtAddr {
    /// Creates a new virtual address from a raw 64-bit value.
    #[inline(always)]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit address value.
    #[inline(always)]
    pub const fn val(self) -> u64 {
        self.0
    }

    /// Byte offset of the address inside its 16-byte data bank.
    #[inline]
    pub const fn bank_offset(self) -> u64 {
        self.0 & (BANK_BYTES - 1)
    }

    /// Adds a signed displacement, wrapping at the top of the address space.
    #[inline]
    pub const fn offset(self, imm: i64) -> Self {
        Self(self.0.wrapping_add_signed(imm))
    }
}

impl PhysAddr {
    /// Creates a new physical address from a raw 64-bit value.
    #[inline(always)]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit address value.
    #[inline(always)]
    pub const fn val(self) -> u64 {
        self.0
    }

    /// Byte offset of the address inside its 16-byte data bank.
    #[inline]
    pub const fn bank_offset(self) -> u64 {
        self.0 & (BANK_BYTES - 1)
    }

    /// Returns true if both addresses fall in the same `1 << shift` byte granule.
    ///
    /// # Arguments
    ///
    /// * `other` - The address to compare against.
    /// * `shift` - log2 of the granule size (3 = doubleword, 4 = bank, 6 = 64-byte line).
    #[inline]
    pub const fn same_granule(self, other: Self, shift: u32) -> bool {
        (self.0 >> shift) == (other.0 >> shift)
    }
}

impl std::fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl std::fmt::Display for VirtAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
