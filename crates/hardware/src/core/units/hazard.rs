//! Store-to-load ordering hazard detection.
//!
//! A load that has already read memory is in danger when an older store to an
//! overlapping address resolves after it. The store pipeline broadcasts one
//! [`StoreHazardQuery`] per active store each cycle and this module decides
//! whether any of them invalidates a given load. It provides:
//! 1. **Coverage Matching:** Cache-line, bank, or doubleword comparison chosen by priority.
//! 2. **Detection:** The pure violation predicate.
//! 3. **Two-Phase Checks:** Provisional (Stage1) and final (Stage2) evaluation.

use crate::common::constants::{BANK_SHIFT, WORD_SHIFT};
use crate::common::PhysAddr;
use crate::core::pipeline::request::Age;

/// Address granule used to compare a store query against a load.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Granularity {
    /// Native doubleword.
    Word,
    /// 16-byte bank.
    Bank,
    /// Whole cache line.
    Line,
}

impl Granularity {
    /// log2 of the granule size, given the line shift.
    pub const fn shift(self, line_shift: u32) -> u32 {
        match self {
            Self::Word => WORD_SHIFT,
            Self::Bank => BANK_SHIFT,
            Self::Line => line_shift,
        }
    }
}

/// Hazard query broadcast by a store in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreHazardQuery {
    /// Store age.
    pub age: Age,
    /// Physical address.
    pub paddr: PhysAddr,
    /// Bytes written within the bank.
    pub mask: u16,
    /// Wide (16-byte) store.
    pub wide: bool,
    /// The store covers its whole cache line (e.g. a block zero).
    pub full_line: bool,
}

/// Load side of a hazard comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadProbe {
    /// Load age.
    pub age: Age,
    /// Physical address.
    pub paddr: PhysAddr,
    /// Bytes read within the bank.
    pub mask: u16,
    /// Wide (16-byte) load.
    pub wide: bool,
}

/// Hazard status carried by a request between stages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HazardState {
    /// No violation observed.
    #[default]
    Clear,
    /// A violating older store was observed.
    Violation,
    /// The physical address was not known; the next attempt decides.
    Undetermined,
}

impl HazardState {
    /// Returns true for [`HazardState::Violation`].
    #[inline]
    pub const fn is_violation(self) -> bool {
        matches!(self, Self::Violation)
    }
}

/// Chooses the coverage granule for a store/load pair.
///
/// Line match takes precedence over bank match (either side wide), which
/// takes precedence over doubleword match.
pub const fn granularity(store: &StoreHazardQuery, load: &LoadProbe) -> Granularity {
    if store.full_line {
        Granularity::Line
    } else if store.wide || load.wide {
        Granularity::Bank
    } else {
        Granularity::Word
    }
}

/// Returns true if `store` invalidates `load`.
///
/// The store must be strictly older, the granules must match, and the byte
/// masks must intersect. A full-line store covers every byte of its line, so
/// the mask test is skipped for [`Granularity::Line`].
pub const fn violates(store: &StoreHazardQuery, load: &LoadProbe, line_shift: u32) -> bool {
    if !store.age.is_older_than(load.age) {
        return false;
    }
    let g = granularity(store, load);
    if !store.paddr.same_granule(load.paddr, g.shift(line_shift)) {
        return false;
    }
    matches!(g, Granularity::Line) || store.mask & load.mask != 0
}

/// Returns true if any query invalidates `load`.
pub fn detect(load: &LoadProbe, queries: &[StoreHazardQuery], line_shift: u32) -> bool {
    queries.iter().any(|q| violates(q, load, line_shift))
}

/// Stage1 check, usable only once the physical address is known.
///
/// # Arguments
///
/// * `load` - The probe, or `None` when translation missed.
/// * `queries` - Store queries visible this cycle.
/// * `line_shift` - log2 of the cache line size.
///
/// # Returns
///
/// [`HazardState::Undetermined`] without a physical address, otherwise
/// whether a violation was seen.
pub fn provisional(
    load: Option<&LoadProbe>,
    queries: &[StoreHazardQuery],
    line_shift: u32,
) -> HazardState {
    match load {
        None => HazardState::Undetermined,
        Some(p) if detect(p, queries, line_shift) => HazardState::Violation,
        Some(_) => HazardState::Clear,
    }
}

/// Stage2 check, folding in the Stage1 verdict and any flag carried from an
/// earlier replay.
pub fn final_check(
    load: Option<&LoadProbe>,
    queries: &[StoreHazardQuery],
    line_shift: u32,
    stage1: HazardState,
    carried: bool,
) -> bool {
    let now = load.is_some_and(|p| detect(p, queries, line_shift));
    now || stage1.is_violation() || carried
}
