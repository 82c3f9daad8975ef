//! Stage slot interface.
//!
//! Every stage slot supports the same control operations regardless of the
//! state it carries. It provides:
//! 1. **Occupancy:** Whether the slot holds a request and its age.
//! 2. **Flush:** Age-based discard against the announced redirects.

use crate::core::pipeline::request::Age;
use crate::core::pipeline::signals::Redirect;

/// Represents a stage slot (a single-entry latch).
///
/// Slots hold one request as it moves between stages. They support
/// redirect-driven flushing.
pub trait PipelineLatch {
    /// Age of the occupant, if any.
    fn age(&self) -> Option<Age>;

    /// Discards the occupant if any of `redirects` kills it.
    ///
    /// # Arguments
    ///
    /// * `redirects` - Current and, where applicable, delayed redirects.
    ///
    /// # Returns
    ///
    /// `true` if an occupant was discarded.
    fn flush(&mut self, redirects: &[Option<Redirect>]) -> bool;

    /// Checks if the slot is empty.
    fn is_empty(&self) -> bool;
}
