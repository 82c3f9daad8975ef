//! Stage0: address generation and query issue.
//!
//! The arbitration winner owns the translation and cache query ports for this
//! cycle. Translation-exempt requests that already hold a physical address
//! skip the translator; every request gets the index half of its cache access.

use tracing::trace;

use crate::common::AccessKind;
use crate::core::pipeline::latches::{PendingAccess, S1Slot};
use crate::core::pipeline::request::{LoadRequest, RequestSource};
use crate::core::ports::{TranslationQuery, Translator};

/// Issues the queries for a granted request and builds its Stage1 slot.
///
/// # Arguments
///
/// * `source` - Source the request was granted from.
/// * `req` - Normalized request.
/// * `chase_base` - Speculative base value used to form a chained address.
/// * `tlb` - Translator port.
pub fn stage0<T: Translator + ?Sized>(
    source: RequestSource,
    req: LoadRequest,
    chase_base: Option<u64>,
    tlb: &mut T,
) -> S1Slot {
    let exempt = source.is_translation_exempt() && req.paddr.is_some();
    let tlb_resp = if exempt {
        None
    } else {
        let kind = if req.flags.prefetch {
            AccessKind::Prefetch
        } else {
            AccessKind::Load
        };
        Some(tlb.translate(&TranslationQuery {
            age: req.age,
            vaddr: req.vaddr,
            kind,
        }))
    };
    trace!(
        age = req.age.0,
        vaddr = req.vaddr.val(),
        mask = req.mask,
        translated = !exempt,
        "S0"
    );
    S1Slot {
        access: PendingAccess::of(&req),
        req,
        tlb: tlb_resp,
        chase_base,
    }
}
