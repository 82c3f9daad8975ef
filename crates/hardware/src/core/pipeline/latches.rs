//! Stage slots for the load pipeline.
//!
//! Each slot holds one [`LoadRequest`] plus the state derived for it by the
//! stages it has passed through:
//! 1. **Stage1 Slot:** Translation response and the pending cache access.
//! 2. **Stage2 Slot:** Cache response, forwarding answers and first-pass causes.
//! 3. **Stage3 Slot:** Merged data, accumulated causes and the wakeup record.

use crate::common::{PhysAddr, VirtAddr};
use crate::core::pipeline::request::{Age, LoadRequest, ReplayCarry};
use crate::core::pipeline::signals::Redirect;
use crate::core::pipeline::traits::PipelineLatch;
use crate::core::ports::{CacheQuery, CacheResponse, TranslationResponse};
use crate::core::units::forward::{ForwardMerge, ForwardResponses};
use crate::core::units::hazard::HazardState;
use crate::core::units::replay::RawCauses;

/// Cache access whose index half was built in Stage0.
///
/// The tag half needs the physical address and is supplied in Stage1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingAccess {
    /// Requesting load.
    pub age: Age,
    /// Index address.
    pub vaddr: VirtAddr,
    /// Bytes read within the bank.
    pub mask: u16,
    /// Prefetch access.
    pub is_prefetch: bool,
    /// Token from the previous attempt.
    pub carry: ReplayCarry,
}

impl PendingAccess {
    /// Builds the index half for `req`.
    pub const fn of(req: &LoadRequest) -> Self {
        Self {
            age: req.age,
            vaddr: req.vaddr,
            mask: req.mask,
            is_prefetch: req.flags.prefetch,
            carry: req.carry,
        }
    }

    /// Completes the access with the translated address.
    pub const fn with_paddr(self, paddr: PhysAddr) -> CacheQuery {
        CacheQuery {
            age: self.age,
            vaddr: self.vaddr,
            paddr,
            mask: self.mask,
            is_prefetch: self.is_prefetch,
            carry: self.carry,
        }
    }
}

/// Occupant of Stage1.
#[derive(Clone, Debug)]
pub struct S1Slot {
    /// The request.
    pub req: LoadRequest,
    /// Translation response; `None` for translation-exempt requests.
    pub tlb: Option<TranslationResponse>,
    /// Cache access waiting for its physical address.
    pub access: PendingAccess,
    /// Speculative base the address was formed from, for chained loads.
    pub chase_base: Option<u64>,
}

/// Occupant of Stage2.
#[derive(Clone, Debug)]
pub struct S2Slot {
    /// The request.
    pub req: LoadRequest,
    /// Cache response; `None` when the cache was not accessed.
    pub cache: Option<CacheResponse>,
    /// Forwarding answers gathered in Stage1.
    pub forward: ForwardResponses,
    /// Causes raised so far.
    pub raw: RawCauses,
    /// Stage1 hazard verdict, refined while the slot waits.
    pub hazard: HazardState,
}

/// Occupant of Stage3.
#[derive(Clone, Debug)]
pub struct S3Slot {
    /// The request.
    pub req: LoadRequest,
    /// Every cause raised for this attempt.
    pub raw: RawCauses,
    /// Cache data with forwarded bytes overlaid.
    pub bank: [u8; 16],
    /// Merged forwarding result.
    pub forward: ForwardMerge,
    /// The cache was accessed and may still report a delayed error.
    pub accessed: bool,
    /// An ordering violation was observed while the slot sat in Stage3.
    pub late_nuke: bool,
    /// An early wakeup was sent from Stage2.
    pub woke: bool,
}

macro_rules! impl_latch {
    ($slot:ty) => {
        impl PipelineLatch for Option<$slot> {
            fn age(&self) -> Option<Age> {
                self.as_ref().map(|s| s.req.age)
            }

            fn flush(&mut self, redirects: &[Option<Redirect>]) -> bool {
                let kill = self.as_ref().is_some_and(|s| {
                    crate::core::pipeline::signals::needs_flush(s.req.age, redirects)
                });
                if kill {
                    *self = None;
                }
                kill
            }

            fn is_empty(&self) -> bool {
                self.is_none()
            }

        }
    };
}

impl_latch!(S1Slot);
impl_latch!(S2Slot);
impl_latch!(S3Slot);
