//! External collaborator interfaces.
//!
//! The load pipeline does not model translation, the cache hierarchy, the
//! store pipeline's queues or the replay storage. It talks to them through the
//! traits in this module:
//! 1. **Translator:** Virtual-to-physical translation with miss and fault flags.
//! 2. **Data Cache:** Tag/data lookup with structural failure flags and a late error.
//! 3. **Forward Network:** Byte contributions from store and refill buffers.
//! 4. **Access Policy:** Protection verdict and debug trigger match.
//! 5. **Ordering Queues:** Load-side registration with the RAR/RAW hazard queues.
//! 6. **Replay Sink:** Queued replay, misalignment split and uncached hand-off.

use crate::common::{AccessKind, PhysAddr, VirtAddr};
use crate::core::pipeline::request::{Age, LoadRequest, ReplayCarry};
use crate::core::units::forward::{ForwardQuery, ForwardResponses};
use crate::core::units::replay::ReplayRecord;

/// Translation request issued from Stage0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TranslationQuery {
    /// Requesting load.
    pub age: Age,
    /// Address to translate.
    pub vaddr: VirtAddr,
    /// Access kind.
    pub kind: AccessKind,
}

/// Translation response latched into Stage1.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TranslationResponse {
    /// Translated address; meaningless when `miss` is set.
    pub paddr: PhysAddr,
    /// The translation is not available yet; the load must wait for a refill.
    pub miss: bool,
    /// Page fault.
    pub page_fault: bool,
    /// Access fault raised during the walk.
    pub access_fault: bool,
    /// Page attributes mark the target as MMIO.
    pub mmio: bool,
    /// Page attributes mark the target as non-cacheable memory.
    pub non_cacheable: bool,
}

impl TranslationResponse {
    /// A successful translation to `paddr`.
    pub const fn hit(paddr: u64) -> Self {
        Self {
            paddr: PhysAddr(paddr),
            miss: false,
            page_fault: false,
            access_fault: false,
            mmio: false,
            non_cacheable: false,
        }
    }

    /// A translation miss.
    pub const fn miss() -> Self {
        Self {
            paddr: PhysAddr(0),
            miss: true,
            page_fault: false,
            access_fault: false,
            mmio: false,
            non_cacheable: false,
        }
    }
}

/// Cache access built in Stage0 and completed with the physical address in Stage1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheQuery {
    /// Requesting load.
    pub age: Age,
    /// Index address.
    pub vaddr: VirtAddr,
    /// Tag address.
    pub paddr: PhysAddr,
    /// Bytes read within the bank.
    pub mask: u16,
    /// Prefetch access (fills without returning data).
    pub is_prefetch: bool,
    /// Token from the previous attempt.
    pub carry: ReplayCarry,
}

/// Cache response latched into Stage2.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheResponse {
    /// Line present.
    pub hit: bool,
    /// Bank data, valid on a hit.
    pub data: [u8; 16],
    /// Structural refusal (e.g. MSHR or port unavailable).
    pub nack: bool,
    /// Lost a bank arbitration.
    pub bank_conflict: bool,
    /// Way predictor picked the wrong way.
    pub way_mispredict: bool,
    /// Token for the next attempt.
    pub carry: ReplayCarry,
    /// Miss-handling slot tracking the refill, on a miss.
    pub mshr_id: Option<u8>,
}

impl CacheResponse {
    /// A clean hit returning `data`.
    pub const fn hit(data: [u8; 16]) -> Self {
        Self {
            hit: true,
            data,
            nack: false,
            bank_conflict: false,
            way_mispredict: false,
            carry: ReplayCarry { valid: false, way: 0 },
            mshr_id: None,
        }
    }

    /// A miss allocated to `mshr`.
    pub const fn miss(mshr: u8) -> Self {
        Self {
            hit: false,
            data: [0; 16],
            nack: false,
            bank_conflict: false,
            way_mispredict: false,
            carry: ReplayCarry { valid: false, way: 0 },
            mshr_id: Some(mshr),
        }
    }
}

/// Result of registering a load with the ordering hazard queues.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OrderingAck {
    /// Read-after-read queue full.
    pub rar_nack: bool,
    /// Read-after-write queue full.
    pub raw_nack: bool,
}

/// Load-side hazard query submitted to the store pipeline's ordering queues.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadHazardQuery {
    /// Load age.
    pub age: Age,
    /// Physical address.
    pub paddr: PhysAddr,
    /// Bytes read within the bank.
    pub mask: u16,
    /// Data was obtained (hit or full forward); the queues may track it as completed.
    pub data_valid: bool,
}

/// Virtual-to-physical translation.
pub trait Translator {
    /// Translates one query. Called at most once per cycle.
    fn translate(&mut self, query: &TranslationQuery) -> TranslationResponse;
}

/// First-level data cache.
pub trait DataCache {
    /// Performs the tag/data access. Called at most once per cycle.
    fn access(&mut self, query: &CacheQuery) -> CacheResponse;

    /// Reports a hardware error detected one cycle after the response for `age`.
    fn delayed_error(&mut self, age: Age) -> bool {
        let _ = age;
        false
    }
}

/// Store queue, store buffer, miss buffer and refill network forwarding.
pub trait ForwardNetwork {
    /// Collects every source's contribution for the query.
    fn forward(&mut self, query: &ForwardQuery) -> ForwardResponses;
}

/// Physical memory protection and debug triggers.
pub trait AccessPolicy {
    /// Protection verdict for a load of `paddr`.
    fn permits(&self, paddr: PhysAddr) -> bool;

    /// Debug trigger match on the load's virtual address.
    fn breakpoint(&self, vaddr: VirtAddr) -> bool {
        let _ = vaddr;
        false
    }
}

/// Load-side registration with the ordering hazard queues.
pub trait OrderingQueues {
    /// Registers a load; reports which queue refused it.
    fn register_load(&mut self, query: &LoadHazardQuery) -> OrderingAck;
}

/// Destinations for requests that leave the pipeline without committing.
pub trait ReplaySink {
    /// Records a request in the queued-replay store.
    fn enqueue_replay(&mut self, record: ReplayRecord);

    /// Hands a misaligned request to the misalignment handler.
    /// Returns false if the handler cannot take it this cycle.
    fn enqueue_misalign(&mut self, request: LoadRequest) -> bool;

    /// Hands an uncached request to the uncached access path.
    fn enqueue_uncached(&mut self, request: LoadRequest);
}

/// Everything the load pipeline needs from its surroundings.
pub trait LoadEnvironment:
    Translator + DataCache + ForwardNetwork + AccessPolicy + OrderingQueues + ReplaySink
{
}

impl<T> LoadEnvironment for T where
    T: Translator + DataCache + ForwardNetwork + AccessPolicy + OrderingQueues + ReplaySink
{
}
