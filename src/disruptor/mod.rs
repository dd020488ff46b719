//! Lock-free event transport: a broadcast ring buffer for market data and a
//! bounded MPSC queue for order requests, built on the same sequence-and-barrier
//! primitives LMAX Disruptor implementations use.
//!
//! ## Architecture
//!
//! - [`RingBuffer`] is single-producer/multi-consumer: every registered consumer
//!   sees every published event, gated by its own independent sequence.
//! - [`SequenceBarrier`] is how a consumer waits for the producer to advance,
//!   using a busy-spin-then-backoff strategy that never sleeps.
//! - [`MpscQueue`] is multi-producer/single-consumer, used for the order path
//!   where many strategy threads submit and one OEMS thread drains.

pub mod ring_buffer;
pub mod wait_strategy;
pub mod mpsc_queue;

pub use ring_buffer::RingBuffer;
pub use wait_strategy::SequenceBarrier;
pub use mpsc_queue::MpscQueue;

use std::sync::atomic::AtomicU64;

use crossbeam::utils::CachePadded;

/// Sequence number type: a monotonically non-decreasing slot identifier.
/// Slot index = `sequence & (capacity - 1)`.
pub type Sequence = u64;

/// Sentinel meaning "nothing published/consumed yet". Chosen over a signed
/// `-1` because every cursor in this crate is a `u64` so it can be compared
/// and CAS'd directly against `AtomicU64` without a sign-extension step.
pub const SEQUENCE_NONE: Sequence = u64::MAX;

/// Trait for values that can live in a ring slot.
///
/// `sequence()`/`set_sequence()`/`reset()` are bookkeeping hooks the ring
/// uses to detect stale slots after a wrap; they are independent of any
/// sequence meaning the value itself assigns to its own fields.
pub trait RingBufferEntry: Clone + Default + Send + Sync + 'static {
    /// Get the bookkeeping sequence stamped into this slot
    fn sequence(&self) -> Sequence;

    /// Set the bookkeeping sequence stamped into this slot
    fn set_sequence(&mut self, seq: Sequence);

    /// Reset the slot to its default state before reuse
    fn reset(&mut self);
}

/// A cache-line padded atomic sequence counter, used for every producer and
/// consumer cursor in the ring/queue so that independent cursors never share
/// a cache line (false sharing would otherwise dominate at this throughput).
pub struct PaddedSequence {
    pub value: CachePadded<AtomicU64>,
}

impl PaddedSequence {
    pub fn new(initial: u64) -> Self {
        Self {
            value: CachePadded::new(AtomicU64::new(initial)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_padded_sequence_alignment() {
        assert!(std::mem::align_of::<PaddedSequence>() >= 64);
    }

    #[test]
    fn test_padded_sequence_roundtrip() {
        let seq = PaddedSequence::new(SEQUENCE_NONE);
        assert_eq!(seq.value.load(Ordering::Relaxed), u64::MAX);
        seq.value.store(5, Ordering::Relaxed);
        assert_eq!(seq.value.load(Ordering::Relaxed), 5);
    }
}
