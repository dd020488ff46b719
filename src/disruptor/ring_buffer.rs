//! Single-producer/multi-consumer broadcast ring buffer.
//!
//! Every registered consumer sees every published event, independently gated
//! by its own sequence; the single producer is gated by the slowest consumer
//! still registered, so it never overwrites a slot a consumer hasn't read yet
//! *unless that consumer has fallen behind by more than the ring's capacity*,
//! in which case the data is lost for that consumer (see module docs on the
//! engine's error-handling taxonomy for why this is accepted rather than
//! buffered or retried).

use std::sync::atomic::Ordering;

use crate::disruptor::{ PaddedSequence, RingBufferEntry, Sequence, SEQUENCE_NONE };
use crate::error::{ EngineError, Result };

/// Fixed-capacity, cache-aligned SPMC ring buffer.
///
/// `N` must be a power of two; this is asserted in [`RingBuffer::new`] rather
/// than at the type level because const-generic `where` bounds on arithmetic
/// predicates aren't expressible on stable Rust.
pub struct RingBuffer<T: RingBufferEntry, const N: usize> {
    slots: Box<[T]>,
    mask: usize,
    producer_cursor: PaddedSequence,
    consumer_cursors: Vec<PaddedSequence>,
}

impl<T: RingBufferEntry, const N: usize> RingBuffer<T, N> {
    /// Create a ring with `num_consumers` independent broadcast readers.
    pub fn new(num_consumers: usize) -> Result<Self> {
        if N == 0 || !N.is_power_of_two() {
            return Err(EngineError::config("ring capacity must be a non-zero power of two"));
        }
        if num_consumers == 0 {
            return Err(EngineError::config("ring buffer needs at least one consumer"));
        }

        let slots = (0..N).map(|_| T::default()).collect::<Vec<_>>().into_boxed_slice();
        let consumer_cursors = (0..num_consumers)
            .map(|_| PaddedSequence::new(SEQUENCE_NONE))
            .collect();

        Ok(Self {
            slots,
            mask: N - 1,
            producer_cursor: PaddedSequence::new(SEQUENCE_NONE),
            consumer_cursors,
        })
    }

    /// Ring capacity (power of two).
    pub fn capacity(&self) -> usize {
        N
    }

    pub fn consumer_count(&self) -> usize {
        self.consumer_cursors.len()
    }

    /// Producer-side: the next sequence this (single) producer should claim.
    pub fn next_sequence(&self) -> Sequence {
        let current = self.producer_cursor.value.load(Ordering::Relaxed);
        if current == SEQUENCE_NONE { 0 } else { current + 1 }
    }

    /// Producer-side: mutable access to the slot that will hold `seq`.
    ///
    /// # Safety contract
    /// Only the single producer thread may call this, and only for the
    /// sequence returned by the most recent [`RingBuffer::next_sequence`]
    /// call that hasn't yet been published.
    #[allow(clippy::mut_from_ref)]
    pub fn claim(&self, seq: Sequence) -> &mut T {
        let idx = (seq as usize) & self.mask;
        let ptr = self.slots.as_ptr().wrapping_add(idx) as *mut T;
        unsafe { &mut *ptr }
    }

    /// Producer-side: publish `seq`, releasing all prior writes to its slot
    /// to every consumer that subsequently loads the cursor with acquire.
    pub fn publish(&self, seq: Sequence) {
        self.producer_cursor.value.store(seq, Ordering::Release);
    }

    /// The highest published sequence, visible to any consumer.
    pub fn cursor(&self) -> Sequence {
        self.producer_cursor.value.load(Ordering::Acquire)
    }

    /// Read-only access to slot `seq`. Caller must have already observed
    /// `cursor() >= seq` via an acquire load (the barrier does this).
    pub fn get(&self, seq: Sequence) -> &T {
        let idx = (seq as usize) & self.mask;
        &self.slots[idx]
    }

    /// Consumer-side: this consumer's own progress.
    pub fn consumer_sequence(&self, consumer_id: usize) -> Sequence {
        self.consumer_cursors[consumer_id].value.load(Ordering::Acquire)
    }

    /// Consumer-side: record that `consumer_id` has now consumed through `seq`.
    pub fn set_consumer_sequence(&self, consumer_id: usize, seq: Sequence) {
        self.consumer_cursors[consumer_id].value.store(seq, Ordering::Release);
    }

    /// The slowest consumer's sequence; the producer must never publish past
    /// this plus capacity without losing that consumer's unread data.
    pub fn minimum_consumer_sequence(&self) -> Sequence {
        self.consumer_cursors
            .iter()
            .map(|c| c.value.load(Ordering::Acquire))
            .min()
            .unwrap_or(SEQUENCE_NONE)
    }

    /// Free slots remaining for a consumer at `consumer_seq`, from the
    /// producer's point of view.
    pub fn available_capacity(&self, consumer_seq: Sequence) -> usize {
        let producer = self.cursor();
        if producer == SEQUENCE_NONE {
            return N;
        }
        let consumed = if consumer_seq == SEQUENCE_NONE { 0 } else { consumer_seq + 1 };
        N.saturating_sub((producer + 1 - consumed) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MarketEvent;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[test]
    fn test_publish_and_single_consumer_observe() {
        let ring: RingBuffer<MarketEvent, 16> = RingBuffer::new(1).unwrap();
        let seq = ring.next_sequence();
        assert_eq!(seq, 0);
        *ring.claim(seq) = MarketEvent::ticker(1, 0, 1, 100.0, 99.0, 101.0);
        ring.publish(seq);

        assert_eq!(ring.cursor(), 0);
        let ev = ring.get(0);
        assert_eq!(ev.last_price, 100.0);
    }

    #[test]
    fn test_broadcast_to_multiple_consumers() {
        let ring: RingBuffer<MarketEvent, 16> = RingBuffer::new(3).unwrap();
        for i in 0..5u64 {
            let seq = ring.next_sequence();
            *ring.claim(seq) = MarketEvent::ticker(i as i64, 0, 1, i as f64, i as f64, i as f64);
            ring.publish(seq);
        }

        for consumer in 0..3 {
            for i in 0..5u64 {
                let ev = ring.get(i);
                assert_eq!(ev.last_price, i as f64);
            }
            ring.set_consumer_sequence(consumer, 4);
        }
        assert_eq!(ring.minimum_consumer_sequence(), 4);
    }

    #[test]
    fn test_available_capacity_shrinks_with_lag() {
        let ring: RingBuffer<MarketEvent, 8> = RingBuffer::new(1).unwrap();
        assert_eq!(ring.available_capacity(SEQUENCE_NONE), 8);
        for i in 0..4u64 {
            let seq = ring.next_sequence();
            *ring.claim(seq) = MarketEvent::default();
            ring.publish(seq);
        }
        // consumer hasn't advanced: 4 published, 4 slots still free
        assert_eq!(ring.available_capacity(SEQUENCE_NONE), 4);
    }

    #[test]
    fn test_concurrent_consumers_see_same_order() {
        const N: usize = 1024;
        let ring: Arc<RingBuffer<MarketEvent, N>> = Arc::new(RingBuffer::new(2).unwrap());
        let mismatches = Arc::new(AtomicUsize::new(0));

        let producer_ring = ring.clone();
        let producer = thread::spawn(move || {
            for i in 0..2000u64 {
                let seq = producer_ring.next_sequence();
                *producer_ring.claim(seq) = MarketEvent::ticker(
                    i as i64,
                    0,
                    1,
                    i as f64,
                    i as f64,
                    i as f64
                );
                producer_ring.publish(seq);
            }
        });

        let mut consumers = Vec::new();
        for consumer_id in 0..2 {
            let ring = ring.clone();
            let mismatches = mismatches.clone();
            consumers.push(
                thread::spawn(move || {
                    let mut next = 0u64;
                    while next < 2000 {
                        let available = ring.cursor();
                        if available == SEQUENCE_NONE {
                            continue;
                        }
                        while next <= available {
                            let ev = ring.get(next);
                            if ev.last_price != next as f64 {
                                mismatches.fetch_add(1, Ordering::Relaxed);
                            }
                            ring.set_consumer_sequence(consumer_id, next);
                            next += 1;
                        }
                    }
                })
            );
        }

        producer.join().unwrap();
        for c in consumers {
            c.join().unwrap();
        }
        assert_eq!(mismatches.load(Ordering::Relaxed), 0);
    }
}
