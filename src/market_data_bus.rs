//! Typed façade over the broadcast ring buffer: the one surface ingestors
//! publish through and strategies/logger consume through.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::constants::DEFAULT_RING_CAPACITY;
use crate::disruptor::ring_buffer::RingBuffer;
use crate::disruptor::wait_strategy::SequenceBarrier;
use crate::disruptor::{ Sequence, SEQUENCE_NONE };
use crate::error::{ EngineError, Result };
use crate::events::MarketEvent;

/// `N` is the ring capacity; see [`crate::constants::DEFAULT_RING_CAPACITY`]
/// for the default the engine builds with.
pub struct MarketDataBus<const N: usize = DEFAULT_RING_CAPACITY> {
    ring: Arc<RingBuffer<MarketEvent, N>>,
    barrier: Arc<SequenceBarrier<MarketEvent, N>>,
    num_consumers: usize,
    next_consumer_id: std::sync::atomic::AtomicUsize,
}

impl<const N: usize> MarketDataBus<N> {
    /// `num_consumers` must account for every strategy group *and* the
    /// logger — the logger is an ordinary registered consumer, never a
    /// bypass into ring storage.
    pub fn new(num_consumers: usize) -> Result<Self> {
        let ring = Arc::new(RingBuffer::new(num_consumers)?);
        let alert = Arc::new(AtomicBool::new(false));
        let barrier = Arc::new(SequenceBarrier::new(ring.clone(), alert));
        Ok(Self {
            ring,
            barrier,
            num_consumers,
            next_consumer_id: std::sync::atomic::AtomicUsize::new(0),
        })
    }

    /// Hand out the next unused consumer id. Must be called before `start()`
    /// for every strategy group and the logger; calling it more than
    /// `num_consumers` times is a configuration error.
    pub fn register_consumer(&self) -> Result<usize> {
        let id = self.next_consumer_id.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if id >= self.num_consumers {
            return Err(
                EngineError::config(
                    format!("registered more consumers ({}) than bus was sized for ({})", id + 1, self.num_consumers)
                )
            );
        }
        Ok(id)
    }

    /// Producer-side: claim the next slot to write into.
    pub fn next(&self) -> Sequence {
        self.ring.next_sequence()
    }

    /// Producer-side: write access to the slot claimed by `next()`.
    pub fn slot(&self, seq: Sequence) -> &mut MarketEvent {
        self.ring.claim(seq)
    }

    /// Producer-side: make the event at `seq` visible to every consumer.
    pub fn publish(&self, seq: Sequence) {
        self.ring.publish(seq);
    }

    /// Convenience one-shot publish for the common ticker case.
    pub fn publish_ticker(
        &self,
        timestamp_ns: i64,
        exchange_id: u8,
        symbol_id: u16,
        last_price: f64,
        bid_price: f64,
        ask_price: f64
    ) -> Sequence {
        let seq = self.next();
        let mut event = MarketEvent::ticker(
            timestamp_ns,
            exchange_id,
            symbol_id,
            last_price,
            bid_price,
            ask_price
        );
        event.sequence = seq as u32;
        *self.slot(seq) = event;
        self.publish(seq);
        seq
    }

    /// If `target` names a sequence the producer has already overwritten
    /// (the consumer lagged by more than the ring's capacity), jump forward
    /// to the oldest sequence still present in the ring rather than reading
    /// slots whose content no longer matches their nominal sequence. The
    /// skipped events are the data loss spec.md's error-handling design
    /// accepts for a slow consumer; this only stops the consumer from
    /// misreading them as something they're not.
    fn clamp_to_unoverwritten(&self, target: Sequence, available: Sequence) -> Sequence {
        let capacity = self.ring.capacity() as u64;
        let earliest_valid = available.saturating_sub(capacity - 1);
        target.max(earliest_valid)
    }

    /// Blocking consumer drive: wait for at least one new event, then
    /// dispatch every event through `handler` up to the available cursor.
    /// Returns the number of (non-sentinel) events dispatched, or `None` if
    /// the bus was alerted (shutdown) before anything became available.
    pub fn consume_blocking(
        &self,
        consumer_id: usize,
        mut handler: impl FnMut(&MarketEvent)
    ) -> Option<usize> {
        let local = self.ring.consumer_sequence(consumer_id);
        let target = if local == SEQUENCE_NONE { 0 } else { local + 1 };

        let available = self.barrier.wait_for(target)?;
        let mut seq = self.clamp_to_unoverwritten(target, available);
        let mut dispatched = 0;
        while seq <= available {
            let event = self.ring.get(seq);
            if !event.is_sentinel() {
                handler(event);
                dispatched += 1;
            }
            seq += 1;
        }
        self.ring.set_consumer_sequence(consumer_id, available);
        Some(dispatched)
    }

    /// Non-blocking consumer drive: dispatch whatever is already published,
    /// doing nothing if there is no new data.
    pub fn poll(&self, consumer_id: usize, mut handler: impl FnMut(&MarketEvent)) -> usize {
        let local = self.ring.consumer_sequence(consumer_id);
        let target = if local == SEQUENCE_NONE { 0 } else { local + 1 };

        let Some(available) = self.barrier.try_wait_for(target) else {
            return 0;
        };
        let mut seq = self.clamp_to_unoverwritten(target, available);
        let mut dispatched = 0;
        while seq <= available {
            let event = self.ring.get(seq);
            if !event.is_sentinel() {
                handler(event);
                dispatched += 1;
            }
            seq += 1;
        }
        self.ring.set_consumer_sequence(consumer_id, available);
        dispatched
    }

    /// Publish a sentinel event and alert the barrier, waking any consumer
    /// blocked in `consume_blocking`. Called once by the engine during
    /// `stop()`.
    pub fn shutdown(&self) {
        let seq = self.next();
        *self.slot(seq) = MarketEvent::default();
        self.publish(seq);
        self.barrier.alert();
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}
