//! Thin, named wrapper around the generic MPSC queue for the order path.

use crate::constants::DEFAULT_ORDER_QUEUE_CAPACITY;
use crate::disruptor::mpsc_queue::MpscQueue;
use crate::error::Result;
use crate::events::OrderRequest;

/// Bounded order submission queue: many `StrategyWorker`s push, one
/// `OEMSWorker` pops. `N` defaults to
/// [`crate::constants::DEFAULT_ORDER_QUEUE_CAPACITY`].
pub struct OrderQueue<const N: usize = DEFAULT_ORDER_QUEUE_CAPACITY> {
    inner: MpscQueue<OrderRequest, N>,
}

impl<const N: usize> OrderQueue<N> {
    pub fn new() -> Result<Self> {
        Ok(Self { inner: MpscQueue::new()? })
    }

    /// Submit an order. `Err` hands the order back to the caller if the
    /// queue is full — per the engine's drop-on-full policy, the caller
    /// (a `StrategyWorker`) is responsible for deciding whether to drop it.
    pub fn try_push(&self, order: OrderRequest) -> std::result::Result<(), OrderRequest> {
        self.inner.try_push(order)
    }

    pub fn try_pop(&self) -> Option<OrderRequest> {
        self.inner.try_pop()
    }

    pub fn pop_batch(&self, out: &mut Vec<OrderRequest>, max: usize) -> usize {
        self.inner.pop_batch(out, max)
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}
