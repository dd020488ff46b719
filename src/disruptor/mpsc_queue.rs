//! Bounded multi-producer/single-consumer queue (order submission path).
//!
//! Each cell carries its own atomic sequence stamp rather than a shared
//! head/tail pair guarding the whole array — this is the classic Vyukov
//! bounded queue, specialized here to a single consumer. Producers race each
//! other with CAS on a shared head cursor; the lone consumer never needs a
//! CAS on tail since nothing else advances it.

use std::cell::UnsafeCell;
use std::sync::atomic::{ AtomicU64, Ordering };

use crate::disruptor::PaddedSequence;
use crate::error::{ EngineError, Result };

struct Cell<T> {
    stamp: AtomicU64,
    value: UnsafeCell<Option<T>>,
}

unsafe impl<T: Send> Sync for Cell<T> {}

/// Fixed-capacity bounded MPSC queue. `N` must be a power of two.
pub struct MpscQueue<T, const N: usize> {
    cells: Box<[Cell<T>]>,
    mask: u64,
    head: PaddedSequence,
    tail: PaddedSequence,
}

impl<T, const N: usize> MpscQueue<T, N> {
    pub fn new() -> Result<Self> {
        if N == 0 || !N.is_power_of_two() {
            return Err(EngineError::config("order queue capacity must be a non-zero power of two"));
        }

        let cells = (0..N)
            .map(|i| Cell {
                stamp: AtomicU64::new(i as u64),
                value: UnsafeCell::new(None),
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            cells,
            mask: (N as u64) - 1,
            head: PaddedSequence::new(0),
            tail: PaddedSequence::new(0),
        })
    }

    pub fn capacity(&self) -> usize {
        N
    }

    /// Attempt to enqueue `value`. Returns `false` (dropping `value`'s claim
    /// on the slot, i.e. it's handed back) if the queue is full. Safe to
    /// call from any number of producer threads concurrently.
    pub fn try_push(&self, value: T) -> std::result::Result<(), T> {
        let mut head = self.head.value.load(Ordering::Relaxed);
        loop {
            let cell = &self.cells[(head & self.mask) as usize];
            let stamp = cell.stamp.load(Ordering::Acquire);
            let diff = (stamp as i64) - (head as i64);

            if diff == 0 {
                match
                    self.head.value.compare_exchange_weak(
                        head,
                        head + 1,
                        Ordering::Relaxed,
                        Ordering::Relaxed
                    )
                {
                    Ok(_) => {
                        unsafe {
                            *cell.value.get() = Some(value);
                        }
                        cell.stamp.store(head + 1, Ordering::Release);
                        return Ok(());
                    }
                    Err(actual) => {
                        head = actual;
                    }
                }
            } else if diff < 0 {
                return Err(value);
            } else {
                head = self.head.value.load(Ordering::Relaxed);
            }
        }
    }

    /// Attempt to dequeue a single item. Must only be called from the one
    /// designated consumer thread.
    pub fn try_pop(&self) -> Option<T> {
        let tail = self.tail.value.load(Ordering::Relaxed);
        let cell = &self.cells[(tail & self.mask) as usize];
        let stamp = cell.stamp.load(Ordering::Acquire);
        let diff = (stamp as i64) - ((tail + 1) as i64);

        if diff == 0 {
            let value = unsafe { (*cell.value.get()).take() };
            self.tail.value.store(tail + 1, Ordering::Relaxed);
            cell.stamp.store(tail + (N as u64), Ordering::Release);
            value
        } else {
            None
        }
    }

    /// Drain up to `max` items into `out`, returning how many were popped.
    pub fn pop_batch(&self, out: &mut Vec<T>, max: usize) -> usize {
        let mut count = 0;
        while count < max {
            match self.try_pop() {
                Some(v) => {
                    out.push(v);
                    count += 1;
                }
                None => {
                    break;
                }
            }
        }
        count
    }

    pub fn is_empty(&self) -> bool {
        let tail = self.tail.value.load(Ordering::Relaxed);
        let cell = &self.cells[(tail & self.mask) as usize];
        cell.stamp.load(Ordering::Acquire) != tail + 1
    }
}

unsafe impl<T: Send, const N: usize> Send for MpscQueue<T, N> {}
unsafe impl<T: Send, const N: usize> Sync for MpscQueue<T, N> {}
