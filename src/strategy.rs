//! `IStrategy` contract and the pinned worker that drives a group of them
//! against the market data bus.

use std::panic::{ self, AssertUnwindSafe };
use std::sync::Arc;
use std::sync::atomic::{ AtomicBool, AtomicU64, Ordering };

use crossbeam::channel::Receiver;
use tracing::error;

use crate::events::{ MarketEvent, OrderRequest, OrderResponse };
use crate::market_data_bus::MarketDataBus;
use crate::order_queue::OrderQueue;

/// A trading strategy. One `StrategyWorker` may host several of these,
/// dispatching every market event and order response to each in turn.
pub trait IStrategy: Send {
    fn strategy_id(&self) -> u32;

    /// Called for every market event this strategy's worker observes.
    /// Returns `true` if the call produced a pending order, retrievable via
    /// [`IStrategy::get_pending_order`].
    fn on_market_event(&mut self, event: &MarketEvent) -> bool;

    /// Called for every order response addressed to this strategy.
    fn on_order_response(&mut self, response: &OrderResponse);

    /// If `on_market_event` produced an order, write it into `out` and
    /// return `true`. Called at most once per `on_market_event` that
    /// returned `true`.
    fn get_pending_order(&mut self, out: &mut OrderRequest) -> bool;
}

/// A snapshot of a worker's hot-path counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrategyWorkerStats {
    pub event_count: u64,
    pub order_count: u64,
    pub dropped_order_count: u64,
}

/// Cloneable handle onto a running worker's counters. Cheap to hand to the
/// engine before the worker itself is moved onto its pinned thread: the
/// counters are `Arc`-shared rather than owned by a value the engine could
/// otherwise no longer reach.
#[derive(Clone)]
pub struct StrategyWorkerHandle {
    event_count: Arc<AtomicU64>,
    order_count: Arc<AtomicU64>,
    dropped_order_count: Arc<AtomicU64>,
}

impl StrategyWorkerHandle {
    pub fn snapshot(&self) -> StrategyWorkerStats {
        StrategyWorkerStats {
            event_count: self.event_count.load(Ordering::Relaxed),
            order_count: self.order_count.load(Ordering::Relaxed),
            dropped_order_count: self.dropped_order_count.load(Ordering::Relaxed),
        }
    }
}

/// Pinned consumer of the market data bus that drives a fixed set of
/// strategies and forwards the orders they produce to the order queue.
pub struct StrategyWorker<const RING_N: usize, const QUEUE_N: usize> {
    consumer_id: usize,
    strategies: Vec<Box<dyn IStrategy>>,
    bus: Arc<MarketDataBus<RING_N>>,
    order_queue: Arc<OrderQueue<QUEUE_N>>,
    responses: Receiver<(u32, OrderResponse)>,
    running: Arc<AtomicBool>,
    event_count: Arc<AtomicU64>,
    order_count: Arc<AtomicU64>,
    dropped_order_count: Arc<AtomicU64>,
}

impl<const RING_N: usize, const QUEUE_N: usize> StrategyWorker<RING_N, QUEUE_N> {
    pub fn new(
        consumer_id: usize,
        strategies: Vec<Box<dyn IStrategy>>,
        bus: Arc<MarketDataBus<RING_N>>,
        order_queue: Arc<OrderQueue<QUEUE_N>>,
        responses: Receiver<(u32, OrderResponse)>
    ) -> Self {
        Self {
            consumer_id,
            strategies,
            bus,
            order_queue,
            responses,
            running: Arc::new(AtomicBool::new(false)),
            event_count: Arc::new(AtomicU64::new(0)),
            order_count: Arc::new(AtomicU64::new(0)),
            dropped_order_count: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Clone a handle onto this worker's counters, to read after the worker
    /// itself has been moved onto its pinned thread.
    pub fn handle(&self) -> StrategyWorkerHandle {
        StrategyWorkerHandle {
            event_count: self.event_count.clone(),
            order_count: self.order_count.clone(),
            dropped_order_count: self.dropped_order_count.clone(),
        }
    }

    pub fn stats(&self) -> StrategyWorkerStats {
        StrategyWorkerStats {
            event_count: self.event_count.load(Ordering::Relaxed),
            order_count: self.order_count.load(Ordering::Relaxed),
            dropped_order_count: self.dropped_order_count.load(Ordering::Relaxed),
        }
    }

    /// Dispatch every strategy against a single market event, catching any
    /// strategy panic at the loop boundary per the crate's error-handling
    /// contract: a misbehaving strategy is logged and skipped, never allowed
    /// to bring the worker down.
    fn dispatch_event(&mut self) {
        let consumer_id = self.consumer_id;
        let event_count = &self.event_count;
        let order_count = &self.order_count;
        let dropped_order_count = &self.dropped_order_count;
        let order_queue = &self.order_queue;
        let strategies = &mut self.strategies;

        self.bus.poll(consumer_id, |event| {
            event_count.fetch_add(1, Ordering::Relaxed);
            for strategy in strategies.iter_mut() {
                let produced = panic::catch_unwind(AssertUnwindSafe(|| strategy.on_market_event(event)));
                match produced {
                    Ok(true) => {
                        let mut order = OrderRequest::default();
                        let got = panic::catch_unwind(
                            AssertUnwindSafe(|| strategy.get_pending_order(&mut order))
                        );
                        if matches!(got, Ok(true)) {
                            match order_queue.try_push(order) {
                                Ok(()) => {
                                    order_count.fetch_add(1, Ordering::Relaxed);
                                }
                                Err(_dropped) => {
                                    dropped_order_count.fetch_add(1, Ordering::Relaxed);
                                }
                            }
                        }
                    }
                    Ok(false) => {}
                    Err(payload) => {
                        error!(
                            strategy_id = strategy.strategy_id(),
                            ?payload,
                            "strategy panicked on market event"
                        );
                    }
                }
            }
        });
    }

    /// Deliver a response to the strategy it belongs to (matched by
    /// `strategy_id` encoded in the response's order id bookkeeping at the
    /// OEMS layer — see [`crate::oems::OemsWorker`]).
    pub fn deliver_response(&mut self, strategy_id: u32, response: &OrderResponse) {
        for strategy in self.strategies.iter_mut() {
            if strategy.strategy_id() == strategy_id {
                let result = panic::catch_unwind(
                    AssertUnwindSafe(|| strategy.on_order_response(response))
                );
                if let Err(payload) = result {
                    error!(strategy_id, ?payload, "strategy panicked on order response");
                }
            }
        }
    }

    /// Drain whatever order responses the OEMS has routed to this group
    /// since the last call, delivering each to the strategy it belongs to.
    fn drain_responses(&mut self) {
        while let Ok((strategy_id, response)) = self.responses.try_recv() {
            self.deliver_response(strategy_id, &response);
        }
    }

    /// Pinned loop body: drains available bus events and routed order
    /// responses, then yields the CPU briefly. The caller is expected to run
    /// this in a `while running.load()` loop on a dedicated thread (see
    /// [`crate::engine::DisruptorEngine`]).
    pub fn run_once(&mut self) {
        self.dispatch_event();
        self.drain_responses();
        std::hint::spin_loop();
    }
}
