//! Order Execution Management System worker: the single consumer of the
//! order queue, routing each request to the connection registered for its
//! exchange and applying risk checks before anything reaches the network.

use std::collections::HashMap;
use std::panic::{ self, AssertUnwindSafe };
use std::sync::Arc;
use std::sync::atomic::{ AtomicU64, Ordering };

use parking_lot::Mutex;
use tracing::error;

use crate::constants::{ ERROR_CODE_RISK_REJECTED, ERROR_CODE_UNKNOWN_EXCHANGE };
use crate::connection::ITradeConnection;
use crate::events::{ OrderRequest, OrderResponse };
use crate::order_queue::OrderQueue;

/// Shared `order_id -> strategy_id` correlation table, populated by the OEMS
/// worker as every order is routed so that a response can later be matched
/// back to the strategy that placed it — `OrderResponse` carries no
/// `strategy_id` field of its own (spec.md's 128-byte fixed response format).
pub type OrderStrategyMap = Arc<Mutex<HashMap<i64, u32>>>;

/// `(OrderRequest) -> bool`; `false` rejects the order before it reaches any
/// connection.
pub type RiskPredicate = Box<dyn Fn(&OrderRequest) -> bool + Send>;

/// `(OrderResponse) -> ()`; invoked for every response, whether synthesized
/// locally (rejection) or forwarded from a connection. The OEMS itself has
/// no notion of strategies; [`crate::engine::DisruptorEngine`] wraps this
/// handler to also route each response to the strategy that placed it, via
/// [`OrderStrategyMap`].
pub type ResponseHandler = Box<dyn FnMut(OrderResponse) + Send>;

#[derive(Debug, Clone, Copy, Default)]
pub struct OemsWorkerStats {
    pub order_count: u64,
    pub reject_count: u64,
}

/// Cloneable handle onto a running OEMS worker's counters, taken before the
/// worker is moved onto its pinned thread.
#[derive(Clone)]
pub struct OemsWorkerHandle {
    order_count: Arc<AtomicU64>,
    reject_count: Arc<AtomicU64>,
}

impl OemsWorkerHandle {
    pub fn snapshot(&self) -> OemsWorkerStats {
        OemsWorkerStats {
            order_count: self.order_count.load(Ordering::Relaxed),
            reject_count: self.reject_count.load(Ordering::Relaxed),
        }
    }
}

/// Pinned single-consumer worker over the order queue.
pub struct OemsWorker<const QUEUE_N: usize, const MAX_EXCHANGES: usize> {
    order_queue: Arc<OrderQueue<QUEUE_N>>,
    connections: [Option<Box<dyn ITradeConnection>>; MAX_EXCHANGES],
    risk_predicate: Option<RiskPredicate>,
    response_handler: ResponseHandler,
    order_count: Arc<AtomicU64>,
    reject_count: Arc<AtomicU64>,
    now_ns: Box<dyn Fn() -> i64 + Send>,
    order_strategy_map: OrderStrategyMap,
}

impl<const QUEUE_N: usize, const MAX_EXCHANGES: usize> OemsWorker<QUEUE_N, MAX_EXCHANGES> {
    pub fn new(
        order_queue: Arc<OrderQueue<QUEUE_N>>,
        risk_predicate: Option<RiskPredicate>,
        response_handler: ResponseHandler,
        now_ns: Box<dyn Fn() -> i64 + Send>,
        order_strategy_map: OrderStrategyMap
    ) -> Self {
        Self {
            order_queue,
            connections: std::array::from_fn(|_| None),
            risk_predicate,
            response_handler,
            order_count: Arc::new(AtomicU64::new(0)),
            reject_count: Arc::new(AtomicU64::new(0)),
            now_ns,
            order_strategy_map,
        }
    }

    /// Clone a handle onto this worker's counters, to read after the worker
    /// itself has been moved onto its pinned thread.
    pub fn handle(&self) -> OemsWorkerHandle {
        OemsWorkerHandle {
            order_count: self.order_count.clone(),
            reject_count: self.reject_count.clone(),
        }
    }

    /// Register a connection for `exchange_id`. `exchange_id` must be
    /// `< MAX_EXCHANGES`.
    pub fn register_connection(
        &mut self,
        exchange_id: u8,
        connection: Box<dyn ITradeConnection>
    ) -> crate::error::Result<()> {
        let idx = exchange_id as usize;
        if idx >= MAX_EXCHANGES {
            return Err(
                crate::error::EngineError::config(
                    format!("exchange_id {exchange_id} exceeds max_exchanges {MAX_EXCHANGES}")
                )
            );
        }
        self.connections[idx] = Some(connection);
        Ok(())
    }

    pub fn stats(&self) -> OemsWorkerStats {
        OemsWorkerStats {
            order_count: self.order_count.load(Ordering::Relaxed),
            reject_count: self.reject_count.load(Ordering::Relaxed),
        }
    }

    fn reject(&mut self, order: &OrderRequest, error_code: u16, reason: &str) {
        self.reject_count.fetch_add(1, Ordering::Relaxed);
        let response = OrderResponse::rejected(order.order_id, error_code, reason, (self.now_ns)());
        (self.response_handler)(response);
    }

    fn route(&mut self, order: OrderRequest) {
        self.order_strategy_map.lock().insert(order.order_id, order.strategy_id);

        if let Some(predicate) = &self.risk_predicate {
            if !predicate(&order) {
                self.reject(&order, ERROR_CODE_RISK_REJECTED, "Risk check failed");
                return;
            }
        }

        let idx = order.exchange_id as usize;
        let Some(connection) = self.connections.get_mut(idx).and_then(|c| c.as_mut()) else {
            self.reject(&order, ERROR_CODE_UNKNOWN_EXCHANGE, "Unknown exchange");
            return;
        };

        let accepted = panic::catch_unwind(AssertUnwindSafe(|| connection.send_order(&order)));
        match accepted {
            Ok(true) => {
                self.order_count.fetch_add(1, Ordering::Relaxed);
            }
            Ok(false) => {
                self.reject(&order, ERROR_CODE_UNKNOWN_EXCHANGE, "Connection rejected order");
            }
            Err(payload) => {
                error!(order_id = order.order_id, ?payload, "connection panicked on send_order");
                self.reject(&order, ERROR_CODE_UNKNOWN_EXCHANGE, "Connection panicked");
            }
        }
    }

    fn poll_connections(&mut self) {
        let handler = &mut self.response_handler;
        for connection in self.connections.iter_mut().flatten() {
            let result = panic::catch_unwind(
                AssertUnwindSafe(|| {
                    connection.poll_responses(&mut |response| {
                        handler(response);
                    });
                })
            );
            if let Err(payload) = result {
                error!(?payload, "connection panicked on poll_responses");
            }
        }
    }

    /// One iteration of the pinned loop: drain the queue, route every order,
    /// then poll connections for responses.
    pub fn run_once(&mut self, batch: usize) {
        let mut drained = Vec::with_capacity(batch);
        self.order_queue.pop_batch(&mut drained, batch);
        for order in drained {
            self.route(order);
        }
        self.poll_connections();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingConnection {
        sent: Arc<Mutex<Vec<OrderRequest>>>,
    }

    impl ITradeConnection for RecordingConnection {
        fn send_order(&mut self, order: &OrderRequest) -> bool {
            self.sent.lock().unwrap().push(*order);
            true
        }
        fn cancel_order(&mut self, _order_id: i64) -> bool {
            true
        }
        fn poll_responses(&mut self, _on_response: &mut dyn FnMut(OrderResponse)) {}
    }

    #[test]
    fn test_order_routes_to_registered_connection() {
        let queue: Arc<OrderQueue<16>> = Arc::new(OrderQueue::new().unwrap());
        let sent = Arc::new(Mutex::new(Vec::new()));
        let responses = Arc::new(Mutex::new(Vec::new()));
        let responses_clone = responses.clone();

        let mut oems: OemsWorker<16, 2> = OemsWorker::new(
            queue.clone(),
            None,
            Box::new(move |resp| responses_clone.lock().unwrap().push(resp)),
            Box::new(|| 0),
            OrderStrategyMap::default()
        );
        oems.register_connection(0, Box::new(RecordingConnection { sent: sent.clone() })).unwrap();

        queue
            .try_push(OrderRequest {
                order_id: 1,
                exchange_id: 0,
                price: 50_000.0,
                quantity: 0.01,
                strategy_id: 1,
                ..Default::default()
            })
            .unwrap();

        oems.run_once(16);

        assert_eq!(sent.lock().unwrap().len(), 1);
        assert_eq!(oems.stats().order_count, 1);
        assert_eq!(oems.stats().reject_count, 0);
    }

    #[test]
    fn test_risk_predicate_rejects_order() {
        let queue: Arc<OrderQueue<16>> = Arc::new(OrderQueue::new().unwrap());
        let responses = Arc::new(Mutex::new(Vec::new()));
        let responses_clone = responses.clone();

        let mut oems: OemsWorker<16, 2> = OemsWorker::new(
            queue.clone(),
            Some(Box::new(|order: &OrderRequest| order.quantity <= 0.005)),
            Box::new(move |resp| responses_clone.lock().unwrap().push(resp)),
            Box::new(|| 0),
            OrderStrategyMap::default()
        );
        oems.register_connection(0, Box::new(RecordingConnection { sent: Arc::new(Mutex::new(Vec::new())) })).unwrap();

        queue
            .try_push(OrderRequest {
                order_id: 2,
                exchange_id: 0,
                quantity: 0.01,
                strategy_id: 1,
                ..Default::default()
            })
            .unwrap();

        oems.run_once(16);

        assert_eq!(oems.stats().reject_count, 1);
        assert_eq!(oems.stats().order_count, 0);
        let responses = responses.lock().unwrap();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].error_code, ERROR_CODE_RISK_REJECTED);
    }

    #[test]
    fn test_unknown_exchange_is_rejected() {
        let queue: Arc<OrderQueue<16>> = Arc::new(OrderQueue::new().unwrap());
        let responses = Arc::new(Mutex::new(Vec::new()));
        let responses_clone = responses.clone();

        let mut oems: OemsWorker<16, 2> = OemsWorker::new(
            queue.clone(),
            None,
            Box::new(move |resp| responses_clone.lock().unwrap().push(resp)),
            Box::new(|| 0),
            OrderStrategyMap::default()
        );

        queue
            .try_push(OrderRequest {
                order_id: 3,
                exchange_id: 1,
                ..Default::default()
            })
            .unwrap();

        oems.run_once(16);

        assert_eq!(oems.stats().reject_count, 1);
        let responses = responses.lock().unwrap();
        assert_eq!(responses[0].error_code, ERROR_CODE_UNKNOWN_EXCHANGE);
    }
}
