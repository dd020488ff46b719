//! Composition root: owns the market data bus, the order queue, and every
//! worker thread, and drives the `start()`/`stop()` lifecycle in the order
//! spec.md §4.8 calls for (leaves first on the way up, reverse on the way
//! down).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{ AtomicU8, Ordering };
use std::thread::JoinHandle;

use crossbeam::channel::Sender;
use parking_lot::Mutex;
use tracing::{ error, info };

use crate::connection::ITradeConnection;
use crate::constants::{ DEFAULT_MAX_EXCHANGES, RESPONSE_CHANNEL_CAPACITY };
use crate::cpu::{ pin_to_cpu, set_realtime_priority };
use crate::error::{ EngineError, Result };
use crate::events::OrderResponse;
use crate::logger::{ LoggerWorker, LoggerWorkerHandle, LoggerWorkerStats };
use crate::market_data_bus::MarketDataBus;
use crate::oems::{ OemsWorker, OemsWorkerHandle, OemsWorkerStats, OrderStrategyMap, ResponseHandler, RiskPredicate };
use crate::order_queue::OrderQueue;
use crate::strategy::{ IStrategy, StrategyWorker, StrategyWorkerHandle, StrategyWorkerStats };

/// Which CPU, if any, a pinned thread should run on. `-1` (spec.md's
/// `int|-1`) becomes `None`.
pub type CpuAssignment = Option<usize>;

/// A strategy group: one pinned `StrategyWorker` thread hosting one or more
/// `IStrategy` instances.
pub struct StrategyGroup {
    pub strategies: Vec<Box<dyn IStrategy>>,
    pub cpu: CpuAssignment,
}

/// Builder for engine construction. Every field spec.md §6 enumerates under
/// "Configuration" is represented here except `ring_capacity` and
/// `order_queue_capacity`, which are compile-time const generics on
/// [`DisruptorEngine`] rather than runtime fields (see DESIGN.md).
pub struct EngineConfig {
    md_thread_cpu: CpuAssignment,
    oems_thread_cpu: CpuAssignment,
    logger_thread_cpu: CpuAssignment,
    enable_cpu_pinning: bool,
    enable_realtime_priority: bool,
    log_file_path: Option<PathBuf>,
    max_exchanges: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            md_thread_cpu: None,
            oems_thread_cpu: None,
            logger_thread_cpu: None,
            enable_cpu_pinning: false,
            enable_realtime_priority: false,
            log_file_path: None,
            max_exchanges: DEFAULT_MAX_EXCHANGES,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_md_thread_cpu(mut self, cpu: usize) -> Self {
        self.md_thread_cpu = Some(cpu);
        self
    }

    pub fn with_oems_thread_cpu(mut self, cpu: usize) -> Self {
        self.oems_thread_cpu = Some(cpu);
        self
    }

    pub fn with_logger_thread_cpu(mut self, cpu: usize) -> Self {
        self.logger_thread_cpu = Some(cpu);
        self
    }

    pub fn with_cpu_pinning(mut self, enable: bool) -> Self {
        self.enable_cpu_pinning = enable;
        self
    }

    pub fn with_realtime_priority(mut self, enable: bool) -> Self {
        self.enable_realtime_priority = enable;
        self
    }

    pub fn with_log_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file_path = Some(path.into());
        self
    }

    pub fn with_max_exchanges(mut self, max_exchanges: usize) -> Self {
        self.max_exchanges = max_exchanges;
        self
    }

    /// The configured exchange bound. Cross-checked against
    /// [`DisruptorEngine`]'s `MAX_EXCHANGES` const generic in `new()`: the
    /// two must agree, since the connection table is sized at compile time
    /// but this value is what an operator actually tunes.
    pub fn max_exchanges(&self) -> usize {
        self.max_exchanges
    }

    /// Validate and freeze the configuration. `max_exchanges` must be
    /// nonzero and no greater than `DEFAULT_MAX_EXCHANGES`'s sibling bound of
    /// 8 (spec.md §6: `max_exchanges: int ≤ 8`). Any pinned CPU assignment
    /// must name a core this host actually has.
    pub fn build(self) -> Result<Self> {
        if self.max_exchanges == 0 || self.max_exchanges > 8 {
            return Err(EngineError::config(format!("max_exchanges must be in 1..=8, got {}", self.max_exchanges)));
        }
        if self.log_file_path.is_none() {
            return Err(EngineError::config("log_file_path is required"));
        }

        let available = num_cpus::get();
        for (label, cpu) in
            [
                ("md_thread_cpu", self.md_thread_cpu),
                ("oems_thread_cpu", self.oems_thread_cpu),
                ("logger_thread_cpu", self.logger_thread_cpu),
            ]
        {
            if let Some(cpu) = cpu {
                if cpu >= available {
                    return Err(
                        EngineError::config(
                            format!("{label} names cpu {cpu} but this host only has {available} available")
                        )
                    );
                }
            }
        }

        Ok(self)
    }
}

/// Single point-in-time read of every worker's counters.
#[derive(Debug, Clone, Default)]
pub struct EngineStats {
    pub strategy_groups: Vec<StrategyWorkerStats>,
    pub oems: OemsWorkerStats,
    pub logger: LoggerWorkerStats,
}

const STATE_CREATED: u8 = 0;
const STATE_STARTED: u8 = 1;
const STATE_STOPPING: u8 = 2;
const STATE_JOINED: u8 = 3;

struct WorkerThread {
    running: Arc<std::sync::atomic::AtomicBool>,
    join_handle: Option<JoinHandle<()>>,
}

/// Composition root. `RING_N`/`QUEUE_N` are the bus/order-queue capacities
/// (compile-time per spec.md's "compile-time template arg" note);
/// `MAX_EXCHANGES` bounds the OEMS connection table.
pub struct DisruptorEngine<
    const RING_N: usize,
    const QUEUE_N: usize,
    const MAX_EXCHANGES: usize = DEFAULT_MAX_EXCHANGES
> {
    config: EngineConfig,
    bus: Arc<MarketDataBus<RING_N>>,
    order_queue: Arc<OrderQueue<QUEUE_N>>,
    strategy_groups: Vec<StrategyGroup>,
    risk_predicate: Option<RiskPredicate>,
    response_handler: Option<ResponseHandler>,
    order_strategy_map: OrderStrategyMap,
    connections: Vec<(u8, Box<dyn ITradeConnection>)>,
    state: AtomicU8,
    logger_handle: Option<LoggerWorkerHandle>,
    strategy_handles: Vec<StrategyWorkerHandle>,
    oems_handle: Option<OemsWorkerHandle>,
    logger_thread: Option<WorkerThread>,
    strategy_threads: Vec<WorkerThread>,
    oems_thread: Option<WorkerThread>,
}

impl<const RING_N: usize, const QUEUE_N: usize, const MAX_EXCHANGES: usize> DisruptorEngine<
    RING_N,
    QUEUE_N,
    MAX_EXCHANGES
> {
    pub fn new(
        config: EngineConfig,
        strategy_groups: Vec<StrategyGroup>,
        risk_predicate: Option<RiskPredicate>,
        response_handler: ResponseHandler
    ) -> Result<Self> {
        if config.max_exchanges() != MAX_EXCHANGES {
            return Err(
                EngineError::config(
                    format!(
                        "config.max_exchanges ({}) must match the engine's MAX_EXCHANGES type parameter ({})",
                        config.max_exchanges(),
                        MAX_EXCHANGES
                    )
                )
            );
        }

        // logger + one consumer per strategy group
        let num_consumers = strategy_groups.len() + 1;
        let bus = Arc::new(MarketDataBus::new(num_consumers)?);
        let order_queue = Arc::new(OrderQueue::new()?);

        Ok(Self {
            config,
            bus,
            order_queue,
            strategy_groups,
            risk_predicate,
            response_handler: Some(response_handler),
            order_strategy_map: Arc::new(Mutex::new(HashMap::new())),
            connections: Vec::new(),
            state: AtomicU8::new(STATE_CREATED),
            logger_handle: None,
            strategy_handles: Vec::new(),
            oems_handle: None,
            logger_thread: None,
            strategy_threads: Vec::new(),
            oems_thread: None,
        })
    }

    /// Register a connection for `exchange_id`, taking effect the next time
    /// `start()` builds the OEMS worker. Must be called before `start()`.
    pub fn register_connection(&mut self, exchange_id: u8, connection: Box<dyn ITradeConnection>) {
        self.connections.push((exchange_id, connection));
    }

    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::SeqCst) == STATE_STARTED
    }

    /// Bring every worker up, leaves-first: logger, then each strategy
    /// group, then OEMS. Idempotent: a second call while already started is
    /// a no-op.
    pub fn start(&mut self) -> Result<()> {
        if
            self.state
                .compare_exchange(STATE_CREATED, STATE_STARTED, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
        {
            return Ok(());
        }

        let log_path = self.config.log_file_path.clone().ok_or_else(|| EngineError::config("log_file_path missing"))?;
        let logger_consumer_id = self.bus.register_consumer()?;
        let mut logger = LoggerWorker::new(logger_consumer_id, self.bus.clone(), &log_path);
        self.logger_handle = Some(logger.handle());
        let logger_running = Arc::new(std::sync::atomic::AtomicBool::new(true));
        let thread_running = logger_running.clone();
        let cpu = self.config.logger_thread_cpu;
        let pinning = self.config.enable_cpu_pinning;
        let realtime = self.config.enable_realtime_priority;
        let join_handle = std::thread::spawn(move || {
            pin_worker_thread(cpu, pinning, realtime, "logger");
            while thread_running.load(Ordering::Relaxed) {
                if !logger.run_once() {
                    break;
                }
            }
        });
        self.logger_thread = Some(WorkerThread { running: logger_running, join_handle: Some(join_handle) });
        info!("logger worker started");

        let mut strategy_senders: HashMap<u32, Sender<(u32, OrderResponse)>> = HashMap::new();
        for group in self.strategy_groups.drain(..) {
            let consumer_id = self.bus.register_consumer()?;
            let (response_tx, response_rx) = crossbeam::channel::bounded(RESPONSE_CHANNEL_CAPACITY);
            for strategy in &group.strategies {
                strategy_senders.insert(strategy.strategy_id(), response_tx.clone());
            }
            let mut worker = StrategyWorker::new(
                consumer_id,
                group.strategies,
                self.bus.clone(),
                self.order_queue.clone(),
                response_rx
            );
            self.strategy_handles.push(worker.handle());
            let running = worker.running_flag();
            running.store(true, Ordering::SeqCst);
            let cpu = group.cpu;
            let pinning = self.config.enable_cpu_pinning;
            let realtime = self.config.enable_realtime_priority;
            let thread_running = running.clone();
            let join_handle = std::thread::spawn(move || {
                pin_worker_thread(cpu, pinning, realtime, "strategy");
                while thread_running.load(Ordering::Relaxed) {
                    worker.run_once();
                }
            });
            self.strategy_threads.push(WorkerThread { running, join_handle: Some(join_handle) });
        }
        info!(count = self.strategy_handles.len(), "strategy workers started");

        let response_handler = self.response_handler
            .take()
            .ok_or_else(|| EngineError::invalid_state("response handler already consumed"))?;
        let order_strategy_map = self.order_strategy_map.clone();
        let dispatch_handler: ResponseHandler = Box::new(move |response| {
            let strategy_id = order_strategy_map.lock().remove(&response.order_id);
            if let Some(strategy_id) = strategy_id {
                if let Some(sender) = strategy_senders.get(&strategy_id) {
                    let _ = sender.try_send((strategy_id, response));
                }
            }
            response_handler(response);
        });
        let risk_predicate = self.risk_predicate.take();
        let mut oems: OemsWorker<QUEUE_N, MAX_EXCHANGES> = OemsWorker::new(
            self.order_queue.clone(),
            risk_predicate,
            dispatch_handler,
            Box::new(now_ns),
            self.order_strategy_map.clone()
        );
        for (exchange_id, connection) in self.connections.drain(..) {
            oems.register_connection(exchange_id, connection)?;
        }
        self.oems_handle = Some(oems.handle());
        let oems_running = Arc::new(std::sync::atomic::AtomicBool::new(true));
        let thread_running = oems_running.clone();
        let cpu = self.config.oems_thread_cpu;
        let pinning = self.config.enable_cpu_pinning;
        let realtime = self.config.enable_realtime_priority;
        let join_handle = std::thread::spawn(move || {
            pin_worker_thread(cpu, pinning, realtime, "oems");
            while thread_running.load(Ordering::Relaxed) {
                oems.run_once(64);
            }
        });
        self.oems_thread = Some(WorkerThread { running: oems_running, join_handle: Some(join_handle) });
        info!("oems worker started");

        Ok(())
    }

    /// The caller's market-data ingestion thread should pin itself using
    /// this assignment before publishing onto the bus (spec.md calls the
    /// ingestor's CPU `md_thread_cpu`; the engine does not own the ingestor
    /// thread itself since the ingestor is external per §1's non-goals).
    pub fn md_thread_cpu(&self) -> CpuAssignment {
        self.config.md_thread_cpu
    }

    pub fn bus(&self) -> Arc<MarketDataBus<RING_N>> {
        self.bus.clone()
    }

    /// Bring every worker down, reverse order: OEMS, then strategies, then
    /// logger. Publishes a sentinel and alerts the bus barrier so any
    /// blocked consumer wakes, then joins every thread. Idempotent.
    pub fn stop(&mut self) {
        if
            self.state
                .compare_exchange(STATE_STARTED, STATE_STOPPING, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
        {
            return;
        }

        if let Some(oems) = self.oems_thread.take() {
            oems.running.store(false, Ordering::SeqCst);
            if let Some(handle) = oems.join_handle {
                let _ = handle.join();
            }
        }

        for worker in self.strategy_threads.drain(..) {
            worker.running.store(false, Ordering::SeqCst);
        }
        self.bus.shutdown();
        for worker in std::mem::take(&mut self.strategy_threads) {
            if let Some(handle) = worker.join_handle {
                let _ = handle.join();
            }
        }

        if let Some(logger) = self.logger_thread.take() {
            logger.running.store(false, Ordering::SeqCst);
            if let Some(handle) = logger.join_handle {
                let _ = handle.join();
            }
        }

        self.state.store(STATE_JOINED, Ordering::SeqCst);
        info!("engine stopped");
    }

    /// Point-in-time read of every worker's counters.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            strategy_groups: self.strategy_handles
                .iter()
                .map(|h| h.snapshot())
                .collect(),
            oems: self.oems_handle.as_ref().map(|h| h.snapshot()).unwrap_or_default(),
            logger: self.logger_handle.as_ref().map(|h| h.snapshot()).unwrap_or_default(),
        }
    }
}

fn pin_worker_thread(cpu: CpuAssignment, pinning: bool, realtime: bool, name: &str) {
    if !pinning {
        return;
    }
    if let Some(cpu) = cpu {
        if let Err(err) = pin_to_cpu(cpu) {
            error!(thread = name, cpu, error = %err, "failed to pin thread to cpu");
        }
    }
    if realtime {
        if let Err(err) = set_realtime_priority() {
            error!(thread = name, error = %err, "failed to set real-time priority");
        }
    }
}

fn now_ns() -> i64 {
    use std::time::{ SystemTime, UNIX_EPOCH };
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}
