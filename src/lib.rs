//! disruptor-gateway - concurrency and dispatch core for a multi-exchange
//! live-trading gateway: a lock-free SPMC market data bus, an MPSC order
//! queue, and the pinned worker threads that sit between them.

pub mod connection;
pub mod constants;
pub mod cpu;
pub mod disruptor;
pub mod engine;
pub mod error;
pub mod events;
pub mod logger;
pub mod market_data_bus;
pub mod oems;
pub mod order_queue;
pub mod strategy;
pub mod telemetry;

pub use connection::ITradeConnection;
pub use engine::{ CpuAssignment, DisruptorEngine, EngineConfig, EngineStats, StrategyGroup };
pub use error::{ EngineError, Result };
pub use events::{ MarketEvent, MarketEventType, OrderRequest, OrderResponse, OrderSide, OrderStatus, OrderType };
pub use market_data_bus::MarketDataBus;
pub use oems::{ OemsWorker, OemsWorkerStats, OrderStrategyMap, ResponseHandler, RiskPredicate };
pub use order_queue::OrderQueue;
pub use strategy::{ IStrategy, StrategyWorker, StrategyWorkerStats };
pub use telemetry::init_tracing;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
