//! Fixed-size, cache-aligned event structs carried by the ring bus and order queue.
//!
//! None of these types own heap memory: every field is plain old data, so a slot
//! can be value-initialized once at ring construction and overwritten in place on
//! every publish, with no allocation on the hot path.

use static_assertions::const_assert_eq;

use crate::disruptor::{ RingBufferEntry, Sequence };

/// Market data event kind
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarketEventType {
    #[default]
    None = 0,
    Ticker = 1,
    Trade = 2,
    Depth = 3,
    Kline = 4,
    Funding = 5,
}

/// Order side
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderSide {
    #[default]
    Buy = 0,
    Sell = 1,
}

/// Order type
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderType {
    #[default]
    Market = 0,
    Limit = 1,
}

/// Order lifecycle status reported back by a connection
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderStatus {
    #[default]
    New = 0,
    Ack = 1,
    Partial = 2,
    Filled = 3,
    Cancelled = 4,
    Rejected = 5,
}

/// One tick/trade/depth/kline/funding update, broadcast to every bus consumer.
///
/// 64 bytes: one cache line.
#[repr(C, align(64))]
#[derive(Debug, Clone, Copy)]
pub struct MarketEvent {
    pub timestamp_ns: i64,
    pub last_price: f64,
    pub bid_price: f64,
    pub ask_price: f64,
    pub volume: f64,
    pub bid_size: f64,
    pub ask_size: f64,
    pub sequence: u32,
    pub symbol_id: u16,
    pub kind: MarketEventType,
    pub exchange_id: u8,
}

const_assert_eq!(std::mem::size_of::<MarketEvent>(), 64);

impl Default for MarketEvent {
    fn default() -> Self {
        Self {
            timestamp_ns: 0,
            kind: MarketEventType::None,
            exchange_id: 0,
            symbol_id: 0,
            sequence: 0,
            last_price: 0.0,
            bid_price: 0.0,
            ask_price: 0.0,
            volume: 0.0,
            bid_size: 0.0,
            ask_size: 0.0,
        }
    }
}

impl MarketEvent {
    /// Build a `Ticker` event; the common case ingestors publish.
    pub fn ticker(
        timestamp_ns: i64,
        exchange_id: u8,
        symbol_id: u16,
        last_price: f64,
        bid_price: f64,
        ask_price: f64
    ) -> Self {
        Self {
            timestamp_ns,
            kind: MarketEventType::Ticker,
            exchange_id,
            symbol_id,
            last_price,
            bid_price,
            ask_price,
            ..Default::default()
        }
    }

    /// The sentinel event published on shutdown to wake barrier-blocked consumers.
    /// Consumers filter this out before dispatching to strategies/logger.
    pub fn is_sentinel(&self) -> bool {
        self.kind == MarketEventType::None
    }
}

/// Sequence used only for the `RingBufferEntry` bookkeeping; the bus's own
/// producer/consumer cursors are the authoritative ordering, this is bookkeeping
/// for slot reuse detection, matching the ring-internal `sequence`/`reset` contract.
impl RingBufferEntry for MarketEvent {
    fn sequence(&self) -> Sequence {
        self.sequence as u64
    }

    fn set_sequence(&mut self, seq: Sequence) {
        self.sequence = seq as u32;
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A strategy's request to buy or sell, submitted to the order queue.
///
/// 128 bytes.
#[repr(C, align(64))]
#[derive(Debug, Clone, Copy)]
pub struct OrderRequest {
    pub order_id: i64,
    pub timestamp_ns: i64,
    pub price: f64,
    pub quantity: f64,
    pub strategy_id: u32,
    pub symbol_id: u16,
    pub exchange_id: u8,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub pos_side: u8,
    pub time_in_force: u8,
    _padding: [u8; 85],
}

const_assert_eq!(std::mem::size_of::<OrderRequest>(), 128);

impl Default for OrderRequest {
    fn default() -> Self {
        Self {
            order_id: 0,
            strategy_id: 0,
            exchange_id: 0,
            symbol_id: 0,
            side: OrderSide::Buy,
            order_type: OrderType::Market,
            pos_side: 0,
            time_in_force: 0,
            price: 0.0,
            quantity: 0.0,
            timestamp_ns: 0,
            _padding: [0; 85],
        }
    }
}

/// A connection's reply to a submitted `OrderRequest`.
///
/// 128 bytes.
#[repr(C, align(64))]
#[derive(Debug, Clone, Copy)]
pub struct OrderResponse {
    pub order_id: i64,
    pub exchange_order_id: i64,
    pub filled_qty: f64,
    pub avg_price: f64,
    pub timestamp_ns: i64,
    pub error_code: u16,
    pub status: OrderStatus,
    pub error_msg: [u8; 64],
    _padding: [u8; 21],
}

const_assert_eq!(std::mem::size_of::<OrderResponse>(), 128);

impl Default for OrderResponse {
    fn default() -> Self {
        Self {
            order_id: 0,
            exchange_order_id: 0,
            status: OrderStatus::New,
            filled_qty: 0.0,
            avg_price: 0.0,
            error_code: 0,
            error_msg: [0; 64],
            timestamp_ns: 0,
            _padding: [0; 21],
        }
    }
}

impl OrderResponse {
    /// Synthesize a rejection response without going through a connection.
    pub fn rejected(order_id: i64, error_code: u16, reason: &str, timestamp_ns: i64) -> Self {
        let mut error_msg = [0u8; 64];
        let bytes = reason.as_bytes();
        let n = bytes.len().min(error_msg.len());
        error_msg[..n].copy_from_slice(&bytes[..n]);

        Self {
            order_id,
            status: OrderStatus::Rejected,
            error_code,
            error_msg,
            timestamp_ns,
            ..Default::default()
        }
    }
}
