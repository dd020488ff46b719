//! The boundary the OEMS routes orders across. Exchange REST/WS adapters
//! live outside this crate and implement this trait.

use crate::events::{ OrderRequest, OrderResponse };

/// A single exchange connection. Implementations are expected to be
/// non-blocking on `send_order` (fire-and-forget onto a socket, queue, or
/// similar) and to return promptly from `poll_responses`.
pub trait ITradeConnection: Send {
    /// Submit an order. Returns `false` if the connection could not accept
    /// it (e.g. disconnected); the OEMS treats this the same as an
    /// unknown-exchange rejection.
    fn send_order(&mut self, order: &OrderRequest) -> bool;

    /// Request cancellation of a previously submitted order.
    fn cancel_order(&mut self, order_id: i64) -> bool;

    /// Drain any responses that have arrived since the last poll, invoking
    /// `on_response` for each. Must not block.
    fn poll_responses(&mut self, on_response: &mut dyn FnMut(OrderResponse));
}
