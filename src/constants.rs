//! Tuning constants for the ring bus, order queue, and workers

/// Default market-data ring capacity (must be a power of two)
pub const DEFAULT_RING_CAPACITY: usize = 1 << 16; // 65,536 slots

/// Default order queue capacity (must be a power of two)
pub const DEFAULT_ORDER_QUEUE_CAPACITY: usize = 1 << 12; // 4,096 slots

/// Tight busy-spin iterations before switching to a CPU pause/yield hint
pub const SPIN_TIGHT_ITERATIONS: u32 = 100;

/// Pause/yield-hint iterations after the tight spin phase, before resetting
pub const SPIN_BACKOFF_ITERATIONS: u32 = 900;

/// Upper bound on distinct exchange ids the OEMS can route to
pub const DEFAULT_MAX_EXCHANGES: usize = 8;

/// Logger's in-process write buffer, flushed at half-full or on the timer below
pub const LOGGER_BUFFER_SIZE: usize = 4096;

/// Logger flush interval even if the buffer hasn't filled
pub const LOGGER_FLUSH_INTERVAL_MS: u64 = 1;

/// Logger poll interval when the bus has no new events
pub const LOGGER_POLL_SLEEP_US: u64 = 100;

/// Error code synthesized for a risk-rejected order
pub const ERROR_CODE_RISK_REJECTED: u16 = 1001;

/// Error code synthesized for an order addressed to an unknown exchange
pub const ERROR_CODE_UNKNOWN_EXCHANGE: u16 = 1002;

/// Bound on the per-strategy-group channel used to route order responses
/// back from the OEMS worker to the strategies that placed them.
pub const RESPONSE_CHANNEL_CAPACITY: usize = 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacities_are_powers_of_two() {
        assert!(DEFAULT_RING_CAPACITY.is_power_of_two());
        assert!(DEFAULT_ORDER_QUEUE_CAPACITY.is_power_of_two());
    }
}
