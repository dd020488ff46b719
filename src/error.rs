//! Error types for the disruptor engine

use thiserror::Error;

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by the ring bus, order queue, and worker orchestration
#[derive(Error, Debug)]
pub enum EngineError {
    /// Invalid configuration parameter, caught at `build()` time
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the offending field
        message: String,
    },

    /// Order queue had no free slot when a producer tried to enqueue
    #[error("order queue is full")]
    QueueFull,

    /// `exchange_id` has no registered connection
    #[error("unknown exchange id: {exchange_id}")]
    UnknownExchange {
        /// The exchange id that had no connection registered
        exchange_id: u8,
    },

    /// A strategy or connection callback panicked; caught at the worker loop boundary
    #[error("handler panicked: {message}")]
    HandlerPanic {
        /// Panic payload, downcast to a string where possible
        message: String,
    },

    /// I/O failure opening or writing the logger's output file
    #[error("logger I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CPU pinning or real-time priority request failed
    #[error("cpu affinity error: {message}")]
    CpuAffinity {
        /// Description of the failed affinity/priority call
        message: String,
    },

    /// Engine lifecycle method called in an invalid state (e.g. `start()` after `stop()`)
    #[error("invalid engine state transition: {message}")]
    InvalidState {
        /// Description of the attempted transition
        message: String,
    },
}

impl EngineError {
    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig { message: message.into() }
    }

    /// Create a new handler-panic error from a caught payload
    pub fn handler_panic(message: impl Into<String>) -> Self {
        Self::HandlerPanic { message: message.into() }
    }

    /// Create a new CPU affinity error
    pub fn cpu_affinity(message: impl Into<String>) -> Self {
        Self::CpuAffinity { message: message.into() }
    }

    /// Create a new invalid-state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState { message: message.into() }
    }

    /// Whether the caller can reasonably retry or continue after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::QueueFull | Self::UnknownExchange { .. } | Self::HandlerPanic { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = EngineError::config("ring capacity must be a power of two");
        assert!(matches!(err, EngineError::InvalidConfig { .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_error_classification() {
        assert!(EngineError::QueueFull.is_recoverable());
        assert!(EngineError::UnknownExchange { exchange_id: 7 }.is_recoverable());
        assert!(!EngineError::invalid_state("start after stop").is_recoverable());
    }
}
