//! Process-global `tracing` init, the way `hdds-gateway`'s `main.rs` wires up
//! `tracing_subscriber::fmt` for its own gateway process.
//!
//! The engine itself never calls this — a library shouldn't install a global
//! subscriber behind its caller's back. It's here for binaries and tests that
//! embed the engine and want the crate's `tracing` output on stderr without
//! hand-rolling the boilerplate, and it's safe to call more than once (only
//! the first call takes effect).

use once_cell::sync::OnceCell;

static INIT: OnceCell<()> = OnceCell::new();

/// Install a `tracing_subscriber::fmt` subscriber at `level`, once per
/// process. Subsequent calls, even at a different level, are no-ops.
pub fn init_tracing(level: tracing::Level) {
    INIT.get_or_init(|| {
        tracing_subscriber::fmt().with_max_level(level).with_target(false).init();
    });
}
