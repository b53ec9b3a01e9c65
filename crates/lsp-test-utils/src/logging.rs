//! Tracing output for tests.
//!
//! Resolution logs and install steps are emitted through `tracing`; with a
//! subscriber installed they show up in the captured output of a failing
//! test. Verbosity follows `RUST_LOG`, defaulting to "info".

use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static INIT: Once = Once::new();

/// Install the global subscriber once per test binary. Later calls, or a
/// subscriber installed elsewhere, are left alone.
pub fn init() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new("info"))
            .unwrap_or_else(|_| EnvFilter::new("info"));
        let fmt_layer = fmt::layer()
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(true)
            .compact();

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init();
    });
}
