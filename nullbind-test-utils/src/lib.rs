//! Shared test helpers: tracing setup and a scripted in-memory backend.

use std::sync::Once;

pub mod scripted;

pub use scripted::{
    Event, ExecuteFailure, HandleKind, Journal, Script, ScriptedBackend, ScriptedDatabase,
    ScriptedSession, ScriptedStatement,
};

static INIT: Once = Once::new();

/// Filter used when `RUST_LOG` is unset or unparsable.
const DEFAULT_TEST_FILTER: &str = "warn,nullbind=info";

/// Initialize tracing for test binaries. Safe to call multiple times.
///
/// Output goes through the test writer, so libtest captures it per test and
/// only shows it for failing tests (or with `--nocapture`). `RUST_LOG`
/// overrides the default filter.
pub fn init_tracing_for_tests() {
    INIT.call_once(|| {
        use tracing_subscriber::filter::EnvFilter;
        use tracing_subscriber::fmt;
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_TEST_FILTER));
        // Another subscriber may already be installed by the test binary.
        let _ = fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_test_writer()
            .try_init();
    });
}
