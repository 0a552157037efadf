//! Integration tests for tandem-peer.
//!
//! Tests are organized by functionality:
//! - `negotiation_tests` - offer/answer/ICE exchange between two sessions
//! - `lifecycle_tests` - startup failures, dispose, timeouts and transport loss
//! - `recording_tests` - recorder against live streams


use tracing::Level;

/// Initialize tracing for tests (call once per test).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}
