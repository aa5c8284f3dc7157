//! Transport behavior tests
//!
//! All tests run on a paused clock so timer driven behavior (backoff,
//! keepalive) is deterministic and instantaneous.

mod failover_tests;
mod mock_socket;

use std::time::Duration;

/// Let the control task drain everything it has been handed
pub(crate) async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// Route transport logs to the test writer
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("confsig_sip_transport=debug")
        .with_test_writer()
        .try_init();
}
