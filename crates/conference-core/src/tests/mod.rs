//! Conference behavior tests
//!
//! The signaling agent is scripted; session and subscription events are fed
//! through the same sinks a real user agent would use. Tests run on a paused
//! clock so command timeouts elapse instantly.

mod mock_agent;

use std::sync::Arc;
use std::time::Duration;

use crate::conference::Conference;
use crate::config::ConferenceConfig;
use mock_agent::MockAgent;

/// Let the dispatcher drain everything it has been handed
pub(crate) async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// Route conference logs to the test writer
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("confsig_conference_core=debug")
        .with_test_writer()
        .try_init();
}

/// A conference that has joined through a default scripted agent
pub(crate) async fn joined(config: ConferenceConfig) -> (Conference, Arc<MockAgent>) {
    init_tracing();
    let agent = MockAgent::new();
    let conference = Conference::new(agent.clone(), config).unwrap();
    conference.dial_in("800123", "4321").await.unwrap();
    (conference, agent)
}
