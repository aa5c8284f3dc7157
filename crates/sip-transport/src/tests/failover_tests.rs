use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::{sleep, Instant};

use super::mock_socket::{ConnectBehavior, MockSocket};
use crate::config::{RecoveryOptions, TransportConfig};
use crate::events::TransportEvent;
use crate::transport::Transport;

/// A heavier server that never answers and a lighter one that fails once
/// before recovering. The transport must alternate between them with every
/// backoff gap inside the configured bounds and settle on the lighter one.
#[tokio::test(start_paused = true)]
async fn failover_settles_on_recovering_endpoint() {
    let primary = MockSocket::new("wss://primary.example.com", ConnectBehavior::Fail);
    let secondary = MockSocket::new("wss://secondary.example.com", ConnectBehavior::FailTimes(1));

    let config = TransportConfig::new().with_recovery(RecoveryOptions::new(2, 4));
    let transport = Transport::new(vec![primary.endpoint(10.0), secondary.endpoint(5.0)], config).unwrap();

    let attempts: Arc<Mutex<Vec<(Instant, String, u32)>>> = Arc::new(Mutex::new(Vec::new()));
    let mut events = transport.subscribe();
    let log = attempts.clone();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let TransportEvent::Connecting { url, attempts } = event {
                log.lock().unwrap().push((Instant::now(), url, attempts));
            }
        }
    });

    transport.connect().await.unwrap();
    sleep(Duration::from_secs(30)).await;

    assert!(transport.is_connected());
    assert_eq!(transport.url(), "wss://secondary.example.com");
    assert_eq!(transport.recover_attempts(), 0);

    let attempts = attempts.lock().unwrap().clone();
    let urls: Vec<&str> = attempts.iter().map(|(_, url, _)| url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "wss://primary.example.com",
            "wss://secondary.example.com",
            "wss://primary.example.com",
            "wss://secondary.example.com",
        ]
    );
    let counters: Vec<u32> = attempts.iter().map(|(_, _, n)| *n).collect();
    assert_eq!(counters, vec![0, 1, 2, 3]);

    for pair in attempts.windows(2) {
        let gap = pair[1].0 - pair[0].0;
        assert!(gap >= Duration::from_secs(2), "gap too short: {:?}", gap);
        assert!(gap <= Duration::from_secs(4), "gap too long: {:?}", gap);
    }

    assert_eq!(primary.connects(), 2);
    assert_eq!(secondary.connects(), 2);
}

/// With a single endpoint the set is reset after every failure, so the
/// transport keeps retrying the same server.
#[tokio::test(start_paused = true)]
async fn single_failing_endpoint_is_retried_forever() {
    let only = MockSocket::new("wss://only.example.com", ConnectBehavior::Fail);
    let config = TransportConfig::new().with_recovery(RecoveryOptions::new(2, 4));
    let transport = Transport::new(vec![only.endpoint(0.0)], config).unwrap();

    transport.connect().await.unwrap();
    sleep(Duration::from_secs(40)).await;

    // at most 4s apart over 40s
    assert!(only.connects() >= 10, "only {} attempts", only.connects());
    assert!(!transport.is_connected());
    assert!(transport.recover_attempts() >= 10);
}
