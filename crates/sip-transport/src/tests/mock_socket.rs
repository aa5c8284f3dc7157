//! Scripted socket used by the transport tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use crate::endpoint::Endpoint;
use crate::socket::{Frame, Socket, SocketEvents};
use crate::transport::{KEEP_ALIVE_ACK, KEEP_ALIVE_PROBE};

/// What the socket does when asked to connect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectBehavior {
    /// Report the socket open right away
    Succeed,
    /// Report an abnormal close right away
    Fail,
    /// Fail this many times, then succeed
    FailTimes(usize),
    /// Never report anything
    Hang,
}

#[derive(Debug)]
pub struct MockSocket {
    url: String,
    behavior: Mutex<ConnectBehavior>,
    answer_keep_alives: AtomicBool,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    sent: Mutex<Vec<String>>,
    events: Mutex<Option<SocketEvents>>,
}

impl MockSocket {
    pub fn new(url: &str, behavior: ConnectBehavior) -> Arc<Self> {
        Arc::new(Self {
            url: url.to_string(),
            behavior: Mutex::new(behavior),
            answer_keep_alives: AtomicBool::new(true),
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
            events: Mutex::new(None),
        })
    }

    pub fn endpoint(self: &Arc<Self>, weight: f64) -> Endpoint {
        Endpoint::new(self.clone(), weight).unwrap()
    }

    pub fn answer_keep_alives(&self, answer: bool) {
        self.answer_keep_alives.store(answer, Ordering::SeqCst);
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn probes(&self) -> usize {
        self.sent().iter().filter(|m| m.as_str() == KEEP_ALIVE_PROBE).count()
    }

    /// The events handle of the most recent connect
    pub fn events(&self) -> SocketEvents {
        self.events.lock().unwrap().clone().expect("socket was never connected")
    }

    /// Simulate the server dropping the connection
    pub fn drop_connection(&self) {
        self.events().disconnected(true, Some(1006), Some("connection reset".to_string()));
    }

    pub fn receive_text(&self, text: &str) {
        self.events().data(Frame::Text(text.to_string()));
    }

    pub fn receive_binary(&self, data: &[u8]) {
        self.events().data(Frame::Binary(Bytes::copy_from_slice(data)));
    }
}

#[async_trait]
impl Socket for MockSocket {
    fn via_transport(&self) -> &str {
        "WSS"
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn sip_uri(&self) -> &str {
        &self.url
    }

    async fn connect(&self, events: SocketEvents) {
        self.connects.fetch_add(1, Ordering::SeqCst);
        *self.events.lock().unwrap() = Some(events.clone());

        let succeed = {
            let mut behavior = self.behavior.lock().unwrap();
            match *behavior {
                ConnectBehavior::Succeed => Some(true),
                ConnectBehavior::Fail => Some(false),
                ConnectBehavior::Hang => None,
                ConnectBehavior::FailTimes(0) => {
                    *behavior = ConnectBehavior::Succeed;
                    Some(true)
                }
                ConnectBehavior::FailTimes(n) => {
                    *behavior = ConnectBehavior::FailTimes(n - 1);
                    Some(false)
                }
            }
        };

        match succeed {
            Some(true) => {
                events.connected();
            }
            Some(false) => {
                events.disconnected(true, Some(1006), Some("connection refused".to_string()));
            }
            None => {}
        }
    }

    async fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }

    async fn send(&self, message: &str) -> bool {
        self.sent.lock().unwrap().push(message.to_string());
        if message == KEEP_ALIVE_PROBE && self.answer_keep_alives.load(Ordering::SeqCst) {
            self.receive_text(KEEP_ALIVE_ACK);
        }
        true
    }
}
