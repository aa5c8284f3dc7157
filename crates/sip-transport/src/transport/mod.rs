//! Multi-endpoint transport
//!
//! [`Transport`] is a cheap, cloneable handle. All state lives in a single
//! control task that owns the endpoint set, the connection status and the
//! three timers (reconnect, keepalive, keepalive acknowledgment). Socket
//! events, timer expirations and handle commands are processed one at a
//! time by that task, so none of the state needs locking.
//!
//! ```text
//!   Transport (handle) ──commands──┐
//!                                  ▼
//!   Socket ──SocketEvents──► control task ──► TransportEvent broadcast
//!                                  ▲
//!          reconnect / keepalive / ack-timeout timers
//! ```

pub mod timing;
#[cfg(feature = "ws")]
pub mod ws;

use std::pin::Pin;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{sleep, Sleep};
use tracing::{debug, info, warn};

use crate::config::TransportConfig;
use crate::endpoint::{Endpoint, EndpointSet};
use crate::error::{Result, TransportError};
use crate::events::{TransportEvent, TransportEventEmitter};
use crate::socket::{Frame, SocketEvent, SocketEvents};

use self::timing::{keep_alive_interval, reconnect_interval};

/// Probe sent by the client to check the connection is alive
pub const KEEP_ALIVE_PROBE: &str = "\r\n\r\n";
/// Bare acknowledgment the server answers a probe with
pub const KEEP_ALIVE_ACK: &str = "\r\n";

/// Connection status of the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportStatus {
    Connected,
    Connecting,
    Disconnected,
}

/// Point-in-time view of the transport published by the control task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportSnapshot {
    pub status: TransportStatus,
    /// URL of the active endpoint
    pub url: String,
    /// Via transport token of the active endpoint
    pub via_transport: String,
    /// SIP URI of the active endpoint
    pub sip_uri: String,
    /// Reconnection attempts since the last successful connect
    pub recover_attempts: u32,
}

enum Command {
    Connect { done: oneshot::Sender<()> },
    Disconnect { done: oneshot::Sender<()> },
    Send { message: String, respond_to: oneshot::Sender<bool> },
    SetEndpoints { endpoints: Vec<Endpoint>, done: oneshot::Sender<Result<()>> },
}

/// Handle to the signaling transport
///
/// Must be created from within a Tokio runtime. The control task stops, after
/// disconnecting, once every handle has been dropped.
#[derive(Clone)]
pub struct Transport {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<TransportSnapshot>,
    events: TransportEventEmitter,
}

impl Transport {
    /// Create a transport over `endpoints` and select the initial endpoint
    pub fn new(endpoints: Vec<Endpoint>, config: TransportConfig) -> Result<Self> {
        Self::with_rng(endpoints, config, SmallRng::from_entropy())
    }

    /// Same as [`Transport::new`] with a caller supplied random source
    pub fn with_rng(endpoints: Vec<Endpoint>, config: TransportConfig, mut rng: SmallRng) -> Result<Self> {
        config.validate()?;
        let mut endpoints = EndpointSet::new(endpoints)?;
        endpoints.select(&mut rng);

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (socket_tx, socket_rx) = mpsc::unbounded_channel();
        let events = TransportEventEmitter::new(config.event_capacity);

        let initial = snapshot_of(&endpoints, TransportStatus::Disconnected, 0);
        let (snapshot_tx, snapshot_rx) = watch::channel(initial);

        let actor = TransportActor {
            endpoints,
            config,
            status: TransportStatus::Disconnected,
            recover_attempts: 0,
            close_requested: false,
            binding: 0,
            rng,
            reconnect_timer: None,
            keep_alive_timer: None,
            keep_alive_timeout: None,
            commands: commands_rx,
            socket_tx,
            socket_rx,
            snapshot: snapshot_tx,
            events: events.clone(),
        };
        tokio::spawn(actor.run());

        Ok(Self {
            commands: commands_tx,
            snapshot: snapshot_rx,
            events,
        })
    }

    /// Start connecting; a no-op when connected or already connecting
    pub async fn connect(&self) -> Result<()> {
        let (done, rx) = oneshot::channel();
        self.request(Command::Connect { done })?;
        rx.await.map_err(|_| TransportError::ChannelClosed)
    }

    /// Tear the connection down and cancel every pending timer
    ///
    /// Safe to call in any state, any number of times.
    pub async fn disconnect(&self) -> Result<()> {
        let (done, rx) = oneshot::channel();
        self.request(Command::Disconnect { done })?;
        rx.await.map_err(|_| TransportError::ChannelClosed)
    }

    /// Send a message over the active socket
    ///
    /// Returns `false`, without touching the socket, when not connected.
    pub async fn send(&self, message: impl Into<String>) -> bool {
        let (respond_to, rx) = oneshot::channel();
        let command = Command::Send {
            message: message.into(),
            respond_to,
        };
        if self.request(command).is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Replace the endpoint set, e.g. with the servers offered by a redirect
    ///
    /// A live connection is torn down first, as by [`Transport::disconnect`].
    /// The next endpoint is then selected from the new set; the caller
    /// reconnects when ready.
    pub async fn set_endpoints(&self, endpoints: Vec<Endpoint>) -> Result<()> {
        let (done, rx) = oneshot::channel();
        self.request(Command::SetEndpoints { endpoints, done })?;
        rx.await.map_err(|_| TransportError::ChannelClosed)?
    }

    pub fn status(&self) -> TransportStatus {
        self.snapshot.borrow().status
    }

    pub fn is_connected(&self) -> bool {
        self.status() == TransportStatus::Connected
    }

    pub fn is_connecting(&self) -> bool {
        self.status() == TransportStatus::Connecting
    }

    pub fn url(&self) -> String {
        self.snapshot.borrow().url.clone()
    }

    pub fn via_transport(&self) -> String {
        self.snapshot.borrow().via_transport.clone()
    }

    pub fn sip_uri(&self) -> String {
        self.snapshot.borrow().sip_uri.clone()
    }

    pub fn recover_attempts(&self) -> u32 {
        self.snapshot.borrow().recover_attempts
    }

    /// Watch status changes
    pub fn watch(&self) -> watch::Receiver<TransportSnapshot> {
        self.snapshot.clone()
    }

    /// Subscribe to transport events; drop the receiver to unsubscribe
    pub fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.events.subscribe()
    }

    fn request(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| TransportError::ChannelClosed)
    }
}

fn snapshot_of(endpoints: &EndpointSet, status: TransportStatus, recover_attempts: u32) -> TransportSnapshot {
    let socket = endpoints.active().socket();
    TransportSnapshot {
        status,
        url: socket.url().to_string(),
        via_transport: socket.via_transport().to_string(),
        sip_uri: socket.sip_uri().to_string(),
        recover_attempts,
    }
}

async fn expired(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer.as_mut() {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}

struct TransportActor {
    endpoints: EndpointSet,
    config: TransportConfig,
    status: TransportStatus,
    recover_attempts: u32,
    close_requested: bool,
    /// Tag of the socket binding whose events are accepted
    binding: u64,
    rng: SmallRng,
    reconnect_timer: Option<Pin<Box<Sleep>>>,
    keep_alive_timer: Option<Pin<Box<Sleep>>>,
    keep_alive_timeout: Option<Pin<Box<Sleep>>>,
    commands: mpsc::UnboundedReceiver<Command>,
    socket_tx: mpsc::UnboundedSender<(u64, SocketEvent)>,
    socket_rx: mpsc::UnboundedReceiver<(u64, SocketEvent)>,
    snapshot: watch::Sender<TransportSnapshot>,
    events: TransportEventEmitter,
}

impl TransportActor {
    async fn run(mut self) {
        debug!(url = self.url(), "transport control task started");

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(command) => self.handle_command(command).await,
                        None => {
                            debug!("all transport handles dropped, shutting down");
                            self.disconnect().await;
                            break;
                        }
                    }
                }

                Some((binding, event)) = self.socket_rx.recv() => {
                    if binding == self.binding {
                        self.handle_socket_event(event).await;
                    } else {
                        debug!(binding, current = self.binding, "discarding event from unbound socket");
                    }
                }

                () = expired(&mut self.reconnect_timer) => {
                    self.reconnect_timer = None;
                    self.on_reconnect_timer().await;
                }

                () = expired(&mut self.keep_alive_timer) => {
                    self.keep_alive_timer = None;
                    self.send_keep_alive().await;
                    self.start_keep_alives();
                }

                () = expired(&mut self.keep_alive_timeout) => {
                    self.keep_alive_timeout = None;
                    warn!(url = self.url(), "keepalive acknowledgment timed out");
                }
            }
        }
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect { done } => {
                self.connect().await;
                let _ = done.send(());
            }
            Command::Disconnect { done } => {
                self.disconnect().await;
                let _ = done.send(());
            }
            Command::Send { message, respond_to } => {
                let sent = self.send(&message).await;
                let _ = respond_to.send(sent);
            }
            Command::SetEndpoints { endpoints, done } => {
                let _ = done.send(self.set_endpoints(endpoints).await);
            }
        }
    }

    async fn handle_socket_event(&mut self, event: SocketEvent) {
        match event {
            SocketEvent::Connected => self.on_connect(),
            SocketEvent::Disconnected { error, code, reason } => self.on_disconnect(error, code, reason),
            SocketEvent::Data(frame) => self.on_data(frame),
        }
    }

    async fn connect(&mut self) {
        match self.status {
            TransportStatus::Connected => {
                debug!("transport is already connected");
                return;
            }
            TransportStatus::Connecting => {
                debug!("transport is connecting");
                return;
            }
            TransportStatus::Disconnected => {}
        }

        self.close_requested = false;
        self.status = TransportStatus::Connecting;
        self.publish();

        info!(url = self.url(), attempts = self.recover_attempts, "connecting");
        self.events.emit(TransportEvent::Connecting {
            url: self.url().to_string(),
            attempts: self.recover_attempts,
        });

        // a disconnect bumps the binding, so whatever this socket reports
        // afterwards is dropped
        self.binding += 1;
        let events = SocketEvents::new(self.binding, self.socket_tx.clone());
        let socket = self.endpoints.active().socket().clone();
        socket.connect(events).await;
    }

    async fn disconnect(&mut self) {
        debug!(url = self.url(), "disconnect requested");

        self.close_requested = true;
        self.recover_attempts = 0;
        self.status = TransportStatus::Disconnected;

        self.reconnect_timer = None;
        self.stop_keep_alives();

        // Unbind: anything the socket still reports carries a stale tag.
        self.binding += 1;

        let socket = self.endpoints.active().socket().clone();
        socket.disconnect().await;
        self.publish();

        self.events.emit(TransportEvent::Disconnected {
            url: self.url().to_string(),
            error: false,
            code: None,
            reason: None,
            requested: true,
        });
    }

    async fn set_endpoints(&mut self, endpoints: Vec<Endpoint>) -> Result<()> {
        let endpoints = EndpointSet::new(endpoints)?;
        if self.status != TransportStatus::Disconnected {
            self.disconnect().await;
        }

        debug!(endpoints = endpoints.len(), "replacing endpoint set");
        self.endpoints = endpoints;
        self.endpoints.select(&mut self.rng);
        self.publish();
        Ok(())
    }

    async fn send(&mut self, message: &str) -> bool {
        if self.status != TransportStatus::Connected {
            warn!("unable to send message, transport is not connected");
            return false;
        }

        if message == KEEP_ALIVE_PROBE {
            debug!("sending keep alive message");
        } else {
            debug!(body = message, "sending message");
        }

        let socket = self.endpoints.active().socket().clone();
        socket.send(message).await
    }

    fn on_connect(&mut self) {
        self.recover_attempts = 0;
        self.status = TransportStatus::Connected;
        self.reconnect_timer = None;
        self.start_keep_alives();
        self.publish();

        info!(url = self.url(), "transport connected");
        self.events.emit(TransportEvent::Connected {
            url: self.url().to_string(),
        });
    }

    fn on_disconnect(&mut self, error: bool, code: Option<u16>, reason: Option<String>) {
        self.status = TransportStatus::Disconnected;
        self.stop_keep_alives();
        self.publish();

        self.events.emit(TransportEvent::Disconnected {
            url: self.url().to_string(),
            error,
            code,
            reason: reason.clone(),
            requested: self.close_requested,
        });

        if self.close_requested {
            return;
        }

        warn!(url = self.url(), error, code, reason = reason.as_deref(), "connection lost");
        self.endpoints.mark_active_errored();
        self.schedule_reconnect();
    }

    fn on_data(&mut self, frame: Frame) {
        let message = match frame {
            Frame::Text(text) if text == KEEP_ALIVE_ACK => {
                debug!("received CRLF keep alive response");
                self.keep_alive_timeout = None;
                return;
            }
            Frame::Text(text) => {
                debug!(body = %text, "received text message");
                text
            }
            Frame::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
                Ok(text) => {
                    debug!(body = %text, "received binary message");
                    text
                }
                Err(e) => {
                    debug!(error = %e, "binary message could not be decoded, discarded");
                    return;
                }
            },
        };

        self.events.emit(TransportEvent::Data { message });
    }

    fn schedule_reconnect(&mut self) {
        self.recover_attempts += 1;
        let interval = reconnect_interval(self.recover_attempts, &self.config.recovery, &mut self.rng);

        info!(
            attempt = self.recover_attempts,
            next_attempt_secs = interval.as_secs(),
            "reconnection scheduled"
        );

        self.reconnect_timer = Some(Box::pin(sleep(interval)));
        self.publish();
    }

    async fn on_reconnect_timer(&mut self) {
        if self.close_requested || self.status != TransportStatus::Disconnected {
            return;
        }
        self.endpoints.select(&mut self.rng);
        self.publish();
        self.connect().await;
    }

    fn start_keep_alives(&mut self) {
        if self.config.keep_alive.is_enabled() && self.keep_alive_timer.is_none() {
            let interval = keep_alive_interval(self.config.keep_alive.interval_secs, &mut self.rng);
            self.keep_alive_timer = Some(Box::pin(sleep(interval)));
        }
    }

    fn stop_keep_alives(&mut self) {
        self.keep_alive_timer = None;
        self.keep_alive_timeout = None;
    }

    async fn send_keep_alive(&mut self) {
        if self.keep_alive_timeout.is_some() {
            return;
        }
        self.keep_alive_timeout = Some(Box::pin(sleep(self.config.keep_alive.timeout())));
        self.send(KEEP_ALIVE_PROBE).await;
    }

    fn url(&self) -> &str {
        self.endpoints.active().socket().url()
    }

    fn publish(&self) {
        self.snapshot
            .send_replace(snapshot_of(&self.endpoints, self.status, self.recover_attempts));
    }
}
