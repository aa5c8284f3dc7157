//! WebSocket socket
//!
//! Carries SIP over WebSocket (RFC 7118) using `tokio-tungstenite`. The
//! handshake offers the `sip` sub-protocol. Opening and reading happen on a
//! background task, which reports through the [`SocketEvents`] handle given to
//! [`Socket::connect`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{SplitSink, StreamExt};
use futures_util::SinkExt;
use http::{HeaderMap, HeaderValue};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::error::{Result, TransportError};
use crate::socket::{Frame, Socket, SocketEvents};

/// Sub-protocol negotiated during the handshake
pub const SIP_SUBPROTOCOL: &str = "sip";

const PROTOCOL_HEADER: &str = "Sec-WebSocket-Protocol";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;

/// A [`Socket`] over a WebSocket connection
pub struct WebSocketSocket {
    url: String,
    sip_uri: String,
    via_transport: String,
    writer: Arc<Mutex<Option<WsWriter>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl WebSocketSocket {
    /// Create a socket for a `ws://` or `wss://` URL
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let (via_transport, rest) = if let Some(rest) = url.strip_prefix("wss://") {
            ("WSS", rest)
        } else if let Some(rest) = url.strip_prefix("ws://") {
            ("WS", rest)
        } else {
            return Err(TransportError::config(format!("invalid WebSocket URL: {}", url)));
        };

        let host = rest.split(['/', '?']).next().unwrap_or_default();
        if host.is_empty() {
            return Err(TransportError::config(format!("WebSocket URL without host: {}", url)));
        }

        Ok(Self {
            sip_uri: format!("sip:{};transport=ws", host),
            via_transport: via_transport.to_string(),
            url,
            writer: Arc::new(Mutex::new(None)),
            reader: Mutex::new(None),
        })
    }

    /// Open the connection and check the negotiated sub-protocol
    async fn handshake(url: &str) -> Result<WsStream> {
        let mut request = url.into_client_request()?;
        request
            .headers_mut()
            .insert(PROTOCOL_HEADER, HeaderValue::from_static(SIP_SUBPROTOCOL));

        let (stream, response) = connect_async(request).await?;
        check_subprotocol(response.headers())?;
        Ok(stream)
    }

    async fn open(url: String, writer: Arc<Mutex<Option<WsWriter>>>, events: SocketEvents) {
        let stream = match Self::handshake(&url).await {
            Ok(stream) => stream,
            Err(e) => {
                debug!(url = %url, error = %e, "WebSocket handshake failed");
                events.disconnected(true, None, Some(e.to_string()));
                return;
            }
        };

        let (sink, mut stream) = stream.split();
        *writer.lock().await = Some(sink);
        events.connected();

        while let Some(message) = stream.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    events.data(Frame::Text(text));
                }
                Ok(Message::Binary(data)) => {
                    events.data(Frame::Binary(Bytes::from(data)));
                }
                Ok(Message::Close(frame)) => {
                    writer.lock().await.take();
                    let (code, reason) = close_details(frame);
                    events.disconnected(false, code, reason);
                    return;
                }
                Ok(_) => {}
                Err(e) => {
                    writer.lock().await.take();
                    events.disconnected(true, None, Some(e.to_string()));
                    return;
                }
            }
        }

        writer.lock().await.take();
        events.disconnected(true, None, Some("connection reset".to_string()));
    }
}

impl fmt::Debug for WebSocketSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketSocket")
            .field("url", &self.url)
            .field("sip_uri", &self.sip_uri)
            .field("via_transport", &self.via_transport)
            .finish()
    }
}

/// The server must echo the `sip` sub-protocol
fn check_subprotocol(headers: &HeaderMap) -> Result<()> {
    match headers.get(PROTOCOL_HEADER).and_then(|v| v.to_str().ok()) {
        Some(protocol) if protocol.eq_ignore_ascii_case(SIP_SUBPROTOCOL) => Ok(()),
        Some(protocol) => Err(TransportError::socket(format!(
            "server selected sub-protocol {} instead of {}",
            protocol, SIP_SUBPROTOCOL
        ))),
        None => Err(TransportError::socket("server did not accept the sip sub-protocol")),
    }
}

fn close_details(frame: Option<CloseFrame<'_>>) -> (Option<u16>, Option<String>) {
    match frame {
        Some(frame) => (Some(u16::from(frame.code)), Some(frame.reason.into_owned())),
        None => (None, None),
    }
}

#[async_trait]
impl Socket for WebSocketSocket {
    fn via_transport(&self) -> &str {
        &self.via_transport
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn sip_uri(&self) -> &str {
        &self.sip_uri
    }

    async fn connect(&self, events: SocketEvents) {
        let mut reader = self.reader.lock().await;
        if let Some(task) = reader.take() {
            task.abort();
        }
        let task = tokio::spawn(Self::open(self.url.clone(), self.writer.clone(), events));
        *reader = Some(task);
    }

    async fn disconnect(&self) {
        if let Some(task) = self.reader.lock().await.take() {
            task.abort();
        }
        if let Some(mut sink) = self.writer.lock().await.take() {
            if let Err(e) = sink.close().await {
                debug!(url = %self.url, error = %e, "error closing WebSocket");
            }
        }
    }

    async fn send(&self, message: &str) -> bool {
        let mut writer = self.writer.lock().await;
        let Some(sink) = writer.as_mut() else {
            return false;
        };
        match sink.send(Message::Text(message.to_string())).await {
            Ok(()) => true,
            Err(e) => {
                warn!(url = %self.url, error = %e, "failed to send WebSocket message");
                false
            }
        }
    }
}
