//! WebSocket connection to an out-of-process guest runtime.
//!
//! # Event Loop
//!
//! The connection spawns a tokio task that handles:
//!
//! - Text frames from the guest, fed to [`BridgeChannel::receive`]
//! - Delivery scripts from the [`SocketSink`], written as text frames
//! - Detaching the channel once the guest goes away

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message as Frame;
use tracing::{debug, error, trace, warn};

use crate::bridge::{BridgeChannel, GuestSink};
use crate::error::{Error, Result};
use crate::identifiers::ChannelId;

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Write a delivery script.
    Evaluate(String),
    /// Close the socket.
    Shutdown,
}

// ============================================================================
// SocketSink
// ============================================================================

/// [`GuestSink`] writing delivery scripts to a guest socket.
pub struct SocketSink {
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    channel: ChannelId,
}

impl SocketSink {
    /// Queues a script for the socket.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] once the event loop has stopped.
    pub fn send_script(&self, script: impl Into<String>) -> Result<()> {
        self.command_tx
            .send(ConnectionCommand::Evaluate(script.into()))
            .map_err(|_| Error::ConnectionClosed)
    }
}

impl GuestSink for SocketSink {
    fn evaluate(&self, script: &str) {
        if let Err(e) = self.send_script(script) {
            debug!(channel = %self.channel, error = %e, "Script not delivered");
        }
    }
}

impl fmt::Debug for SocketSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketSink")
            .field("channel", &self.channel)
            .field("closed", &self.command_tx.is_closed())
            .finish()
    }
}

// ============================================================================
// GuestConnection
// ============================================================================

/// WebSocket connection to one guest runtime.
///
/// # Thread Safety
///
/// `GuestConnection` is `Send + Sync`. Dropping it does not close the
/// socket; the event loop runs until the guest disconnects or
/// [`shutdown`](Self::shutdown) is called.
pub struct GuestConnection {
    /// Sink handed to the channel's host.
    sink: Arc<SocketSink>,
    /// Channel fed by this connection.
    channel: BridgeChannel,
}

impl GuestConnection {
    /// Wraps an upgraded stream and spawns its event loop.
    pub(crate) fn new(ws_stream: WebSocketStream<TcpStream>, channel: BridgeChannel) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let sink = Arc::new(SocketSink {
            command_tx,
            channel: channel.id(),
        });

        let weak: Weak<dyn GuestSink> = Arc::downgrade(&(Arc::clone(&sink) as Arc<dyn GuestSink>));
        tokio::spawn(Self::run_event_loop(
            ws_stream,
            command_rx,
            channel.clone(),
            weak,
        ));

        Self { sink, channel }
    }

    /// Sink for the channel's [`Host`](crate::Host).
    #[must_use]
    pub fn sink(&self) -> Arc<dyn GuestSink> {
        Arc::clone(&self.sink) as Arc<dyn GuestSink>
    }

    /// Channel fed by this connection.
    #[inline]
    #[must_use]
    pub fn channel(&self) -> &BridgeChannel {
        &self.channel
    }

    /// Returns `true` once the event loop has stopped.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sink.command_tx.is_closed()
    }

    /// Closes the socket.
    pub fn shutdown(&self) {
        let _ = self.sink.command_tx.send(ConnectionCommand::Shutdown);
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop(
        ws_stream: WebSocketStream<TcpStream>,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        channel: BridgeChannel,
        sink: Weak<dyn GuestSink>,
    ) {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                frame = ws_read.next() => {
                    match frame {
                        Some(Ok(Frame::Text(text))) => {
                            trace!(channel = %channel.id(), len = text.len(), "Guest frame");
                            channel.receive(text.as_str());
                        }

                        Some(Ok(Frame::Close(_))) => {
                            debug!(channel = %channel.id(), "Guest closed the socket");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(channel = %channel.id(), error = %e, "WebSocket error");
                            break;
                        }

                        None => {
                            debug!(channel = %channel.id(), "WebSocket stream ended");
                            break;
                        }

                        // Binary, Ping, Pong
                        _ => {}
                    }
                }

                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Evaluate(script)) => {
                            if let Err(e) = ws_write.send(Frame::Text(script.into())).await {
                                warn!(channel = %channel.id(), error = %e, "Failed to write script");
                                break;
                            }
                        }

                        Some(ConnectionCommand::Shutdown) => {
                            debug!(channel = %channel.id(), "Shutdown command received");
                            let _ = ws_write.close().await;
                            break;
                        }

                        None => {
                            debug!(channel = %channel.id(), "Command channel closed");
                            break;
                        }
                    }
                }
            }
        }

        command_rx.close();
        Self::detach_if_ours(&channel, &sink);
        debug!(channel = %channel.id(), "Event loop terminated");
    }

    /// Detaches `channel` if its host still delivers through `sink`.
    fn detach_if_ours(channel: &BridgeChannel, sink: &Weak<dyn GuestSink>) {
        let (Some(sink), Some(host)) = (sink.upgrade(), channel.host()) else {
            return;
        };
        if Arc::ptr_eq(&host.sink, &sink) {
            channel.detach();
        }
    }
}

impl fmt::Debug for GuestConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuestConnection")
            .field("channel", &self.channel.id())
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    use tokio::time::{sleep, timeout};
    use tokio_tungstenite::connect_async;

    use crate::bridge::Host;
    use crate::navigation::controller::tests::{RecordingHost, resolver};
    use crate::shell::Shell;
    use crate::transport::GuestServer;

    use super::*;

    async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        for _ in 0..200 {
            if condition() {
                return true;
            }
            sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_round_trip_over_socket() {
        let shell = Shell::builder()
            .resolver(resolver())
            .screen_host(Arc::new(RecordingHost::default()))
            .build()
            .expect("shell");
        let root = shell
            .navigation()
            .register_root(None, "index.html")
            .expect("root");
        let channel = shell.open_channel(root);

        let server = GuestServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
            .await
            .expect("bind");
        let url = server.ws_url();
        let client = tokio::spawn(async move { connect_async(url).await });

        let connection = server.accept(channel.clone()).await.expect("accept");
        channel.attach(Host::new(connection.sink()));
        let (mut guest, _) = client.await.expect("join").expect("connect");

        channel.send_event("hello", None, None);
        guest
            .send(Frame::Text(r#"{"type":"cobaltIsReady"}"#.into()))
            .await
            .expect("send ready");

        let frame = timeout(Duration::from_secs(5), guest.next())
            .await
            .expect("frame in time")
            .expect("stream open")
            .expect("frame ok");
        let Frame::Text(text) = frame else {
            panic!("expected a text frame");
        };
        assert_eq!(
            text.as_str(),
            r#"cobalt.execute({"type":"event","event":"hello"});"#
        );
        assert!(channel.is_ready());

        guest.close(None).await.expect("close");
        assert!(wait_until(|| !channel.is_attached()).await);
        assert!(wait_until(|| connection.is_closed()).await);
    }
}
