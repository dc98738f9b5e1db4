//! WebSocket server guest runtimes connect to.
//!
//! # Connection Flow
//!
//! 1. Bind to `localhost:0` (random port)
//! 2. Hand [`GuestServer::ws_url`] to the out-of-process guest runtime
//! 3. [`GuestServer::accept`] upgrades the connection and wires it to a channel
//! 4. Attach a [`Host`](crate::Host) around [`GuestConnection::sink`]

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::bridge::BridgeChannel;
use crate::error::{Error, Result};

use super::connection::GuestConnection;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for a guest runtime to connect.
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// GuestServer
// ============================================================================

/// A bound WebSocket server accepting guest runtimes.
///
/// # Example
///
/// ```ignore
/// use std::net::{IpAddr, Ipv4Addr};
/// use cobalt_bridge::{GuestServer, Host};
///
/// let server = GuestServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).await?;
/// launch_guest(server.ws_url());
///
/// let connection = server.accept(channel.clone()).await?;
/// channel.attach(Host::new(connection.sink()));
/// ```
#[derive(Debug)]
pub struct GuestServer {
    /// TCP listener for incoming connections.
    listener: TcpListener,
    /// Bound address.
    addr: SocketAddr,
    /// Accept timeout.
    accept_timeout: Duration,
}

impl GuestServer {
    /// Binds to `ip:port`; port 0 lets the OS pick one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn bind(ip: IpAddr, port: u16) -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::new(ip, port)).await?;
        let addr = listener.local_addr()?;

        debug!(port = addr.port(), "Guest server bound");

        Ok(Self {
            listener,
            addr,
            accept_timeout: CONNECTION_TIMEOUT,
        })
    }

    /// Sets the accept timeout.
    #[inline]
    #[must_use]
    pub fn with_accept_timeout(mut self, accept_timeout: Duration) -> Self {
        self.accept_timeout = accept_timeout;
        self
    }

    /// Bound port.
    #[inline]
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Bound address.
    #[inline]
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// WebSocket URL for guests: `ws://{ip}:{port}`.
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Accepts one guest runtime and feeds its frames to `channel`.
    ///
    /// The channel is not attached; inbound messages queue in it until the
    /// caller attaches a host around [`GuestConnection::sink`].
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if no guest connects in time
    /// - [`Error::Connection`] if the WebSocket upgrade fails
    pub async fn accept(&self, channel: BridgeChannel) -> Result<GuestConnection> {
        let timeout_ms = u64::try_from(self.accept_timeout.as_millis()).unwrap_or(u64::MAX);
        let (stream, peer) = timeout(self.accept_timeout, self.listener.accept())
            .await
            .map_err(|_| Error::connection_timeout(timeout_ms))??;

        debug!(%peer, "TCP connection accepted");

        let ws_stream = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|e| Error::connection(format!("WebSocket upgrade failed: {e}")))?;

        info!(%peer, channel = %channel.id(), "Guest runtime connected");

        Ok(GuestConnection::new(ws_stream, channel))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn test_bind_random_port() {
        let server = GuestServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
            .await
            .expect("bind should succeed");

        assert!(server.port() > 0);
        assert_eq!(server.ws_url(), format!("ws://127.0.0.1:{}", server.port()));
        assert_eq!(server.local_addr().ip(), IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[test]
    fn test_connection_timeout_constant() {
        assert_eq!(CONNECTION_TIMEOUT.as_secs(), 30);
    }
}
