//! WebSocket transport for out-of-process guest runtimes.
//!
//! A guest runtime that does not live in an embedded rendering surface (a
//! development shell, a headless test harness) connects over WebSocket.
//! Its text frames are bridge messages; delivery scripts go back as text
//! frames.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                              ┌─────────────────┐
//! │  Shell (Rust)    │                              │  Guest runtime  │
//! │                  │         WebSocket            │                 │
//! │  GuestServer     │◄────────────────────────────►│  cobalt.js      │
//! │  → GuestConnection      localhost:PORT          │  WebSocket      │
//! │  → BridgeChannel │                              │  client         │
//! └──────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `GuestServer::bind` - Bind to localhost with a random port
//! 2. Launch the guest with `GuestServer::ws_url`
//! 3. `GuestServer::accept` - Wait for the guest, wire frames to a channel
//! 4. `BridgeChannel::attach` with a host around `GuestConnection::sink`
//! 5. Socket closes - the channel is detached
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Guest connection and event loop |
//! | `server` | Server binding and acceptance |

// ============================================================================
// Submodules
// ============================================================================

/// Guest connection and event loop.
pub mod connection;

/// WebSocket server for guest runtimes.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{GuestConnection, SocketSink};
pub use server::{CONNECTION_TIMEOUT, GuestServer};
