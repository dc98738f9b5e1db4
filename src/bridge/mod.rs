//! Native ↔ guest message bridge.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`BridgeChannel`] | One guest runtime: readiness, queues, send/receive |
//! | [`Dispatcher`] | Routes a decoded message to its handler |
//! | [`OutboundQueue`] / [`InboundQueue`] | Buffers while the peer cannot take messages |
//! | [`PendingRequests`] | Host → guest requests awaiting a reply |
//! | [`Host`] | Capabilities a screen lends its channel |
//! | [`PluginManager`] | Name-keyed [`PluginRegistry`] |

// ============================================================================
// Submodules
// ============================================================================

/// Bridge channel.
pub mod channel;

/// Inbound dispatch.
pub mod dispatcher;

/// Host collaborators and plugins.
pub mod host;

/// Correlated requests.
pub mod pending;

/// Message queues.
pub mod queue;

// ============================================================================
// Re-exports
// ============================================================================

pub use channel::BridgeChannel;
pub use dispatcher::Dispatcher;
pub use host::{
    BridgeHooks, ExternalLinkOpener, GuestSink, Host, Noop, Plugin, PluginManager,
    PluginRegistry, UiControls, WebLayerHost,
};
pub use pending::{PendingRequest, PendingRequests};
pub use queue::{InboundQueue, OutboundQueue};
