//! Cobalt bridge - native host side of a hybrid app shell.
//!
//! Native screens host embedded web content (the guest runtime). Both sides
//! talk through JSON messages: the guest calls into the host with text, the
//! host answers by evaluating `cobalt.execute(<json>);` in the guest.
//!
//! # Architecture
//!
//! - Each screen's guest runtime gets a [`BridgeChannel`]: readiness, an
//!   outbound queue held until the guest is ready, an inbound queue held
//!   until the screen attaches its capabilities ([`Host`])
//! - Inbound messages are decoded, turned into a typed [`Route`] and handled
//!   by the [`Dispatcher`] on the UI-owning executor
//! - [`NavigationController`] drives push / pop / pop-to / modal / replace
//!   over an explicit [`NavigationHistory`]
//! - Host → guest requests that expect a reply (back permission,
//!   pull-to-refresh, infinite scroll) are correlated by generated ids
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use cobalt_bridge::{Host, Result, Shell};
//!
//! fn start(screens: Arc<MyScreens>, web_view: Arc<MyWebView>) -> Result<()> {
//!     let shell = Shell::builder()
//!         .routes_json(r#"{"controllers":{"default":{"kind":"Web"}}}"#)
//!         .screen_host(screens)
//!         .build()?;
//!
//!     let root = shell.navigation().register_root(None, "index.html")?;
//!     let channel = shell.open_channel(root);
//!     channel.attach(Host::new(web_view));
//!     channel.resume();
//!
//!     // From the web view's script message handler:
//!     channel.receive(r#"{"type":"cobaltIsReady","version":"0.6.0"}"#);
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bridge`] | [`BridgeChannel`], queues, dispatch, host collaborators |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`executor`] | UI-owning executors: [`UiThread`], [`InlineUi`] |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`navigation`] | [`NavigationController`], history, route resolution |
//! | [`protocol`] | Message envelope, codec, typed routes |
//! | [`shell`] | [`Shell`] composition root and configuration |
//! | [`transport`] | WebSocket transport for out-of-process guests |

// ============================================================================
// Modules
// ============================================================================

/// Channels, queues, dispatch and host collaborators.
pub mod bridge;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// UI-owning execution context.
pub mod executor;

/// Type-safe identifiers.
pub mod identifiers;

/// Screen navigation.
pub mod navigation;

/// Bridge message protocol.
pub mod protocol;

/// Shell composition root.
pub mod shell;

/// WebSocket guest transport.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Bridge types
pub use bridge::{
    BridgeChannel, BridgeHooks, Dispatcher, ExternalLinkOpener, GuestSink, Host, Noop, Plugin,
    PluginManager, PluginRegistry, UiControls, WebLayerHost,
};

// Error types
pub use error::{Error, Result};

// Executor types
pub use executor::{InlineUi, UiExecutor, UiHandle, UiJob, UiThread};

// Identifier types
pub use identifiers::{CallbackId, ChannelId, ScreenId};

// Navigation types
pub use navigation::{
    ControllerConfig, NavigationController, NavigationHistory, RouteResolver, RouteTable, Screen,
    ScreenDescriptor, ScreenHost, Transition,
};

// Protocol types
pub use protocol::{
    DecodeError, Inbound, Message, MessageType, Route, decode, decode_inbound, encode, to_script,
};

// Shell types
pub use shell::{BridgeOptions, Shell, ShellBuilder};

// Transport types
pub use transport::{GuestConnection, GuestServer, SocketSink};
