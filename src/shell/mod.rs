//! Native host shell.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Shell`] | Shared services and the open channels |
//! | [`ShellBuilder`] | Fluent configuration builder |
//! | [`BridgeOptions`] | Bridge configuration |
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use cobalt_bridge::{Host, Shell};
//!
//! let shell = Shell::builder()
//!     .routes_json(r#"{"controllers":{"default":{"kind":"Web"}}}"#)
//!     .screen_host(Arc::new(MyScreens::default()))
//!     .build()?;
//!
//! let root = shell.navigation().register_root(None, "index.html")?;
//! let channel = shell.open_channel(root);
//! channel.attach(Host::new(Arc::new(MyWebView::default())));
//! channel.resume();
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder for shell configuration.
pub mod builder;

/// Core shell implementation.
pub mod core;

/// Bridge options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ShellBuilder;
pub use core::Shell;
pub use options::{
    BridgeOptions, DEFAULT_BRIDGE_GLOBAL, DEFAULT_MAX_PENDING_REQUESTS, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_WEB_LAYER_FADE_DURATION,
};
