//! Error types for the bridge.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! Host-facing fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use cobalt_bridge::{Result, Shell};
//!
//! fn open_root(shell: &Shell) -> Result<()> {
//!     let screen = shell.navigation().register_root(None, "index.html")?;
//!     shell.navigation().push(screen, &target)?;
//!     Ok(())
//! }
//! ```
//!
//! Nothing here ever crosses the guest boundary: the inbound path
//! (`BridgeChannel::receive`) turns every error into a `tracing` diagnostic.
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::RouteConfig`] |
//! | Protocol | [`Error::Decode`], [`Error::MissingField`], [`Error::InvalidField`], [`Error::UnknownAction`] |
//! | Navigation | [`Error::UnresolvedRoute`], [`Error::HistoryMatchNotFound`], [`Error::UnknownScreenKind`], [`Error::ScreenNotFound`] |
//! | Channel | [`Error::ChannelDetached`], [`Error::TooManyPendingRequests`], [`Error::UiClosed`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::{ChannelId, ScreenId};
use crate::protocol::DecodeError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for diagnostics.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when shell or bridge options are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Route table could not be loaded.
    #[error("Route configuration error: {message}")]
    RouteConfig {
        /// Description of the problem.
        message: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Inbound text could not be decoded into a message.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A field mandatory for this message kind is absent.
    #[error("Missing field `{field}` in {context}")]
    MissingField {
        /// Dotted path of the missing field (e.g. `data.url`).
        field: String,
        /// Message kind or action being processed.
        context: String,
    },

    /// A field is present but has the wrong shape.
    #[error("Invalid field `{field}`: {message}")]
    InvalidField {
        /// Dotted path of the field.
        field: String,
        /// Why the value was rejected.
        message: String,
    },

    /// An `action` / `control` value outside the known set.
    #[error("Unknown {kind} action: {action}")]
    UnknownAction {
        /// Message kind (navigation, webLayer, ui, ...).
        kind: String,
        /// The unrecognized action.
        action: String,
    },

    // ========================================================================
    // Navigation Errors
    // ========================================================================
    /// The route resolver has no screen for this controller/page.
    #[error("No route for controller={controller:?}, page={page}")]
    UnresolvedRoute {
        /// Controller name requested by the guest.
        controller: Option<String>,
        /// Page requested by the guest.
        page: String,
    },

    /// `popTo` found no matching history entry.
    #[error("No history entry matches controller={controller:?}, page={page}")]
    HistoryMatchNotFound {
        /// Controller name requested by the guest.
        controller: Option<String>,
        /// Page requested by the guest.
        page: String,
    },

    /// Modal dismissal targets a screen kind the host does not know.
    #[error("Unknown screen kind: {kind}")]
    UnknownScreenKind {
        /// The unrecognized kind.
        kind: String,
    },

    /// Screen is not (or no longer) part of the history.
    #[error("Screen not found: {screen_id}")]
    ScreenNotFound {
        /// The missing screen.
        screen_id: ScreenId,
    },

    // ========================================================================
    // Channel Errors
    // ========================================================================
    /// Operation needs an attached host.
    #[error("Channel {channel_id} has no attached host")]
    ChannelDetached {
        /// The detached channel.
        channel_id: ChannelId,
    },

    /// Too many correlated requests are awaiting a guest reply.
    #[error("Too many pending requests: {pending}/{max}")]
    TooManyPendingRequests {
        /// Requests currently pending.
        pending: usize,
        /// Configured maximum.
        max: usize,
    },

    /// The UI execution context has shut down.
    #[error("UI executor closed")]
    UiClosed,

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection timeout waiting for the guest runtime.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// WebSocket connection closed unexpectedly.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a route configuration error.
    #[inline]
    pub fn route_config(message: impl Into<String>) -> Self {
        Self::RouteConfig {
            message: message.into(),
        }
    }

    /// Creates a missing field error.
    #[inline]
    pub fn missing_field(field: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
            context: context.into(),
        }
    }

    /// Creates an invalid field error.
    #[inline]
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an unknown action error.
    #[inline]
    pub fn unknown_action(kind: impl Into<String>, action: impl Into<String>) -> Self {
        Self::UnknownAction {
            kind: kind.into(),
            action: action.into(),
        }
    }

    /// Creates an unresolved route error.
    #[inline]
    pub fn unresolved_route(controller: Option<&str>, page: impl Into<String>) -> Self {
        Self::UnresolvedRoute {
            controller: controller.map(str::to_string),
            page: page.into(),
        }
    }

    /// Creates a history match not found error.
    #[inline]
    pub fn history_match_not_found(controller: Option<&str>, page: impl Into<String>) -> Self {
        Self::HistoryMatchNotFound {
            controller: controller.map(str::to_string),
            page: page.into(),
        }
    }

    /// Creates an unknown screen kind error.
    #[inline]
    pub fn unknown_screen_kind(kind: impl Into<String>) -> Self {
        Self::UnknownScreenKind { kind: kind.into() }
    }

    /// Creates a screen not found error.
    #[inline]
    pub fn screen_not_found(screen_id: ScreenId) -> Self {
        Self::ScreenNotFound { screen_id }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if the guest sent something the protocol rejects.
    #[inline]
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::Decode(_)
                | Self::MissingField { .. }
                | Self::InvalidField { .. }
                | Self::UnknownAction { .. }
        )
    }

    /// Returns `true` if a navigation request could not be carried out.
    #[inline]
    #[must_use]
    pub fn is_navigation_error(&self) -> bool {
        matches!(
            self,
            Self::UnresolvedRoute { .. }
                | Self::HistoryMatchNotFound { .. }
                | Self::UnknownScreenKind { .. }
                | Self::ScreenNotFound { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed when retried later.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. }
                | Self::TooManyPendingRequests { .. }
                | Self::ChannelDetached { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::config("bridge global is empty");
        assert_eq!(
            err.to_string(),
            "Configuration error: bridge global is empty"
        );

        let err = Error::missing_field("data.url", "intent");
        assert_eq!(err.to_string(), "Missing field `data.url` in intent");

        let err = Error::unresolved_route(Some("detail"), "detail.html");
        assert!(err.to_string().contains("detail.html"));
    }

    #[test]
    fn test_is_protocol_error() {
        assert!(Error::missing_field("action", "navigation").is_protocol_error());
        assert!(Error::unknown_action("webLayer", "spin").is_protocol_error());
        assert!(!Error::ConnectionClosed.is_protocol_error());
    }

    #[test]
    fn test_is_navigation_error() {
        assert!(Error::unresolved_route(None, "a.html").is_navigation_error());
        assert!(Error::history_match_not_found(None, "a.html").is_navigation_error());
        assert!(Error::unknown_screen_kind("Nope").is_navigation_error());
        assert!(!Error::config("x").is_navigation_error());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("test").is_connection_error());
        assert!(Error::connection_timeout(1000).is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(!Error::config("test").is_connection_error());
    }

    #[test]
    fn test_is_recoverable() {
        let pending = Error::TooManyPendingRequests {
            pending: 100,
            max: 100,
        };
        assert!(pending.is_recoverable());
        assert!(!Error::config("test").is_recoverable());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
