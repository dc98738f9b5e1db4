//! Bridge configuration options.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use cobalt_bridge::BridgeOptions;
//!
//! let options = BridgeOptions::new()
//!     .with_bridge_global("app.cobalt")
//!     .with_request_timeout(Duration::from_secs(10))
//!     .with_escape_percent(false);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};
use crate::protocol::ScriptOptions;

// ============================================================================
// Constants
// ============================================================================

/// Default JavaScript global exposing `execute(message)`.
pub const DEFAULT_BRIDGE_GLOBAL: &str = "cobalt";

/// Default expiry of correlated requests.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default cap on correlated requests awaiting a reply.
pub const DEFAULT_MAX_PENDING_REQUESTS: usize = 100;

/// Default web layer fade duration, in seconds.
pub const DEFAULT_WEB_LAYER_FADE_DURATION: f64 = 0.3;

// ============================================================================
// BridgeOptions
// ============================================================================

/// Bridge configuration shared by every channel of a shell.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeOptions {
    /// JavaScript global receiving `execute(..)` calls.
    pub bridge_global: String,

    /// Host bridge version, compared with the guest's readiness announcement.
    pub host_version: String,

    /// Escape `%` as `%25` in delivered scripts.
    pub escape_percent: bool,

    /// Expiry of correlated requests.
    pub request_timeout: Duration,

    /// Cap on correlated requests awaiting a reply, per channel.
    pub max_pending_requests: usize,

    /// Fade duration for `webLayer.show` without one, in seconds.
    pub web_layer_fade_duration: f64,

    /// Infinite scroll trigger offset for routes without one, in percent.
    pub infinite_scroll_offset: u32,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            bridge_global: DEFAULT_BRIDGE_GLOBAL.to_string(),
            host_version: env!("CARGO_PKG_VERSION").to_string(),
            escape_percent: true,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_pending_requests: DEFAULT_MAX_PENDING_REQUESTS,
            web_layer_fade_duration: DEFAULT_WEB_LAYER_FADE_DURATION,
            infinite_scroll_offset: 0,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl BridgeOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the JavaScript bridge global.
    #[inline]
    #[must_use]
    pub fn with_bridge_global(mut self, global: impl Into<String>) -> Self {
        self.bridge_global = global.into();
        self
    }

    /// Sets the host version.
    #[inline]
    #[must_use]
    pub fn with_host_version(mut self, version: impl Into<String>) -> Self {
        self.host_version = version.into();
        self
    }

    /// Enables or disables `%` escaping.
    #[inline]
    #[must_use]
    pub fn with_escape_percent(mut self, escape: bool) -> Self {
        self.escape_percent = escape;
        self
    }

    /// Sets the correlated request expiry.
    #[inline]
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the pending request cap.
    #[inline]
    #[must_use]
    pub fn with_max_pending_requests(mut self, max: usize) -> Self {
        self.max_pending_requests = max;
        self
    }

    /// Sets the default web layer fade duration, in seconds.
    #[inline]
    #[must_use]
    pub fn with_web_layer_fade_duration(mut self, seconds: f64) -> Self {
        self.web_layer_fade_duration = seconds;
        self
    }

    /// Sets the default infinite scroll offset, in percent.
    #[inline]
    #[must_use]
    pub fn with_infinite_scroll_offset(mut self, offset: u32) -> Self {
        self.infinite_scroll_offset = offset;
        self
    }
}

// ============================================================================
// Conversion & Validation
// ============================================================================

impl BridgeOptions {
    /// Script wrapping options for the codec.
    #[must_use]
    pub fn script_options(&self) -> ScriptOptions {
        ScriptOptions {
            bridge_global: self.bridge_global.clone(),
            escape_percent: self.escape_percent,
        }
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if:
    /// - `bridge_global` is not a dotted JavaScript identifier path
    /// - `max_pending_requests` is zero
    /// - `request_timeout` is zero
    /// - `web_layer_fade_duration` is negative or not finite
    pub fn validate(&self) -> Result<()> {
        if !is_identifier_path(&self.bridge_global) {
            return Err(Error::config(format!(
                "Bridge global `{}` is not a JavaScript identifier path.\n\
                 Example: BridgeOptions::new().with_bridge_global(\"app.cobalt\")",
                self.bridge_global
            )));
        }

        if self.max_pending_requests == 0 {
            return Err(Error::config("max_pending_requests must be greater than zero"));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::config("request_timeout must be greater than zero"));
        }

        if !self.web_layer_fade_duration.is_finite() || self.web_layer_fade_duration < 0.0 {
            return Err(Error::config(
                "web_layer_fade_duration must be a non-negative number of seconds",
            ));
        }

        Ok(())
    }
}

/// `a`, `a.b`, `$app._bridge`: non-empty segments of `[A-Za-z_$][A-Za-z0-9_$]*`.
fn is_identifier_path(path: &str) -> bool {
    !path.is_empty()
        && path.split('.').all(|segment| {
            let mut chars = segment.chars();
            chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = BridgeOptions::new();
        assert_eq!(options.bridge_global, "cobalt");
        assert_eq!(options.host_version, env!("CARGO_PKG_VERSION"));
        assert!(options.escape_percent);
        assert_eq!(options.request_timeout.as_secs(), 30);
        assert_eq!(options.max_pending_requests, 100);
        assert!((options.web_layer_fade_duration - 0.3).abs() < f64::EPSILON);
        assert_eq!(options.infinite_scroll_offset, 0);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let options = BridgeOptions::new()
            .with_bridge_global("app.cobalt")
            .with_escape_percent(false)
            .with_max_pending_requests(5)
            .with_infinite_scroll_offset(15);

        assert_eq!(options.bridge_global, "app.cobalt");
        assert!(!options.escape_percent);
        assert_eq!(options.max_pending_requests, 5);
        assert_eq!(options.infinite_scroll_offset, 15);

        let script = options.script_options();
        assert_eq!(script.bridge_global, "app.cobalt");
        assert!(!script.escape_percent);
    }

    #[test]
    fn test_identifier_paths() {
        assert!(is_identifier_path("cobalt"));
        assert!(is_identifier_path("window.$app._bridge2"));
        assert!(!is_identifier_path(""));
        assert!(!is_identifier_path("a..b"));
        assert!(!is_identifier_path("2fast"));
        assert!(!is_identifier_path("a-b"));
        assert!(!is_identifier_path("alert(1);x"));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        assert!(BridgeOptions::new().with_max_pending_requests(0).validate().is_err());
        assert!(
            BridgeOptions::new()
                .with_request_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
        assert!(
            BridgeOptions::new()
                .with_web_layer_fade_duration(-1.0)
                .validate()
                .is_err()
        );
    }
}
