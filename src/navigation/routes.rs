//! Route resolution: `(controller, page)` to a screen descriptor.
//!
//! [`RouteTable`] is the stock resolver, loaded from the bridge's JSON
//! configuration document:
//!
//! ```json
//! {
//!   "controllers": {
//!     "default": { "kind": "WebScreen" },
//!     "detail":  { "kind": "DetailScreen", "pullToRefresh": true,
//!                  "infiniteScroll": true, "infiniteScrollOffset": 20,
//!                  "bars": { "title": "Detail" } }
//!   }
//! }
//! ```
//!
//! `android` is accepted as an alias of `kind`. A controller missing from the
//! table falls back to `default`.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Controller used when the guest names none or an unknown one.
pub const DEFAULT_CONTROLLER: &str = "default";

// ============================================================================
// ScreenDescriptor
// ============================================================================

/// Everything the screen host needs to open a screen.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScreenDescriptor {
    /// Concrete host screen kind.
    pub kind: String,
    /// Controller name the descriptor was resolved from.
    pub controller: Option<String>,
    /// Page to load.
    pub page: String,
    /// Pull-to-refresh enabled.
    pub pull_to_refresh: bool,
    /// Infinite scroll enabled.
    pub infinite_scroll: bool,
    /// Infinite scroll trigger offset, in percent of the content height.
    pub infinite_scroll_offset: u32,
    /// Bars configuration.
    pub bars: Option<Value>,
    /// Navigation payload for the new screen.
    pub data: Option<Value>,
}

impl ScreenDescriptor {
    /// Creates a descriptor with default options.
    #[must_use]
    pub fn new(kind: impl Into<String>, page: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            page: page.into(),
            ..Self::default()
        }
    }

    /// Sets the navigation payload.
    #[inline]
    #[must_use]
    pub fn with_data(mut self, data: Option<Value>) -> Self {
        self.data = data;
        self
    }

    /// Overrides the bars configuration when `bars` is set.
    #[inline]
    #[must_use]
    pub fn with_bars(mut self, bars: Option<Value>) -> Self {
        if bars.is_some() {
            self.bars = bars;
        }
        self
    }
}

// ============================================================================
// RouteResolver
// ============================================================================

/// Maps a guest navigation target to a host screen.
pub trait RouteResolver: Send + Sync {
    /// Resolves a target; `None` if the host has no screen for it.
    fn resolve(&self, controller: Option<&str>, page: &str) -> Option<ScreenDescriptor>;
}

impl<F> RouteResolver for F
where
    F: Fn(Option<&str>, &str) -> Option<ScreenDescriptor> + Send + Sync,
{
    fn resolve(&self, controller: Option<&str>, page: &str) -> Option<ScreenDescriptor> {
        self(controller, page)
    }
}

// ============================================================================
// RouteTable
// ============================================================================

/// One controller entry of the configuration document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerConfig {
    /// Concrete host screen kind.
    #[serde(alias = "android")]
    pub kind: String,
    /// Pull-to-refresh enabled.
    #[serde(default)]
    pub pull_to_refresh: bool,
    /// Infinite scroll enabled.
    #[serde(default)]
    pub infinite_scroll: bool,
    /// Infinite scroll trigger offset; `None` uses the bridge default.
    #[serde(default)]
    pub infinite_scroll_offset: Option<u32>,
    /// Default bars configuration.
    #[serde(default)]
    pub bars: Option<Value>,
}

impl ControllerConfig {
    /// Creates an entry with default options.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            pull_to_refresh: false,
            infinite_scroll: false,
            infinite_scroll_offset: None,
            bars: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RouteDocument {
    #[serde(default)]
    controllers: FxHashMap<String, ControllerConfig>,
}

/// Table-driven [`RouteResolver`].
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    controllers: FxHashMap<String, ControllerConfig>,
    default_scroll_offset: u32,
}

impl RouteTable {
    /// Creates an empty table.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RouteConfig`] if the text is not a valid document.
    pub fn from_json(text: &str) -> Result<Self> {
        let document: RouteDocument = serde_json::from_str(text)
            .map_err(|e| Error::route_config(format!("invalid route document: {e}")))?;

        debug!(controllers = document.controllers.len(), "Route table loaded");

        Ok(Self {
            controllers: document.controllers,
            default_scroll_offset: 0,
        })
    }

    /// Adds or replaces a controller entry.
    #[must_use]
    pub fn with_controller(mut self, name: impl Into<String>, config: ControllerConfig) -> Self {
        self.controllers.insert(name.into(), config);
        self
    }

    /// Sets the infinite scroll offset used when an entry has none.
    #[inline]
    #[must_use]
    pub fn with_default_scroll_offset(mut self, offset: u32) -> Self {
        self.default_scroll_offset = offset;
        self
    }

    /// Looks up a controller entry by exact name.
    #[must_use]
    pub fn controller(&self, name: &str) -> Option<&ControllerConfig> {
        self.controllers.get(name)
    }

    /// Returns `true` if some entry maps to this screen kind.
    #[must_use]
    pub fn knows_kind(&self, kind: &str) -> bool {
        self.controllers.values().any(|config| config.kind == kind)
    }

    /// Number of entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    /// Returns `true` if the table has no entries.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }
}

impl RouteResolver for RouteTable {
    fn resolve(&self, controller: Option<&str>, page: &str) -> Option<ScreenDescriptor> {
        let name = controller.unwrap_or(DEFAULT_CONTROLLER);

        let (name, config) = match self.controllers.get(name) {
            Some(config) => (name, config),
            None => {
                if controller.is_some() {
                    warn!(controller = name, "Unknown controller, falling back to default");
                }
                let config = self.controllers.get(DEFAULT_CONTROLLER)?;
                (DEFAULT_CONTROLLER, config)
            }
        };

        Some(ScreenDescriptor {
            kind: config.kind.clone(),
            controller: Some(name.to_string()),
            page: page.to_string(),
            pull_to_refresh: config.pull_to_refresh,
            infinite_scroll: config.infinite_scroll,
            infinite_scroll_offset: config
                .infinite_scroll_offset
                .unwrap_or(self.default_scroll_offset),
            bars: config.bars.clone(),
            data: None,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
