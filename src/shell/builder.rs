//! Builder for shell configuration.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use cobalt_bridge::{Shell, UiThread};
//!
//! let shell = Shell::builder()
//!     .routes_json(include_str!("cobalt.json"))
//!     .screen_host(Arc::new(MyScreens::default()))
//!     .executor(Arc::new(UiThread::spawn()))
//!     .build()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::debug;

use crate::bridge::{Plugin, PluginManager, PluginRegistry};
use crate::error::{Error, Result};
use crate::executor::{InlineUi, UiExecutor, UiThread};
use crate::navigation::{RouteResolver, RouteTable, ScreenHost};

use super::core::Shell;
use super::options::BridgeOptions;

// ============================================================================
// Types
// ============================================================================

/// Where routes come from.
#[derive(Clone)]
enum RouteSource {
    Resolver(Arc<dyn RouteResolver>),
    Json(String),
}

// ============================================================================
// ShellBuilder
// ============================================================================

/// Builder for configuring a [`Shell`].
///
/// Use [`Shell::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct ShellBuilder {
    /// Route resolution.
    routes: Option<RouteSource>,
    /// Screen open/close callbacks.
    screen_host: Option<Arc<dyn ScreenHost>>,
    /// UI-owning executor.
    executor: Option<Arc<dyn UiExecutor>>,
    /// Bridge options.
    options: BridgeOptions,
    /// Custom plugin registry.
    registry: Option<Arc<dyn PluginRegistry>>,
    /// Plugins for the stock registry.
    plugins: Vec<(String, Arc<dyn Plugin>)>,
}

impl fmt::Debug for ShellBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShellBuilder")
            .field("routes", &self.routes.is_some())
            .field("screen_host", &self.screen_host.is_some())
            .field("executor", &self.executor.is_some())
            .field("options", &self.options)
            .field("plugins", &self.plugins.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ShellBuilder Implementation
// ============================================================================

impl ShellBuilder {
    /// Creates a builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the route resolver.
    #[inline]
    #[must_use]
    pub fn resolver(mut self, resolver: Arc<dyn RouteResolver>) -> Self {
        self.routes = Some(RouteSource::Resolver(resolver));
        self
    }

    /// Uses a route table.
    #[inline]
    #[must_use]
    pub fn routes(self, table: RouteTable) -> Self {
        self.resolver(Arc::new(table))
    }

    /// Uses a route table parsed from JSON at build time.
    #[inline]
    #[must_use]
    pub fn routes_json(mut self, json: impl Into<String>) -> Self {
        self.routes = Some(RouteSource::Json(json.into()));
        self
    }

    /// Sets the screen host.
    #[inline]
    #[must_use]
    pub fn screen_host(mut self, host: Arc<dyn ScreenHost>) -> Self {
        self.screen_host = Some(host);
        self
    }

    /// Sets the UI-owning executor.
    #[inline]
    #[must_use]
    pub fn executor(mut self, executor: Arc<dyn UiExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Sets the bridge options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: BridgeOptions) -> Self {
        self.options = options;
        self
    }

    /// Replaces the stock plugin registry.
    #[inline]
    #[must_use]
    pub fn plugin_registry(mut self, registry: Arc<dyn PluginRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Registers a plugin with the stock registry.
    #[inline]
    #[must_use]
    pub fn plugin(mut self, name: impl Into<String>, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push((name.into(), plugin));
        self
    }

    /// Builds the shell with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if routes or the screen host are not set, the
    ///   options are invalid, or plugins are given with a custom registry
    /// - [`Error::RouteConfig`] if the route JSON does not parse
    pub fn build(self) -> Result<Shell> {
        self.options.validate()?;
        let resolver = self.validate_routes()?;
        let screen_host = self.validate_screen_host()?;
        let registry = self.validate_plugins()?;

        let executor = self.executor.unwrap_or_else(default_executor);

        Ok(Shell::new(
            self.options,
            resolver,
            screen_host,
            executor,
            registry,
        ))
    }
}

/// A [`UiThread`] inside a tokio runtime, [`InlineUi`] outside.
fn default_executor() -> Arc<dyn UiExecutor> {
    if Handle::try_current().is_ok() {
        debug!("No executor configured, spawning a UI task");
        Arc::new(UiThread::spawn())
    } else {
        debug!("No executor configured, running UI jobs inline");
        Arc::new(InlineUi::new())
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ShellBuilder {
    /// Validates the route configuration.
    fn validate_routes(&self) -> Result<Arc<dyn RouteResolver>> {
        let source = self.routes.clone().ok_or_else(|| {
            Error::config(
                "Routes are required. Use .routes(), .routes_json() or .resolver() to set them.\n\
                 Example: Shell::builder().routes_json(r#\"{\"controllers\":{\"default\":{\"kind\":\"Web\"}}}\"#)",
            )
        })?;

        match source {
            RouteSource::Resolver(resolver) => Ok(resolver),
            RouteSource::Json(json) => {
                let table = RouteTable::from_json(&json)?
                    .with_default_scroll_offset(self.options.infinite_scroll_offset);
                Ok(Arc::new(table))
            }
        }
    }

    /// Validates the screen host configuration.
    fn validate_screen_host(&self) -> Result<Arc<dyn ScreenHost>> {
        self.screen_host.clone().ok_or_else(|| {
            Error::config(
                "Screen host is required. Use .screen_host() to set it.\n\
                 The screen host opens and closes native screens.",
            )
        })
    }

    /// Validates the plugin configuration.
    fn validate_plugins(&self) -> Result<Arc<dyn PluginRegistry>> {
        match &self.registry {
            Some(_) if !self.plugins.is_empty() => Err(Error::config(
                "Plugins added with .plugin() need the stock registry.\n\
                 Register them with the custom registry passed to .plugin_registry() instead.",
            )),
            Some(registry) => Ok(Arc::clone(registry)),
            None => {
                let manager = PluginManager::new();
                for (name, plugin) in &self.plugins {
                    manager.register(name.clone(), Arc::clone(plugin));
                }
                Ok(Arc::new(manager))
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
