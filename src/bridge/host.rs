//! Collaborators consumed by the bridge.
//!
//! A [`Host`] is the capability bundle a screen hands to its
//! [`BridgeChannel`] on attach and takes back on detach. Every method is a
//! fire-and-forget call taking already-validated arguments, made on the
//! UI-owning context.
//!
//! | Trait | Role |
//! |-------|------|
//! | [`GuestSink`] | Evaluates delivery scripts in the rendering surface |
//! | [`BridgeHooks`] | Readiness and "unhandled" fallbacks |
//! | [`UiControls`] | Date picker, alerts, toasts, bars |
//! | [`WebLayerHost`] | Overlay web layer |
//! | [`ExternalLinkOpener`] | Opens URLs outside the app |
//! | [`PluginRegistry`] | Handles `plugin` messages ([`PluginManager`] is the stock one) |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::identifiers::{CallbackId, ChannelId};
use crate::protocol::{Alert, BarsVisibility, DatePicker, Inbound};

use super::channel::BridgeChannel;

// ============================================================================
// GuestSink
// ============================================================================

/// Delivery into the guest rendering surface.
pub trait GuestSink: Send + Sync {
    /// Evaluates `<global>.execute(<json>);`.
    fn evaluate(&self, script: &str);
}

// ============================================================================
// BridgeHooks
// ============================================================================

/// Readiness notification and fallbacks for messages the bridge does not
/// handle itself. Every method has a no-op default.
#[allow(unused_variables)]
pub trait BridgeHooks: Send + Sync {
    /// The guest announced readiness; the outbound queue is already flushing.
    fn on_ready(&self, channel: &BridgeChannel) {}

    /// A guest event. Return `true` if handled.
    fn on_unhandled_event(
        &self,
        channel: &BridgeChannel,
        event: &str,
        data: Option<&Value>,
        callback: Option<&CallbackId>,
    ) -> bool {
        false
    }

    /// A reply matching no pending request. Return `true` if handled.
    fn on_unhandled_callback(
        &self,
        channel: &BridgeChannel,
        callback: &CallbackId,
        data: Option<&Value>,
    ) -> bool {
        false
    }

    /// Any message left unhandled, as the JSON object the guest sent.
    ///
    /// Also receives objects without a usable or known `type`.
    fn on_unhandled_message(&self, channel: &BridgeChannel, message: &Value) {}

    /// The guest finished a pull-to-refresh.
    fn on_pull_to_refresh_done(&self, channel: &BridgeChannel) {}

    /// The guest finished loading an infinite-scroll page.
    fn on_infinite_scroll_done(&self, channel: &BridgeChannel) {}
}

// ============================================================================
// UiControls
// ============================================================================

/// Native UI controls. Every method has a no-op default.
#[allow(unused_variables)]
pub trait UiControls: Send + Sync {
    /// Shows a date picker; answer with [`BridgeChannel::date_picked`].
    fn show_date_picker(
        &self,
        channel: &BridgeChannel,
        picker: &DatePicker,
        callback: Option<&CallbackId>,
    ) {
    }

    /// Shows an alert; answer with [`BridgeChannel::alert_button_pressed`].
    fn show_alert(&self, channel: &BridgeChannel, alert: &Alert, callback: Option<&CallbackId>) {}

    /// Shows a toast.
    fn show_toast(&self, text: &str) {}

    /// Replaces the bars configuration.
    fn set_bars(&self, bars: Option<&Value>) {}

    /// Sets an action badge; `""` clears it.
    fn set_action_badge(&self, name: &str, badge: &str) {}

    /// Replaces an action's content.
    fn set_action_content(&self, name: &str, content: &Value) {}

    /// Shows or hides the bars.
    fn set_bars_visible(&self, visibility: BarsVisibility) {}

    /// Replaces the bar content.
    fn set_bar_content(&self, content: &Value) {}

    /// Shows or hides one action.
    fn set_action_visible(&self, name: &str, visible: bool) {}

    /// Enables or disables one action.
    fn set_action_enabled(&self, name: &str, enabled: bool) {}
}

// ============================================================================
// WebLayerHost
// ============================================================================

/// Overlay web layer. Every method has a no-op default.
#[allow(unused_variables)]
pub trait WebLayerHost: Send + Sync {
    /// Shows `page` in a layer over the screen.
    fn show(&self, page: &str, fade_duration: f64) {}

    /// Dismisses the layer. Once gone, report with
    /// [`BridgeChannel::web_layer_dismissed`] on the root channel.
    fn dismiss(&self, data: Option<&Value>, fade_duration: f64) {}

    /// Raises the layer above the screen content.
    fn bring_to_front(&self) {}

    /// Lowers the layer below the screen content.
    fn send_to_back(&self) {}
}

// ============================================================================
// ExternalLinkOpener
// ============================================================================

/// Opens URLs outside the app.
pub trait ExternalLinkOpener: Send + Sync {
    /// Opens `url`.
    fn open(&self, url: &Url);
}

// ============================================================================
// Noop
// ============================================================================

/// Collaborator doing nothing; the default for every optional capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct Noop;

impl BridgeHooks for Noop {}

impl UiControls for Noop {}

impl WebLayerHost for Noop {}

impl ExternalLinkOpener for Noop {
    fn open(&self, url: &Url) {
        debug!(%url, "No external link opener, URL ignored");
    }
}

// ============================================================================
// Host
// ============================================================================

/// Capabilities a screen lends its channel while attached.
#[derive(Clone)]
pub struct Host {
    /// Guest rendering surface.
    pub sink: Arc<dyn GuestSink>,
    /// Readiness and fallback hooks.
    pub hooks: Arc<dyn BridgeHooks>,
    /// Native UI controls.
    pub ui: Arc<dyn UiControls>,
    /// Web layer overlay.
    pub web_layer: Arc<dyn WebLayerHost>,
    /// External link opener.
    pub links: Arc<dyn ExternalLinkOpener>,
}

impl Host {
    /// Creates a host with no-op collaborators around a sink.
    #[must_use]
    pub fn new(sink: Arc<dyn GuestSink>) -> Self {
        Self {
            sink,
            hooks: Arc::new(Noop),
            ui: Arc::new(Noop),
            web_layer: Arc::new(Noop),
            links: Arc::new(Noop),
        }
    }

    /// Sets the hooks.
    #[inline]
    #[must_use]
    pub fn with_hooks(mut self, hooks: Arc<dyn BridgeHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Sets the UI controls.
    #[inline]
    #[must_use]
    pub fn with_ui(mut self, ui: Arc<dyn UiControls>) -> Self {
        self.ui = ui;
        self
    }

    /// Sets the web layer host.
    #[inline]
    #[must_use]
    pub fn with_web_layer(mut self, web_layer: Arc<dyn WebLayerHost>) -> Self {
        self.web_layer = web_layer;
        self
    }

    /// Sets the external link opener.
    #[inline]
    #[must_use]
    pub fn with_links(mut self, links: Arc<dyn ExternalLinkOpener>) -> Self {
        self.links = links;
        self
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host").finish_non_exhaustive()
    }
}

// ============================================================================
// PluginRegistry
// ============================================================================

/// Handles `plugin` messages.
pub trait PluginRegistry: Send + Sync {
    /// Handles a whole plugin message. Returns `true` if handled.
    ///
    /// [`Inbound::object`] holds every key the guest sent.
    fn handle(&self, channel: &BridgeChannel, inbound: &Inbound) -> bool;

    /// A channel was detached from its host.
    fn on_channel_detached(&self, channel: ChannelId) {
        let _ = channel;
    }
}

/// A host plugin.
pub trait Plugin: Send + Sync {
    /// Handles a message addressed to this plugin. Returns `true` if handled.
    ///
    /// Reply with [`BridgeChannel::send_plugin`] or
    /// [`BridgeChannel::send_callback`]; the channel handle may be cloned
    /// and kept for later replies.
    fn on_message(&self, channel: &BridgeChannel, inbound: &Inbound) -> bool;

    /// A channel the plugin talked to was detached.
    fn on_channel_detached(&self, channel: ChannelId) {
        let _ = channel;
    }
}

// ============================================================================
// PluginManager
// ============================================================================

/// Plugin registry keyed by plugin name.
#[derive(Default)]
pub struct PluginManager {
    plugins: RwLock<FxHashMap<String, Arc<dyn Plugin>>>,
}

impl PluginManager {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin, replacing any previous one with that name.
    pub fn register(&self, name: impl Into<String>, plugin: Arc<dyn Plugin>) {
        let name = name.into();
        debug!(plugin = %name, "Plugin registered");
        if self.plugins.write().insert(name.clone(), plugin).is_some() {
            warn!(plugin = %name, "Plugin replaced");
        }
    }

    /// Removes a plugin.
    pub fn unregister(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins.write().remove(name)
    }

    /// Returns `true` if a plugin with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.plugins.read().contains_key(name)
    }

    /// Number of registered plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.read().len()
    }

    /// Returns `true` if no plugin is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.read().is_empty()
    }
}

impl PluginRegistry for PluginManager {
    fn handle(&self, channel: &BridgeChannel, inbound: &Inbound) -> bool {
        let Some(name) = inbound.message().plugin_name() else {
            warn!(channel = %channel.id(), "Plugin message without pluginName");
            return false;
        };

        let plugin = self.plugins.read().get(name).cloned();
        match plugin {
            Some(plugin) => plugin.on_message(channel, inbound),
            None => {
                warn!(channel = %channel.id(), plugin = name, "No plugin registered");
                false
            }
        }
    }

    fn on_channel_detached(&self, channel: ChannelId) {
        let plugins: Vec<Arc<dyn Plugin>> = self.plugins.read().values().cloned().collect();
        for plugin in plugins {
            plugin.on_channel_detached(channel);
        }
    }
}

impl fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginManager")
            .field("plugins", &self.len())
            .finish()
    }
}
