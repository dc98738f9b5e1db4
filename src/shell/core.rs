//! Shell: the native host coordinating screens and their bridge channels.
//!
//! The [`Shell`] owns the services every channel shares (options, the
//! navigation controller, the UI executor and the plugin registry) and
//! tracks the open channels.
//!
//! # Example
//!
//! ```ignore
//! let shell = Shell::builder()
//!     .routes_json(ROUTES)
//!     .screen_host(screens)
//!     .build()?;
//!
//! let root = shell.navigation().register_root(None, "index.html")?;
//! let channel = shell.open_channel(root);
//! channel.attach(Host::new(sink));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::bridge::channel::Services;
use crate::bridge::{BridgeChannel, PluginRegistry};
use crate::executor::{UiExecutor, UiHandle};
use crate::identifiers::{ChannelId, ScreenId};
use crate::navigation::{NavigationController, RouteResolver, ScreenHost};

use super::builder::ShellBuilder;
use super::options::BridgeOptions;

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the shell.
pub(crate) struct ShellInner {
    /// Services shared by every channel.
    services: Arc<Services>,

    /// Open channels by id.
    channels: Mutex<FxHashMap<ChannelId, BridgeChannel>>,
}

// ============================================================================
// Shell
// ============================================================================

/// Native host shell.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Shell {
    inner: Arc<ShellInner>,
}

impl fmt::Debug for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shell")
            .field("options", &self.inner.services.options)
            .field("screens", &self.inner.services.navigation.len())
            .field("channels", &self.channel_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Shell - Construction
// ============================================================================

impl Shell {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ShellBuilder {
        ShellBuilder::new()
    }

    pub(crate) fn new(
        options: BridgeOptions,
        resolver: Arc<dyn RouteResolver>,
        screen_host: Arc<dyn ScreenHost>,
        executor: Arc<dyn UiExecutor>,
        plugins: Arc<dyn PluginRegistry>,
    ) -> Self {
        let navigation = Arc::new(NavigationController::new(resolver, screen_host));
        let services = Services::new(options, navigation, UiHandle::from_arc(executor), plugins);

        info!(
            bridge_global = %services.options.bridge_global,
            version = %services.options.host_version,
            "Shell created"
        );

        Self {
            inner: Arc::new(ShellInner {
                services: Arc::new(services),
                channels: Mutex::new(FxHashMap::default()),
            }),
        }
    }
}

// ============================================================================
// Shell - Accessors
// ============================================================================

impl Shell {
    /// Bridge options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &BridgeOptions {
        &self.inner.services.options
    }

    /// Navigation controller.
    #[inline]
    #[must_use]
    pub fn navigation(&self) -> &Arc<NavigationController> {
        &self.inner.services.navigation
    }

    /// UI executor handle.
    #[inline]
    #[must_use]
    pub fn ui(&self) -> &UiHandle {
        &self.inner.services.ui
    }

    /// Plugin registry.
    #[inline]
    #[must_use]
    pub fn plugins(&self) -> &Arc<dyn PluginRegistry> {
        &self.inner.services.plugins
    }
}

// ============================================================================
// Shell - Channels
// ============================================================================

impl Shell {
    /// Opens a bridge channel for the guest runtime of `screen`.
    pub fn open_channel(&self, screen: ScreenId) -> BridgeChannel {
        let channel = BridgeChannel::new(screen, Arc::clone(&self.inner.services));
        self.inner
            .channels
            .lock()
            .insert(channel.id(), channel.clone());

        debug!(channel = %channel.id(), screen = %screen, "Channel opened");
        channel
    }

    /// Looks up a channel by id.
    #[must_use]
    pub fn channel(&self, id: ChannelId) -> Option<BridgeChannel> {
        self.inner.channels.lock().get(&id).cloned()
    }

    /// Channels of one screen; a screen may host a web layer channel too.
    #[must_use]
    pub fn channels_for(&self, screen: ScreenId) -> Vec<BridgeChannel> {
        self.inner
            .channels
            .lock()
            .values()
            .filter(|channel| channel.screen() == screen)
            .cloned()
            .collect()
    }

    /// First channel of the bottom-most screen of the history.
    ///
    /// This is the channel receiving `onWebLayerDismissed`.
    #[must_use]
    pub fn root_channel(&self) -> Option<BridgeChannel> {
        let root = self.navigation().screens().first()?.id;
        self.channels_for(root).into_iter().next()
    }

    /// Detaches and forgets a channel.
    pub fn close_channel(&self, id: ChannelId) -> Option<BridgeChannel> {
        let channel = self.inner.channels.lock().remove(&id)?;
        channel.detach();
        debug!(channel = %id, "Channel closed");
        Some(channel)
    }

    /// Number of open channels.
    #[inline]
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.inner.channels.lock().len()
    }

    /// Sends `onAppBackground` to every channel.
    pub fn app_background(&self) {
        for channel in self.snapshot() {
            channel.app_background();
        }
    }

    /// Sends `onAppForeground` to every channel.
    pub fn app_foreground(&self) {
        for channel in self.snapshot() {
            channel.app_foreground();
        }
    }

    /// Detaches and forgets every channel.
    pub fn close(&self) {
        let channels: Vec<BridgeChannel> = {
            let mut map = self.inner.channels.lock();
            map.drain().map(|(_, channel)| channel).collect()
        };

        info!(count = channels.len(), "Closing all channels");
        for channel in channels {
            channel.detach();
        }
    }

    fn snapshot(&self) -> Vec<BridgeChannel> {
        self.inner.channels.lock().values().cloned().collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::bridge::Host;
    use crate::bridge::channel::tests::RecordingSink;
    use crate::navigation::controller::tests::{RecordingHost, resolver};
    use crate::protocol::events;

    fn shell() -> Shell {
        Shell::builder()
            .resolver(resolver())
            .screen_host(Arc::new(RecordingHost::default()))
            .build()
            .expect("shell")
    }

    #[test]
    fn test_open_and_close_channels() {
        let shell = shell();
        let root = shell
            .navigation()
            .register_root(None, "index.html")
            .expect("root");

        let channel = shell.open_channel(root);
        assert_eq!(shell.channel_count(), 1);
        assert_eq!(shell.channel(channel.id()).map(|c| c.id()), Some(channel.id()));
        assert_eq!(shell.root_channel().map(|c| c.id()), Some(channel.id()));

        assert!(shell.close_channel(channel.id()).is_some());
        assert_eq!(shell.channel_count(), 0);
        assert!(shell.close_channel(channel.id()).is_none());
    }

    #[test]
    fn test_app_background_reaches_every_channel() {
        let shell = shell();
        let root = shell
            .navigation()
            .register_root(None, "index.html")
            .expect("root");

        let sinks: Vec<Arc<RecordingSink>> = (0..2)
            .map(|_| {
                let sink = Arc::new(RecordingSink::default());
                let channel = shell.open_channel(root);
                channel.attach(Host::new(sink.clone()));
                channel.receive(r#"{"type":"cobaltIsReady"}"#);
                sink
            })
            .collect();

        shell.app_background();

        for sink in &sinks {
            let names: Vec<Option<String>> = sink
                .messages()
                .iter()
                .map(|m| m.event_name().map(str::to_string))
                .collect();
            assert_eq!(names, vec![Some(events::ON_APP_BACKGROUND.to_string())]);
        }
        assert_eq!(shell.channels_for(root).len(), 2);

        shell.close();
        assert_eq!(shell.channel_count(), 0);
    }

    #[test]
    fn test_web_layer_dismissed_on_root_channel() {
        let shell = shell();
        let root = shell
            .navigation()
            .register_root(None, "index.html")
            .expect("root");
        let sink = Arc::new(RecordingSink::default());
        let channel = shell.open_channel(root);
        channel.attach(Host::new(sink.clone()));
        channel.receive(r#"{"type":"cobaltIsReady"}"#);

        shell
            .root_channel()
            .expect("root channel")
            .web_layer_dismissed("layer.html", None);

        let messages = sink.messages();
        assert_eq!(
            messages[0].data(),
            Some(&json!({"page": "layer.html", "data": null}))
        );
    }
}
