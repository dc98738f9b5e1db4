//! Inbound message dispatch.
//!
//! Every decoded message is turned into a [`Route`] and handled on the
//! UI-owning context. A message the dispatcher does not handle is offered to
//! [`BridgeHooks::on_unhandled_message`](super::BridgeHooks::on_unhandled_message)
//! as the JSON object the guest sent, unknown keys included.
//!
//! | Type | Handling |
//! |------|----------|
//! | `callback` | Resolves a pending request, else the unhandled-callback hook |
//! | `cobaltIsReady` | Marks the channel ready, flushes, then the ready hook |
//! | `event` | The unhandled-event hook |
//! | `intent` | `openExternalUrl` through the link opener |
//! | `log` | Logged on the `cobalt::guest` target |
//! | `navigation` | [`NavigationController`](crate::NavigationController) |
//! | `plugin` | The plugin registry |
//! | `ui` | [`UiControls`](super::UiControls) |
//! | `webLayer` | [`WebLayerHost`](super::WebLayerHost) |

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::identifiers::CallbackId;
use crate::protocol::{
    BarsAction, Inbound, IntentAction, NavigationAction, Route, UiAction, WebLayerAction, keys,
};

use super::channel::BridgeChannel;
use super::host::Host;
use super::pending::PendingRequest;

// ============================================================================
// Entry Point
// ============================================================================

/// Handles a decoded message on the UI-owning context.
pub(crate) fn dispatch_on_ui(channel: &BridgeChannel, inbound: &Inbound) {
    let Some(host) = channel.host() else {
        warn!(
            channel = %channel.id(),
            kind = %inbound.message().kind(),
            "Message dropped: host detached"
        );
        return;
    };

    if !Dispatcher::new(channel, &host).dispatch(inbound) {
        host.hooks.on_unhandled_message(channel, inbound.object());
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Routes one message to the channel's collaborators.
///
/// Must run on the UI-owning context.
#[derive(Debug)]
pub struct Dispatcher<'a> {
    channel: &'a BridgeChannel,
    host: &'a Host,
}

impl<'a> Dispatcher<'a> {
    /// Creates a dispatcher for `channel` with the capabilities of `host`.
    #[inline]
    #[must_use]
    pub fn new(channel: &'a BridgeChannel, host: &'a Host) -> Self {
        Self { channel, host }
    }

    /// Handles a message. Returns `false` if nothing handled it.
    ///
    /// Does not call the unhandled-message hook itself.
    pub fn dispatch(&self, inbound: &Inbound) -> bool {
        let message = inbound.message();
        let route = match Route::from_message(message) {
            Ok(route) => route,
            Err(e) => {
                warn!(
                    channel = %self.channel.id(),
                    kind = %message.kind(),
                    error = %e,
                    "Message not routed"
                );
                return false;
            }
        };

        match route {
            Route::Callback { callback, data } => self.callback(&callback, data.as_ref()),

            Route::Ready { version } => {
                self.channel.mark_ready(version.as_deref());
                self.host.hooks.on_ready(self.channel);
                true
            }

            Route::Event {
                event,
                data,
                callback,
            } => self.host.hooks.on_unhandled_event(
                self.channel,
                &event,
                data.as_ref(),
                callback.as_ref(),
            ),

            Route::Intent(IntentAction::OpenExternalUrl(url)) => {
                info!(channel = %self.channel.id(), %url, "Opening external URL");
                self.host.links.open(&url);
                true
            }

            Route::Intent(IntentAction::Unsupported(action)) => {
                debug!(channel = %self.channel.id(), action = %action, "Intent not supported");
                false
            }

            Route::Log { value } => {
                info!(target: "cobalt::guest", channel = %self.channel.id(), "{value}");
                true
            }

            Route::Navigation(action) => {
                if let Err(e) = self.navigation(action) {
                    warn!(channel = %self.channel.id(), error = %e, "Navigation failed");
                }
                true
            }

            Route::Plugin => self
                .channel
                .services()
                .plugins
                .handle(self.channel, inbound),

            Route::Ui(action) => self.ui(action),

            Route::WebLayer(action) => {
                self.web_layer(action);
                true
            }
        }
    }

    fn callback(&self, callback: &CallbackId, data: Option<&Value>) -> bool {
        match self.channel.take_pending(callback) {
            Some(PendingRequest::BackPermission) => {
                let allowed = data
                    .and_then(|data| data.get(keys::VALUE))
                    .and_then(Value::as_bool)
                    .unwrap_or(false);

                if allowed {
                    if let Err(e) = self.channel.navigation().pop(self.channel.screen()) {
                        warn!(channel = %self.channel.id(), error = %e, "Pop failed");
                    }
                } else {
                    info!(channel = %self.channel.id(), "Back navigation denied by guest");
                }
                true
            }

            Some(PendingRequest::PullToRefresh) => {
                self.host.hooks.on_pull_to_refresh_done(self.channel);
                true
            }

            Some(PendingRequest::InfiniteScroll) => {
                self.host.hooks.on_infinite_scroll_done(self.channel);
                true
            }

            None => self
                .host
                .hooks
                .on_unhandled_callback(self.channel, callback, data),
        }
    }

    fn navigation(&self, action: NavigationAction) -> Result<()> {
        let navigation = self.channel.navigation();
        let screen = self.channel.screen();

        match action {
            NavigationAction::Push(target) => navigation.push(&target).map(|_| ()),

            NavigationAction::Pop => self.channel.request_back().map(|_| ()),

            NavigationAction::PopWithData(data) => {
                navigation.set_pop_data(screen, data)?;
                self.channel.request_back().map(|_| ())
            }

            NavigationAction::PopTo {
                controller,
                page,
                data,
            } => navigation.pop_to(controller.as_deref(), &page, data),

            NavigationAction::PresentModal { target, callback } => {
                let (_, origin) = navigation.present_modal(screen, &target)?;
                if let Some(callback) = callback {
                    self.channel.send_callback(
                        callback,
                        Some(json!({
                            keys::PAGE: origin.page,
                            keys::CONTROLLER: origin.controller,
                        })),
                    );
                }
                Ok(())
            }

            NavigationAction::DismissModal {
                controller,
                page,
                data,
            } => navigation.dismiss_modal(screen, &controller, &page, data),

            NavigationAction::Replace {
                target,
                animated,
                clear_history,
            } => navigation
                .replace(screen, &target, animated, clear_history)
                .map(|_| ()),
        }
    }

    fn ui(&self, action: UiAction) -> bool {
        let ui = &self.host.ui;

        match action {
            UiAction::DatePicker { picker, callback } => {
                ui.show_date_picker(self.channel, &picker, callback.as_ref());
                true
            }

            UiAction::UnsupportedPicker(kind) => {
                debug!(channel = %self.channel.id(), picker = %kind, "Picker not supported");
                false
            }

            UiAction::Alert { alert, callback } => {
                self.channel.show_alert(self.host, alert, callback);
                true
            }

            UiAction::Toast(text) => {
                ui.show_toast(&text);
                true
            }

            UiAction::Bars(action) => {
                self.bars(action);
                true
            }
        }
    }

    fn bars(&self, action: BarsAction) {
        let ui = &self.host.ui;

        match action {
            BarsAction::SetBars(bars) => {
                if let Err(e) = self
                    .channel
                    .navigation()
                    .update_bars(self.channel.screen(), bars.clone())
                {
                    warn!(channel = %self.channel.id(), error = %e, "Bars not recorded");
                }
                ui.set_bars(bars.as_ref());
            }
            BarsAction::SetActionBadge { name, badge } => ui.set_action_badge(&name, &badge),
            BarsAction::SetActionContent { name, content } => {
                ui.set_action_content(&name, &content);
            }
            BarsAction::SetBarsVisible(visibility) => ui.set_bars_visible(visibility),
            BarsAction::SetBarContent(content) => ui.set_bar_content(&content),
            BarsAction::SetActionVisible { name, visible } => {
                ui.set_action_visible(&name, visible);
            }
            BarsAction::SetActionEnabled { name, enabled } => {
                ui.set_action_enabled(&name, enabled);
            }
        }
    }

    fn web_layer(&self, action: WebLayerAction) {
        let layer = &self.host.web_layer;

        match action {
            WebLayerAction::Show {
                page,
                fade_duration,
            } => {
                let fade = fade_duration
                    .unwrap_or(self.channel.options().web_layer_fade_duration);
                debug!(channel = %self.channel.id(), page = %page, fade, "Show web layer");
                layer.show(&page, fade);
            }
            WebLayerAction::Dismiss {
                data,
                fade_duration,
            } => layer.dismiss(data.as_ref(), fade_duration),
            WebLayerAction::BringToFront => layer.bring_to_front(),
            WebLayerAction::SendToBack => layer.send_to_back(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use serde_json::json;
    use url::Url;

    use crate::bridge::channel::tests::Fixture;
    use crate::bridge::host::{ExternalLinkOpener, Plugin, WebLayerHost};
    use crate::identifiers::{CallbackId, ChannelId};
    use crate::protocol::{Message, events};

    use super::*;

    #[derive(Default)]
    struct RecordingLinks(Mutex<Vec<String>>);

    impl ExternalLinkOpener for RecordingLinks {
        fn open(&self, url: &Url) {
            self.0.lock().push(url.to_string());
        }
    }

    #[derive(Default)]
    struct RecordingLayer(Mutex<Vec<String>>);

    impl WebLayerHost for RecordingLayer {
        fn show(&self, page: &str, fade_duration: f64) {
            self.0.lock().push(format!("show:{page}:{fade_duration}"));
        }

        fn dismiss(&self, data: Option<&Value>, fade_duration: f64) {
            self.0
                .lock()
                .push(format!("dismiss:{}:{fade_duration}", data.is_some()));
        }

        fn bring_to_front(&self) {
            self.0.lock().push("front".to_string());
        }
    }

    #[derive(Default)]
    struct EchoPlugin {
        received: Mutex<Vec<Value>>,
        detached: Mutex<Vec<ChannelId>>,
    }

    impl Plugin for EchoPlugin {
        fn on_message(&self, channel: &BridgeChannel, inbound: &Inbound) -> bool {
            self.received.lock().push(inbound.object().clone());
            let message = inbound.message();
            channel.send_plugin(
                "echo",
                message.data().cloned(),
                message.callback_id().cloned(),
            );
            true
        }

        fn on_channel_detached(&self, channel: ChannelId) {
            self.detached.lock().push(channel);
        }
    }

    fn unhandled_types(fx: &Fixture) -> Vec<String> {
        fx.hooks
            .unhandled
            .lock()
            .iter()
            .filter_map(|v| v.get("type").and_then(Value::as_str).map(str::to_string))
            .collect()
    }

    #[test]
    fn test_log_is_handled() {
        let fx = Fixture::new().ready();
        fx.channel.receive(r#"{"type":"log","value":"hello"}"#);
        assert!(fx.hooks.unhandled.lock().is_empty());
    }

    #[test]
    fn test_unknown_type_reaches_unhandled_hook() {
        let fx = Fixture::new().ready();
        fx.channel.receive(r#"{"type":"telemetry","x":1}"#);
        assert_eq!(*fx.hooks.unhandled.lock(), vec![json!({"type": "telemetry", "x": 1})]);
    }

    #[test]
    fn test_malformed_is_dropped() {
        let fx = Fixture::new().ready();
        fx.channel.receive("not json");
        fx.channel.receive("[1,2]");
        fx.channel.receive(r#"{"type":"callback"}"#);
        assert!(fx.hooks.unhandled.lock().is_empty());
    }

    #[test]
    fn test_missing_type_reaches_unhandled_hook() {
        let fx = Fixture::new().ready();
        fx.channel.receive(r#"{"data":{"a":1}}"#);
        fx.channel.receive(r#"{"type":3,"data":null}"#);

        assert_eq!(
            *fx.hooks.unhandled.lock(),
            vec![json!({"data": {"a": 1}}), json!({"type": 3, "data": null})]
        );
    }

    #[test]
    fn test_unhandled_hook_gets_every_key() {
        let fx = Fixture::new().ready();
        fx.channel.receive(
            r#"{"type":"navigation","action":"teleport","target":"x","extra":{"k":1}}"#,
        );

        assert_eq!(
            *fx.hooks.unhandled.lock(),
            vec![json!({
                "type": "navigation",
                "action": "teleport",
                "target": "x",
                "extra": {"k": 1}
            })]
        );
    }

    #[test]
    fn test_events_fall_back_to_unhandled() {
        let fx = Fixture::new().ready();
        fx.channel.receive(r#"{"type":"event","event":"handledByHost"}"#);
        fx.channel.receive(r#"{"type":"event","event":"other","data":{"a":1}}"#);

        assert_eq!(*fx.hooks.events.lock(), vec!["handledByHost", "other"]);
        assert_eq!(unhandled_types(&fx), vec!["event"]);
    }

    #[test]
    fn test_route_errors_fall_back_to_unhandled() {
        let fx = Fixture::new().ready();
        fx.channel.receive(r#"{"type":"navigation","action":"teleport"}"#);
        fx.channel.receive(r#"{"type":"ui","control":"alert"}"#);
        fx.channel.receive(r#"{"type":"intent","action":"call"}"#);
        fx.channel
            .receive(r#"{"type":"ui","control":"picker","data":{"type":"time"}}"#);

        assert_eq!(unhandled_types(&fx), vec!["navigation", "ui", "intent", "ui"]);
    }

    #[test]
    fn test_open_external_url() {
        let fx = Fixture::new();
        let links = Arc::new(RecordingLinks::default());
        fx.channel.attach(fx.host().with_links(links.clone()));
        fx.channel.receive(
            r#"{"type":"intent","action":"openExternalUrl","data":{"url":"https://example.com/a"}}"#,
        );

        assert_eq!(*links.0.lock(), vec!["https://example.com/a"]);
        assert!(fx.hooks.unhandled.lock().is_empty());
    }

    #[test]
    fn test_pop_asks_permission_then_pops() {
        let fx = Fixture::new().ready();
        fx.channel.receive(r#"{"type":"navigation","action":"pop"}"#);

        let asked = fx
            .sink
            .messages()
            .into_iter()
            .find(|m| m.event_name() == Some(events::ON_BACK_BUTTON_PRESSED))
            .expect("permission asked");
        let callback = asked.callback_id().cloned().expect("callback id");
        assert!(fx.screens.closed.lock().is_empty());

        fx.channel.receive(&format!(
            r#"{{"type":"callback","callback":"{callback}","data":{{"value":true}}}}"#
        ));
        assert_eq!(fx.screens.closed.lock().len(), 1);
        assert_eq!(fx.channel.pending_requests(), 0);

        fx.channel.receive(&format!(
            r#"{{"type":"callback","callback":"{callback}","data":{{"value":true}}}}"#
        ));
        assert_eq!(*fx.hooks.callbacks.lock(), vec![callback]);
    }

    #[test]
    fn test_pop_denied_keeps_screen() {
        let fx = Fixture::new().ready();
        let callback = fx.channel.request_back().expect("request");
        fx.channel.receive(&format!(
            r#"{{"type":"callback","callback":"{callback}","data":{{"value":false}}}}"#
        ));

        assert!(fx.screens.closed.lock().is_empty());
        assert_eq!(fx.channel.navigation().len(), 1);
    }

    #[test]
    fn test_pull_to_refresh_reply() {
        let fx = Fixture::new().ready();
        let callback = fx.channel.pull_to_refresh().expect("request");
        assert!(fx.channel.is_refreshing());

        fx.channel
            .receive(&format!(r#"{{"type":"callback","callback":"{callback}"}}"#));
        assert!(!fx.channel.is_refreshing());
        assert_eq!(*fx.hooks.refreshed.lock(), 1);
    }

    #[test]
    fn test_modal_replies_with_origin() {
        let fx = Fixture::new().ready();
        fx.channel.receive(
            r#"{"type":"navigation","action":"modal","data":{"page":"m.html","controller":"Modal"},"callback":"m1"}"#,
        );

        let reply = fx
            .sink
            .messages()
            .into_iter()
            .find(|m| m.callback_id() == Some(&CallbackId::new("m1")))
            .expect("modal reply");
        assert_eq!(
            reply.data(),
            Some(&json!({"page": "index.html", "controller": "Web"}))
        );
        assert!(fx.channel.navigation().from_modal());
    }

    #[test]
    fn test_modal_with_numeric_callback() {
        let fx = Fixture::new().ready();
        fx.channel.receive(
            r#"{"type":"navigation","action":"modal","data":{"page":"m.html","controller":"Modal"},"callback":7}"#,
        );

        assert_eq!(fx.channel.navigation().len(), 2);
        assert!(fx.channel.navigation().from_modal());
        assert!(
            fx.sink
                .messages()
                .iter()
                .any(|m| m.callback_id() == Some(&CallbackId::new("7")))
        );
    }

    #[test]
    fn test_push_opens_screen() {
        let fx = Fixture::new().ready();
        fx.channel.receive(
            r#"{"type":"navigation","action":"push","data":{"page":"b.html","controller":"Web"}}"#,
        );
        fx.channel.receive(
            r#"{"type":"navigation","action":"push","data":{"page":"c.html","controller":"missing"}}"#,
        );

        assert_eq!(fx.channel.navigation().len(), 2);
        assert!(fx.hooks.unhandled.lock().is_empty());
    }

    #[test]
    fn test_ui_controls() {
        let fx = Fixture::new().ready();
        fx.channel.receive(r#"{"type":"ui","control":"toast","data":{"message":"hi"}}"#);
        fx.channel.receive(
            r#"{"type":"ui","control":"bars","data":{"action":"setActionBadge","name":"cart","badge":"3"}}"#,
        );
        fx.channel.receive(
            r#"{"type":"ui","control":"bars","data":{"action":"setActionVisible","name":"cart"}}"#,
        );
        fx.channel.receive(
            r#"{"type":"ui","control":"bars","data":{"action":"setBars","bars":{"title":"T"}}}"#,
        );

        assert_eq!(
            *fx.ui.calls.lock(),
            vec!["toast:hi", "badge:cart=3", "visible:cart=true", "setBars:true"]
        );
        let screen = fx
            .channel
            .navigation()
            .screen(fx.channel.screen())
            .expect("root");
        assert_eq!(screen.bars, Some(json!({"title": "T"})));
    }

    #[test]
    fn test_web_layer_actions() {
        let fx = Fixture::new();
        let layer = Arc::new(RecordingLayer::default());
        fx.channel.attach(fx.host().with_web_layer(layer.clone()));
        fx.channel
            .receive(r#"{"type":"webLayer","action":"show","data":{"page":"l.html"}}"#);
        fx.channel.receive(
            r#"{"type":"webLayer","action":"dismiss","data":{"fadeDuration":1.5,"x":1}}"#,
        );
        fx.channel.receive(r#"{"type":"webLayer","action":"bringToFront"}"#);
        fx.channel.receive(r#"{"type":"webLayer","action":"sendToBack"}"#);

        assert_eq!(
            *layer.0.lock(),
            vec!["show:l.html:0.3", "dismiss:true:1.5", "front"]
        );
        assert!(fx.hooks.unhandled.lock().is_empty());
    }

    #[test]
    fn test_plugins() {
        let fx = Fixture::new().ready();
        let plugin = Arc::new(EchoPlugin::default());
        fx.plugins.register("echo", plugin.clone());
        assert!(fx.plugins.contains("echo"));

        fx.channel.receive(
            r#"{"type":"plugin","pluginName":"echo","data":{"n":1},"callback":"p1","origin":"map"}"#,
        );
        fx.channel.receive(r#"{"type":"plugin","pluginName":"nobody"}"#);
        fx.channel.receive(r#"{"type":"plugin"}"#);

        let replies: Vec<Message> = fx
            .sink
            .messages()
            .into_iter()
            .filter(|m| m.plugin_name() == Some("echo"))
            .collect();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].data(), Some(&json!({"n": 1})));
        assert_eq!(plugin.received.lock()[0]["origin"], "map");
        assert_eq!(unhandled_types(&fx), vec!["plugin", "plugin"]);

        fx.channel.detach();
        assert_eq!(*plugin.detached.lock(), vec![fx.channel.id()]);
        assert!(fx.plugins.unregister("echo").is_some());
        assert!(fx.plugins.is_empty());
    }

    #[test]
    fn test_dispatch_directly() {
        let fx = Fixture::new();
        let host = fx.host();
        fx.channel.attach(host.clone());

        let dispatcher = Dispatcher::new(&fx.channel, &host);
        assert!(dispatcher.dispatch(&Inbound::from(Message::cobalt_is_ready(None))));
        assert!(fx.channel.is_ready());
        assert!(!dispatcher.dispatch(&Inbound::from(Message::intent("share", None))));
    }
}
