//! Bridge channel: one guest runtime instance.
//!
//! A [`BridgeChannel`] owns the readiness flag, the outbound/inbound queue
//! pair and the correlated requests of one guest runtime, and exposes the
//! send/receive API used by the hosting screen.
//!
//! # Delivery
//!
//! ```text
//! send ──► ready && attached? ──no──► OutboundQueue
//!                │                         │
//!               yes                   flush (ready, page loaded, attach, resume)
//!                │                         │
//!                ▼                         ▼
//!          UI job: GuestSink::evaluate(script), in post order
//! ```
//!
//! # Thread Safety
//!
//! `BridgeChannel` is a cheap `Clone` handle, `Send + Sync`. State changes
//! and job posting happen under one reentrant lock, so the UI executor sees
//! jobs in the order the state changes were made, and a job running inline
//! may call back into the channel.

// ============================================================================
// Imports
// ============================================================================

use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::sync::Arc;

use parking_lot::ReentrantMutex;
use serde_json::{Value, json};
use tracing::{debug, info, trace, warn};

use crate::error::Result;
use crate::executor::UiHandle;
use crate::identifiers::{CallbackId, ChannelId, ScreenId};
use crate::navigation::NavigationController;
use crate::protocol::{
    Alert, DecodeError, Message, PickerDate, ScriptOptions, actions, decode_inbound, events, keys,
    to_script,
};
use crate::shell::BridgeOptions;

use super::dispatcher;
use super::host::{GuestSink, Host, PluginRegistry};
use super::pending::{PendingRequest, PendingRequests};
use super::queue::{InboundQueue, OutboundQueue};

// ============================================================================
// Services
// ============================================================================

/// Shell-wide services shared by every channel.
pub(crate) struct Services {
    /// Bridge options.
    pub(crate) options: BridgeOptions,
    /// Script wrapping, derived from `options`.
    pub(crate) script: ScriptOptions,
    /// Navigation state machine.
    pub(crate) navigation: Arc<NavigationController>,
    /// UI-owning executor.
    pub(crate) ui: UiHandle,
    /// Plugin registry.
    pub(crate) plugins: Arc<dyn PluginRegistry>,
}

impl Services {
    pub(crate) fn new(
        options: BridgeOptions,
        navigation: Arc<NavigationController>,
        ui: UiHandle,
        plugins: Arc<dyn PluginRegistry>,
    ) -> Self {
        let script = options.script_options();
        Self {
            options,
            script,
            navigation,
            ui,
            plugins,
        }
    }
}

// ============================================================================
// Types
// ============================================================================

/// Mutable state of one channel.
struct ChannelState {
    /// Guest announced readiness. Monotonic.
    ready: bool,
    /// Owning screen is in the foreground.
    active: bool,
    /// Version reported by the guest.
    guest_version: Option<String>,
    /// Capabilities lent by the attached screen.
    host: Option<Host>,
    outbound: OutboundQueue,
    inbound: InboundQueue,
    pending: PendingRequests,
    /// Alerts requested while paused.
    pending_alerts: Vec<(Alert, Option<CallbackId>)>,
    /// Pull-to-refresh awaiting its reply.
    refreshing: bool,
    /// Infinite scroll awaiting its reply.
    loading_more: bool,
}

impl ChannelState {
    fn new(options: &BridgeOptions) -> Self {
        Self {
            ready: false,
            active: false,
            guest_version: None,
            host: None,
            outbound: OutboundQueue::new(),
            inbound: InboundQueue::new(),
            pending: PendingRequests::new(options.request_timeout, options.max_pending_requests),
            pending_alerts: Vec::new(),
            refreshing: false,
            loading_more: false,
        }
    }

    /// Sink to deliver to now, if the channel can deliver.
    fn deliverable_sink(&self) -> Option<Arc<dyn GuestSink>> {
        if !self.ready {
            return None;
        }
        self.host.as_ref().map(|host| Arc::clone(&host.sink))
    }
}

struct ChannelInner {
    id: ChannelId,
    screen: ScreenId,
    services: Arc<Services>,
    state: ReentrantMutex<RefCell<ChannelState>>,
}

// ============================================================================
// BridgeChannel
// ============================================================================

/// Bridge to one guest runtime instance.
#[derive(Clone)]
pub struct BridgeChannel {
    inner: Arc<ChannelInner>,
}

impl fmt::Debug for BridgeChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeChannel")
            .field("id", &self.inner.id)
            .field("screen", &self.inner.screen)
            .field("ready", &self.is_ready())
            .field("attached", &self.is_attached())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// BridgeChannel - Construction & Queries
// ============================================================================

impl BridgeChannel {
    pub(crate) fn new(screen: ScreenId, services: Arc<Services>) -> Self {
        let state = ChannelState::new(&services.options);
        let id = ChannelId::generate();
        debug!(channel = %id, screen = %screen, "Channel created");

        Self {
            inner: Arc::new(ChannelInner {
                id,
                screen,
                services,
                state: ReentrantMutex::new(RefCell::new(state)),
            }),
        }
    }

    /// Channel id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ChannelId {
        self.inner.id
    }

    /// Screen owning this guest runtime.
    #[inline]
    #[must_use]
    pub fn screen(&self) -> ScreenId {
        self.inner.screen
    }

    /// Returns `true` once the guest announced readiness.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.with_state(|state| state.ready)
    }

    /// Returns `true` while a host is attached.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.with_state(|state| state.host.is_some())
    }

    /// Returns `true` while the owning screen is in the foreground.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.with_state(|state| state.active)
    }

    /// Version the guest reported in its readiness announcement.
    #[must_use]
    pub fn guest_version(&self) -> Option<String> {
        self.with_state(|state| state.guest_version.clone())
    }

    /// Messages waiting in the outbound queue.
    #[must_use]
    pub fn queued_outbound(&self) -> usize {
        self.with_state(|state| state.outbound.len())
    }

    /// Raw messages waiting for the first host attach.
    #[must_use]
    pub fn queued_inbound(&self) -> usize {
        self.with_state(|state| state.inbound.len())
    }

    /// Correlated requests awaiting a reply.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.with_state(|state| state.pending.len())
    }

    /// Returns `true` while a pull-to-refresh awaits its reply.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.with_state(|state| state.refreshing)
    }

    /// Returns `true` while an infinite-scroll load awaits its reply.
    #[must_use]
    pub fn is_loading_more(&self) -> bool {
        self.with_state(|state| state.loading_more)
    }

    /// Navigation controller of the shell.
    #[inline]
    #[must_use]
    pub fn navigation(&self) -> &Arc<NavigationController> {
        &self.inner.services.navigation
    }

    /// Bridge options of the shell.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &BridgeOptions {
        &self.inner.services.options
    }

    /// Currently attached host.
    #[must_use]
    pub fn host(&self) -> Option<Host> {
        self.with_state(|state| state.host.clone())
    }

    pub(crate) fn services(&self) -> &Services {
        &self.inner.services
    }

    /// Runs `f` on the state. `f` must not call back into the channel.
    fn with_state<R>(&self, f: impl FnOnce(&mut ChannelState) -> R) -> R {
        let guard = self.inner.state.lock();
        let mut state = guard.borrow_mut();
        f(&mut state)
    }
}

// ============================================================================
// BridgeChannel - Host Attachment
// ============================================================================

impl BridgeChannel {
    /// Attaches the screen's capabilities.
    ///
    /// The first attach replays buffered inbound messages in receipt order
    /// and retires the inbound queue. Every attach flushes the outbound queue.
    pub fn attach(&self, host: Host) {
        let guard = self.inner.state.lock();

        let replay = {
            let mut state = guard.borrow_mut();
            if state.host.replace(host).is_some() {
                warn!(channel = %self.inner.id, "Host replaced without detach");
            }
            state.inbound.retire()
        };

        info!(channel = %self.inner.id, screen = %self.inner.screen, "Host attached");

        if let Some(replay) = replay
            && !replay.is_empty()
        {
            debug!(channel = %self.inner.id, count = replay.len(), "Replaying inbound messages");
            for raw in &replay {
                self.dispatch_raw(raw);
            }
        }

        self.flush();
        drop(guard);
    }

    /// Takes the capabilities back.
    ///
    /// Pending requests and deferred alerts are dropped. Later inbound
    /// messages are dropped; later outbound messages queue until re-attach.
    pub fn detach(&self) -> Option<Host> {
        let host = self.with_state(|state| {
            state.active = false;
            state.refreshing = false;
            state.loading_more = false;
            state.pending.clear();
            state.pending_alerts.clear();
            state.host.take()
        });

        if host.is_some() {
            info!(channel = %self.inner.id, "Host detached");
            self.inner.services.plugins.on_channel_detached(self.inner.id);
        }
        host
    }
}

// ============================================================================
// BridgeChannel - Inbound
// ============================================================================

impl BridgeChannel {
    /// Entry point for guest → host text. Callable from any thread.
    ///
    /// Before the first attach the text is buffered untouched. Decoding
    /// happens here; handling runs on the UI executor.
    pub fn receive(&self, raw: &str) {
        let guard = self.inner.state.lock();

        {
            let mut state = guard.borrow_mut();
            if state.host.is_none() {
                if state.inbound.push(raw) {
                    debug!(
                        channel = %self.inner.id,
                        queued = state.inbound.len(),
                        "Inbound message queued until host attach"
                    );
                } else {
                    warn!(channel = %self.inner.id, "Inbound message dropped: host detached");
                }
                return;
            }
        }

        self.dispatch_raw(raw);
        drop(guard);
    }

    /// Decodes and posts handling to the UI executor.
    fn dispatch_raw(&self, raw: &str) {
        match decode_inbound(raw) {
            Ok(inbound) => {
                trace!(
                    channel = %self.inner.id,
                    kind = %inbound.message().kind(),
                    "Inbound message"
                );
                let channel = self.clone();
                self.inner
                    .services
                    .ui
                    .run_or_log("dispatch", move || dispatcher::dispatch_on_ui(&channel, &inbound));
            }

            Err(DecodeError::UnknownType { kind, object, .. }) => {
                warn!(channel = %self.inner.id, kind = %kind, "Unknown message type");
                self.post_unhandled(object);
            }

            Err(DecodeError::MissingType { object, .. }) => {
                warn!(channel = %self.inner.id, "Message without a usable type");
                self.post_unhandled(object);
            }

            Err(e) => {
                warn!(channel = %self.inner.id, error = %e, "Inbound message dropped");
            }
        }
    }

    /// Hands an object nothing can route to the unhandled-message hook.
    fn post_unhandled(&self, object: Value) {
        let channel = self.clone();
        self.inner.services.ui.run_or_log("unhandled message", move || {
            if let Some(host) = channel.host() {
                host.hooks.on_unhandled_message(&channel, &object);
            }
        });
    }
}

// ============================================================================
// BridgeChannel - Outbound
// ============================================================================

impl BridgeChannel {
    /// Sends a message to the guest.
    ///
    /// Delivered right away when the guest is ready and a host is attached,
    /// queued otherwise. Queueing is not an error.
    pub fn send(&self, message: Message) {
        let guard = self.inner.state.lock();

        let sink = {
            let mut state = guard.borrow_mut();
            match state.deliverable_sink() {
                Some(sink) => sink,
                None => {
                    state.outbound.push(message);
                    trace!(
                        channel = %self.inner.id,
                        queued = state.outbound.len(),
                        "Outbound message queued"
                    );
                    return;
                }
            }
        };

        self.post_delivery(vec![message], sink);
        drop(guard);
    }

    /// Delivers every queued message, in order, if the channel can deliver.
    ///
    /// Messages sent while the snapshot is being delivered are not part of it.
    pub fn flush(&self) {
        let guard = self.inner.state.lock();

        let (sink, snapshot) = {
            let mut state = guard.borrow_mut();
            let Some(sink) = state.deliverable_sink() else {
                trace!(
                    channel = %self.inner.id,
                    queued = state.outbound.len(),
                    "Flush deferred"
                );
                return;
            };
            (sink, state.outbound.take_snapshot())
        };

        if !snapshot.is_empty() {
            debug!(channel = %self.inner.id, count = snapshot.len(), "Flushing outbound queue");
            self.post_delivery(snapshot, sink);
        }
        drop(guard);
    }

    fn post_delivery(&self, messages: Vec<Message>, sink: Arc<dyn GuestSink>) {
        let scripts: Vec<String> = messages
            .iter()
            .filter_map(|message| match to_script(message, &self.inner.services.script) {
                Ok(script) => Some(script),
                Err(e) => {
                    warn!(channel = %self.inner.id, error = %e, "Failed to encode message");
                    None
                }
            })
            .collect();

        if scripts.is_empty() {
            return;
        }

        let channel_id = self.inner.id;
        self.inner.services.ui.run_or_log("deliver", move || {
            for script in &scripts {
                sink.evaluate(script);
            }
            trace!(channel = %channel_id, count = scripts.len(), "Delivered to guest");
        });
    }

    /// Replies to a guest callback. An empty id is ignored.
    pub fn send_callback(&self, callback: CallbackId, data: Option<Value>) {
        if callback.is_empty() {
            debug!(channel = %self.inner.id, "Callback without id not sent");
            return;
        }
        self.send(Message::callback(callback, data));
    }

    /// Sends an event.
    pub fn send_event(
        &self,
        event: impl Into<String>,
        data: Option<Value>,
        callback: Option<CallbackId>,
    ) {
        self.send(Message::event(event, data, callback));
    }

    /// Sends a plugin message.
    pub fn send_plugin(
        &self,
        plugin_name: impl Into<String>,
        data: Option<Value>,
        callback: Option<CallbackId>,
    ) {
        self.send(Message::plugin(plugin_name, data, callback));
    }
}

// ============================================================================
// BridgeChannel - Readiness & Correlated Requests
// ============================================================================

impl BridgeChannel {
    /// Marks the guest ready (idempotent) and flushes.
    pub(crate) fn mark_ready(&self, version: Option<&str>) {
        let guard = self.inner.state.lock();

        {
            let mut state = guard.borrow_mut();
            if state.ready {
                debug!(channel = %self.inner.id, "Readiness repeated");
            } else {
                state.ready = true;
                info!(channel = %self.inner.id, version = ?version, "Guest runtime ready");
            }
            state.guest_version = version.map(str::to_string);
        }

        let host_version = &self.inner.services.options.host_version;
        if let Some(version) = version
            && version != host_version.as_str()
        {
            warn!(
                channel = %self.inner.id,
                guest = version,
                host = %host_version,
                "Bridge version mismatch"
            );
        }

        self.flush();
        drop(guard);
    }

    /// Asks the guest whether the screen may close.
    ///
    /// An allowing reply (`{"value": true}`) pops the channel's screen.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::TooManyPendingRequests`] if the request cap is reached.
    pub fn request_back(&self) -> Result<CallbackId> {
        let id = self.with_state(|state| state.pending.register(PendingRequest::BackPermission))?;
        debug!(channel = %self.inner.id, callback = %id, "Asking guest for back permission");
        self.send_event(events::ON_BACK_BUTTON_PRESSED, None, Some(id.clone()));
        Ok(id)
    }

    /// Starts a pull-to-refresh.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::TooManyPendingRequests`] if the request cap is reached.
    pub fn pull_to_refresh(&self) -> Result<CallbackId> {
        let id = self.with_state(|state| -> Result<CallbackId> {
            let id = state.pending.register(PendingRequest::PullToRefresh)?;
            state.refreshing = true;
            Ok(id)
        })?;
        self.send_event(events::PULL_TO_REFRESH, None, Some(id.clone()));
        Ok(id)
    }

    /// Asks the guest for the next infinite-scroll page.
    ///
    /// Returns `None` while an earlier request is still unanswered.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::TooManyPendingRequests`] if the request cap is reached.
    pub fn infinite_scroll(&self) -> Result<Option<CallbackId>> {
        let id = self.with_state(|state| -> Result<Option<CallbackId>> {
            if state.loading_more && state.pending.has_pending(PendingRequest::InfiniteScroll) {
                return Ok(None);
            }
            let id = state.pending.register(PendingRequest::InfiniteScroll)?;
            state.loading_more = true;
            Ok(Some(id))
        })?;

        match id {
            Some(id) => {
                self.send_event(events::INFINITE_SCROLL, None, Some(id.clone()));
                Ok(Some(id))
            }
            None => {
                trace!(channel = %self.inner.id, "Infinite scroll already in flight");
                Ok(None)
            }
        }
    }

    /// Resolves a reply id against the pending requests.
    pub(crate) fn take_pending(&self, callback: &CallbackId) -> Option<PendingRequest> {
        self.with_state(|state| {
            let resolved = state.pending.resolve(callback);
            match resolved {
                Some(PendingRequest::PullToRefresh) => state.refreshing = false,
                Some(PendingRequest::InfiniteScroll) => state.loading_more = false,
                _ => {}
            }
            resolved
        })
    }
}

// ============================================================================
// BridgeChannel - Lifecycle
// ============================================================================

impl BridgeChannel {
    /// The guest page finished loading; re-flushes.
    pub fn page_loaded(&self) {
        debug!(channel = %self.inner.id, "Page loaded");
        self.flush();
    }

    /// The owning screen came to the foreground.
    ///
    /// Shows deferred alerts in order, flushes, then sends `onPageShown`
    /// with the screen's navigation payload and clears it.
    pub fn resume(&self) {
        let guard = self.inner.state.lock();

        let (alerts, host) = {
            let mut state = guard.borrow_mut();
            state.active = true;
            match state.host.clone() {
                Some(host) => (mem::take(&mut state.pending_alerts), Some(host)),
                None => (Vec::new(), None),
            }
        };

        debug!(channel = %self.inner.id, deferred_alerts = alerts.len(), "Resume");

        if let Some(host) = host
            && !alerts.is_empty()
        {
            let channel = self.clone();
            self.inner.services.ui.run_or_log("deferred alerts", move || {
                for (alert, callback) in &alerts {
                    host.ui.show_alert(&channel, alert, callback.as_ref());
                }
            });
        }

        self.flush();

        let channel = self.clone();
        self.inner.services.ui.run_or_log("page shown", move || {
            let data = channel.navigation().take_data(channel.screen());
            channel.send_event(events::ON_PAGE_SHOWN, data, None);
        });
        drop(guard);
    }

    /// The owning screen left the foreground.
    pub fn pause(&self) {
        debug!(channel = %self.inner.id, "Pause");
        self.with_state(|state| state.active = false);
    }

    /// The app went to the background.
    pub fn app_background(&self) {
        self.send_event(events::ON_APP_BACKGROUND, None, None);
    }

    /// The app came back to the foreground.
    pub fn app_foreground(&self) {
        self.send_event(events::ON_APP_FOREGROUND, None, None);
    }
}

// ============================================================================
// BridgeChannel - UI Replies
// ============================================================================

impl BridgeChannel {
    /// Shows an alert now, or defers it until [`resume`](Self::resume).
    pub(crate) fn show_alert(&self, host: &Host, alert: Alert, callback: Option<CallbackId>) {
        let to_show = self.with_state(|state| {
            if state.active {
                Some((alert, callback))
            } else {
                state.pending_alerts.push((alert, callback));
                debug!(
                    channel = %self.inner.id,
                    deferred = state.pending_alerts.len(),
                    "Alert deferred until resume"
                );
                None
            }
        });

        if let Some((alert, callback)) = to_show {
            host.ui.show_alert(self, &alert, callback.as_ref());
        }
    }

    /// Alert deferred while paused, waiting for [`resume`](Self::resume).
    #[must_use]
    pub fn deferred_alerts(&self) -> usize {
        self.with_state(|state| state.pending_alerts.len())
    }

    /// Replies with the pressed alert button.
    pub fn alert_button_pressed(&self, callback: &CallbackId, index: usize) {
        self.send_callback(callback.clone(), Some(json!({ keys::INDEX: index })));
    }

    /// Replies with the picked date, or `None` when the picker was cleared.
    pub fn date_picked(&self, callback: &CallbackId, date: Option<PickerDate>) {
        let data = date.map(|date| {
            json!({
                keys::YEAR: date.year,
                keys::MONTH: date.month,
                keys::DAY: date.day,
            })
        });
        self.send_callback(callback.clone(), data);
    }

    /// Reports a bars action press.
    pub fn action_pressed(&self, name: &str) {
        self.send(Message::ui(
            actions::BARS,
            Some(json!({ keys::ACTION: actions::ACTION_PRESSED, keys::NAME: name })),
            None,
        ));
    }
}

// ============================================================================
// BridgeChannel - Web Layer Events
// ============================================================================

impl BridgeChannel {
    /// The web layer started loading.
    pub fn web_layer_loading(&self) {
        self.send_event(events::ON_WEB_LAYER_LOADING, None, None);
    }

    /// The web layer finished loading.
    pub fn web_layer_loaded(&self) {
        self.send_event(events::ON_WEB_LAYER_LOADED, None, None);
    }

    /// The web layer showing `page` was dismissed with `data`.
    pub fn web_layer_dismissed(&self, page: &str, data: Option<Value>) {
        self.send_event(
            events::ON_WEB_LAYER_DISMISSED,
            Some(json!({ keys::PAGE: page, keys::DATA: data })),
            None,
        );
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use parking_lot::Mutex;
    use proptest::prelude::*;

    use crate::bridge::host::{BridgeHooks, PluginManager, UiControls};
    use crate::executor::{InlineUi, UiThread};
    use crate::protocol::decode;
    use crate::navigation::controller::tests::{RecordingHost, resolver};

    /// Guest sink recording delivered scripts.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub(crate) scripts: Mutex<Vec<String>>,
    }

    impl RecordingSink {
        /// Delivered messages, decoded back.
        pub(crate) fn messages(&self) -> Vec<Message> {
            self.scripts
                .lock()
                .iter()
                .map(|script| {
                    let json = script
                        .strip_prefix("cobalt.execute(")
                        .and_then(|s| s.strip_suffix(");"))
                        .expect("script shape")
                        .replace("%25", "%");
                    decode(&json).expect("decode delivered")
                })
                .collect()
        }
    }

    impl GuestSink for RecordingSink {
        fn evaluate(&self, script: &str) {
            self.scripts.lock().push(script.to_string());
        }
    }

    /// Hooks recording what reached them.
    #[derive(Default)]
    pub(crate) struct RecordingHooks {
        pub(crate) ready: Mutex<usize>,
        pub(crate) unhandled: Mutex<Vec<Value>>,
        pub(crate) events: Mutex<Vec<String>>,
        pub(crate) callbacks: Mutex<Vec<CallbackId>>,
        pub(crate) refreshed: Mutex<usize>,
        pub(crate) scrolled: Mutex<usize>,
    }

    impl BridgeHooks for RecordingHooks {
        fn on_ready(&self, _channel: &BridgeChannel) {
            *self.ready.lock() += 1;
        }

        fn on_unhandled_event(
            &self,
            _channel: &BridgeChannel,
            event: &str,
            _data: Option<&Value>,
            _callback: Option<&CallbackId>,
        ) -> bool {
            self.events.lock().push(event.to_string());
            event.starts_with("handled")
        }

        fn on_unhandled_callback(
            &self,
            _channel: &BridgeChannel,
            callback: &CallbackId,
            _data: Option<&Value>,
        ) -> bool {
            self.callbacks.lock().push(callback.clone());
            true
        }

        fn on_unhandled_message(&self, _channel: &BridgeChannel, message: &Value) {
            self.unhandled.lock().push(message.clone());
        }

        fn on_pull_to_refresh_done(&self, _channel: &BridgeChannel) {
            *self.refreshed.lock() += 1;
        }

        fn on_infinite_scroll_done(&self, _channel: &BridgeChannel) {
            *self.scrolled.lock() += 1;
        }
    }

    /// UI controls recording alerts and calls.
    #[derive(Default)]
    pub(crate) struct RecordingUi {
        pub(crate) alerts: Mutex<Vec<(Alert, Option<CallbackId>)>>,
        pub(crate) calls: Mutex<Vec<String>>,
    }

    impl UiControls for RecordingUi {
        fn show_alert(
            &self,
            _channel: &BridgeChannel,
            alert: &Alert,
            callback: Option<&CallbackId>,
        ) {
            self.alerts.lock().push((alert.clone(), callback.cloned()));
        }

        fn show_toast(&self, text: &str) {
            self.calls.lock().push(format!("toast:{text}"));
        }

        fn set_bars(&self, bars: Option<&Value>) {
            self.calls.lock().push(format!("setBars:{}", bars.is_some()));
        }

        fn set_action_badge(&self, name: &str, badge: &str) {
            self.calls.lock().push(format!("badge:{name}={badge}"));
        }

        fn set_action_visible(&self, name: &str, visible: bool) {
            self.calls.lock().push(format!("visible:{name}={visible}"));
        }
    }

    /// A channel on an inline executor, with recording collaborators.
    pub(crate) struct Fixture {
        pub(crate) channel: BridgeChannel,
        pub(crate) sink: Arc<RecordingSink>,
        pub(crate) hooks: Arc<RecordingHooks>,
        pub(crate) ui: Arc<RecordingUi>,
        pub(crate) screens: Arc<RecordingHost>,
        pub(crate) plugins: Arc<PluginManager>,
    }

    impl Fixture {
        pub(crate) fn new() -> Self {
            Self::with_options(BridgeOptions::default())
        }

        pub(crate) fn with_options(options: BridgeOptions) -> Self {
            Self::with_executor(options, UiHandle::new(InlineUi::new()))
        }

        pub(crate) fn with_executor(options: BridgeOptions, ui: UiHandle) -> Self {
            let screens = Arc::new(RecordingHost::default());
            let navigation = Arc::new(NavigationController::new(resolver(), screens.clone()));
            let screen = navigation
                .register_root(None, "index.html")
                .expect("root");
            let plugins = Arc::new(PluginManager::new());
            let services = Arc::new(Services::new(
                options,
                navigation,
                ui,
                plugins.clone(),
            ));

            Self {
                channel: BridgeChannel::new(screen, services),
                sink: Arc::new(RecordingSink::default()),
                hooks: Arc::new(RecordingHooks::default()),
                ui: Arc::new(RecordingUi::default()),
                screens,
                plugins,
            }
        }

        pub(crate) fn host(&self) -> Host {
            Host::new(self.sink.clone())
                .with_hooks(self.hooks.clone())
                .with_ui(self.ui.clone())
        }

        /// Attaches and announces readiness.
        pub(crate) fn ready(self) -> Self {
            self.channel.attach(self.host());
            self.channel.receive(r#"{"type":"cobaltIsReady","version":"0.1.0"}"#);
            self
        }

        pub(crate) fn delivered_logs(&self) -> Vec<String> {
            self.sink
                .messages()
                .iter()
                .filter_map(|m| m.value().map(str::to_string))
                .collect()
        }
    }

    #[test]
    fn test_send_before_ready_is_queued() {
        let fx = Fixture::new();
        fx.channel.attach(fx.host());
        fx.channel.send(Message::log("early"));

        assert_eq!(fx.channel.queued_outbound(), 1);
        assert!(fx.sink.scripts.lock().is_empty());
    }

    #[test]
    fn test_ready_flushes_in_order() {
        let fx = Fixture::new();
        fx.channel.attach(fx.host());
        for text in ["a", "b", "c"] {
            fx.channel.send(Message::log(text));
        }

        fx.channel.receive(r#"{"type":"cobaltIsReady"}"#);

        assert!(fx.channel.is_ready());
        assert_eq!(fx.channel.queued_outbound(), 0);
        assert_eq!(fx.delivered_logs(), vec!["a", "b", "c"]);
        assert_eq!(*fx.hooks.ready.lock(), 1);

        fx.channel.send(Message::log("d"));
        assert_eq!(fx.delivered_logs(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_ready_twice_flushes_only_new_messages() {
        let fx = Fixture::new().ready();
        fx.channel.send(Message::log("first"));

        fx.channel.detach();
        fx.channel.send(Message::log("while detached"));
        fx.channel.attach(fx.host());
        fx.channel.receive(r#"{"type":"cobaltIsReady"}"#);

        assert_eq!(fx.delivered_logs(), vec!["first", "while detached"]);
        assert_eq!(*fx.hooks.ready.lock(), 2);
    }

    #[test]
    fn test_inbound_replayed_once_on_attach() {
        let fx = Fixture::new();
        fx.channel.receive(r#"{"type":"event","event":"one"}"#);
        fx.channel.receive(r#"{"type":"event","event":"two"}"#);
        assert_eq!(fx.channel.queued_inbound(), 2);

        fx.channel.attach(fx.host());
        fx.channel.detach();
        fx.channel.attach(fx.host());

        assert_eq!(*fx.hooks.events.lock(), vec!["one", "two"]);
        assert_eq!(fx.channel.queued_inbound(), 0);
    }

    #[test]
    fn test_inbound_dropped_after_detach() {
        let fx = Fixture::new();
        fx.channel.attach(fx.host());
        fx.channel.detach();
        fx.channel.receive(r#"{"type":"event","event":"late"}"#);

        assert_eq!(fx.channel.queued_inbound(), 0);
        assert!(fx.hooks.events.lock().is_empty());
    }

    #[test]
    fn test_send_during_delivery_is_not_reordered() {
        struct EchoSink {
            channel: Mutex<Option<BridgeChannel>>,
            scripts: Mutex<Vec<String>>,
        }

        impl GuestSink for EchoSink {
            fn evaluate(&self, script: &str) {
                self.scripts.lock().push(script.to_string());
                let channel = self.channel.lock().clone();
                if script.contains("\"ping\"")
                    && let Some(channel) = channel
                {
                    channel.send(Message::log("pong"));
                }
            }
        }

        let fx = Fixture::new();
        let sink = Arc::new(EchoSink {
            channel: Mutex::new(Some(fx.channel.clone())),
            scripts: Mutex::new(Vec::new()),
        });
        fx.channel.attach(Host::new(sink.clone()));
        fx.channel.send(Message::log("ping"));
        fx.channel.send(Message::log("after"));
        fx.channel.receive(r#"{"type":"cobaltIsReady"}"#);

        let order: Vec<bool> = sink
            .scripts
            .lock()
            .iter()
            .map(|s| s.contains("pong"))
            .collect();
        assert_eq!(order, vec![false, false, true]);
        sink.channel.lock().take();
    }

    #[test]
    fn test_alerts_deferred_until_resume() {
        let fx = Fixture::new().ready();
        let alert = r#"{"type":"ui","control":"alert","data":{"title":"A"},"callback":"a1"}"#;
        fx.channel.receive(alert);
        fx.channel
            .receive(r#"{"type":"ui","control":"alert","data":{"title":"B"},"callback":"a2"}"#);

        assert!(fx.ui.alerts.lock().is_empty());
        assert_eq!(fx.channel.deferred_alerts(), 2);

        fx.channel.resume();
        let titles: Vec<Option<String>> =
            fx.ui.alerts.lock().iter().map(|(a, _)| a.title.clone()).collect();
        assert_eq!(titles, vec![Some("A".to_string()), Some("B".to_string())]);

        fx.channel.resume();
        assert_eq!(fx.ui.alerts.lock().len(), 2);

        fx.channel.receive(alert);
        assert_eq!(fx.ui.alerts.lock().len(), 3);
    }

    #[test]
    fn test_resume_sends_page_shown_with_data_once() {
        let fx = Fixture::new().ready();
        fx.channel
            .navigation()
            .pop_to(None, "index.html", Some(json!({"n": 1})))
            .expect("root matches");

        fx.channel.resume();
        fx.channel.pause();
        fx.channel.resume();

        let shown: Vec<Message> = fx
            .sink
            .messages()
            .into_iter()
            .filter(|m| m.event_name() == Some(events::ON_PAGE_SHOWN))
            .collect();
        assert_eq!(shown.len(), 2);
        assert_eq!(shown[0].data(), Some(&json!({"n": 1})));
        assert!(shown[1].data().is_none());
    }

    #[test]
    fn test_infinite_scroll_in_flight_guard() {
        let fx = Fixture::new().ready();
        let id = fx
            .channel
            .infinite_scroll()
            .expect("request")
            .expect("first request sent");
        assert!(fx.channel.infinite_scroll().expect("request").is_none());

        fx.channel
            .receive(&format!(r#"{{"type":"callback","callback":"{id}"}}"#));
        assert!(!fx.channel.is_loading_more());
        assert_eq!(*fx.hooks.scrolled.lock(), 1);
        assert!(fx.channel.infinite_scroll().expect("request").is_some());
    }

    #[test]
    fn test_alert_and_date_replies() {
        let fx = Fixture::new().ready();
        fx.channel.alert_button_pressed(&CallbackId::new("a1"), 2);
        fx.channel.date_picked(
            &CallbackId::new("d1"),
            Some(PickerDate {
                year: 2024,
                month: 2,
                day: 29,
            }),
        );
        fx.channel.date_picked(&CallbackId::new("d2"), None);

        let delivered = fx.sink.messages();
        assert_eq!(delivered[0].data(), Some(&json!({"index": 2})));
        assert_eq!(
            delivered[1].data(),
            Some(&json!({"year": 2024, "month": 2, "day": 29}))
        );
        assert_eq!(delivered[2].callback_id(), Some(&CallbackId::new("d2")));
        assert!(delivered[2].data().is_none());
    }

    #[test]
    fn test_web_layer_dismissed_event() {
        let fx = Fixture::new().ready();
        fx.channel
            .web_layer_dismissed("layer.html", Some(json!({"ok": true})));

        let delivered = fx.sink.messages();
        assert_eq!(delivered[0].event_name(), Some(events::ON_WEB_LAYER_DISMISSED));
        assert_eq!(
            delivered[0].data(),
            Some(&json!({"page": "layer.html", "data": {"ok": true}}))
        );
    }

    #[test]
    fn test_action_pressed_message() {
        let fx = Fixture::new().ready();
        fx.channel.action_pressed("share");

        let delivered = fx.sink.messages();
        assert_eq!(delivered[0].control(), Some(actions::BARS));
        assert_eq!(
            delivered[0].data(),
            Some(&json!({"action": "actionPressed", "name": "share"}))
        );
    }

    #[test]
    fn test_scripts_use_configured_global() {
        let fx = Fixture::with_options(BridgeOptions::new().with_bridge_global("app.bridge"))
            .ready();
        fx.channel.send(Message::log("x"));
        assert_eq!(
            fx.sink.scripts.lock().last().map(String::as_str),
            Some(r#"app.bridge.execute({"type":"log","value":"x"});"#)
        );
    }

    #[test]
    fn test_ready_with_numeric_version() {
        let fx = Fixture::new();
        fx.channel.attach(fx.host());
        fx.channel.send(Message::log("queued"));

        fx.channel.receive(r#"{"type":"cobaltIsReady","version":2}"#);

        assert!(fx.channel.is_ready());
        assert_eq!(fx.channel.guest_version().as_deref(), Some("2"));
        assert_eq!(fx.channel.queued_outbound(), 0);
        assert_eq!(fx.delivered_logs(), vec!["queued"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_ui_thread_keeps_order_across_threads() {
        let ui = UiThread::spawn();
        let fx = Fixture::with_executor(BridgeOptions::default(), UiHandle::new(ui.clone()));

        let channel = fx.channel.clone();
        tokio::task::spawn_blocking(move || {
            channel.receive(r#"{"type":"event","event":"one"}"#);
            channel.receive(r#"{"type":"event","event":"two"}"#);
            for text in ["a", "b", "c"] {
                channel.send(Message::log(text));
            }
        })
        .await
        .expect("guest thread");
        assert_eq!(fx.channel.queued_inbound(), 2);
        assert_eq!(fx.channel.queued_outbound(), 3);

        fx.channel.attach(fx.host());
        ui.idle().await.expect("idle");
        assert_eq!(*fx.hooks.events.lock(), vec!["one", "two"]);
        assert_eq!(fx.channel.queued_inbound(), 0);

        let channel = fx.channel.clone();
        tokio::task::spawn_blocking(move || {
            channel.receive(r#"{"type":"cobaltIsReady"}"#);
            channel.send(Message::log("d"));
        })
        .await
        .expect("guest thread");
        ui.idle().await.expect("idle");
        assert!(fx.channel.is_ready());
        assert_eq!(fx.delivered_logs(), vec!["a", "b", "c", "d"]);

        let channel = fx.channel.clone();
        tokio::task::spawn_blocking(move || {
            channel.receive(r#"{"type":"cobaltIsReady"}"#);
            channel.send(Message::log("e"));
        })
        .await
        .expect("guest thread");
        ui.idle().await.expect("idle");
        assert_eq!(fx.delivered_logs(), vec!["a", "b", "c", "d", "e"]);

        fx.channel.detach();
        fx.channel.attach(fx.host());
        ui.idle().await.expect("idle");
        assert_eq!(*fx.hooks.events.lock(), vec!["one", "two"]);

        ui.shutdown();
    }

    proptest! {
        #[test]
        fn prop_queue_ordering(values in proptest::collection::vec("[a-z0-9 ]{0,8}", 0..30)) {
            let fx = Fixture::new();
            fx.channel.attach(fx.host());
            for value in &values {
                fx.channel.send(Message::log(value.clone()));
            }
            fx.channel.receive(r#"{"type":"cobaltIsReady"}"#);
            fx.channel.receive(r#"{"type":"cobaltIsReady"}"#);

            prop_assert_eq!(fx.delivered_logs(), values);
        }
    }
}
