//! Message envelope exchanged with the guest runtime.
//!
//! Every message, in both directions, is a JSON object whose `type`
//! discriminator selects which of the optional fields are meaningful.
//!
//! # Format
//!
//! ```json
//! {
//!   "type": "navigation",
//!   "action": "push",
//!   "data": { "page": "detail.html", "controller": "detail" },
//!   "callback": "cb-12"
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::identifiers::CallbackId;

// ============================================================================
// Wire Constants
// ============================================================================

/// Envelope and payload keys.
pub mod keys {
    pub const TYPE: &str = "type";
    pub const DATA: &str = "data";
    pub const ACTION: &str = "action";
    pub const EVENT: &str = "event";
    pub const CALLBACK: &str = "callback";
    pub const CONTROL: &str = "control";
    pub const PLUGIN_NAME: &str = "pluginName";
    pub const VALUE: &str = "value";
    pub const VERSION: &str = "version";

    pub const PAGE: &str = "page";
    pub const CONTROLLER: &str = "controller";
    pub const BARS: &str = "bars";
    pub const ANIMATED: &str = "animated";
    pub const CLEAR_HISTORY: &str = "clearHistory";
    pub const URL: &str = "url";
    pub const FADE_DURATION: &str = "fadeDuration";

    pub const DATE: &str = "date";
    pub const YEAR: &str = "year";
    pub const MONTH: &str = "month";
    pub const DAY: &str = "day";
    pub const TEXTS: &str = "texts";
    pub const TITLE: &str = "title";
    pub const CLEAR: &str = "clear";
    pub const CANCEL: &str = "cancel";
    pub const VALIDATE: &str = "validate";

    pub const MESSAGE: &str = "message";
    pub const CANCELABLE: &str = "cancelable";
    pub const BUTTONS: &str = "buttons";
    pub const INDEX: &str = "index";

    pub const NAME: &str = "name";
    pub const BADGE: &str = "badge";
    pub const CONTENT: &str = "content";
    pub const VISIBLE: &str = "visible";
    pub const ENABLED: &str = "enabled";
    pub const TOP: &str = "top";
    pub const BOTTOM: &str = "bottom";
}

/// Events the host sends to the guest.
pub mod events {
    pub const ON_BACK_BUTTON_PRESSED: &str = "onBackButtonPressed";
    pub const PULL_TO_REFRESH: &str = "pullToRefresh";
    pub const INFINITE_SCROLL: &str = "infiniteScroll";
    pub const ON_PAGE_SHOWN: &str = "onPageShown";
    pub const ON_APP_BACKGROUND: &str = "onAppBackground";
    pub const ON_APP_FOREGROUND: &str = "onAppForeground";
    pub const ON_WEB_LAYER_LOADING: &str = "onWebLayerLoading";
    pub const ON_WEB_LAYER_LOADED: &str = "onWebLayerLoaded";
    pub const ON_WEB_LAYER_DISMISSED: &str = "onWebLayerDismissed";
}

/// Well-known callback names answered by the guest.
pub mod callbacks {
    pub const ON_BACK_BUTTON_PRESSED: &str = "onBackButtonPressed";
    pub const PULL_TO_REFRESH_DID_REFRESH: &str = "pullToRefreshDidRefresh";
    pub const INFINITE_SCROLL_DID_REFRESH: &str = "infiniteScrollDidRefresh";
}

/// `action` / `control` values.
pub mod actions {
    pub const PUSH: &str = "push";
    pub const POP: &str = "pop";
    pub const MODAL: &str = "modal";
    pub const DISMISS: &str = "dismiss";
    pub const REPLACE: &str = "replace";

    pub const OPEN_EXTERNAL_URL: &str = "openExternalUrl";

    pub const SHOW: &str = "show";
    pub const BRING_TO_FRONT: &str = "bringToFront";
    pub const SEND_TO_BACK: &str = "sendToBack";

    pub const PICKER: &str = "picker";
    pub const ALERT: &str = "alert";
    pub const TOAST: &str = "toast";
    pub const BARS: &str = "bars";
    pub const PICKER_DATE: &str = "date";

    pub const SET_BARS: &str = "setBars";
    pub const SET_ACTION_BADGE: &str = "setActionBadge";
    pub const SET_ACTION_CONTENT: &str = "setActionContent";
    pub const SET_BARS_VISIBLE: &str = "setBarsVisible";
    pub const SET_BAR_CONTENT: &str = "setBarContent";
    pub const SET_ACTION_VISIBLE: &str = "setActionVisible";
    pub const SET_ACTION_ENABLED: &str = "setActionEnabled";
    pub const ACTION_PRESSED: &str = "actionPressed";
}

// ============================================================================
// MessageType
// ============================================================================

/// Closed set of message kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageType {
    /// Reply correlated to an earlier request.
    Callback,
    /// The guest runtime finished booting.
    CobaltIsReady,
    /// Named notification.
    Event,
    /// Request to hand something to the operating system.
    Intent,
    /// Guest-side log line.
    Log,
    /// Screen navigation request.
    Navigation,
    /// Message for a host plugin.
    Plugin,
    /// Native UI control request.
    Ui,
    /// Overlay web layer request.
    WebLayer,
}

impl MessageType {
    /// Every message type, in wire declaration order.
    pub const ALL: [MessageType; 9] = [
        Self::Callback,
        Self::CobaltIsReady,
        Self::Event,
        Self::Intent,
        Self::Log,
        Self::Navigation,
        Self::Plugin,
        Self::Ui,
        Self::WebLayer,
    ];

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Callback => "callback",
            Self::CobaltIsReady => "cobaltIsReady",
            Self::Event => "event",
            Self::Intent => "intent",
            Self::Log => "log",
            Self::Navigation => "navigation",
            Self::Plugin => "plugin",
            Self::Ui => "ui",
            Self::WebLayer => "webLayer",
        }
    }

    /// Parses a wire name.
    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Message
// ============================================================================

/// An immutable bridge message.
///
/// Fields are private so that a JSON `null` payload is always normalized to
/// "absent"; this keeps `decode(encode(m)) == m` for every constructible value.
///
/// String fields accept numbers and booleans in their JSON spelling; any
/// other shape reads as absent instead of rejecting the message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    kind: MessageType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,

    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    action: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    event: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_callback",
        skip_serializing_if = "Option::is_none"
    )]
    callback: Option<CallbackId>,

    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    control: Option<String>,

    #[serde(
        rename = "pluginName",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    plugin_name: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    value: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    version: Option<String>,
}

/// Strings as-is, numbers and booleans as their JSON text, anything else absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    })
}

fn lenient_callback<'de, D>(deserializer: D) -> Result<Option<CallbackId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.map(CallbackId::new))
}

// ============================================================================
// Message - Constructors
// ============================================================================

impl Message {
    /// Creates an empty message of the given kind.
    #[must_use]
    pub const fn new(kind: MessageType) -> Self {
        Self {
            kind,
            data: None,
            action: None,
            event: None,
            callback: None,
            control: None,
            plugin_name: None,
            value: None,
            version: None,
        }
    }

    /// Reply to a guest callback.
    #[must_use]
    pub fn callback(callback: CallbackId, data: Option<Value>) -> Self {
        Self::new(MessageType::Callback)
            .with_callback(Some(callback))
            .with_data(data)
    }

    /// Readiness announcement, as the guest sends it.
    #[must_use]
    pub fn cobalt_is_ready(version: Option<String>) -> Self {
        let mut message = Self::new(MessageType::CobaltIsReady);
        message.version = version;
        message
    }

    /// Named event with optional payload and reply id.
    #[must_use]
    pub fn event(
        event: impl Into<String>,
        data: Option<Value>,
        callback: Option<CallbackId>,
    ) -> Self {
        let mut message = Self::new(MessageType::Event)
            .with_data(data)
            .with_callback(callback);
        message.event = Some(event.into());
        message
    }

    /// Intent request.
    #[must_use]
    pub fn intent(action: impl Into<String>, data: Option<Value>) -> Self {
        Self::new(MessageType::Intent)
            .with_action(action)
            .with_data(data)
    }

    /// Guest log line.
    #[must_use]
    pub fn log(value: impl Into<String>) -> Self {
        let mut message = Self::new(MessageType::Log);
        message.value = Some(value.into());
        message
    }

    /// Navigation request.
    #[must_use]
    pub fn navigation(
        action: impl Into<String>,
        data: Option<Value>,
        callback: Option<CallbackId>,
    ) -> Self {
        Self::new(MessageType::Navigation)
            .with_action(action)
            .with_data(data)
            .with_callback(callback)
    }

    /// Plugin message.
    #[must_use]
    pub fn plugin(
        plugin_name: impl Into<String>,
        data: Option<Value>,
        callback: Option<CallbackId>,
    ) -> Self {
        let mut message = Self::new(MessageType::Plugin)
            .with_data(data)
            .with_callback(callback);
        message.plugin_name = Some(plugin_name.into());
        message
    }

    /// UI control message.
    #[must_use]
    pub fn ui(control: impl Into<String>, data: Option<Value>, callback: Option<CallbackId>) -> Self {
        let mut message = Self::new(MessageType::Ui)
            .with_data(data)
            .with_callback(callback);
        message.control = Some(control.into());
        message
    }

    /// Web layer message.
    #[must_use]
    pub fn web_layer(action: impl Into<String>, data: Option<Value>) -> Self {
        Self::new(MessageType::WebLayer)
            .with_action(action)
            .with_data(data)
    }

    /// Sets the payload. `Value::Null` is treated as absent.
    #[must_use]
    pub fn with_data(mut self, data: Option<Value>) -> Self {
        self.data = data.filter(|value| !value.is_null());
        self
    }

    /// Sets the action.
    #[must_use]
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Sets the correlation id.
    #[must_use]
    pub fn with_callback(mut self, callback: Option<CallbackId>) -> Self {
        self.callback = callback;
        self
    }
}

// ============================================================================
// Message - Accessors
// ============================================================================

impl Message {
    /// Message kind.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> MessageType {
        self.kind
    }

    /// Payload.
    #[inline]
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// `action` field.
    #[inline]
    #[must_use]
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    /// `event` field.
    #[inline]
    #[must_use]
    pub fn event_name(&self) -> Option<&str> {
        self.event.as_deref()
    }

    /// Correlation id.
    #[inline]
    #[must_use]
    pub fn callback_id(&self) -> Option<&CallbackId> {
        self.callback.as_ref()
    }

    /// `control` field.
    #[inline]
    #[must_use]
    pub fn control(&self) -> Option<&str> {
        self.control.as_deref()
    }

    /// `pluginName` field.
    #[inline]
    #[must_use]
    pub fn plugin_name(&self) -> Option<&str> {
        self.plugin_name.as_deref()
    }

    /// `value` field (log text).
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// `version` field (readiness announcement).
    #[inline]
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Returns the message as a JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Normalizes fields after deserialization.
    pub(crate) fn normalized(mut self) -> Self {
        self.data = self.data.filter(|value| !value.is_null());
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_type_wire_names() {
        for kind in MessageType::ALL {
            let json = serde_json::to_string(&kind).expect("serialize");
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
            assert_eq!(MessageType::from_wire(kind.as_str()), Some(kind));
        }
        assert_eq!(MessageType::from_wire("bogus"), None);
    }

    #[test]
    fn test_event_serialization() {
        let message = Message::event(
            events::ON_PAGE_SHOWN,
            Some(json!({"from": "list"})),
            None,
        );
        let json = serde_json::to_value(&message).expect("serialize");

        assert_eq!(json["type"], "event");
        assert_eq!(json["event"], "onPageShown");
        assert_eq!(json["data"]["from"], "list");
        assert!(json.get("callback").is_none());
    }

    #[test]
    fn test_null_data_is_absent() {
        let message = Message::callback(CallbackId::new("cb"), Some(Value::Null));
        assert!(message.data().is_none());
    }

    #[test]
    fn test_lenient_string_fields() {
        let message: Message = serde_json::from_value(json!({
            "type": "navigation",
            "action": "modal",
            "callback": 7,
            "control": ["x"],
            "version": 1.5
        }))
        .expect("deserialize");

        assert_eq!(message.action(), Some("modal"));
        assert_eq!(message.callback_id(), Some(&CallbackId::new("7")));
        assert_eq!(message.control(), None);
        assert_eq!(message.version(), Some("1.5"));
    }

    #[test]
    fn test_plugin_name_key() {
        let message = Message::plugin("geoloc", None, Some(CallbackId::new("c1")));
        let json = message.to_value();
        assert_eq!(json["pluginName"], "geoloc");
        assert_eq!(json["callback"], "c1");
    }
}
