//! Typed view of a decoded message.
//!
//! [`Route::from_message`] turns the string-keyed envelope into a sum type so
//! the dispatcher can match exhaustively. Required sub-fields are validated
//! here; optional ones get their defaults here too, so handlers only ever see
//! well-formed primitives.

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Map, Value};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::CallbackId;

use super::message::{Message, MessageType, actions, keys};

// ============================================================================
// Constants
// ============================================================================

/// Alert dialogs show at most this many buttons.
pub const MAX_ALERT_BUTTONS: usize = 3;

// ============================================================================
// Route
// ============================================================================

/// What a message asks the host to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// Reply to a correlated request.
    Callback {
        /// Correlation id.
        callback: CallbackId,
        /// Reply payload.
        data: Option<Value>,
    },

    /// Guest runtime is ready.
    Ready {
        /// Guest-side bridge version.
        version: Option<String>,
    },

    /// Guest-defined event.
    Event {
        /// Event name.
        event: String,
        /// Event payload.
        data: Option<Value>,
        /// Reply id, if the guest expects one.
        callback: Option<CallbackId>,
    },

    /// Operating-system intent.
    Intent(IntentAction),

    /// Guest log line.
    Log {
        /// Text to log.
        value: String,
    },

    /// Screen navigation.
    Navigation(NavigationAction),

    /// Delegated to the plugin registry as a whole message.
    Plugin,

    /// Native UI control.
    Ui(UiAction),

    /// Overlay web layer.
    WebLayer(WebLayerAction),
}

// ============================================================================
// Intent
// ============================================================================

/// Intent actions.
#[derive(Debug, Clone, PartialEq)]
pub enum IntentAction {
    /// Open a URL outside the app.
    OpenExternalUrl(Url),
    /// Any other intent; not an error, just not handled.
    Unsupported(String),
}

// ============================================================================
// Navigation
// ============================================================================

/// Screen a push/modal/replace targets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NavigationTarget {
    /// Page to load.
    pub page: String,
    /// Controller name for the route resolver.
    pub controller: Option<String>,
    /// Bars configuration override.
    pub bars: Option<Value>,
    /// Navigation payload for the new screen.
    pub data: Option<Value>,
}

/// Navigation actions.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationAction {
    /// Open a screen on top of the current one.
    Push(NavigationTarget),
    /// Close the current screen, after guest permission.
    Pop,
    /// Hand `data` to the previous screen, then pop.
    PopWithData(Option<Value>),
    /// Unwind to an earlier screen.
    PopTo {
        /// Controller of the target screen.
        controller: Option<String>,
        /// Page of the target screen.
        page: String,
        /// Payload for the target screen.
        data: Option<Value>,
    },
    /// Present a screen modally.
    PresentModal {
        /// Screen to present.
        target: NavigationTarget,
        /// Reply id receiving the presenting screen's identity.
        callback: Option<CallbackId>,
    },
    /// Dismiss back to the screen that presented the modal.
    DismissModal {
        /// Screen kind of the presenter.
        controller: String,
        /// Page of the presenter.
        page: String,
        /// Payload for the presenter.
        data: Option<Value>,
    },
    /// Open a screen in place of the current one.
    Replace {
        /// Screen to open.
        target: NavigationTarget,
        /// Animate the transition.
        animated: bool,
        /// Make the new screen the only history entry.
        clear_history: bool,
    },
}

// ============================================================================
// UI
// ============================================================================

/// A calendar date, month is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickerDate {
    /// Year.
    pub year: i32,
    /// Month, 1-12.
    pub month: u32,
    /// Day of month.
    pub day: u32,
}

/// Labels for the date picker dialog.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PickerTexts {
    /// Dialog title.
    pub title: Option<String>,
    /// "Clear" button.
    pub clear: Option<String>,
    /// "Cancel" button.
    pub cancel: Option<String>,
    /// "Validate" button.
    pub validate: Option<String>,
}

/// Date picker request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DatePicker {
    /// Preselected date; the host picks today when absent.
    pub date: Option<PickerDate>,
    /// Dialog labels.
    pub texts: PickerTexts,
}

/// Alert dialog request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Alert {
    /// Title.
    pub title: Option<String>,
    /// Body text.
    pub message: Option<String>,
    /// Dismissable without pressing a button.
    pub cancelable: bool,
    /// Button labels, at most [`MAX_ALERT_BUTTONS`]. Empty means a single "OK".
    pub buttons: Vec<String>,
}

/// Top / bottom bar visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarsVisibility {
    /// Top bar.
    pub top: bool,
    /// Bottom bar.
    pub bottom: bool,
}

impl Default for BarsVisibility {
    fn default() -> Self {
        Self {
            top: true,
            bottom: true,
        }
    }
}

/// Bars (action bar / menu) mutations.
#[derive(Debug, Clone, PartialEq)]
pub enum BarsAction {
    /// Replace the whole bars configuration.
    SetBars(Option<Value>),
    /// Set (or clear with `""`) an action's badge.
    SetActionBadge {
        /// Action name.
        name: String,
        /// Badge text.
        badge: String,
    },
    /// Replace an action's content.
    SetActionContent {
        /// Action name.
        name: String,
        /// New content.
        content: Value,
    },
    /// Show or hide bars.
    SetBarsVisible(BarsVisibility),
    /// Replace bar content (title, colors...).
    SetBarContent(Value),
    /// Show or hide one action.
    SetActionVisible {
        /// Action name.
        name: String,
        /// Visibility.
        visible: bool,
    },
    /// Enable or disable one action.
    SetActionEnabled {
        /// Action name.
        name: String,
        /// Enabled state.
        enabled: bool,
    },
}

/// UI control actions.
#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    /// Show a date picker; replies with the picked date.
    DatePicker {
        /// Picker configuration.
        picker: DatePicker,
        /// Reply id.
        callback: Option<CallbackId>,
    },
    /// Picker of a type the host does not provide.
    UnsupportedPicker(String),
    /// Show an alert; replies with the pressed button index.
    Alert {
        /// Alert configuration.
        alert: Alert,
        /// Reply id.
        callback: Option<CallbackId>,
    },
    /// Show a toast.
    Toast(String),
    /// Mutate bars.
    Bars(BarsAction),
}

// ============================================================================
// Web Layer
// ============================================================================

/// Web layer actions.
#[derive(Debug, Clone, PartialEq)]
pub enum WebLayerAction {
    /// Show a web layer over the current screen.
    Show {
        /// Page loaded in the layer.
        page: String,
        /// Fade duration in seconds, `None` for the configured default.
        fade_duration: Option<f64>,
    },
    /// Dismiss the current web layer.
    Dismiss {
        /// Payload forwarded to the root screen's `onWebLayerDismissed`.
        data: Option<Value>,
        /// Fade duration in seconds.
        fade_duration: f64,
    },
    /// Raise the layer above the screen content.
    BringToFront,
    /// Lower the layer below the screen content.
    SendToBack,
}

// ============================================================================
// Route Parsing
// ============================================================================

impl Route {
    /// Builds the typed route for a decoded message.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingField`] if a required field is absent
    /// - [`Error::InvalidField`] if a field has the wrong shape
    /// - [`Error::UnknownAction`] for an unrecognized action or control
    pub fn from_message(message: &Message) -> Result<Self> {
        match message.kind() {
            MessageType::Callback => {
                let callback = message
                    .callback_id()
                    .cloned()
                    .ok_or_else(|| Error::missing_field(keys::CALLBACK, "callback"))?;
                Ok(Self::Callback {
                    callback,
                    data: message.data().cloned(),
                })
            }

            MessageType::CobaltIsReady => Ok(Self::Ready {
                version: message.version().map(str::to_string),
            }),

            MessageType::Event => {
                let event = message
                    .event_name()
                    .ok_or_else(|| Error::missing_field(keys::EVENT, "event"))?;
                Ok(Self::Event {
                    event: event.to_string(),
                    data: message.data().cloned(),
                    callback: message.callback_id().cloned(),
                })
            }

            MessageType::Intent => parse_intent(message).map(Self::Intent),

            MessageType::Log => {
                let value = message
                    .value()
                    .ok_or_else(|| Error::missing_field(keys::VALUE, "log"))?;
                Ok(Self::Log {
                    value: value.to_string(),
                })
            }

            MessageType::Navigation => parse_navigation(message).map(Self::Navigation),

            MessageType::Plugin => Ok(Self::Plugin),

            MessageType::Ui => parse_ui(message).map(Self::Ui),

            MessageType::WebLayer => parse_web_layer(message).map(Self::WebLayer),
        }
    }
}

fn parse_intent(message: &Message) -> Result<IntentAction> {
    let action = required_action(message, "intent")?;

    match action {
        actions::OPEN_EXTERNAL_URL => {
            let data = required_data(message, "intent")?;
            let url = required_str(data, keys::URL, "data.url")?;
            let url = Url::parse(url)
                .map_err(|e| Error::invalid_field("data.url", e.to_string()))?;
            Ok(IntentAction::OpenExternalUrl(url))
        }
        other => Ok(IntentAction::Unsupported(other.to_string())),
    }
}

fn parse_navigation(message: &Message) -> Result<NavigationAction> {
    let action = required_action(message, "navigation")?;

    match action {
        actions::PUSH => {
            let data = required_data(message, "navigation.push")?;
            Ok(NavigationAction::Push(parse_target(data)?))
        }

        actions::POP => {
            let Some(data) = message.data() else {
                return Ok(NavigationAction::Pop);
            };
            let data = as_object(data, keys::DATA)?;
            let payload = optional_payload(data, keys::DATA);

            match optional_str(data, keys::PAGE, "data.page")? {
                Some(page) => Ok(NavigationAction::PopTo {
                    controller: optional_str(data, keys::CONTROLLER, "data.controller")?,
                    page,
                    data: payload,
                }),
                None => Ok(NavigationAction::PopWithData(payload)),
            }
        }

        actions::MODAL => {
            let data = required_data(message, "navigation.modal")?;
            Ok(NavigationAction::PresentModal {
                target: parse_target(data)?,
                callback: message.callback_id().cloned(),
            })
        }

        actions::DISMISS => {
            let data = required_data(message, "navigation.dismiss")?;
            Ok(NavigationAction::DismissModal {
                controller: required_str(data, keys::CONTROLLER, "data.controller")?.to_string(),
                page: required_str(data, keys::PAGE, "data.page")?.to_string(),
                data: optional_payload(data, keys::DATA),
            })
        }

        actions::REPLACE => {
            let data = required_data(message, "navigation.replace")?;
            Ok(NavigationAction::Replace {
                target: parse_target(data)?,
                animated: optional_bool(data, keys::ANIMATED, "data.animated")?.unwrap_or(false),
                clear_history: optional_bool(data, keys::CLEAR_HISTORY, "data.clearHistory")?
                    .unwrap_or(false),
            })
        }

        other => Err(Error::unknown_action("navigation", other)),
    }
}

fn parse_target(data: &Map<String, Value>) -> Result<NavigationTarget> {
    Ok(NavigationTarget {
        page: required_str(data, keys::PAGE, "data.page")?.to_string(),
        controller: optional_str(data, keys::CONTROLLER, "data.controller")?,
        bars: optional_payload(data, keys::BARS),
        data: optional_payload(data, keys::DATA),
    })
}

fn parse_ui(message: &Message) -> Result<UiAction> {
    let control = message
        .control()
        .ok_or_else(|| Error::missing_field(keys::CONTROL, "ui"))?;
    let data = required_data(message, "ui")?;
    let callback = message.callback_id().cloned();

    match control {
        actions::PICKER => {
            let picker_type = required_str(data, keys::TYPE, "data.type")?;
            if picker_type != actions::PICKER_DATE {
                return Ok(UiAction::UnsupportedPicker(picker_type.to_string()));
            }
            Ok(UiAction::DatePicker {
                picker: parse_date_picker(data)?,
                callback,
            })
        }

        actions::ALERT => Ok(UiAction::Alert {
            alert: parse_alert(data)?,
            callback,
        }),

        actions::TOAST => {
            let text = required_str(data, keys::MESSAGE, "data.message")?;
            Ok(UiAction::Toast(text.to_string()))
        }

        actions::BARS => parse_bars(data).map(UiAction::Bars),

        other => Err(Error::unknown_action("ui", other)),
    }
}

fn parse_date_picker(data: &Map<String, Value>) -> Result<DatePicker> {
    let date = match data.get(keys::DATE).and_then(Value::as_object) {
        Some(date) => {
            let year = date.get(keys::YEAR).and_then(Value::as_i64);
            let month = date.get(keys::MONTH).and_then(Value::as_u64);
            let day = date.get(keys::DAY).and_then(Value::as_u64);
            match (year, month, day) {
                (Some(year), Some(month), Some(day)) => Some(PickerDate {
                    year: i32::try_from(year)
                        .map_err(|_| Error::invalid_field("data.date.year", "out of range"))?,
                    month: u32::try_from(month)
                        .ok()
                        .filter(|m| (1..=12).contains(m))
                        .ok_or_else(|| Error::invalid_field("data.date.month", "not in 1..=12"))?,
                    day: u32::try_from(day)
                        .ok()
                        .filter(|d| (1..=31).contains(d))
                        .ok_or_else(|| Error::invalid_field("data.date.day", "not in 1..=31"))?,
                }),
                _ => None,
            }
        }
        None => None,
    };

    let texts = match data.get(keys::TEXTS).and_then(Value::as_object) {
        Some(texts) => PickerTexts {
            title: optional_str(texts, keys::TITLE, "data.texts.title")?,
            clear: optional_str(texts, keys::CLEAR, "data.texts.clear")?,
            cancel: optional_str(texts, keys::CANCEL, "data.texts.cancel")?,
            validate: optional_str(texts, keys::VALIDATE, "data.texts.validate")?,
        },
        None => PickerTexts::default(),
    };

    Ok(DatePicker { date, texts })
}

fn parse_alert(data: &Map<String, Value>) -> Result<Alert> {
    let buttons = match data.get(keys::BUTTONS) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .take(MAX_ALERT_BUTTONS)
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| Error::invalid_field("data.buttons", "expected strings"))
            })
            .collect::<Result<Vec<_>>>()?,
        Some(_) => return Err(Error::invalid_field("data.buttons", "expected an array")),
    };

    Ok(Alert {
        title: optional_str(data, keys::TITLE, "data.title")?,
        message: optional_str(data, keys::MESSAGE, "data.message")?,
        cancelable: optional_bool(data, keys::CANCELABLE, "data.cancelable")?.unwrap_or(false),
        buttons,
    })
}

fn parse_bars(data: &Map<String, Value>) -> Result<BarsAction> {
    let action = required_str(data, keys::ACTION, "data.action")?;

    match action {
        actions::SET_BARS => Ok(BarsAction::SetBars(optional_payload(data, keys::BARS))),

        actions::SET_ACTION_BADGE => Ok(BarsAction::SetActionBadge {
            name: required_str(data, keys::NAME, "data.name")?.to_string(),
            badge: optional_str(data, keys::BADGE, "data.badge")?.unwrap_or_default(),
        }),

        actions::SET_ACTION_CONTENT => Ok(BarsAction::SetActionContent {
            name: required_str(data, keys::NAME, "data.name")?.to_string(),
            content: optional_payload(data, keys::CONTENT)
                .ok_or_else(|| Error::missing_field("data.content", "bars.setActionContent"))?,
        }),

        actions::SET_BARS_VISIBLE => {
            let visibility = match data.get(keys::VISIBLE).and_then(Value::as_object) {
                Some(visible) => BarsVisibility {
                    top: optional_bool(visible, keys::TOP, "data.visible.top")?.unwrap_or(true),
                    bottom: optional_bool(visible, keys::BOTTOM, "data.visible.bottom")?
                        .unwrap_or(true),
                },
                None => BarsVisibility::default(),
            };
            Ok(BarsAction::SetBarsVisible(visibility))
        }

        actions::SET_BAR_CONTENT => Ok(BarsAction::SetBarContent(
            optional_payload(data, keys::CONTENT)
                .ok_or_else(|| Error::missing_field("data.content", "bars.setBarContent"))?,
        )),

        actions::SET_ACTION_VISIBLE => Ok(BarsAction::SetActionVisible {
            name: required_str(data, keys::NAME, "data.name")?.to_string(),
            visible: optional_bool(data, keys::VISIBLE, "data.visible")?.unwrap_or(true),
        }),

        actions::SET_ACTION_ENABLED => Ok(BarsAction::SetActionEnabled {
            name: required_str(data, keys::NAME, "data.name")?.to_string(),
            enabled: optional_bool(data, keys::ENABLED, "data.enabled")?.unwrap_or(true),
        }),

        other => Err(Error::unknown_action("bars", other)),
    }
}

fn parse_web_layer(message: &Message) -> Result<WebLayerAction> {
    let action = required_action(message, "webLayer")?;

    match action {
        actions::SHOW => {
            let data = required_data(message, "webLayer.show")?;
            Ok(WebLayerAction::Show {
                page: required_str(data, keys::PAGE, "data.page")?.to_string(),
                fade_duration: optional_f64(data, keys::FADE_DURATION, "data.fadeDuration")?,
            })
        }

        actions::DISMISS => {
            let fade_duration = match message.data() {
                Some(data) => {
                    optional_f64(as_object(data, keys::DATA)?, keys::FADE_DURATION, "data.fadeDuration")?
                }
                None => None,
            };
            Ok(WebLayerAction::Dismiss {
                data: message.data().cloned(),
                fade_duration: fade_duration.unwrap_or(0.0),
            })
        }

        actions::BRING_TO_FRONT => Ok(WebLayerAction::BringToFront),

        actions::SEND_TO_BACK => Ok(WebLayerAction::SendToBack),

        other => Err(Error::unknown_action("webLayer", other)),
    }
}

// ============================================================================
// Field Helpers
// ============================================================================

fn required_action<'a>(message: &'a Message, context: &str) -> Result<&'a str> {
    message
        .action()
        .ok_or_else(|| Error::missing_field(keys::ACTION, context))
}

fn required_data<'a>(message: &'a Message, context: &str) -> Result<&'a Map<String, Value>> {
    let data = message
        .data()
        .ok_or_else(|| Error::missing_field(keys::DATA, context))?;
    as_object(data, keys::DATA)
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| Error::invalid_field(path, "expected an object"))
}

fn required_str<'a>(object: &'a Map<String, Value>, key: &str, path: &str) -> Result<&'a str> {
    match object.get(key) {
        Some(Value::String(value)) => Ok(value),
        None | Some(Value::Null) => Err(Error::missing_field(path, key)),
        Some(_) => Err(Error::invalid_field(path, "expected a string")),
    }
}

fn optional_str(object: &Map<String, Value>, key: &str, path: &str) -> Result<Option<String>> {
    match object.get(key) {
        Some(Value::String(value)) => Ok(Some(value.clone())),
        None | Some(Value::Null) => Ok(None),
        Some(_) => Err(Error::invalid_field(path, "expected a string")),
    }
}

fn optional_bool(object: &Map<String, Value>, key: &str, path: &str) -> Result<Option<bool>> {
    match object.get(key) {
        Some(Value::Bool(value)) => Ok(Some(*value)),
        None | Some(Value::Null) => Ok(None),
        Some(_) => Err(Error::invalid_field(path, "expected a boolean")),
    }
}

fn optional_f64(object: &Map<String, Value>, key: &str, path: &str) -> Result<Option<f64>> {
    match object.get(key) {
        Some(Value::Number(value)) => Ok(value.as_f64()),
        None | Some(Value::Null) => Ok(None),
        Some(_) => Err(Error::invalid_field(path, "expected a number")),
    }
}

fn optional_payload(object: &Map<String, Value>, key: &str) -> Option<Value> {
    object.get(key).filter(|value| !value.is_null()).cloned()
}

// ============================================================================
// Tests
// ============================================================================
