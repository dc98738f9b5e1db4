//! Wire codec: JSON text to [`Message`] and back.
//!
//! Decoding never panics and never reports anything to the guest. A failure
//! is a [`DecodeError`] carrying the raw text so the caller can log it and
//! drop the message. A JSON object that parsed but has no usable `type`, or a
//! `type` outside the closed set, keeps the parsed object so it can still be
//! handed to the unhandled-message hook.
//!
//! [`decode_inbound`] also keeps the object a message was decoded from, so
//! keys outside the envelope reach plugins and the unhandled-message hook.
//!
//! # Script Delivery
//!
//! Native→guest messages are evaluated as `<global>.execute(<json>);` in the
//! rendering surface. Two wire requirements apply to that script text:
//!
//! - U+2028 / U+2029 are legal in JSON strings but terminate lines in older
//!   JavaScript engines; they are written as `\u2028` / `\u2029` escapes.
//! - Some surfaces percent-decode scripts delivered as `javascript:` URLs;
//!   `%` is written as `%25` when [`ScriptOptions::escape_percent`] is set.

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::error::Result;

use super::message::{Message, MessageType, keys};

// ============================================================================
// DecodeError
// ============================================================================

/// Failure to turn inbound text into a [`Message`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Not JSON, not an object, or a field of the wrong shape.
    #[error("Malformed message ({reason}): {raw}")]
    Malformed {
        /// What was wrong.
        reason: String,
        /// The text as received.
        raw: String,
    },

    /// JSON object without a `type`, or with a non-string one.
    #[error("Message without a usable type: {raw}")]
    MissingType {
        /// The parsed object, for the unhandled-message hook.
        object: Value,
        /// The text as received.
        raw: String,
    },

    /// Well-formed object whose `type` is outside the closed set.
    #[error("Unknown message type `{kind}`: {raw}")]
    UnknownType {
        /// The unrecognized `type` value.
        kind: String,
        /// The parsed object, for the unhandled-message hook.
        object: Value,
        /// The text as received.
        raw: String,
    },

    /// A field the envelope requires for this `type` is absent.
    #[error("Missing field `{field}` for {kind} message: {raw}")]
    MissingField {
        /// Message kind.
        kind: MessageType,
        /// Missing key.
        field: &'static str,
        /// The text as received.
        raw: String,
    },
}

impl DecodeError {
    /// Returns the raw text that failed to decode.
    #[must_use]
    pub fn raw(&self) -> &str {
        match self {
            Self::Malformed { raw, .. }
            | Self::MissingType { raw, .. }
            | Self::UnknownType { raw, .. }
            | Self::MissingField { raw, .. } => raw,
        }
    }

    /// The parsed object, when the text was a JSON object the envelope
    /// could not classify.
    #[must_use]
    pub fn object(&self) -> Option<&Value> {
        match self {
            Self::MissingType { object, .. } | Self::UnknownType { object, .. } => Some(object),
            Self::Malformed { .. } | Self::MissingField { .. } => None,
        }
    }

    fn malformed(reason: impl Into<String>, raw: &str) -> Self {
        Self::Malformed {
            reason: reason.into(),
            raw: raw.to_string(),
        }
    }
}

// ============================================================================
// Inbound
// ============================================================================

/// A decoded message together with the JSON object it came from.
///
/// Keys outside the envelope only survive in [`object`](Self::object).
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    message: Message,
    object: Value,
}

impl Inbound {
    /// The decoded envelope.
    #[inline]
    #[must_use]
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// The object as the guest sent it.
    #[inline]
    #[must_use]
    pub fn object(&self) -> &Value {
        &self.object
    }

    /// Splits into the envelope and the source object.
    #[must_use]
    pub fn into_parts(self) -> (Message, Value) {
        (self.message, self.object)
    }
}

impl From<Message> for Inbound {
    fn from(message: Message) -> Self {
        let object = message.to_value();
        Self { message, object }
    }
}

// ============================================================================
// ScriptOptions
// ============================================================================

/// How encoded messages are wrapped into evaluable script text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOptions {
    /// JavaScript global exposing `execute(message)`.
    pub bridge_global: String,
    /// Escape `%` as `%25`.
    pub escape_percent: bool,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            bridge_global: "cobalt".to_string(),
            escape_percent: true,
        }
    }
}

// ============================================================================
// Encode / Decode
// ============================================================================

/// Encodes a message as compact JSON text.
///
/// # Errors
///
/// Returns [`crate::Error::Json`] if serialization fails.
pub fn encode(message: &Message) -> Result<String> {
    Ok(serde_json::to_string(message)?)
}

/// Decodes JSON text into a message.
///
/// # Errors
///
/// - [`DecodeError::Malformed`] for invalid JSON or a non-object
/// - [`DecodeError::MissingType`] for an object without a string `type`
/// - [`DecodeError::UnknownType`] for a `type` outside [`MessageType::ALL`]
/// - [`DecodeError::MissingField`] for a `callback` message without an id
pub fn decode(text: &str) -> std::result::Result<Message, DecodeError> {
    decode_inbound(text).map(|inbound| inbound.message)
}

/// Decodes JSON text, keeping the source object next to the message.
///
/// # Errors
///
/// Same as [`decode`].
pub fn decode_inbound(text: &str) -> std::result::Result<Inbound, DecodeError> {
    let object: Value = serde_json::from_str(text)
        .map_err(|e| DecodeError::malformed(format!("invalid JSON: {e}"), text))?;

    if !object.is_object() {
        return Err(DecodeError::malformed("not a JSON object", text));
    }

    let kind = match object.get(keys::TYPE) {
        Some(Value::String(kind)) => kind.clone(),
        _ => {
            return Err(DecodeError::MissingType {
                object,
                raw: text.to_string(),
            });
        }
    };

    let Some(message_type) = MessageType::from_wire(&kind) else {
        return Err(DecodeError::UnknownType {
            kind,
            object,
            raw: text.to_string(),
        });
    };

    let message: Message = Message::deserialize(&object)
        .map_err(|e| DecodeError::malformed(e.to_string(), text))?;

    if message_type == MessageType::Callback
        && message.callback_id().is_none_or(|id| id.is_empty())
    {
        return Err(DecodeError::MissingField {
            kind: message_type,
            field: keys::CALLBACK,
            raw: text.to_string(),
        });
    }

    Ok(Inbound {
        message: message.normalized(),
        object,
    })
}

// ============================================================================
// Script Generation
// ============================================================================

/// Escapes encoded JSON for evaluation in the rendering surface.
#[must_use]
pub fn escape_for_script(json: &str, escape_percent: bool) -> String {
    let mut escaped = String::with_capacity(json.len());
    for ch in json.chars() {
        match ch {
            '\u{2028}' => escaped.push_str("\\u2028"),
            '\u{2029}' => escaped.push_str("\\u2029"),
            '%' if escape_percent => escaped.push_str("%25"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Builds the script delivering `message` to the guest runtime.
///
/// # Errors
///
/// Returns [`crate::Error::Json`] if serialization fails.
pub fn to_script(message: &Message, options: &ScriptOptions) -> Result<String> {
    let json = encode(message)?;
    Ok(format!(
        "{}.execute({});",
        options.bridge_global,
        escape_for_script(&json, options.escape_percent)
    ))
}

// ============================================================================
// Tests
// ============================================================================
