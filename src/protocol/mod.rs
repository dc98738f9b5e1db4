//! Bridge wire protocol.
//!
//! This module defines the message format exchanged between the native host
//! (Rust) and the guest runtime (embedded web content).
//!
//! # Protocol Overview
//!
//! | Type | Direction | Purpose |
//! |------|-----------|---------|
//! | `callback` | Both | Reply correlated by a callback id |
//! | `cobaltIsReady` | Guest → Host | Guest runtime finished booting |
//! | `event` | Both | Named notification |
//! | `intent` | Guest → Host | Hand something to the OS (open a URL) |
//! | `log` | Guest → Host | Guest-side diagnostic line |
//! | `navigation` | Guest → Host | push / pop / modal / dismiss / replace |
//! | `plugin` | Both | Message for a named host plugin |
//! | `ui` | Both | Native controls: picker, alert, toast, bars |
//! | `webLayer` | Guest → Host | Overlay web layer |
//!
//! Host → guest delivery is a script `<global>.execute(<json>);`, see
//! [`to_script`].
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `message` | Envelope and wire constants |
//! | `codec` | Text encoding, decoding and script generation |
//! | `route` | Typed per-action view of a message |

// ============================================================================
// Submodules
// ============================================================================

/// Text encoding, decoding and script generation.
pub mod codec;

/// Message envelope and wire constants.
pub mod message;

/// Typed view of a message.
pub mod route;

// ============================================================================
// Re-exports
// ============================================================================

pub use codec::{
    DecodeError, Inbound, ScriptOptions, decode, decode_inbound, encode, escape_for_script,
    to_script,
};
pub use message::{Message, MessageType, actions, callbacks, events, keys};
pub use route::{
    Alert, BarsAction, BarsVisibility, DatePicker, IntentAction, MAX_ALERT_BUTTONS,
    NavigationAction, NavigationTarget, PickerDate, PickerTexts, Route, UiAction, WebLayerAction,
};
