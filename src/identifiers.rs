//! Type-safe identifiers for bridge entities.
//!
//! Newtype wrappers keep screen handles, channel handles and callback
//! correlation ids from being mixed up at compile time.
//!
//! | Type | Backing | Generated by |
//! |------|---------|--------------|
//! | [`ScreenId`] | `u64` | [`ScreenId::next`] (process-wide counter) |
//! | [`ChannelId`] | `Uuid` | [`ChannelId::generate`] |
//! | [`CallbackId`] | `String` | guest, or [`CallbackId::generate`] |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// ScreenId
// ============================================================================

/// Counter backing [`ScreenId::next`]. Zero is never handed out.
static NEXT_SCREEN_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque reference to one screen of the navigation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScreenId(u64);

impl ScreenId {
    /// Allocates a fresh, process-unique screen id.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_SCREEN_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wraps a raw value.
    ///
    /// Returns `None` for zero, which is reserved.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Option<Self> {
        if value == 0 { None } else { Some(Self(value)) }
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ChannelId
// ============================================================================

/// Identity of one bridge channel (one guest runtime instance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(Uuid);

impl ChannelId {
    /// Generates a random channel id.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// CallbackId
// ============================================================================

/// Correlation id matching an asynchronous reply to its request.
///
/// Guest-chosen ids are arbitrary strings. Host-generated ids have the form
/// `<name>#<uuid>` so they stay readable in guest-side logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallbackId(String);

impl CallbackId {
    /// Wraps a callback id.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh id prefixed with a readable name.
    #[must_use]
    pub fn generate(name: &str) -> Self {
        Self(format!("{name}#{}", Uuid::new_v4().simple()))
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the id is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CallbackId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CallbackId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ============================================================================
// Tests
// ============================================================================
