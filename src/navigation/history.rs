//! Ordered history of open screens.
//!
//! The history is append-at-tail. Removal happens from the tail backward
//! (pop, unwind) or at a single position (host-initiated close) and never
//! reorders the remaining entries.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;

use crate::identifiers::ScreenId;

use super::routes::ScreenDescriptor;

// ============================================================================
// Screen
// ============================================================================

/// One entry of the navigation history.
#[derive(Debug, Clone, PartialEq)]
pub struct Screen {
    /// Host-side handle.
    pub id: ScreenId,
    /// Concrete host screen kind.
    pub kind: String,
    /// Controller name the screen was resolved from.
    pub controller: Option<String>,
    /// Page the screen was opened with. `None` for screens whose page is
    /// only known to their live content.
    pub page: Option<String>,
    /// Presented modally.
    pub is_modal: bool,
    /// Opened with an animated transition.
    pub animated: bool,
    /// Hosts guest content. Native-only ("headless") screens do not.
    pub hosts_guest: bool,
    /// Navigation payload waiting for the screen's guest content.
    pub data: Option<Value>,
    /// Bars configuration.
    pub bars: Option<Value>,
}

impl Screen {
    /// Creates a guest-hosting screen from a resolved descriptor.
    #[must_use]
    pub fn from_descriptor(descriptor: &ScreenDescriptor) -> Self {
        Self {
            id: ScreenId::next(),
            kind: descriptor.kind.clone(),
            controller: descriptor.controller.clone(),
            page: Some(descriptor.page.clone()),
            is_modal: false,
            animated: true,
            hosts_guest: true,
            data: descriptor.data.clone(),
            bars: descriptor.bars.clone(),
        }
    }

    /// Creates a native-only screen without guest content.
    #[must_use]
    pub fn headless(kind: impl Into<String>) -> Self {
        Self {
            id: ScreenId::next(),
            kind: kind.into(),
            controller: None,
            page: None,
            is_modal: false,
            animated: true,
            hosts_guest: false,
            data: None,
            bars: None,
        }
    }

    /// Marks the screen as modal.
    #[inline]
    #[must_use]
    pub fn modal(mut self, is_modal: bool) -> Self {
        self.is_modal = is_modal;
        self
    }

    /// Sets whether the screen opens with an animation.
    #[inline]
    #[must_use]
    pub fn animated(mut self, animated: bool) -> Self {
        self.animated = animated;
        self
    }
}

// ============================================================================
// NavigationHistory
// ============================================================================

/// Ordered sequence of open screens, oldest first.
#[derive(Debug, Clone, Default)]
pub struct NavigationHistory {
    screens: Vec<Screen>,
}

impl NavigationHistory {
    /// Creates an empty history.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a screen at the tail.
    #[inline]
    pub fn push(&mut self, screen: Screen) {
        self.screens.push(screen);
    }

    /// Returns the screens, oldest first.
    #[inline]
    #[must_use]
    pub fn screens(&self) -> &[Screen] {
        &self.screens
    }

    /// Number of screens.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.screens.len()
    }

    /// Returns `true` if no screen is open.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.screens.is_empty()
    }

    /// Most recently opened screen.
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&Screen> {
        self.screens.last()
    }

    /// Position of a screen.
    #[must_use]
    pub fn position(&self, id: ScreenId) -> Option<usize> {
        self.screens.iter().position(|screen| screen.id == id)
    }

    /// Looks up a screen.
    #[must_use]
    pub fn get(&self, id: ScreenId) -> Option<&Screen> {
        self.screens.iter().find(|screen| screen.id == id)
    }

    /// Looks up a screen mutably.
    #[must_use]
    pub fn get_mut(&mut self, id: ScreenId) -> Option<&mut Screen> {
        self.screens.iter_mut().find(|screen| screen.id == id)
    }

    /// Removes one screen, keeping the order of the others.
    pub fn remove(&mut self, id: ScreenId) -> Option<Screen> {
        let index = self.position(id)?;
        Some(self.screens.remove(index))
    }

    /// Removes every screen after `index` and returns them in index order.
    pub fn truncate_after(&mut self, index: usize) -> Vec<Screen> {
        if index + 1 >= self.screens.len() {
            return Vec::new();
        }
        self.screens.split_off(index + 1)
    }

    /// Removes every screen, oldest first.
    pub fn clear(&mut self) -> Vec<Screen> {
        std::mem::take(&mut self.screens)
    }
}

// ============================================================================
// Tests
// ============================================================================
