//! Navigation state machine over the screen history.
//!
//! Every operation computes its history mutation under the state lock, then
//! calls the [`ScreenHost`] after the lock is released, so a host may report
//! back (for example through [`NavigationController::screen_closed`]) from
//! inside `open`/`close`.
//!
//! # Modal transitions
//!
//! A single shared flag records whether the most recently opened screen was
//! presented modally. It selects the [`Transition`] on open and close:
//!
//! | Event | Flag before | Transition | Flag after |
//! |-------|-------------|------------|------------|
//! | open modal | any | `ModalOpen` | set |
//! | open inside modal | set | `ModalPush` | set |
//! | open | clear | `Default` | clear |
//! | close modal / dismiss | any | `ModalClose` | clear |
//! | close inside modal | set | `ModalPop` | set |
//! | close | clear | `Default` | clear |
//!
//! Nested modals share the flag, so only the innermost transition is exact.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::ScreenId;
use crate::protocol::NavigationTarget;

use super::history::{NavigationHistory, Screen};
use super::routes::{RouteResolver, ScreenDescriptor};

// ============================================================================
// Transition
// ============================================================================

/// Animation style for opening or closing a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// No animation.
    None,
    /// Regular push / pop.
    Default,
    /// Modal presentation.
    ModalOpen,
    /// Modal dismissal.
    ModalClose,
    /// Push inside a modal flow.
    ModalPush,
    /// Pop inside a modal flow.
    ModalPop,
}

// ============================================================================
// ScreenHost
// ============================================================================

/// Host side of screen management.
///
/// All calls are made on the UI-owning context.
pub trait ScreenHost: Send + Sync {
    /// Opens a screen already appended to the history.
    fn open(&self, screen: &Screen, descriptor: &ScreenDescriptor, transition: Transition);

    /// Closes a screen already removed from the history.
    fn close(&self, screen: &Screen, transition: Transition);

    /// Page currently shown by a screen's live content.
    fn current_page(&self, screen: ScreenId) -> Option<String>;

    /// Returns `true` if the host can instantiate screens of this kind.
    fn knows_kind(&self, kind: &str) -> bool;
}

// ============================================================================
// ModalOrigin
// ============================================================================

/// Identity of the screen that presented a modal, for a later dismiss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalOrigin {
    /// Page of the presenting screen.
    pub page: Option<String>,
    /// Screen kind of the presenting screen.
    pub controller: String,
}

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Default)]
struct NavigationState {
    history: NavigationHistory,
    from_modal: bool,
}

impl NavigationState {
    fn open_transition(&mut self, modal: bool, animated: bool) -> Transition {
        let transition = if modal {
            self.from_modal = true;
            Transition::ModalOpen
        } else if self.from_modal {
            Transition::ModalPush
        } else {
            Transition::Default
        };

        if animated { transition } else { Transition::None }
    }

    fn close_transition(&mut self, screen: &Screen) -> Transition {
        if screen.is_modal {
            self.from_modal = false;
            Transition::ModalClose
        } else if self.from_modal {
            Transition::ModalPop
        } else {
            Transition::Default
        }
    }
}

/// Candidate for a backward history scan.
struct Candidate {
    index: usize,
    id: ScreenId,
    kind: String,
    page: Option<String>,
    hosts_guest: bool,
}

// ============================================================================
// NavigationController
// ============================================================================

/// Push / pop / modal / replace over an explicit [`NavigationHistory`].
pub struct NavigationController {
    state: Mutex<NavigationState>,
    resolver: Arc<dyn RouteResolver>,
    host: Arc<dyn ScreenHost>,
}

impl fmt::Debug for NavigationController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("NavigationController")
            .field("screens", &state.history.len())
            .field("from_modal", &state.from_modal)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// NavigationController - Construction & Queries
// ============================================================================

impl NavigationController {
    /// Creates a controller with an empty history.
    #[must_use]
    pub fn new(resolver: Arc<dyn RouteResolver>, host: Arc<dyn ScreenHost>) -> Self {
        Self {
            state: Mutex::new(NavigationState::default()),
            resolver,
            host,
        }
    }

    /// Snapshot of the history, oldest first.
    #[must_use]
    pub fn screens(&self) -> Vec<Screen> {
        self.state.lock().history.screens().to_vec()
    }

    /// Snapshot of one screen.
    #[must_use]
    pub fn screen(&self, id: ScreenId) -> Option<Screen> {
        self.state.lock().history.get(id).cloned()
    }

    /// Number of open screens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().history.len()
    }

    /// Returns `true` if no screen is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().history.is_empty()
    }

    /// Returns the shared modal flag.
    #[must_use]
    pub fn from_modal(&self) -> bool {
        self.state.lock().from_modal
    }

    /// Route resolver in use.
    #[inline]
    #[must_use]
    pub fn resolver(&self) -> &Arc<dyn RouteResolver> {
        &self.resolver
    }

    fn resolve(&self, target: &NavigationTarget) -> Result<ScreenDescriptor> {
        let descriptor = self
            .resolver
            .resolve(target.controller.as_deref(), &target.page)
            .ok_or_else(|| Error::unresolved_route(target.controller.as_deref(), &target.page))?;

        Ok(descriptor
            .with_bars(target.bars.clone())
            .with_data(target.data.clone()))
    }
}

// ============================================================================
// NavigationController - Host-registered Screens
// ============================================================================

impl NavigationController {
    /// Registers a screen the host opened itself (root, deep link).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvedRoute`] if the resolver has no screen.
    pub fn register_root(&self, controller: Option<&str>, page: &str) -> Result<ScreenId> {
        let descriptor = self
            .resolver
            .resolve(controller, page)
            .ok_or_else(|| Error::unresolved_route(controller, page))?;

        Ok(self.register_screen(Screen::from_descriptor(&descriptor)))
    }

    /// Appends a screen the host opened itself, guest-hosting or headless.
    pub fn register_screen(&self, screen: Screen) -> ScreenId {
        let id = screen.id;
        debug!(screen = %id, kind = %screen.kind, "Screen registered");
        self.state.lock().history.push(screen);
        id
    }

    /// Removes a screen the host destroyed on its own.
    pub fn screen_closed(&self, id: ScreenId) -> Option<Screen> {
        let mut state = self.state.lock();
        let screen = state.history.remove(id)?;
        if screen.is_modal {
            state.from_modal = false;
        }
        debug!(screen = %id, remaining = state.history.len(), "Screen closed by host");
        Some(screen)
    }

    /// Takes the navigation payload waiting for a screen.
    pub fn take_data(&self, id: ScreenId) -> Option<Value> {
        self.state
            .lock()
            .history
            .get_mut(id)
            .and_then(|screen| screen.data.take())
    }

    /// Replaces a screen's bars configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ScreenNotFound`] if the screen is not in the history.
    pub fn update_bars(&self, id: ScreenId, bars: Option<Value>) -> Result<()> {
        let mut state = self.state.lock();
        let screen = state
            .history
            .get_mut(id)
            .ok_or_else(|| Error::screen_not_found(id))?;
        screen.bars = bars;
        Ok(())
    }
}

// ============================================================================
// NavigationController - Navigation
// ============================================================================

impl NavigationController {
    /// Opens a screen on top of the history.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvedRoute`] if the resolver has no screen.
    pub fn push(&self, target: &NavigationTarget) -> Result<ScreenId> {
        let descriptor = self.resolve(target)?;
        let screen = Screen::from_descriptor(&descriptor);

        let transition = {
            let mut state = self.state.lock();
            let transition = state.open_transition(false, true);
            state.history.push(screen.clone());
            transition
        };

        info!(screen = %screen.id, kind = %screen.kind, page = %descriptor.page, "Push");
        self.host.open(&screen, &descriptor, transition);
        Ok(screen.id)
    }

    /// Closes a screen. Called once the guest allowed it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ScreenNotFound`] if the screen is not in the history.
    pub fn pop(&self, id: ScreenId) -> Result<()> {
        let (screen, transition) = {
            let mut state = self.state.lock();
            let screen = state
                .history
                .remove(id)
                .ok_or_else(|| Error::screen_not_found(id))?;
            let transition = state.close_transition(&screen);
            (screen, transition)
        };

        info!(screen = %id, kind = %screen.kind, "Pop");
        self.host.close(&screen, transition);
        Ok(())
    }

    /// Hands `data` to the nearest earlier screen hosting guest content.
    ///
    /// Native-only screens in between are skipped. Finding no such screen is
    /// logged, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ScreenNotFound`] if `from` is not in the history.
    pub fn set_pop_data(&self, from: ScreenId, data: Option<Value>) -> Result<()> {
        let mut state = self.state.lock();
        let index = state
            .history
            .position(from)
            .ok_or_else(|| Error::screen_not_found(from))?;

        let target = state.history.screens()[..index]
            .iter()
            .rposition(|screen| screen.hosts_guest);

        match target {
            Some(target) => {
                let id = state.history.screens()[target].id;
                if let Some(screen) = state.history.get_mut(id) {
                    screen.data = data;
                }
                debug!(from = %from, to = %id, "Pop data attached");
            }
            None => warn!(from = %from, "No earlier screen to receive pop data"),
        }
        Ok(())
    }

    /// Unwinds to the most recent screen matching `(controller, page)`.
    ///
    /// Screens with no recorded page are matched on the page their live
    /// content currently shows. Every screen after the match is removed from
    /// the history first, then closed in index order.
    ///
    /// # Errors
    ///
    /// - [`Error::UnresolvedRoute`] if the resolver has no screen
    /// - [`Error::HistoryMatchNotFound`] if no entry matches (history untouched)
    pub fn pop_to(
        &self,
        controller: Option<&str>,
        page: &str,
        data: Option<Value>,
    ) -> Result<()> {
        let descriptor = self
            .resolver
            .resolve(controller, page)
            .ok_or_else(|| Error::unresolved_route(controller, page))?;

        let matched = self
            .find_backward(&descriptor.kind, page)
            .ok_or_else(|| Error::history_match_not_found(controller, page))?;

        let closing = {
            let mut state = self.state.lock();
            let index = state
                .history
                .position(matched)
                .ok_or_else(|| Error::history_match_not_found(controller, page))?;

            if let Some(screen) = state.history.get_mut(matched) {
                screen.data = data;
            }

            let removed = state.history.truncate_after(index);
            removed
                .into_iter()
                .map(|screen| {
                    let transition = state.close_transition(&screen);
                    (screen, transition)
                })
                .collect::<Vec<_>>()
        };

        info!(target_screen = %matched, closing = closing.len(), "Pop to");
        for (screen, transition) in &closing {
            self.host.close(screen, *transition);
        }
        Ok(())
    }

    /// Presents a screen modally on top of `from`.
    ///
    /// # Errors
    ///
    /// - [`Error::UnresolvedRoute`] if the resolver has no screen
    /// - [`Error::ScreenNotFound`] if `from` is not in the history
    pub fn present_modal(
        &self,
        from: ScreenId,
        target: &NavigationTarget,
    ) -> Result<(ScreenId, ModalOrigin)> {
        let descriptor = self.resolve(target)?;
        let presenting = self.screen(from).ok_or_else(|| Error::screen_not_found(from))?;

        let origin = ModalOrigin {
            page: self.host.current_page(from).or(presenting.page),
            controller: presenting.kind,
        };

        let screen = Screen::from_descriptor(&descriptor).modal(true);
        let transition = {
            let mut state = self.state.lock();
            let transition = state.open_transition(true, true);
            state.history.push(screen.clone());
            transition
        };

        info!(screen = %screen.id, kind = %screen.kind, from = %from, "Present modal");
        self.host.open(&screen, &descriptor, transition);
        Ok((screen.id, origin))
    }

    /// Dismisses back to the screen `(kind, page)` that presented a modal.
    ///
    /// If that screen is still in the history, the screens above it are
    /// closed and it receives `data`. Otherwise a new instance is opened and
    /// `from` is closed.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownScreenKind`] if the host cannot instantiate `kind`
    /// - [`Error::ScreenNotFound`] if `from` is not in the history
    pub fn dismiss_modal(
        &self,
        from: ScreenId,
        kind: &str,
        page: &str,
        data: Option<Value>,
    ) -> Result<()> {
        if !self.host.knows_kind(kind) {
            return Err(Error::unknown_screen_kind(kind));
        }

        if let Some(matched) = self.find_backward(kind, page) {
            let closing = {
                let mut state = self.state.lock();
                let Some(index) = state.history.position(matched) else {
                    return Err(Error::screen_not_found(matched));
                };
                if let Some(screen) = state.history.get_mut(matched) {
                    screen.data = data;
                }
                state.from_modal = false;
                state.history.truncate_after(index)
            };

            info!(target_screen = %matched, closing = closing.len(), "Dismiss modal");
            for screen in &closing {
                self.host.close(screen, Transition::ModalClose);
            }
            return Ok(());
        }

        let descriptor = ScreenDescriptor::new(kind, page).with_data(data);
        let screen = Screen::from_descriptor(&descriptor);
        let closing = {
            let mut state = self.state.lock();
            let closing = state
                .history
                .remove(from)
                .ok_or_else(|| Error::screen_not_found(from))?;
            state.from_modal = false;
            state.history.push(screen.clone());
            closing
        };

        info!(screen = %screen.id, kind, "Dismiss modal to new instance");
        self.host.open(&screen, &descriptor, Transition::ModalClose);
        self.host.close(&closing, Transition::ModalClose);
        Ok(())
    }

    /// Opens a screen in place of `from`.
    ///
    /// With `clear_history`, every screen is closed and the new one becomes
    /// the only entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvedRoute`] if the resolver has no screen.
    pub fn replace(
        &self,
        from: ScreenId,
        target: &NavigationTarget,
        animated: bool,
        clear_history: bool,
    ) -> Result<ScreenId> {
        let descriptor = self.resolve(target)?;
        let screen = Screen::from_descriptor(&descriptor).animated(animated);

        let (transition, closing) = {
            let mut state = self.state.lock();
            let transition = state.open_transition(false, animated);
            let closing = if clear_history {
                state.history.clear()
            } else {
                state.history.remove(from).into_iter().collect()
            };
            state.history.push(screen.clone());
            (transition, closing)
        };

        info!(
            screen = %screen.id,
            kind = %screen.kind,
            replaced = closing.len(),
            clear_history,
            "Replace"
        );
        self.host.open(&screen, &descriptor, transition);
        for old in &closing {
            self.host.close(old, Transition::None);
        }
        Ok(screen.id)
    }

    /// Scans the history tail-to-head for `(kind, page)`.
    fn find_backward(&self, kind: &str, page: &str) -> Option<ScreenId> {
        let candidates: Vec<Candidate> = {
            let state = self.state.lock();
            state
                .history
                .screens()
                .iter()
                .enumerate()
                .filter(|(_, screen)| screen.kind == kind)
                .map(|(index, screen)| Candidate {
                    index,
                    id: screen.id,
                    kind: screen.kind.clone(),
                    page: screen.page.clone(),
                    hosts_guest: screen.hosts_guest,
                })
                .collect()
        };

        candidates.into_iter().rev().find_map(|candidate| {
            if !candidate.hosts_guest {
                return Some(candidate.id);
            }
            let live_page = match candidate.page {
                Some(page) => Some(page),
                None => self.host.current_page(candidate.id),
            };
            debug!(
                index = candidate.index,
                kind = %candidate.kind,
                page = ?live_page,
                "History candidate"
            );
            (live_page.as_deref() == Some(page)).then_some(candidate.id)
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    /// Screen host recording every open/close.
    #[derive(Default)]
    pub(crate) struct RecordingHost {
        pub(crate) opened: Mutex<Vec<(ScreenId, String, Transition)>>,
        pub(crate) closed: Mutex<Vec<(ScreenId, Transition)>>,
        pub(crate) live_pages: Mutex<Vec<(ScreenId, String)>>,
    }

    impl ScreenHost for RecordingHost {
        fn open(&self, screen: &Screen, descriptor: &ScreenDescriptor, transition: Transition) {
            self.opened
                .lock()
                .push((screen.id, descriptor.page.clone(), transition));
        }

        fn close(&self, screen: &Screen, transition: Transition) {
            self.closed.lock().push((screen.id, transition));
        }

        fn current_page(&self, screen: ScreenId) -> Option<String> {
            self.live_pages
                .lock()
                .iter()
                .find(|(id, _)| *id == screen)
                .map(|(_, page)| page.clone())
        }

        fn knows_kind(&self, kind: &str) -> bool {
            kind != "Unknown"
        }
    }

    /// Resolver mapping a controller name to the screen kind of the same name.
    pub(crate) fn resolver() -> Arc<dyn RouteResolver> {
        Arc::new(|controller: Option<&str>, page: &str| {
            match controller {
                Some("missing") => None,
                Some(kind) => Some(ScreenDescriptor::new(kind, page)),
                None => Some(ScreenDescriptor::new("Web", page)),
            }
        })
    }

    fn target(controller: &str, page: &str) -> NavigationTarget {
        NavigationTarget {
            page: page.to_string(),
            controller: Some(controller.to_string()),
            ..NavigationTarget::default()
        }
    }

    fn setup() -> (NavigationController, Arc<RecordingHost>) {
        let host = Arc::new(RecordingHost::default());
        let controller = NavigationController::new(resolver(), host.clone());
        (controller, host)
    }

    #[test]
    fn test_push_appends_and_opens() {
        let (nav, host) = setup();
        let id = assert_ok!(nav.push(&target("A", "p1")));

        assert_eq!(nav.len(), 1);
        assert_eq!(
            host.opened.lock().as_slice(),
            &[(id, "p1".to_string(), Transition::Default)]
        );
    }

    #[test]
    fn test_push_unresolved_is_noop() {
        let (nav, host) = setup();
        let err = assert_err!(nav.push(&target("missing", "p1")));
        assert!(err.is_navigation_error());
        assert!(nav.is_empty());
        assert!(host.opened.lock().is_empty());
    }

    #[test]
    fn test_pop_to_closes_only_later_entries() {
        let (nav, host) = setup();
        let a = assert_ok!(nav.push(&target("A", "p1")));
        let b = assert_ok!(nav.push(&target("B", "p2")));
        let c = assert_ok!(nav.push(&target("C", "p3")));

        assert_ok!(nav.pop_to(Some("B"), "p2", Some(json!({"k": 1}))));

        let ids: Vec<ScreenId> = nav.screens().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![a, b]);
        assert_eq!(nav.screen(b).and_then(|s| s.data), Some(json!({"k": 1})));
        assert_eq!(host.closed.lock().as_slice(), &[(c, Transition::Default)]);
    }

    #[test]
    fn test_pop_to_no_match_leaves_history() {
        let (nav, host) = setup();
        assert_ok!(nav.push(&target("A", "p1")));
        assert_ok!(nav.push(&target("B", "p2")));

        let err = assert_err!(nav.pop_to(Some("B"), "nonexistent", None));
        assert!(matches!(err, Error::HistoryMatchNotFound { .. }));
        assert_eq!(nav.len(), 2);
        assert!(host.closed.lock().is_empty());
    }

    #[test]
    fn test_pop_to_uses_live_page_for_unknown_page() {
        let (nav, host) = setup();
        let mut root = Screen::from_descriptor(&ScreenDescriptor::new("A", "start"));
        root.page = None;
        let root_id = nav.register_screen(root);
        host.live_pages.lock().push((root_id, "moved.html".to_string()));
        let top = assert_ok!(nav.push(&target("B", "p2")));

        assert_ok!(nav.pop_to(Some("A"), "moved.html", None));
        assert_eq!(nav.len(), 1);
        assert_eq!(host.closed.lock().as_slice(), &[(top, Transition::Default)]);
    }

    #[test]
    fn test_pop_to_closes_in_index_order() {
        let (nav, host) = setup();
        assert_ok!(nav.push(&target("A", "p1")));
        let b = assert_ok!(nav.push(&target("B", "p2")));
        let c = assert_ok!(nav.push(&target("C", "p3")));
        let d = assert_ok!(nav.push(&target("D", "p4")));

        assert_ok!(nav.pop_to(Some("A"), "p1", None));
        let closed: Vec<ScreenId> = host.closed.lock().iter().map(|(id, _)| *id).collect();
        assert_eq!(closed, vec![b, c, d]);
    }

    #[test]
    fn test_set_pop_data_skips_headless() {
        let (nav, _host) = setup();
        let a = assert_ok!(nav.push(&target("A", "p1")));
        nav.register_screen(Screen::headless("NativeSettings"));
        let c = assert_ok!(nav.push(&target("C", "p3")));

        assert_ok!(nav.set_pop_data(c, Some(json!("back"))));
        assert_eq!(nav.screen(a).and_then(|s| s.data), Some(json!("back")));
    }

    #[test]
    fn test_modal_flag_scenario() {
        let (nav, host) = setup();
        assert_ok!(nav.register_root(None, "index.html"));
        let b = assert_ok!(nav.push(&target("B", "list.html")));

        let (modal, origin) = assert_ok!(nav.present_modal(b, &target("M", "edit.html")));
        assert_eq!(origin.controller, "B");
        assert_eq!(origin.page.as_deref(), Some("list.html"));
        assert!(nav.from_modal());

        let inner = assert_ok!(nav.push(&target("N", "inner.html")));
        assert_ok!(nav.pop(inner));

        assert_ok!(nav.dismiss_modal(modal, "B", "list.html", Some(json!({"saved": true}))));
        assert!(!nav.from_modal());
        assert_eq!(nav.screen(b).and_then(|s| s.data), Some(json!({"saved": true})));

        assert_ok!(nav.pop(b));

        let opened: Vec<Transition> = host.opened.lock().iter().map(|(_, _, t)| *t).collect();
        assert_eq!(
            opened,
            vec![Transition::Default, Transition::ModalOpen, Transition::ModalPush]
        );
        let closed: Vec<(ScreenId, Transition)> = host.closed.lock().clone();
        assert_eq!(
            closed,
            vec![
                (inner, Transition::ModalPop),
                (modal, Transition::ModalClose),
                (b, Transition::Default),
            ]
        );
    }

    #[test]
    fn test_dismiss_unknown_kind() {
        let (nav, _host) = setup();
        let a = assert_ok!(nav.push(&target("A", "p1")));
        let err = assert_err!(nav.dismiss_modal(a, "Unknown", "p1", None));
        assert!(matches!(err, Error::UnknownScreenKind { .. }));
        assert_eq!(nav.len(), 1);
    }

    #[test]
    fn test_dismiss_to_missing_screen_opens_new_instance() {
        let (nav, host) = setup();
        let a = assert_ok!(nav.push(&target("A", "p1")));
        let (modal, _) = assert_ok!(nav.present_modal(a, &target("M", "m.html")));

        assert_ok!(nav.dismiss_modal(modal, "Other", "o.html", None));
        let screens = nav.screens();
        assert_eq!(screens.len(), 2);
        assert_eq!(screens[1].kind, "Other");
        assert_eq!(host.closed.lock().as_slice(), &[(modal, Transition::ModalClose)]);
    }

    #[test]
    fn test_replace_and_clear_history() {
        let (nav, host) = setup();
        let a = assert_ok!(nav.push(&target("A", "p1")));
        let b = assert_ok!(nav.push(&target("B", "p2")));

        let c = assert_ok!(nav.replace(b, &target("C", "p3"), false, false));
        let ids: Vec<ScreenId> = nav.screens().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![a, c]);
        assert_eq!(host.opened.lock().last().map(|(_, _, t)| *t), Some(Transition::None));

        let d = assert_ok!(nav.replace(c, &target("D", "p4"), true, true));
        let ids: Vec<ScreenId> = nav.screens().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![d]);
        assert_eq!(host.closed.lock().len(), 3);
    }

    #[test]
    fn test_take_data_clears() {
        let (nav, _host) = setup();
        let mut t = target("A", "p1");
        t.data = Some(json!({"x": 1}));
        let a = assert_ok!(nav.push(&t));

        assert_eq!(nav.take_data(a), Some(json!({"x": 1})));
        assert_eq!(nav.take_data(a), None);
    }

    #[test]
    fn test_screen_closed_by_host() {
        let (nav, _host) = setup();
        let a = assert_ok!(nav.push(&target("A", "p1")));
        assert!(nav.screen_closed(a).is_some());
        assert!(nav.screen_closed(a).is_none());
        assert!(matches!(nav.pop(a), Err(Error::ScreenNotFound { .. })));
    }
}
