//! Correlated host → guest requests awaiting a reply.
//!
//! A request is sent with a generated [`CallbackId`]; the guest answers with
//! a `callback` message carrying the same id. Entries expire after the
//! configured timeout: expired entries are purged lazily and a late reply is
//! treated like any other unmatched callback.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use rustc_hash::FxHashMap;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::identifiers::CallbackId;
use crate::protocol::callbacks;

// ============================================================================
// PendingRequest
// ============================================================================

/// What a correlated reply resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PendingRequest {
    /// Guest permission to close the screen.
    BackPermission,
    /// Guest finished a pull-to-refresh.
    PullToRefresh,
    /// Guest finished loading the next infinite-scroll page.
    InfiniteScroll,
}

impl PendingRequest {
    /// Readable prefix for generated ids; also the bare well-known callback name.
    #[must_use]
    pub const fn callback_name(&self) -> &'static str {
        match self {
            Self::BackPermission => callbacks::ON_BACK_BUTTON_PRESSED,
            Self::PullToRefresh => callbacks::PULL_TO_REFRESH_DID_REFRESH,
            Self::InfiniteScroll => callbacks::INFINITE_SCROLL_DID_REFRESH,
        }
    }

    /// Resolves a bare well-known callback name.
    #[must_use]
    pub fn from_well_known(name: &str) -> Option<Self> {
        [Self::BackPermission, Self::PullToRefresh, Self::InfiniteScroll]
            .into_iter()
            .find(|request| request.callback_name() == name)
    }
}

// ============================================================================
// Types
// ============================================================================

#[derive(Debug)]
struct Entry {
    request: PendingRequest,
    deadline: Instant,
}

/// Map of callback ids to their pending requests.
type CorrelationMap = FxHashMap<CallbackId, Entry>;

// ============================================================================
// PendingRequests
// ============================================================================

/// Correlation map with expiry and a size cap.
#[derive(Debug)]
pub struct PendingRequests {
    entries: CorrelationMap,
    timeout: Duration,
    max: usize,
}

impl PendingRequests {
    /// Creates an empty map.
    #[must_use]
    pub fn new(timeout: Duration, max: usize) -> Self {
        Self {
            entries: CorrelationMap::default(),
            timeout,
            max,
        }
    }

    /// Registers a request and returns its fresh correlation id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TooManyPendingRequests`] if the map is full after
    /// purging expired entries.
    pub fn register(&mut self, request: PendingRequest) -> Result<CallbackId> {
        self.purge_expired();

        if self.entries.len() >= self.max {
            warn!(
                pending = self.entries.len(),
                max = self.max,
                "Too many pending requests"
            );
            return Err(Error::TooManyPendingRequests {
                pending: self.entries.len(),
                max: self.max,
            });
        }

        let id = CallbackId::generate(request.callback_name());
        self.entries.insert(
            id.clone(),
            Entry {
                request,
                deadline: Instant::now() + self.timeout,
            },
        );
        Ok(id)
    }

    /// Resolves a reply id.
    ///
    /// Registered ids resolve once; an expired entry resolves to `None`.
    /// Bare well-known names always resolve.
    pub fn resolve(&mut self, id: &CallbackId) -> Option<PendingRequest> {
        if let Some(entry) = self.entries.remove(id) {
            if entry.deadline <= Instant::now() {
                warn!(callback = %id, request = ?entry.request, "Reply for expired request");
                return None;
            }
            return Some(entry.request);
        }

        PendingRequest::from_well_known(id.as_str())
    }

    /// Returns `true` if a live request of this kind is registered.
    #[must_use]
    pub fn has_pending(&self, request: PendingRequest) -> bool {
        let now = Instant::now();
        self.entries
            .values()
            .any(|entry| entry.request == request && entry.deadline > now)
    }

    /// Drops expired entries.
    pub fn purge_expired(&mut self) {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|id, entry| {
            let live = entry.deadline > now;
            if !live {
                debug!(callback = %id, request = ?entry.request, "Pending request expired");
            }
            live
        });

        let purged = before - self.entries.len();
        if purged > 0 {
            debug!(purged, "Purged expired requests");
        }
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of registered entries, expired ones included until purged.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_register_and_resolve_once() {
        let mut pending = PendingRequests::new(Duration::from_secs(30), 10);
        let id = assert_ok!(pending.register(PendingRequest::BackPermission));

        assert!(id.as_str().starts_with("onBackButtonPressed#"));
        assert!(pending.has_pending(PendingRequest::BackPermission));
        assert_eq!(pending.resolve(&id), Some(PendingRequest::BackPermission));
        assert_eq!(pending.resolve(&id), None);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_well_known_names_resolve() {
        let mut pending = PendingRequests::new(Duration::from_secs(30), 10);
        assert_eq!(
            pending.resolve(&CallbackId::new("pullToRefreshDidRefresh")),
            Some(PendingRequest::PullToRefresh)
        );
        assert_eq!(
            pending.resolve(&CallbackId::new("infiniteScrollDidRefresh")),
            Some(PendingRequest::InfiniteScroll)
        );
        assert_eq!(pending.resolve(&CallbackId::new("somethingElse")), None);
    }

    #[test]
    fn test_max_pending() {
        let mut pending = PendingRequests::new(Duration::from_secs(30), 2);
        assert_ok!(pending.register(PendingRequest::PullToRefresh));
        assert_ok!(pending.register(PendingRequest::PullToRefresh));

        let err = assert_err!(pending.register(PendingRequest::PullToRefresh));
        assert!(err.is_recoverable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_reply_is_unmatched() {
        let mut pending = PendingRequests::new(Duration::from_secs(5), 10);
        let id = assert_ok!(pending.register(PendingRequest::InfiniteScroll));

        tokio::time::advance(Duration::from_secs(6)).await;

        assert!(!pending.has_pending(PendingRequest::InfiniteScroll));
        assert_eq!(pending.resolve(&id), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_frees_capacity() {
        let mut pending = PendingRequests::new(Duration::from_secs(1), 1);
        assert_ok!(pending.register(PendingRequest::BackPermission));

        tokio::time::advance(Duration::from_secs(2)).await;

        assert_ok!(pending.register(PendingRequest::BackPermission));
        assert_eq!(pending.len(), 1);
    }
}
