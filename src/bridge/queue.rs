//! Outbound and inbound message queues.
//!
//! | Queue | Holds | Drained |
//! |-------|-------|---------|
//! | [`OutboundQueue`] | host → guest messages sent before the channel can deliver | on every flush, snapshot-and-clear |
//! | [`InboundQueue`] | raw guest → host text received before the first host attach | once, then retired |

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::mem;

use crate::protocol::Message;

// ============================================================================
// OutboundQueue
// ============================================================================

/// FIFO of messages waiting for the guest runtime.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    messages: VecDeque<Message>,
}

impl OutboundQueue {
    /// Creates an empty queue.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parks a message behind every message already queued.
    #[inline]
    pub fn push(&mut self, message: Message) {
        self.messages.push_back(message);
    }

    /// Takes every queued message, leaving the queue empty.
    ///
    /// Messages pushed after this call belong to the next snapshot.
    #[must_use]
    pub fn take_snapshot(&mut self) -> Vec<Message> {
        mem::take(&mut self.messages).into()
    }

    /// Number of queued messages.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if nothing is queued.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

// ============================================================================
// InboundQueue
// ============================================================================

/// Raw guest text buffered until the host attaches.
///
/// Unbounded while waiting: if no host ever attaches, entries accumulate for
/// the lifetime of the channel.
#[derive(Debug, Default)]
pub struct InboundQueue {
    entries: Vec<String>,
    retired: bool,
}

impl InboundQueue {
    /// Creates an empty, active queue.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers raw text.
    ///
    /// Returns `false` (and keeps nothing) once the queue is retired.
    pub fn push(&mut self, raw: impl Into<String>) -> bool {
        if self.retired {
            return false;
        }
        self.entries.push(raw.into());
        true
    }

    /// Retires the queue and returns its entries in receipt order.
    ///
    /// Only the first call returns `Some`.
    pub fn retire(&mut self) -> Option<Vec<String>> {
        if self.retired {
            return None;
        }
        self.retired = true;
        Some(mem::take(&mut self.entries))
    }

    /// Returns `true` after [`retire`](Self::retire).
    #[inline]
    #[must_use]
    pub const fn is_retired(&self) -> bool {
        self.retired
    }

    /// Number of buffered entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is buffered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
