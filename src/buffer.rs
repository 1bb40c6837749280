//! Bounded message buffer with progress-line coalescing.
//!
//! The buffer keeps the most recent log lines for display. A line ending in
//! [`OVERWRITE_MARKER`] is a terminal-style progress redraw: whatever is
//! appended next replaces it, so a long stream of progress updates occupies a
//! single slot instead of flooding the buffer.

use std::collections::VecDeque;
use std::ops::Index;

/// Trailing control sequence (`ESC [ K`, erase to end of line) marking a
/// progress line that the next message supersedes.
pub const OVERWRITE_MARKER: &str = "\u{1b}[K";

/// Default number of retained messages.
pub const DEFAULT_CAPACITY: usize = 8192;

/// Returns true if `message` ends with the overwrite marker.
pub fn is_overwrite(message: &str) -> bool {
    message.ends_with(OVERWRITE_MARKER)
}

/// Strip a trailing overwrite marker for display.
pub fn strip_overwrite_marker(message: &str) -> &str {
    message.strip_suffix(OVERWRITE_MARKER).unwrap_or(message)
}

/// Ordered, bounded sequence of log lines.
///
/// Not synchronized; [`crate::hub::LogHub`] owns one and guards it with its lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBuffer {
    messages: VecDeque<String>,
    capacity: usize,
}

impl Default for MessageBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBuffer {
    /// Create an empty buffer with [`DEFAULT_CAPACITY`].
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an empty buffer holding at most `capacity` messages.
    ///
    /// A capacity of zero is raised to one so the newest message is always kept.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            messages: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity,
        }
    }

    /// Append one message.
    ///
    /// If the current last message ends with the overwrite marker it is removed
    /// first, whatever the new message looks like. Then the oldest messages are
    /// evicted until there is room, and the message is pushed at the back.
    pub fn append(&mut self, message: impl Into<String>) {
        if self.messages.back().is_some_and(|last| is_overwrite(last)) {
            self.messages.pop_back();
        }
        while self.messages.len() >= self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(message.into());
    }

    /// Append every message, in order, one at a time.
    ///
    /// Going through [`Self::append`] per element keeps coalescing correct at
    /// the seam between the existing content and the merged content. Accepts
    /// another buffer by reference as well as any sequence of strings.
    pub fn append_all<I, S>(&mut self, messages: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for message in messages {
            self.append(message);
        }
    }

    /// Independent deep copy of the current content.
    pub fn snapshot(&self) -> MessageBuffer {
        self.clone()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.messages.get(index).map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.messages.back().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.messages.iter()
    }

    /// Copy the messages out as a vector, oldest first.
    pub fn to_vec(&self) -> Vec<String> {
        self.messages.iter().cloned().collect()
    }
}

impl Index<usize> for MessageBuffer {
    type Output = str;

    fn index(&self, index: usize) -> &Self::Output {
        &self.messages[index]
    }
}

impl<S: Into<String>> Extend<S> for MessageBuffer {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.append_all(iter);
    }
}

impl<'a> IntoIterator for &'a MessageBuffer {
    type Item = &'a String;
    type IntoIter = std::collections::vec_deque::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}
