//! Conversation memory for Tavern.
//!
//! A memory store owns the ordered message history of one conversation and
//! decides which part of it is visible to the prompt renderer:
//!
//! - [`Memory`]: full history, optionally capped at `keep_max` messages
//!   (oldest evicted first).
//! - [`SlidingWindowMemory`]: the most recent messages that fit a token
//!   budget, plus pinned messages that are always visible.
//!
//! Stores have no internal locking; callers that share one across threads
//! serialize access themselves.

pub mod sliding_window;

use std::collections::VecDeque;

use tavern_types::message::Message;

pub use sliding_window::SlidingWindowMemory;

/// Common interface of the memory stores.
pub trait MemoryStore {
    /// Append a message, applying the store's retention cap.
    fn add_message(&mut self, message: Message);

    /// The current view: what the prompt renderer should see.
    fn messages(&self) -> Vec<&Message>;

    /// The full retained history, in insertion order.
    fn messages_all(&self) -> &VecDeque<Message>;

    /// Forget everything.
    fn clear(&mut self);

    /// Render the current view as `"{name}: {text}\n"` lines.
    fn to_plaintext(&self) -> String {
        messages_to_plaintext(self.messages())
    }

    /// Render the full history as `"{name}: {text}\n"` lines.
    fn to_plaintext_all(&self) -> String {
        messages_to_plaintext(self.messages_all())
    }
}

/// Concatenate `"{name}: {text}\n"` for each message.
pub fn messages_to_plaintext<'a>(messages: impl IntoIterator<Item = &'a Message>) -> String {
    messages
        .into_iter()
        .map(|m| format!("{}: {}\n", m.name(), m.text()))
        .collect()
}

/// Unbounded (or count-capped) message history.
#[derive(Debug, Clone, Default)]
pub struct Memory {
    messages_all: VecDeque<Message>,
    keep_max: usize,
}

impl Memory {
    /// Unbounded history.
    pub fn new() -> Self {
        Self::default()
    }

    /// History capped at `keep_max` messages; 0 means unbounded.
    pub fn with_keep_max(keep_max: usize) -> Self {
        Self {
            messages_all: VecDeque::new(),
            keep_max,
        }
    }

    pub fn keep_max(&self) -> usize {
        self.keep_max
    }

    pub fn len(&self) -> usize {
        self.messages_all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages_all.is_empty()
    }
}

impl MemoryStore for Memory {
    fn add_message(&mut self, message: Message) {
        self.messages_all.push_back(message);
        if self.keep_max > 0 {
            while self.messages_all.len() > self.keep_max {
                self.messages_all.pop_front();
            }
        }
    }

    fn messages(&self) -> Vec<&Message> {
        self.messages_all.iter().collect()
    }

    fn messages_all(&self) -> &VecDeque<Message> {
        &self.messages_all
    }

    fn clear(&mut self) {
        self.messages_all.clear();
    }
}

impl Extend<Message> for Memory {
    fn extend<T: IntoIterator<Item = Message>>(&mut self, iter: T) {
        for message in iter {
            self.add_message(message);
        }
    }
}
