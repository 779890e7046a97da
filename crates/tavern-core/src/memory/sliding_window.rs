//! Token-budgeted sliding-window memory.
//!
//! The visible window is built by scanning history from the newest message
//! backwards and admitting messages while the running token total stays
//! below `token_limit`. The first message that would bring the total to or
//! past the limit stops the scan and is excluded entirely.
//!
//! Pinned messages always lead the window. They do not count against the
//! budget, so the window may exceed `token_limit` when the pinned messages
//! alone are larger than it.

use std::collections::VecDeque;

use tavern_types::message::Message;

use super::{Memory, MemoryStore};

/// Memory whose view is limited to a token budget.
#[derive(Debug, Clone, Default)]
pub struct SlidingWindowMemory {
    memory: Memory,
    token_limit: usize,
    pinned_messages: Vec<Message>,
}

impl SlidingWindowMemory {
    /// A window of `token_limit` tokens over unbounded history.
    /// A limit of 0 disables the window.
    pub fn new(token_limit: usize) -> Self {
        Self {
            memory: Memory::new(),
            token_limit,
            pinned_messages: Vec::new(),
        }
    }

    /// Also cap stored history at `keep_max` messages (0 = unbounded).
    pub fn with_keep_max(mut self, keep_max: usize) -> Self {
        let kept = std::mem::take(&mut self.memory);
        self.memory = Memory::with_keep_max(keep_max);
        self.memory.extend(kept.messages_all().iter().cloned());
        self
    }

    pub fn token_limit(&self) -> usize {
        self.token_limit
    }

    pub fn set_token_limit(&mut self, token_limit: usize) {
        self.token_limit = token_limit;
    }

    /// Add a message that is always part of the window.
    pub fn pin(&mut self, message: Message) {
        self.pinned_messages.push(message);
    }

    pub fn pinned_messages(&self) -> &[Message] {
        &self.pinned_messages
    }

    /// How many of the most recent history messages fit the budget.
    fn admitted_count(&self) -> usize {
        let history = self.memory.messages_all();
        if self.token_limit == 0 {
            return history.len();
        }

        let mut would_be_count = 0;
        let mut admitted = 0;
        for message in history.iter().rev() {
            would_be_count += message.token_count();
            if would_be_count >= self.token_limit {
                break;
            }
            admitted += 1;
        }
        admitted
    }
}

impl MemoryStore for SlidingWindowMemory {
    fn add_message(&mut self, message: Message) {
        self.memory.add_message(message);
    }

    fn messages(&self) -> Vec<&Message> {
        let history = self.memory.messages_all();
        let admitted = self.admitted_count();
        tracing::trace!(
            pinned = self.pinned_messages.len(),
            admitted,
            total = history.len(),
            token_limit = self.token_limit,
            "sliding window view"
        );

        let mut view: Vec<&Message> = Vec::with_capacity(self.pinned_messages.len() + admitted);
        view.extend(self.pinned_messages.iter());
        view.extend(history.range(history.len() - admitted..));
        view
    }

    fn messages_all(&self) -> &VecDeque<Message> {
        self.memory.messages_all()
    }

    fn clear(&mut self) {
        self.memory.clear();
        self.pinned_messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tavern_types::message::Role;
    use tavern_types::tokenizer::whitespace_count;

    fn msg(role: Role, text: &str) -> Message {
        Message::with_tokenizer(role, text, &whitespace_count)
    }

    fn texts(view: &[&Message]) -> Vec<String> {
        view.iter().map(|m| m.text().to_string()).collect()
    }

    #[test]
    fn test_reverse_scan_stops_at_limit() {
        let mut memory = SlidingWindowMemory::new(10);
        memory.pin(msg(Role::System, "You are helpful."));
        memory.add_message(msg(Role::User, "hi"));
        memory.add_message(msg(Role::User, "how are you today friend"));
        memory.add_message(msg(Role::Ai, "I am wonderful thanks for asking"));

        // 6 admitted, then 6 + 5 = 11 >= 10 stops the scan.
        assert_eq!(
            texts(&memory.messages()),
            vec!["You are helpful.", "I am wonderful thanks for asking"]
        );
        assert_eq!(memory.messages_all().len(), 3);
    }

    #[test]
    fn test_view_is_maximal_recent_suffix_under_budget() {
        let limit = 7;
        let mut memory = SlidingWindowMemory::new(limit);
        let sizes = [3, 1, 2, 1, 4, 1, 1, 2];
        for (i, size) in sizes.iter().enumerate() {
            memory.add_message(msg(Role::User, &vec![format!("w{i}"); *size].join(" ")));
        }

        let view = memory.messages();
        let total: usize = view.iter().map(|m| m.token_count()).sum();
        assert!(total < limit);

        // Contiguous, chronological suffix of history.
        let history: Vec<&Message> = memory.messages_all().iter().collect();
        assert_eq!(view.as_slice(), &history[history.len() - view.len()..]);

        // Adding the next older message would reach the limit.
        let next_older = history[history.len() - view.len() - 1];
        assert!(total + next_older.token_count() >= limit);
    }

    #[test]
    fn test_newest_message_over_limit_leaves_pinned_only() {
        let mut memory = SlidingWindowMemory::new(3);
        memory.pin(msg(Role::System, "rules"));
        memory.add_message(msg(Role::User, "a"));
        memory.add_message(msg(Role::User, "one two three"));
        assert_eq!(texts(&memory.messages()), vec!["rules"]);
    }

    #[test]
    fn test_pinned_exempt_even_when_over_budget() {
        let mut memory = SlidingWindowMemory::new(4);
        memory.pin(msg(Role::System, "a very long pinned system prompt here"));
        memory.pin(msg(Role::System, "second pinned"));
        memory.add_message(msg(Role::User, "hi"));

        // Pinned tokens do not pre-consume the budget.
        assert_eq!(
            texts(&memory.messages()),
            vec!["a very long pinned system prompt here", "second pinned", "hi"]
        );
    }

    #[test]
    fn test_zero_limit_is_unbounded() {
        let mut memory = SlidingWindowMemory::new(0);
        memory.pin(msg(Role::System, "pinned"));
        memory.add_message(msg(Role::User, "one two three"));
        memory.add_message(msg(Role::User, "four"));
        assert_eq!(texts(&memory.messages()), vec!["pinned", "one two three", "four"]);
    }

    #[test]
    fn test_keep_max_still_applies_to_history() {
        let mut memory = SlidingWindowMemory::new(100).with_keep_max(2);
        memory.pin(msg(Role::System, "pinned"));
        for text in ["a", "b", "c"] {
            memory.add_message(msg(Role::User, text));
        }
        assert_eq!(memory.messages_all().len(), 2);
        assert_eq!(texts(&memory.messages()), vec!["pinned", "b", "c"]);
    }

    #[test]
    fn test_plaintext_uses_window() {
        let mut memory = SlidingWindowMemory::new(3);
        memory.add_message(msg(Role::User, "old words here"));
        memory.add_message(msg(Role::Ai, "new"));
        assert_eq!(memory.to_plaintext(), "AI: new\n");
        assert_eq!(memory.to_plaintext_all(), "User: old words here\nAI: new\n");
    }

    #[test]
    fn test_clear_twice_empties_pinned_too() {
        let mut memory = SlidingWindowMemory::new(10);
        memory.pin(msg(Role::System, "pinned"));
        memory.add_message(msg(Role::User, "hi"));
        memory.clear();
        assert!(memory.messages().is_empty());
        assert!(memory.pinned_messages().is_empty());
        memory.clear();
        assert!(memory.messages().is_empty());
        assert!(memory.messages_all().is_empty());
    }
}
