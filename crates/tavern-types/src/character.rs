//! Character persona types for Tavern.
//!
//! A [`Character`] holds the static traits of a conversational agent (the
//! things a system prompt describes) plus a queue of scheduled tasks. It is
//! usually loaded from YAML and fed into system-message templates through
//! [`Character::to_context`].

use std::collections::VecDeque;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Name given to characters that were created without one.
pub const DEFAULT_CHARACTER_NAME: &str = "CharacterName";

/// A piece of knowledge injected into the context when it becomes relevant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    /// Words or phrases that make this entry relevant.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Text injected into the context.
    pub content: String,
}

/// Static description of a conversational agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Character {
    pub name: String,
    pub description: String,
    pub traits: String,
    pub gender: String,
    pub summary: String,
    pub world_info: String,
    /// Example dialogues, sampled into prompts.
    pub examples: Vec<String>,
    pub species: String,
    pub height: String,
    pub weight: String,
    pub roles: String,
    pub age: String,
    pub first_message: String,
    /// Scheduled tasks; the front of the queue is the current task.
    pub tasks: VecDeque<String>,
    /// Knowledge relevant to the current context, if any.
    pub knowledge: Option<String>,
    pub triggerword_knowledge: Vec<KnowledgeEntry>,
    pub fuzzy_knowledge: Vec<KnowledgeEntry>,
}

impl Default for Character {
    fn default() -> Self {
        Self {
            name: DEFAULT_CHARACTER_NAME.to_string(),
            description: String::new(),
            traits: String::new(),
            gender: String::new(),
            summary: String::new(),
            world_info: String::new(),
            examples: Vec::new(),
            species: String::new(),
            height: String::new(),
            weight: String::new(),
            roles: String::new(),
            age: String::new(),
            first_message: String::new(),
            tasks: VecDeque::new(),
            knowledge: None,
            triggerword_knowledge: Vec::new(),
            fuzzy_knowledge: Vec::new(),
        }
    }
}

impl Character {
    pub fn new(name: impl Into<String>) -> Self {
        let character = Self {
            name: name.into(),
            ..Self::default()
        };
        character.warn_if_unnamed();
        character
    }

    /// Log a warning when the character still carries the placeholder name.
    pub fn warn_if_unnamed(&self) {
        if !self.has_name() {
            tracing::warn!("Character name is not supplied.");
        }
    }

    pub fn has_name(&self) -> bool {
        !self.name.is_empty() && self.name != DEFAULT_CHARACTER_NAME
    }

    /// The current task: the front of the task queue.
    pub fn task(&self) -> Option<&str> {
        self.tasks.front().map(String::as_str)
    }

    pub fn push_task(&mut self, task: impl Into<String>) {
        self.tasks.push_back(task.into());
    }

    /// Finish the current task and return it.
    pub fn complete_task(&mut self) -> Option<String> {
        self.tasks.pop_front()
    }

    /// Pick up to `n` distinct example dialogues at random.
    pub fn sample_examples(&self, n: usize) -> Vec<&str> {
        self.sample_examples_with(&mut rand::thread_rng(), n)
    }

    /// Same as [`Character::sample_examples`] with a caller-supplied RNG.
    pub fn sample_examples_with<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Vec<&str> {
        let n = n.min(self.examples.len());
        self.examples
            .choose_multiple(rng, n)
            .map(String::as_str)
            .collect()
    }

    /// Template context for system-message templates.
    ///
    /// All persona fields are exposed under their own names, plus `task`
    /// (the current task, or null).
    pub fn to_context(&self) -> serde_json::Value {
        let mut context = serde_json::to_value(self).unwrap_or_default();
        if let serde_json::Value::Object(map) = &mut context {
            map.insert("task".to_string(), self.task().into());
        }
        context
    }
}
