//! Bounded history of previous answers.
//!
//! The last [`HISTORY_CAPACITY`] answers are fed back to the model as
//! reference context so that a sequence of similar questions does not get the
//! same answer over and over.

use std::collections::VecDeque;

/// Maximum number of answers kept.
pub const HISTORY_CAPACITY: usize = 25;

#[derive(Debug, Clone)]
pub struct ResponseHistory {
    entries: VecDeque<String>,
    capacity: usize,
}

impl Default for ResponseHistory {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl ResponseHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `answer`, evicting the oldest entry when full.
    pub fn push(&mut self, answer: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(answer.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest-first copy of the entries, handed to a request worker.
    pub fn snapshot(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }
}

/// Renders the reference block appended to the model prompt.
///
/// Returns `None` when there is nothing to reference.
pub fn prompt_context(prior: &[String]) -> Option<String> {
    if prior.is_empty() {
        return None;
    }
    let mut block = format!(
        "---\nReference only: these are the last {} answers you gave in this session, \
         oldest first. Do not repeat one of them unless the current question \
         clearly requires it.\n\n",
        prior.len()
    );
    for (i, answer) in prior.iter().enumerate() {
        block.push_str(&format!("{}. {}\n", i + 1, answer));
    }
    block.push_str("---");
    Some(block)
}
