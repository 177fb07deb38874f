//! The ordered conversation held with the model: a system prompt, a task
//! message, and exactly one "current browser state" message that is replaced
//! rather than appended every step.

use serde::{Deserialize, Serialize};

use crate::config::ComposerConfig;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

/// Holds the model conversation across an agent run. Message 0 is always the
/// system prompt; message 1 is the task message; the state message is tracked
/// by index and replaced in place on every step rather than appended.
#[derive(Clone, Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    state_message_index: Option<usize>,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>, task: impl Into<String>) -> Self {
        Self { messages: vec![Message::new(Role::System, system_prompt), Message::new(Role::User, task)], state_message_index: None }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Appends an observation record — one per dispatched action, per spec
    /// §7's "every action emits exactly one observation record".
    pub fn push_observation(&mut self, content: impl Into<String>) {
        self.messages.push(Message::new(Role::Assistant, content));
    }

    /// Replaces the single current-browser-state message, inserting it the
    /// first time and overwriting it in place on every subsequent step.
    pub fn replace_state_message(&mut self, content: impl Into<String>) {
        let content = content.into();
        match self.state_message_index {
            Some(idx) => self.messages[idx] = Message::new(Role::User, content),
            None => {
                self.messages.push(Message::new(Role::User, content));
                self.state_message_index = Some(self.messages.len() - 1);
            }
        }
    }

    /// Trims middle history to keep the conversation bounded: the first
    /// `keep_first` messages (system prompt + task) and the last `keep_last`
    /// are kept verbatim; everything between is dropped. The state message
    /// index is adjusted to track its (possibly shifted) new position.
    pub fn trim(&mut self, config: &ComposerConfig) {
        let total = self.messages.len();
        let keep_first = config.keep_first.min(total);
        let keep_last = config.keep_last.min(total.saturating_sub(keep_first));
        if keep_first + keep_last >= total {
            return;
        }

        let dropped_from = keep_first;
        let dropped_to = total - keep_last;
        let dropped = dropped_to - dropped_from;

        let mut kept = Vec::with_capacity(total - dropped);
        kept.extend_from_slice(&self.messages[..keep_first]);
        kept.extend_from_slice(&self.messages[dropped_to..]);
        self.messages = kept;

        self.state_message_index = self.state_message_index.map(|idx| {
            if idx < dropped_from {
                idx
            } else if idx >= dropped_to {
                idx - dropped
            } else {
                // The state message itself fell inside the trimmed window;
                // the next `replace_state_message` call re-inserts it.
                self.messages.len()
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_message_is_replaced_not_appended() {
        let mut convo = Conversation::new("system", "task");
        convo.replace_state_message("state v1");
        convo.replace_state_message("state v2");
        assert_eq!(convo.messages().len(), 3);
        assert_eq!(convo.messages()[2].content, "state v2");
    }

    #[test]
    fn trim_keeps_first_and_last_messages() {
        let mut convo = Conversation::new("system", "task");
        for i in 0..30 {
            convo.push_observation(format!("obs {i}"));
        }
        let config = ComposerConfig { keep_first: 2, keep_last: 5, ..Default::default() };
        convo.trim(&config);
        assert_eq!(convo.messages().len(), 7);
        assert_eq!(convo.messages()[0].role, Role::System);
        assert_eq!(convo.messages().last().unwrap().content, "obs 29");
    }

    #[test]
    fn trim_is_a_no_op_when_conversation_already_fits() {
        let mut convo = Conversation::new("system", "task");
        convo.push_observation("obs");
        let before = convo.messages().len();
        convo.trim(&ComposerConfig::default());
        assert_eq!(convo.messages().len(), before);
    }
}
