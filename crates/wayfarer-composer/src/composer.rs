//! Ties the system prompt, the task message, and the single replaceable
//! state message together into one conversation, per spec §4.H.

use wayfarer_actions::ActionManifest;

use crate::config::ComposerConfig;
use crate::message::Conversation;
use crate::prompt::build_system_prompt;
use crate::state::{format_state_message, BrowserStateView};

pub struct Composer {
    config: ComposerConfig,
    conversation: Conversation,
}

impl Composer {
    pub fn new(task: impl Into<String>, manifests: &[&ActionManifest], config: ComposerConfig) -> Self {
        let system_prompt = build_system_prompt(manifests);
        Self { conversation: Conversation::new(system_prompt, task), config }
    }

    /// Replaces the state message with a freshly formatted one and trims
    /// middle history — the per-step update the agent loop calls before
    /// invoking the model.
    #[tracing::instrument(skip_all, fields(url = view.url))]
    pub fn update_state(&mut self, view: &BrowserStateView<'_>, previous_evaluation: Option<&str>) {
        let message = format_state_message(view, previous_evaluation, &self.config);
        self.conversation.replace_state_message(message);
        self.conversation.trim(&self.config);
        tracing::debug!(messages = self.conversation.messages().len(), "state message updated");
    }

    pub fn observe(&mut self, content: impl Into<String>) {
        self.conversation.push_observation(content);
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfarer_actions::catalog;

    #[test]
    fn composer_assembles_system_task_and_state_messages() {
        let all = catalog::all();
        let refs: Vec<&ActionManifest> = all.iter().collect();
        let mut composer = Composer::new("find the weather", &refs, ComposerConfig::default());
        let view = BrowserStateView {
            url: "https://example.com",
            title: None,
            listing: "[0]<button>Search</button>",
            stats: Default::default(),
            scroll: Default::default(),
            screenshot_attached: false,
        };
        composer.update_state(&view, None);

        let messages = composer.conversation().messages();
        assert_eq!(messages.len(), 3);
        assert!(messages[0].content.contains("Available Actions"));
        assert_eq!(messages[1].content, "find the weather");
        assert!(messages[2].content.contains("[0]<button>Search</button>"));
    }

    #[test]
    fn repeated_updates_replace_rather_than_append() {
        let all = catalog::all();
        let refs: Vec<&ActionManifest> = all.iter().collect();
        let mut composer = Composer::new("task", &refs, ComposerConfig::default());
        let view = BrowserStateView {
            url: "https://example.com",
            title: None,
            listing: "listing 1",
            stats: Default::default(),
            scroll: Default::default(),
            screenshot_attached: false,
        };
        composer.update_state(&view, None);
        let view2 = BrowserStateView { listing: "listing 2", ..view };
        composer.update_state(&view2, Some("Success"));

        assert_eq!(composer.conversation().messages().len(), 3);
        assert!(composer.conversation().messages()[2].content.contains("listing 2"));
    }
}
