/// Tunables for the composer, per spec's configuration surface:
/// `maxDOMLength`, and the middle-history trim window.
#[derive(Clone, Debug)]
pub struct ComposerConfig {
    /// Serialised-listing cap before truncation, with an explicit marker
    /// appended. Default ≈ 40 000 characters.
    pub max_listing_chars: usize,
    /// How many of the most recent steps are rendered in the state message's
    /// "Previous Actions" section.
    pub history_window: usize,
    /// Messages kept at the front of the conversation when trimming (system
    /// prompt + task message).
    pub keep_first: usize,
    /// Messages kept at the back of the conversation when trimming.
    pub keep_last: usize,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self { max_listing_chars: 40_000, history_window: 10, keep_first: 2, keep_last: 20 }
    }
}
