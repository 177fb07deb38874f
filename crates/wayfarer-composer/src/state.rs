//! Formats the single "current browser state" message: previous step
//! evaluation, URL/title, page statistics, the serialised interactive-element
//! listing (truncated to a cap), and viewport/scroll info.

use crate::config::ComposerConfig;

#[derive(Clone, Copy, Debug, Default)]
pub struct PageStats {
    pub interactive_count: usize,
    pub links: usize,
    pub inputs: usize,
    pub buttons: usize,
    pub scroll_containers: usize,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ScrollInfo {
    pub pixels_from_top: u64,
    pub viewport_height: u64,
    pub total_height: u64,
}

impl ScrollInfo {
    pub fn scroll_percentage(&self) -> f64 {
        if self.total_height == 0 {
            return 0.0;
        }
        (self.pixels_from_top as f64 / self.total_height as f64 * 100.0).clamp(0.0, 100.0)
    }
}

pub struct BrowserStateView<'a> {
    pub url: &'a str,
    pub title: Option<&'a str>,
    pub listing: &'a str,
    pub stats: PageStats,
    pub scroll: ScrollInfo,
    pub screenshot_attached: bool,
}

/// Truncates `listing` to `max_chars`, appending an explicit marker when it
/// had to cut — the model must never mistake a truncated listing for a
/// complete one.
fn truncate_listing(listing: &str, max_chars: usize) -> String {
    if listing.chars().count() <= max_chars {
        return listing.to_string();
    }
    let truncated: String = listing.chars().take(max_chars).collect();
    format!("{truncated}\n\n[... listing truncated at {max_chars} characters ...]")
}

pub fn format_state_message(view: &BrowserStateView, previous_evaluation: Option<&str>, config: &ComposerConfig) -> String {
    let mut message = String::new();

    if let Some(evaluation) = previous_evaluation {
        message.push_str("## Previous Step Evaluation\n");
        message.push_str(evaluation);
        message.push_str("\n\n");
    }

    message.push_str("## Current Browser State\n");
    message.push_str(&format!("URL: {}\n", view.url));
    if let Some(title) = view.title {
        message.push_str(&format!("Title: {title}\n"));
    }

    message.push_str(&format!(
        "Page statistics: {} interactive elements ({} links, {} inputs, {} buttons, {} scroll containers)\n",
        view.stats.interactive_count, view.stats.links, view.stats.inputs, view.stats.buttons, view.stats.scroll_containers
    ));

    message.push_str(&format!(
        "Scroll: {:.0}% ({} of {} px, viewport {} px)\n",
        view.scroll.scroll_percentage(),
        view.scroll.pixels_from_top,
        view.scroll.total_height,
        view.scroll.viewport_height
    ));

    message.push_str("\n## Interactive Elements\n");
    message.push_str(&truncate_listing(view.listing, config.max_listing_chars));
    message.push('\n');

    if view.screenshot_attached {
        message.push_str("\n[Screenshot attached — treat it as ground truth over the element listing when they conflict]\n");
    }

    message
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(listing: &str) -> BrowserStateView<'_> {
        BrowserStateView {
            url: "https://example.com",
            title: Some("Example"),
            listing,
            stats: PageStats { interactive_count: 2, links: 1, inputs: 1, buttons: 0, scroll_containers: 0 },
            scroll: ScrollInfo { pixels_from_top: 100, viewport_height: 800, total_height: 2000 },
            screenshot_attached: false,
        }
    }

    #[test]
    fn includes_url_title_and_stats() {
        let state = view("[0]<a>link</a>");
        let message = format_state_message(&state, None, &ComposerConfig::default());
        assert!(message.contains("URL: https://example.com"));
        assert!(message.contains("Title: Example"));
        assert!(message.contains("2 interactive elements"));
    }

    #[test]
    fn long_listing_is_truncated_with_explicit_marker() {
        let listing = "x".repeat(100);
        let config = ComposerConfig { max_listing_chars: 10, ..Default::default() };
        let state = view(&listing);
        let message = format_state_message(&state, None, &config);
        assert!(message.contains("truncated at 10 characters"));
    }

    #[test]
    fn short_listing_is_not_truncated() {
        let listing = "short listing";
        let config = ComposerConfig { max_listing_chars: 10_000, ..Default::default() };
        let state = view(listing);
        let message = format_state_message(&state, None, &config);
        assert!(!message.contains("truncated"));
    }

    #[test]
    fn previous_evaluation_is_prepended_when_present() {
        let state = view("[0]<a>link</a>");
        let message = format_state_message(&state, Some("Success - clicked the link"), &ComposerConfig::default());
        assert!(message.starts_with("## Previous Step Evaluation"));
        assert!(message.contains("Success - clicked the link"));
    }
}
