//! The minimum action set: one `ActionManifest` per entry, with the exact
//! parameter-name contract — `click`/`input` take `index`, never
//! `element_index`.

use crate::manifest::{ActionManifest, ParamSpec, ParamType};

fn index_param() -> ParamSpec {
    ParamSpec::required("index", ParamType::Integer, "index into the current interactive-elements listing")
}

/// Every manifest in the minimum action set, in catalog order (not the
/// alphabetical order `ActionRegistry::manifests` sorts to for the prompt).
pub fn all() -> Vec<ActionManifest> {
    vec![
        ActionManifest::new(
            "search",
            "Search the web for a query and navigate to the results page.",
            vec![ParamSpec::required("query", ParamType::String, "search query text")],
        ),
        ActionManifest::new(
            "navigate",
            "Navigate the current tab to a URL.",
            vec![ParamSpec::required("url", ParamType::String, "absolute URL to load")],
        ),
        ActionManifest::new("click", "Click the element at the given index.", vec![index_param()]),
        ActionManifest::new(
            "input",
            "Type text into the element at the given index.",
            vec![
                index_param(),
                ParamSpec::required("text", ParamType::String, "text to type"),
                ParamSpec::optional("clear", ParamType::Boolean, "clear the field before typing (default false)"),
                ParamSpec::optional("submit", ParamType::Boolean, "press Enter after typing (default false)"),
            ],
        ),
        ActionManifest::new(
            "scroll",
            "Scroll the page or a scroll container.",
            vec![
                ParamSpec::required(
                    "direction",
                    ParamType::Enum { values: vec!["up".into(), "down".into(), "left".into(), "right".into()] },
                    "scroll direction",
                ),
                ParamSpec::optional("pages", ParamType::Integer, "number of viewport pages to scroll (default 1)"),
                ParamSpec::optional("index", ParamType::Integer, "index of a scroll container; absent scrolls the page"),
            ],
        ),
        ActionManifest::new(
            "find_text",
            "Search the current page for literal text and report whether it is present.",
            vec![ParamSpec::required("text", ParamType::String, "text to search for")],
        ),
        ActionManifest::new("screenshot", "Capture a screenshot of the current page.", vec![ParamSpec::optional(
            "full_page",
            ParamType::Boolean,
            "capture the full scrollable page rather than just the viewport (default false)",
        )]),
        ActionManifest::new(
            "evaluate",
            "Evaluate a JavaScript expression in the page and return its result.",
            vec![ParamSpec::required("expression", ParamType::String, "JavaScript expression")],
        ),
        ActionManifest::new(
            "extract",
            "Extract information from the current page matching a goal description.",
            vec![ParamSpec::required("goal", ParamType::String, "natural-language description of what to extract")],
        ),
        ActionManifest::new("go_back", "Navigate back in the tab's history.", vec![]),
        ActionManifest::new(
            "wait",
            "Wait for a fixed duration before the next step.",
            vec![ParamSpec::optional("ms", ParamType::Integer, "milliseconds to wait (default 1000)")],
        ),
        ActionManifest::new(
            "select_dropdown",
            "Select an option in the dropdown at the given index.",
            vec![index_param(), ParamSpec::required("value", ParamType::String, "option value or visible label to select")],
        ),
        ActionManifest::new(
            "dropdown_options",
            "List the options of the dropdown at the given index.",
            vec![index_param()],
        ),
        ActionManifest::new(
            "upload_file",
            "Attach a local file to the file input at the given index.",
            vec![index_param(), ParamSpec::required("path", ParamType::String, "path to the file to upload")],
        ),
        ActionManifest::new(
            "send_keys",
            "Send a raw key sequence to the currently focused element.",
            vec![ParamSpec::required("keys", ParamType::String, "key sequence, e.g. \"Enter\" or \"Control+a\"")],
        ),
        ActionManifest::new(
            "switch",
            "Switch the active tab to the given index.",
            vec![ParamSpec::required("index", ParamType::Integer, "index into the current tab list")],
        ),
        ActionManifest::new(
            "close",
            "Close a tab.",
            vec![ParamSpec::optional("index", ParamType::Integer, "index into the current tab list; absent closes the active tab")],
        ),
        ActionManifest::new(
            "write_file",
            "Write content to a file, creating it if absent.",
            vec![
                ParamSpec::required("path", ParamType::String, "file path"),
                ParamSpec::required("content", ParamType::String, "content to write"),
            ],
        ),
        ActionManifest::new(
            "read_file",
            "Read the content of a file.",
            vec![ParamSpec::required("path", ParamType::String, "file path")],
        ),
        ActionManifest::new(
            "replace_file",
            "Replace a file's entire content.",
            vec![
                ParamSpec::required("path", ParamType::String, "file path"),
                ParamSpec::required("content", ParamType::String, "replacement content"),
            ],
        ),
        ActionManifest::new(
            "done",
            "Finish the task and report the final result.",
            vec![
                ParamSpec::required("text", ParamType::String, "final result text for the caller"),
                ParamSpec::required("success", ParamType::Boolean, "whether the task succeeded"),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_twenty_one_actions() {
        assert_eq!(all().len(), 21);
    }

    #[test]
    fn click_and_input_use_index_not_element_index() {
        let manifests = all();
        let click = manifests.iter().find(|m| m.name == "click").unwrap();
        let input = manifests.iter().find(|m| m.name == "input").unwrap();
        assert!(click.param("index").is_some());
        assert!(click.param("element_index").is_none());
        assert!(input.param("index").is_some());
        assert!(input.param("element_index").is_none());
    }

    #[test]
    fn names_are_unique() {
        let manifests = all();
        let mut names: Vec<&str> = manifests.iter().map(|m| m.name.as_str()).collect();
        names.sort();
        let before = names.len();
        names.dedup();
        assert_eq!(before, names.len());
    }
}
