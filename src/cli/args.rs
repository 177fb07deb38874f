//! Top-level CLI surface: global flags mirroring the teacher's `env::CliArgs`
//! plus one subcommand per collaborator the runtime exposes (run/serve/
//! replay/record).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "LLM-driven browser agent runtime", long_about = None)]
#[command(propagate_version = true)]
pub struct CliArgs {
    /// Path to a YAML config overlay.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Tracing filter, e.g. "info" or "wayfarer_cdp=debug,info".
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Port the Prometheus `/metrics` endpoint listens on.
    #[arg(long, default_value_t = 9090)]
    pub metrics_port: u16,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Drive a task end to end: launch a browser, run the observe-decide-act
    /// loop until the model calls `done`, cancellation, or the iteration cap.
    Run {
        /// The task description handed to the model as the first user message.
        task: String,

        /// Starting URL for the session's first tab.
        #[arg(long, default_value = "about:blank")]
        start_url: String,

        /// OpenAI-compatible chat-completions endpoint base, e.g.
        /// "https://api.openai.com/v1". Falls back to `WAYFARER_MODEL_API_BASE`.
        #[arg(long)]
        model_api_base: Option<String>,

        /// Model name passed to the chat-completions request.
        #[arg(long)]
        model_name: Option<String>,
    },

    /// Expose the event bus and a `/metrics` Prometheus scrape endpoint over
    /// HTTP without driving a task.
    Serve {
        /// Address the event/health HTTP server binds to.
        #[arg(long, default_value = "127.0.0.1:8088")]
        bind: String,
    },

    /// Replay a persisted macro by dispatching its steps through the action
    /// registry.
    Replay {
        /// Macro id, as stored under `--macro-dir`.
        macro_id: String,

        /// Directory macros are persisted under.
        #[arg(long, default_value = "./macros")]
        macro_dir: PathBuf,

        /// Starting URL for the session the replay runs against.
        #[arg(long, default_value = "about:blank")]
        start_url: String,
    },

    /// Placeholder entry point for an external recorder to push captured
    /// steps into a macro file. Reads one JSON `MacroStep` per line from
    /// stdin until EOF, and persists them under one new macro.
    Record {
        /// Name for the macro being recorded.
        name: String,

        /// Directory macros are persisted under.
        #[arg(long, default_value = "./macros")]
        macro_dir: PathBuf,
    },
}
