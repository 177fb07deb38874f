//! `wayfarer record <name>` — a placeholder capture entry point: reads one
//! JSON-encoded [`StepKind`] per line from stdin until EOF and persists them
//! as a new macro. An external recorder (browser extension, devtools
//! attachment) is expected to produce that stream; this subcommand only
//! owns turning it into a macro file.

use std::path::Path;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;
use wayfarer_macro::{Macro, MacroStep, MacroStore, StepKind};

use crate::errors::ExitCode;

pub async fn cmd_record(name: &str, macro_dir: &Path) -> Result<ExitCode> {
    let mut macro_ = Macro::new(Uuid::new_v4().to_string(), name);
    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();

    let mut count = 0usize;
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let step: StepKind = match serde_json::from_str(trimmed) {
            Ok(step) => step,
            Err(err) => {
                tracing::warn!(%err, line = trimmed, "skipping unparseable step");
                continue;
            }
        };
        macro_.push_step(MacroStep::new(Uuid::new_v4().to_string(), step));
        count += 1;
    }

    let store = MacroStore::new(macro_dir.to_path_buf());
    store.save(&macro_).await.context("persisting recorded macro")?;

    println!("recorded {count} step(s) into macro {} ({})", macro_.name, macro_.id);
    Ok(ExitCode::Success)
}
