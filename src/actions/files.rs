//! `write_file`, `read_file`, `replace_file` — plain filesystem access
//! against the working directory the runtime was launched from. These are
//! the only catalog actions that never touch the browser.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::fs;
use wayfarer_actions::{ActionCtx, ActionHandler};
use wayfarer_core::action::ParamValue;
use wayfarer_core::{ActionResult, ErrorKind, WayfarerError};

use super::required_str;

fn io_error(path: &str, err: std::io::Error) -> WayfarerError {
    WayfarerError::new(ErrorKind::InvalidActionSchema, format!("file operation on \"{path}\" failed: {err}"))
}

pub struct WriteFileHandler;

#[async_trait]
impl ActionHandler for WriteFileHandler {
    async fn execute(&self, _ctx: &ActionCtx, params: &BTreeMap<String, ParamValue>) -> Result<ActionResult, WayfarerError> {
        let path = required_str(params, "path")?;
        let content = required_str(params, "content")?;
        fs::write(path, content).await.map_err(|err| io_error(path, err))?;
        Ok(ActionResult::ok(format!("Wrote {} bytes to {path}.", content.len())))
    }
}

pub struct ReadFileHandler;

#[async_trait]
impl ActionHandler for ReadFileHandler {
    async fn execute(&self, _ctx: &ActionCtx, params: &BTreeMap<String, ParamValue>) -> Result<ActionResult, WayfarerError> {
        let path = required_str(params, "path")?;
        let content = fs::read_to_string(path).await.map_err(|err| io_error(path, err))?;
        Ok(ActionResult {
            extracted_content: Some(content.clone()),
            long_term_memory: Some(format!("Read {} bytes from {path}.", content.len())),
            include_in_memory: true,
            ..Default::default()
        })
    }
}

pub struct ReplaceFileHandler;

#[async_trait]
impl ActionHandler for ReplaceFileHandler {
    async fn execute(&self, _ctx: &ActionCtx, params: &BTreeMap<String, ParamValue>) -> Result<ActionResult, WayfarerError> {
        let path = required_str(params, "path")?;
        let content = required_str(params, "content")?;
        if fs::metadata(path).await.is_err() {
            return Err(WayfarerError::new(ErrorKind::InvalidActionSchema, format!("cannot replace \"{path}\": file does not exist")));
        }
        fs::write(path, content).await.map_err(|err| io_error(path, err))?;
        Ok(ActionResult::ok(format!("Replaced contents of {path} ({} bytes).", content.len())))
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use tokio_util::sync::CancellationToken;
    use wayfarer_cdp::PageId;
    use wayfarer_core::TaskId;

    use super::*;

    fn ctx() -> ActionCtx {
        ActionCtx::new(TaskId::new(), PageId(uuid::Uuid::new_v4()), Instant::now() + Duration::from_secs(30), CancellationToken::new())
    }

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, ParamValue> {
        pairs.iter().map(|(k, v)| (k.to_string(), ParamValue::String(v.to_string()))).collect()
    }

    #[tokio::test]
    async fn write_then_read_round_trips_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt").to_string_lossy().into_owned();

        let write_result = WriteFileHandler.execute(&ctx(), &params(&[("path", &path), ("content", "hello")])).await.unwrap();
        assert!(write_result.long_term_memory.unwrap().contains("5 bytes"));

        let read_result = ReadFileHandler.execute(&ctx(), &params(&[("path", &path)])).await.unwrap();
        assert_eq!(read_result.extracted_content.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn read_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.txt").to_string_lossy().into_owned();
        let err = ReadFileHandler.execute(&ctx(), &params(&[("path", &path)])).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidActionSchema);
    }

    #[tokio::test]
    async fn replace_requires_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-there.txt").to_string_lossy().into_owned();
        let err = ReplaceFileHandler.execute(&ctx(), &params(&[("path", &path), ("content", "x")])).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidActionSchema);
    }

    #[tokio::test]
    async fn replace_overwrites_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt").to_string_lossy().into_owned();
        fs::write(&path, "old").await.unwrap();

        ReplaceFileHandler.execute(&ctx(), &params(&[("path", &path), ("content", "new")])).await.unwrap();
        let content = fs::read_to_string(&path).await.unwrap();
        assert_eq!(content, "new");
    }
}
