//! One JSON file per macro keyed by id, plus a single index file — spec's
//! persisted state layout for the macro collaborator.

use std::path::{Path, PathBuf};

use tracing::instrument;

use crate::errors::MacroError;
use crate::types::{Macro, MacroIndex, MacroIndexEntry};
use crate::validate::validate_macro_name;

const INDEX_FILE_NAME: &str = "index.json";

pub struct MacroStore {
    root: PathBuf,
}

impl MacroStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn macro_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE_NAME)
    }

    async fn ensure_root(&self) -> Result<(), MacroError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    #[instrument(skip(self, macro_), fields(macro_id = %macro_.id))]
    pub async fn save(&self, macro_: &Macro) -> Result<(), MacroError> {
        validate_macro_name(&macro_.name)?;
        self.ensure_root().await?;
        let body = serde_json::to_vec_pretty(macro_)?;
        tokio::fs::write(self.macro_path(&macro_.id), body).await?;

        let mut index = self.load_index().await?;
        index.upsert(MacroIndexEntry::from(macro_));
        self.write_index(&index).await
    }

    #[instrument(skip(self))]
    pub async fn load(&self, id: &str) -> Result<Macro, MacroError> {
        let path = self.macro_path(id);
        let body = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => MacroError::NotFound(id.to_string()),
            _ => MacroError::Io(e),
        })?;
        Ok(serde_json::from_slice(&body)?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), MacroError> {
        let path = self.macro_path(id);
        if !path_exists(&path).await {
            return Err(MacroError::NotFound(id.to_string()));
        }
        tokio::fs::remove_file(&path).await?;
        let mut index = self.load_index().await?;
        index.remove(id);
        self.write_index(&index).await
    }

    pub async fn list(&self) -> Result<Vec<MacroIndexEntry>, MacroError> {
        Ok(self.load_index().await?.entries)
    }

    async fn load_index(&self) -> Result<MacroIndex, MacroError> {
        let path = self.index_path();
        if !path_exists(&path).await {
            return Ok(MacroIndex::default());
        }
        let body = tokio::fs::read(&path).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn write_index(&self, index: &MacroIndex) -> Result<(), MacroError> {
        self.ensure_root().await?;
        let body = serde_json::to_vec_pretty(index)?;
        tokio::fs::write(self.index_path(), body).await?;
        Ok(())
    }
}

async fn path_exists(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MacroStep, StepKind};

    #[tokio::test]
    async fn save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = MacroStore::new(dir.path());
        let mut m = Macro::new("m1", "login flow");
        m.push_step(MacroStep::new("s1", StepKind::Navigation { url: "https://example.com".into() }));
        store.save(&m).await.unwrap();

        let loaded = store.load("m1").await.unwrap();
        assert_eq!(loaded.id, "m1");
        assert_eq!(loaded.steps.len(), 1);

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].step_count, 1);
    }

    #[tokio::test]
    async fn delete_removes_macro_and_index_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = MacroStore::new(dir.path());
        let m = Macro::new("m1", "login flow");
        store.save(&m).await.unwrap();

        store.delete("m1").await.unwrap();
        assert!(matches!(store.load("m1").await, Err(MacroError::NotFound(_))));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_rejects_invalid_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = MacroStore::new(dir.path());
        let m = Macro::new("m1", "a/b");
        assert!(matches!(store.save(&m).await, Err(MacroError::InvalidFileName { .. })));
    }
}
