use chrono::{DateTime, Utc};
use nf_core::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Summary of the most recent collection run, persisted as JSON.
///
/// Informational only: the collection window is always derived from the
/// store, never from this file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub last_collection_start: DateTime<Utc>,
    pub last_collection_end: DateTime<Utc>,
    pub first_run: bool,
    pub new_articles: usize,
    #[serde(default)]
    pub sources_failed: Vec<String>,
}

impl RunState {
    /// `Ok(None)` when no run has been recorded yet.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
