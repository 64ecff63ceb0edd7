//! JSON snapshot files for trust records
//!
//! Casino and degen records live in two files under one directory, each a
//! JSON object keyed by casino name or user id. Older snapshots stored an
//! entry list (`[[key, record], ...]`); both layouts load.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::PersistenceConfig;
use crate::trust::LedgerSnapshot;

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordFile<R> {
    Map(BTreeMap<String, R>),
    Entries(Vec<(String, R)>),
}

impl<R> RecordFile<R> {
    fn into_map(self) -> BTreeMap<String, R> {
        match self {
            RecordFile::Map(map) => map,
            RecordFile::Entries(entries) => entries.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
    casino_file: String,
    degen_file: String,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>, casino_file: impl Into<String>, degen_file: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            casino_file: casino_file.into(),
            degen_file: degen_file.into(),
        }
    }

    /// `None` when persistence is disabled
    pub fn from_config(config: &PersistenceConfig) -> Option<Self> {
        config
            .dir
            .as_ref()
            .map(|dir| Self::new(dir, &config.casino_file, &config.degen_file))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn casino_path(&self) -> PathBuf {
        self.dir.join(&self.casino_file)
    }

    pub fn degen_path(&self) -> PathBuf {
        self.dir.join(&self.degen_file)
    }

    /// Load both files. Missing or blank files yield empty maps.
    pub async fn load(&self) -> Result<LedgerSnapshot> {
        let snapshot = LedgerSnapshot {
            casinos: read_records(&self.casino_path()).await?,
            degens: read_records(&self.degen_path()).await?,
        };
        info!(
            dir = %self.dir.display(),
            casinos = snapshot.casinos.len(),
            degens = snapshot.degens.len(),
            "Trust snapshot loaded"
        );
        Ok(snapshot)
    }

    /// Write both files, each replaced atomically
    pub async fn save(&self, snapshot: &LedgerSnapshot) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create snapshot directory {}", self.dir.display()))?;

        write_atomic(&self.casino_path(), &snapshot.casinos).await?;
        write_atomic(&self.degen_path(), &snapshot.degens).await?;
        debug!(
            casinos = snapshot.casinos.len(),
            degens = snapshot.degens.len(),
            "Trust snapshot written"
        );
        Ok(())
    }
}

async fn read_records<R: DeserializeOwned>(path: &Path) -> Result<BTreeMap<String, R>> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read snapshot {}", path.display()))
        }
    };
    if text.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    let file: RecordFile<R> = serde_json::from_str(&text)
        .with_context(|| format!("Invalid snapshot file {}", path.display()))?;
    Ok(file.into_map())
}

async fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value).context("Failed to serialize snapshot")?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, &json)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrustConfig;
    use crate::trust::{CasinoCategory, DegenCategory, TrustLedger};
    use chrono::{TimeZone, Utc};

    fn store(dir: &Path) -> SnapshotStore {
        SnapshotStore::new(dir, "casino-trust.json", "degen-trust.json")
    }

    #[tokio::test]
    async fn test_missing_files_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = store(dir.path()).load().await.unwrap();
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        // Timestamps persist at millisecond precision
        let now = Utc.timestamp_millis_opt(1_760_000_000_123).unwrap();
        let ledger = TrustLedger::new(TrustConfig::default());
        ledger.apply_casino_delta_at("acme", CasinoCategory::Bonus, -6.0, "nerf", Some(3), now);
        ledger.apply_degen_delta_at("u1", DegenCategory::Tilt, 2.0, "tilt", Some(2), now);

        let store = store(&dir.path().join("nested"));
        store.save(&ledger.snapshot()).await.unwrap();
        assert!(store.casino_path().exists());
        assert!(!dir.path().join("nested/casino-trust.json.tmp").exists());

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, ledger.snapshot());
    }

    #[tokio::test]
    async fn test_legacy_entry_list_layout() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = r#"[["acme", {"score": 70, "bonusScore": 50, "history": [], "lastUpdated": 1700000000000}]]"#;
        tokio::fs::write(dir.path().join("casino-trust.json"), legacy)
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("degen-trust.json"), "  \n")
            .await
            .unwrap();

        let snapshot = store(dir.path()).load().await.unwrap();
        assert_eq!(snapshot.casinos["acme"].bonus_score, 50.0);
        assert!(snapshot.degens.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("degen-trust.json"), "{not json")
            .await
            .unwrap();
        let err = store(dir.path()).load().await.unwrap_err();
        assert!(err.to_string().contains("Invalid snapshot file"));
    }
}
