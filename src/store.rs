//! Local key/value storage for the saved API base and admin secret.

use anyhow::{Context, Result, bail};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::home_dir;

/// Last known-good or operator-supplied API base
pub const API_BASE_KEY: &str = "apiBaseUrl";

/// Token sent as `x-admin-secret` for destructive operations
pub const ADMIN_SECRET_KEY: &str = "adminSecret";

/// String-keyed persistent storage.
///
/// Blank values read back as `None`, so callers never see an empty override.
pub trait LocalStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Store backed by a JSON object on disk
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open $GUIDEBOT_HOME/storage.json
    pub fn open_default() -> Result<Self> {
        Self::open(home_dir()?.join("storage.json"))
    }

    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self {
                path,
                entries: BTreeMap::new(),
            });
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let entries = if content.trim().is_empty() {
            BTreeMap::new()
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("failed to parse {}", path.display()))?
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        let content = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, format!("{content}\n"))
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}

impl LocalStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        lookup(&self.entries, key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        insert(&mut self.entries, key, value)?;
        self.write()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.write()?;
        }
        Ok(())
    }
}

/// In-process store; nothing survives the process
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn with(pairs: &[(&str, &str)]) -> Self {
        let entries = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self { entries }
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        lookup(&self.entries, key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        insert(&mut self.entries, key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

fn lookup(entries: &BTreeMap<String, String>, key: &str) -> Option<String> {
    entries.get(key).filter(|v| !v.trim().is_empty()).cloned()
}

fn insert(entries: &mut BTreeMap<String, String>, key: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("refusing to store an empty value for {key}");
    }
    entries.insert(key.to_string(), value.to_string());
    Ok(())
}
