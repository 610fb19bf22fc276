//! Publishing rendered payloads where waybar can read them.

use crate::indicator::render::RenderedPayload;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Destination for rendered payloads.
pub trait OutputSink: Send + Sync {
    /// Replace whatever was published before with `payload`.
    fn publish(&self, payload: &RenderedPayload) -> Result<(), OutputError>;
}

/// Errors that can occur while publishing.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Writes the payload as a JSON file, replacing it atomically.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read back the last payload written to `path`.
    pub fn read(path: &Path) -> Result<RenderedPayload, OutputError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl OutputSink for JsonFileSink {
    fn publish(&self, payload: &RenderedPayload) -> Result<(), OutputError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = payload.to_json()?;
        let temp = self.temp_path();
        std::fs::write(&temp, json)?;
        std::fs::rename(&temp, &self.path)?;
        Ok(())
    }
}

/// Keeps every published payload in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    published: Mutex<Vec<RenderedPayload>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All payloads published so far, oldest first.
    pub fn published(&self) -> Vec<RenderedPayload> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<RenderedPayload> {
        self.published().pop()
    }
}

impl OutputSink for MemorySink {
    fn publish(&self, payload: &RenderedPayload) -> Result<(), OutputError> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(payload.clone());
        Ok(())
    }
}
