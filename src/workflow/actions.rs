//! Post-generation actions.
//!
//! Copying and saving never change workflow state; they only raise a
//! transient notice. The destinations sit behind [`Clipboard`] and
//! [`ArtifactSink`] so front ends and tests can supply their own.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;

/// Actions offered on a completed artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FollowUp {
    /// Copy the artifact text to the clipboard.
    Copy,
    /// Save the artifact text as a file.
    Download,
    /// Render and save a separate document for the artifact's repository.
    DownloadDocument,
}

/// Somewhere text can be copied to.
pub trait Clipboard: Send + Sync {
    fn copy(&self, text: &str) -> anyhow::Result<()>;
}

/// Somewhere files can be saved to.
pub trait ArtifactSink: Send + Sync {
    /// Write `contents` under `file_name`, returning where it went.
    fn save(&self, file_name: &str, contents: &[u8]) -> std::io::Result<PathBuf>;
}

/// The desktop clipboard.
///
/// A connection is opened per copy. On X11 the text stays available only
/// while this process is alive.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn copy(&self, text: &str) -> anyhow::Result<()> {
        let mut clipboard = arboard::Clipboard::new().map_err(|e| anyhow::anyhow!("{e}"))?;
        clipboard.set_text(text).map_err(|e| anyhow::anyhow!("{e}"))?;
        tracing::debug!(bytes = text.len(), "Copied to system clipboard");
        Ok(())
    }
}

/// Saves files into a directory, creating it on demand.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactSink for DirectorySink {
    fn save(&self, file_name: &str, contents: &[u8]) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name);
        std::fs::write(&path, contents)?;
        Ok(path)
    }
}

/// Clipboard that keeps what was copied, for headless use and tests.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
    fail_with: Option<String>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clipboard whose every copy fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self { contents: Mutex::new(None), fail_with: Some(message.into()) }
    }

    /// Last copied text.
    pub fn contents(&self) -> Option<String> {
        self.contents.lock().clone()
    }
}

impl Clipboard for MemoryClipboard {
    fn copy(&self, text: &str) -> anyhow::Result<()> {
        if let Some(message) = &self.fail_with {
            anyhow::bail!("{message}");
        }
        *self.contents.lock() = Some(text.to_string());
        Ok(())
    }
}

/// Sink that keeps saved files in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    files: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Saved files in order, as `(file name, contents)`.
    pub fn files(&self) -> Vec<(String, Vec<u8>)> {
        self.files.lock().clone()
    }
}

impl ArtifactSink for MemorySink {
    fn save(&self, file_name: &str, contents: &[u8]) -> std::io::Result<PathBuf> {
        self.files.lock().push((file_name.to_string(), contents.to_vec()));
        Ok(PathBuf::from(file_name))
    }
}
