use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use vault_core::{Channel, Result};

const MAX_FILENAME_LEN: usize = 255;
/// Longest suffix appended to a base name: `_emails_<13-digit ms>.csv.part`.
const MAX_SUFFIX_LEN: usize = "_emails_".len() + 13 + ".csv".len() + ".part".len();
const MAX_BASE_NAME_LEN: usize = MAX_FILENAME_LEN - MAX_SUFFIX_LEN;
const DEFAULT_BASE_NAME: &str = "messages";

/// Destination for finished CSV documents.
#[async_trait]
pub trait DownloadSink: Send + Sync {
    /// Persist `contents` under `filename` and return where it landed.
    async fn save(&self, filename: &str, contents: &str) -> Result<PathBuf>;

    /// Remove a previously saved file.
    async fn discard(&self, path: &Path) -> Result<()>;
}

/// Writes downloads into a directory on the local filesystem.
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

#[async_trait]
impl DownloadSink for DirectorySink {
    async fn save(&self, filename: &str, contents: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let target = self.dir.join(filename);
        let partial = self.dir.join(format!("{}.part", filename));

        tokio::fs::write(&partial, contents.as_bytes()).await?;
        if let Err(e) = tokio::fs::rename(&partial, &target).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e.into());
        }

        info!("Saved {} ({} bytes)", target.display(), contents.len());
        Ok(target)
    }

    async fn discard(&self, path: &Path) -> Result<()> {
        debug!("Discarding {}", path.display());
        tokio::fs::remove_file(path).await?;
        Ok(())
    }
}

/// Make a contact name safe to use as part of a file name.
///
/// The result is ASCII and short enough that the full export file name,
/// including the `.part` staging suffix, fits in one path component.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .replace("..", "")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_BASE_NAME_LEN)
        .collect();

    if cleaned.is_empty() {
        DEFAULT_BASE_NAME.to_string()
    } else {
        cleaned
    }
}

/// `<baseName>_messages_<ts>.csv` or `<baseName>_emails_<ts>.csv`
pub fn export_filename(base_name: &str, channel: Channel, timestamp_ms: i64) -> String {
    format!("{}_{}_{}.csv", base_name, channel.label(), timestamp_ms)
}
