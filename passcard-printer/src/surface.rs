//! Render surfaces
//!
//! A surface holds one rendered document and hands it to a print facility.
//! The staged implementation writes markup to a file under a work directory;
//! "ready" means the staged file has settled across two frame ticks after the
//! write completed.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

use crate::error::{PrintError, PrintResult};

/// Interval between two settle checks
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Consecutive stable frames required after load-complete
const SETTLED_FRAMES: u8 = 2;

/// A document staged on a surface, ready to be handed to a print facility
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedDocument {
    pub path: PathBuf,
    pub title: String,
    pub bytes: usize,
}

/// Rendering surface
#[async_trait]
pub trait RenderSurface: Send + Sync {
    /// Surface identifier (for logs)
    fn id(&self) -> &str;

    /// Whether the surface is shown to the operator
    fn is_visible(&self) -> bool;

    /// Whether the surface was closed
    fn is_destroyed(&self) -> bool;

    /// Full load of a new document
    async fn load(&mut self, title: &str, markup: &str) -> PrintResult<()>;

    /// Replace the current document in place, skipping the full load
    async fn replace_document(&mut self, title: &str, markup: &str) -> PrintResult<()>;

    /// Wait until rendering has settled, bounded by `timeout`
    async fn when_ready(&self, timeout: Duration) -> PrintResult<()>;

    /// The currently staged document
    fn staged(&self) -> Option<&StagedDocument>;

    /// Close the surface; further use fails
    async fn close(&mut self);
}

/// Creates surfaces on demand
#[async_trait]
pub trait SurfaceFactory: Send + Sync {
    async fn create(&self, visible: bool) -> PrintResult<Box<dyn RenderSurface>>;
}

/// File-staged surface
#[derive(Debug)]
pub struct StagedSurface {
    id: String,
    path: PathBuf,
    visible: bool,
    destroyed: bool,
    current: Option<StagedDocument>,
}

impl StagedSurface {
    /// Create a surface staging into `dir`
    pub async fn create(dir: &Path, visible: bool) -> PrintResult<Self> {
        tokio::fs::create_dir_all(dir).await?;
        let id = format!("surface-{}", uuid::Uuid::new_v4().simple());
        let path = dir.join(format!("{}.html", id));
        debug!(surface = %id, visible, "Surface created");
        Ok(Self {
            id,
            path,
            visible,
            destroyed: false,
            current: None,
        })
    }

    /// Path of the staged file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_alive(&self) -> PrintResult<()> {
        if self.destroyed {
            return Err(PrintError::SurfaceDestroyed(self.id.clone()));
        }
        Ok(())
    }

    async fn write_markup(&mut self, title: &str, markup: &str) -> PrintResult<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
            .await?;
        file.write_all(markup.as_bytes()).await?;
        file.flush().await?;
        file.sync_data().await?;

        self.current = Some(StagedDocument {
            path: self.path.clone(),
            title: title.to_string(),
            bytes: markup.len(),
        });
        Ok(())
    }
}

#[async_trait]
impl RenderSurface for StagedSurface {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    #[instrument(skip(self, markup), fields(surface = %self.id, bytes = markup.len()))]
    async fn load(&mut self, title: &str, markup: &str) -> PrintResult<()> {
        self.ensure_alive()?;
        self.current = None;
        if let Err(e) = tokio::fs::remove_file(&self.path).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            return Err(e.into());
        }
        self.write_markup(title, markup).await
    }

    async fn replace_document(&mut self, title: &str, markup: &str) -> PrintResult<()> {
        self.ensure_alive()?;
        self.write_markup(title, markup).await
    }

    async fn when_ready(&self, timeout: Duration) -> PrintResult<()> {
        self.ensure_alive()?;
        let doc = self.current.as_ref().ok_or(PrintError::NotLoaded)?;
        let expected = doc.bytes as u64;

        let settle = async {
            let mut ticker = tokio::time::interval(FRAME_INTERVAL);
            let mut stable: u8 = 0;
            loop {
                ticker.tick().await;
                match tokio::fs::metadata(&doc.path).await {
                    Ok(meta) if meta.len() == expected => stable += 1,
                    _ => stable = 0,
                }
                if stable >= SETTLED_FRAMES {
                    break;
                }
            }
        };

        tokio::time::timeout(timeout, settle).await.map_err(|_| {
            PrintError::Timeout(format!(
                "surface {} not ready after {}ms",
                self.id,
                timeout.as_millis()
            ))
        })
    }

    fn staged(&self) -> Option<&StagedDocument> {
        self.current.as_ref()
    }

    async fn close(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        // Visible surfaces keep their document for the operator
        if !self.visible
            && let Err(e) = tokio::fs::remove_file(&self.path).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(surface = %self.id, error = %e, "Failed to remove staged document");
        }
        debug!(surface = %self.id, "Surface closed");
    }
}

/// How long a closed preview document stays on disk
pub const DEFAULT_PREVIEW_RETENTION: Duration = Duration::from_secs(15 * 60);

/// Factory for [`StagedSurface`]s
///
/// Hidden surfaces stage under `{root}/surfaces`, visible ones under
/// `{root}/preview`. Preview documents outlive their surface so the operator
/// can look at them; every new visible surface first sweeps previews older
/// than the retention window.
#[derive(Debug, Clone)]
pub struct StagedSurfaceFactory {
    root: PathBuf,
    preview_retention: Duration,
}

impl StagedSurfaceFactory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            preview_retention: DEFAULT_PREVIEW_RETENTION,
        }
    }

    pub fn with_preview_retention(mut self, retention: Duration) -> Self {
        self.preview_retention = retention;
        self
    }

    fn preview_dir(&self) -> PathBuf {
        self.root.join("preview")
    }

    /// Remove staged previews last written before the retention window
    ///
    /// Returns the number of removed files.
    pub async fn sweep_previews(&self) -> PrintResult<usize> {
        let dir = self.preview_dir();
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("html") {
                continue;
            }
            let age = entry
                .metadata()
                .await
                .and_then(|meta| meta.modified())
                .ok()
                .and_then(|modified| modified.elapsed().ok());
            let Some(age) = age else { continue };
            if age < self.preview_retention {
                continue;
            }
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove old preview"),
            }
        }
        if removed > 0 {
            debug!(removed, "Old previews removed");
        }
        Ok(removed)
    }
}

#[async_trait]
impl SurfaceFactory for StagedSurfaceFactory {
    async fn create(&self, visible: bool) -> PrintResult<Box<dyn RenderSurface>> {
        let dir = if visible {
            if let Err(e) = self.sweep_previews().await {
                warn!(error = %e, "Preview sweep failed");
            }
            self.preview_dir()
        } else {
            self.root.join("surfaces")
        };
        Ok(Box::new(StagedSurface::create(&dir, visible).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_then_ready() {
        let dir = tempfile::tempdir().unwrap();
        let mut surface = StagedSurface::create(dir.path(), false).await.unwrap();

        surface.load("T1", "<html>one</html>").await.unwrap();
        surface.when_ready(Duration::from_secs(2)).await.unwrap();

        let staged = surface.staged().unwrap();
        assert_eq!(staged.title, "T1");
        assert_eq!(
            std::fs::read_to_string(&staged.path).unwrap(),
            "<html>one</html>"
        );
    }

    #[tokio::test]
    async fn test_replace_document_reuses_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut surface = StagedSurface::create(dir.path(), false).await.unwrap();

        surface.load("A", "<p>a long first document</p>").await.unwrap();
        let first = surface.staged().unwrap().path.clone();
        surface.replace_document("B", "<p>b</p>").await.unwrap();
        surface.when_ready(Duration::from_secs(2)).await.unwrap();

        let staged = surface.staged().unwrap();
        assert_eq!(staged.path, first);
        assert_eq!(staged.title, "B");
        assert_eq!(std::fs::read_to_string(&first).unwrap(), "<p>b</p>");
    }

    #[tokio::test]
    async fn test_ready_without_document_fails() {
        let dir = tempfile::tempdir().unwrap();
        let surface = StagedSurface::create(dir.path(), false).await.unwrap();
        let result = surface.when_ready(Duration::from_millis(100)).await;
        assert!(matches!(result, Err(PrintError::NotLoaded)));
    }

    #[tokio::test]
    async fn test_close_hidden_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut surface = StagedSurface::create(dir.path(), false).await.unwrap();
        surface.load("T", "<p>x</p>").await.unwrap();
        let path = surface.path().to_path_buf();

        surface.close().await;

        assert!(surface.is_destroyed());
        assert!(!path.exists());
        assert!(matches!(
            surface.load("T", "<p>y</p>").await,
            Err(PrintError::SurfaceDestroyed(_))
        ));
    }

    #[tokio::test]
    async fn test_close_visible_keeps_file() {
        let dir = tempfile::tempdir().unwrap();
        let factory = StagedSurfaceFactory::new(dir.path());
        let mut surface = factory.create(true).await.unwrap();
        surface.load("Preview", "<p>p</p>").await.unwrap();
        let path = surface.staged().unwrap().path.clone();

        surface.close().await;

        assert!(path.exists());
        assert!(path.starts_with(dir.path().join("preview")));
    }

    #[tokio::test]
    async fn test_next_preview_sweeps_expired_documents() {
        let dir = tempfile::tempdir().unwrap();
        let factory = StagedSurfaceFactory::new(dir.path()).with_preview_retention(Duration::ZERO);

        let mut first = factory.create(true).await.unwrap();
        first.load("First", "<p>1</p>").await.unwrap();
        let old = first.staged().unwrap().path.clone();
        first.close().await;
        assert!(old.exists());

        let mut second = factory.create(true).await.unwrap();
        assert!(!old.exists());
        second.load("Second", "<p>2</p>").await.unwrap();
        assert!(second.staged().unwrap().path.exists());
    }

    #[tokio::test]
    async fn test_sweep_keeps_recent_previews() {
        let dir = tempfile::tempdir().unwrap();
        let factory = StagedSurfaceFactory::new(dir.path());
        assert_eq!(factory.sweep_previews().await.unwrap(), 0);

        let mut surface = factory.create(true).await.unwrap();
        surface.load("Preview", "<p>p</p>").await.unwrap();
        surface.close().await;
        std::fs::write(dir.path().join("preview").join("notes.txt"), "x").unwrap();

        assert_eq!(factory.sweep_previews().await.unwrap(), 0);
        assert!(surface.staged().unwrap().path.exists());
    }
}
