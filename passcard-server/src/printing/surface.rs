//! Render surface manager
//!
//! One persistent hidden surface serves the fast path. It sits in a
//! single-slot pool: a job takes the lease, stages and prints, then drops
//! the lease, so concurrent batches interleave per job instead of
//! overwriting each other's document. Preview and diagnostics use transient
//! surfaces that are closed after one use.

use std::sync::Arc;
use std::time::Duration;

use passcard_printer::{PrintError, RenderSurface, StagedDocument, SurfaceFactory};
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

pub const FAST_READY_TIMEOUT: Duration = Duration::from_millis(2500);
pub const PREVIEW_READY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("Failed to create surface: {0}")]
    Create(#[source] PrintError),

    #[error("Failed to load document: {0}")]
    Load(#[source] PrintError),

    #[error("Surface not ready: {0}")]
    NotReady(#[source] PrintError),
}

type Slot = Option<Box<dyn RenderSurface>>;

pub struct SurfaceManager {
    factory: Arc<dyn SurfaceFactory>,
    fast: Mutex<Slot>,
}

impl std::fmt::Debug for SurfaceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceManager").finish_non_exhaustive()
    }
}

impl SurfaceManager {
    pub fn new(factory: Arc<dyn SurfaceFactory>) -> Self {
        Self {
            factory,
            fast: Mutex::new(None),
        }
    }

    /// Exclusive lease on the fast surface, (re)created when missing or destroyed
    pub async fn fast_surface(&self) -> Result<FastLease<'_>, SurfaceError> {
        let mut guard = self.fast.lock().await;
        let alive = guard.as_ref().is_some_and(|s| !s.is_destroyed());
        if !alive {
            let surface = self.factory.create(false).await.map_err(SurfaceError::Create)?;
            debug!(surface = %surface.id(), "Fast surface created");
            *guard = Some(surface);
        }
        Ok(FastLease { guard })
    }

    /// One-shot surface; the caller closes it
    pub async fn transient_surface(
        &self,
        visible: bool,
    ) -> Result<Box<dyn RenderSurface>, SurfaceError> {
        self.factory.create(visible).await.map_err(SurfaceError::Create)
    }

    /// Close the fast surface (shutdown)
    pub async fn close(&self) {
        if let Some(mut surface) = self.fast.lock().await.take() {
            surface.close().await;
        }
    }
}

/// Scoped access to the fast surface
pub struct FastLease<'a> {
    guard: MutexGuard<'a, Slot>,
}

impl FastLease<'_> {
    /// Stage `markup` and wait until it is ready to print
    ///
    /// The first document on a surface is a full load, later ones replace the
    /// document in place. A failing surface is discarded so the next lease
    /// starts from a fresh one.
    pub async fn stage(
        &mut self,
        title: &str,
        markup: &str,
        timeout: Duration,
    ) -> Result<StagedDocument, SurfaceError> {
        let Some(surface) = self.guard.as_mut() else {
            return Err(SurfaceError::Create(PrintError::SurfaceDestroyed(
                "fast".to_string(),
            )));
        };

        let result = stage_on(surface.as_mut(), title, markup, timeout).await;
        if result.is_err()
            && let Some(mut broken) = self.guard.take()
        {
            warn!(surface = %broken.id(), "Discarding fast surface after failure");
            broken.close().await;
        }
        result
    }
}

/// Load (or replace) and wait for readiness on any surface
pub async fn stage_on(
    surface: &mut dyn RenderSurface,
    title: &str,
    markup: &str,
    timeout: Duration,
) -> Result<StagedDocument, SurfaceError> {
    let loaded = if surface.staged().is_some() {
        surface.replace_document(title, markup).await
    } else {
        surface.load(title, markup).await
    };
    loaded.map_err(SurfaceError::Load)?;

    surface.when_ready(timeout).await.map_err(SurfaceError::NotReady)?;

    surface
        .staged()
        .cloned()
        .ok_or(SurfaceError::NotReady(PrintError::NotLoaded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use passcard_printer::StagedSurfaceFactory;

    #[tokio::test]
    async fn test_fast_surface_reused() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SurfaceManager::new(Arc::new(StagedSurfaceFactory::new(dir.path())));

        let first = {
            let mut lease = manager.fast_surface().await.unwrap();
            lease.stage("A", "<p>a</p>", FAST_READY_TIMEOUT).await.unwrap()
        };
        let second = {
            let mut lease = manager.fast_surface().await.unwrap();
            lease.stage("B", "<p>bb</p>", FAST_READY_TIMEOUT).await.unwrap()
        };

        assert_eq!(first.path, second.path);
        assert_eq!(second.title, "B");
        assert_eq!(std::fs::read_to_string(&second.path).unwrap(), "<p>bb</p>");
    }

    #[tokio::test]
    async fn test_fast_surface_recreated_after_close() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SurfaceManager::new(Arc::new(StagedSurfaceFactory::new(dir.path())));

        let first = {
            let mut lease = manager.fast_surface().await.unwrap();
            lease.stage("A", "<p>a</p>", FAST_READY_TIMEOUT).await.unwrap()
        };
        manager.close().await;
        let second = {
            let mut lease = manager.fast_surface().await.unwrap();
            lease.stage("B", "<p>b</p>", FAST_READY_TIMEOUT).await.unwrap()
        };
        assert_ne!(first.path, second.path);
    }

    #[tokio::test]
    async fn test_lease_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let manager = Arc::new(SurfaceManager::new(Arc::new(StagedSurfaceFactory::new(
            dir.path(),
        ))));

        let lease = manager.fast_surface().await.unwrap();
        let other = manager.clone();
        let waiter = tokio::spawn(async move {
            let _lease = other.fast_surface().await.unwrap();
        });
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!waiter.is_finished());

        drop(lease);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_transient_surface_visible() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SurfaceManager::new(Arc::new(StagedSurfaceFactory::new(dir.path())));
        let mut surface = manager.transient_surface(true).await.unwrap();
        let doc = stage_on(surface.as_mut(), "P", "<p>p</p>", PREVIEW_READY_TIMEOUT)
            .await
            .unwrap();
        surface.close().await;
        assert!(surface.is_visible());
        assert!(doc.path.exists());
    }
}
