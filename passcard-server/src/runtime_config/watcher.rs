//! Config file watcher
//!
//! Polls the modification time and length of every candidate that existed
//! at startup. Any change (including deletion) triggers a full `load()`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::store::ConfigStore;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
}

async fn fingerprint(path: &Path) -> Option<Fingerprint> {
    let meta = tokio::fs::metadata(path).await.ok()?;
    Some(Fingerprint {
        modified: meta.modified().ok(),
        len: meta.len(),
    })
}

async fn fingerprints(paths: &[PathBuf]) -> Vec<Option<Fingerprint>> {
    let mut out = Vec::with_capacity(paths.len());
    for path in paths {
        out.push(fingerprint(path).await);
    }
    out
}

/// Spawn the polling task; it stops when `shutdown` is cancelled
pub fn spawn_watcher(
    store: Arc<ConfigStore>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let watched = store.existing_candidates().await;
        if watched.is_empty() {
            info!("No config file present at startup, watcher idle");
            return;
        }
        info!(files = ?watched, interval_ms = interval.as_millis() as u64, "Config watcher started");

        let mut last = fingerprints(&watched).await;
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Config watcher stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let current = fingerprints(&watched).await;
                    if current != last {
                        info!("Config file changed, reloading");
                        store.load().await;
                        last = current;
                    }
                }
            }
        }
    })
}
