//! External commit notifier
//!
//! Best-effort calls to the backend tracking service. A failed call is
//! logged and forgotten: no retry, no error returned to the batch.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use shared::{JobKey, PrintJob};
use tracing::{debug, warn};

use crate::runtime_config::ConfigStore;

pub const NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

pub const START_PATH: &str = "/passcard/print-start";
pub const RESULT_PATH: &str = "/passcard/print-result";

/// State reported with a start commit unless the caller names one
pub const DEFAULT_START_STATE: &str = "PRINTING";

/// One tracking call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Commit {
    #[serde(rename_all = "camelCase")]
    Start {
        key: JobKey,
        device_name: Option<String>,
        state: String,
    },
    #[serde(rename_all = "camelCase")]
    Result {
        key: JobKey,
        ok: bool,
        error_code: Option<String>,
        error_message: Option<String>,
        /// Print counter increment (0 or 1)
        cnt_inc: u32,
        preview: bool,
    },
}

/// How a result counts toward the print counter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResultOptions {
    pub preview: bool,
    /// Whether a preview counts as a print
    pub preview_count_as_print: bool,
}

impl Commit {
    pub fn start(job: &PrintJob, device: Option<&str>, state: Option<&str>) -> Self {
        Self::Start {
            key: JobKey::of(job),
            device_name: device.map(str::to_string),
            state: state.unwrap_or(DEFAULT_START_STATE).to_string(),
        }
    }

    pub fn result(
        job: &PrintJob,
        ok: bool,
        code: Option<&str>,
        message: Option<&str>,
        opts: ResultOptions,
    ) -> Self {
        let cnt_inc = match (ok, opts.preview) {
            (false, _) => 0,
            (true, false) => 1,
            (true, true) => u32::from(opts.preview_count_as_print),
        };
        Self::Result {
            key: JobKey::of(job),
            ok,
            error_code: code.map(str::to_string),
            error_message: message.map(str::to_string),
            cnt_inc,
            preview: opts.preview,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Self::Start { .. } => START_PATH,
            Self::Result { .. } => RESULT_PATH,
        }
    }

    pub fn key(&self) -> &JobKey {
        match self {
            Self::Start { key, .. } | Self::Result { key, .. } => key,
        }
    }

    /// Request body (the variant fields, without the variant name)
    pub fn body(&self) -> serde_json::Value {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(mut map)) => map
                .remove(match self {
                    Self::Start { .. } => "start",
                    Self::Result { .. } => "result",
                })
                .unwrap_or_default(),
            _ => serde_json::Value::Null,
        }
    }
}

#[async_trait]
pub trait CommitNotifier: Send + Sync {
    async fn notify(&self, commit: Commit);
}

/// Notifier used when tracking is disabled
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl CommitNotifier for NoopNotifier {
    async fn notify(&self, commit: Commit) {
        debug!(path = commit.path(), "Commit notification disabled");
    }
}

type BaseSource = Arc<dyn Fn() -> String + Send + Sync>;

/// POSTs commits as JSON to `{apiBase}{path}`
#[derive(Clone)]
pub struct HttpCommitNotifier {
    client: reqwest::Client,
    base: BaseSource,
}

impl std::fmt::Debug for HttpCommitNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCommitNotifier")
            .field("base", &(self.base)())
            .finish()
    }
}

impl HttpCommitNotifier {
    /// `base` is read on every call so config reloads take effect
    pub fn new(base: impl Fn() -> String + Send + Sync + 'static) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(NOTIFY_TIMEOUT).build()?;
        Ok(Self {
            client,
            base: Arc::new(base),
        })
    }

    /// Follow the API base resolved by the config store
    pub fn for_store(store: Arc<ConfigStore>) -> reqwest::Result<Self> {
        Self::new(move || store.api_base())
    }
}

#[async_trait]
impl CommitNotifier for HttpCommitNotifier {
    async fn notify(&self, commit: Commit) {
        let url = format!("{}{}", (self.base)().trim_end_matches('/'), commit.path());
        let key = commit.key();

        match self.client.post(&url).json(&commit.body()).send().await {
            Ok(resp) if resp.status().is_success() => {
                debug!(url = %url, order = %key.order_number, seq = %key.pcard_seq, "Commit sent");
            }
            Ok(resp) => {
                warn!(url = %url, status = %resp.status(), order = %key.order_number, "Commit rejected");
            }
            Err(e) => {
                warn!(url = %url, error = %e, order = %key.order_number, "Commit failed");
            }
        }
    }
}
