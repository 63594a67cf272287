//! Batch orchestration against fake print facilities and surfaces

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use passcard_printer::{
    MarginType, PrintError, PrintFacility, PrintResult, PrintSettings, RenderSurface,
    StagedDocument, StagedSurfaceFactory, SurfaceFactory,
};
use passcard_server::printing::{
    BatchOrchestrator, Commit, CommitNotifier, DocumentError, DocumentSource, EventBus,
    PrintDispatcher, SurfaceManager,
};
use passcard_server::runtime_config::{ConfigStore, PrintOptions};
use shared::{JobErrorCode, PrintEvent, PrintJob, PrintMode};
use tempfile::TempDir;

/// Records every print call; rejects the first `reject` calls
struct FakeFacility {
    printers: Vec<String>,
    reject: Mutex<usize>,
    calls: Mutex<Vec<(String, PrintSettings)>>,
}

impl FakeFacility {
    fn new(printers: &[&str]) -> Self {
        Self {
            printers: printers.iter().map(|p| p.to_string()).collect(),
            reject: Mutex::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn rejecting(self, n: usize) -> Self {
        *self.reject.lock() = n;
        self
    }

    fn calls(&self) -> Vec<(String, PrintSettings)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl PrintFacility for FakeFacility {
    async fn list_printers(&self) -> PrintResult<Vec<String>> {
        Ok(self.printers.clone())
    }

    async fn print(&self, document: &StagedDocument, settings: &PrintSettings) -> PrintResult<()> {
        self.calls
            .lock()
            .push((document.title.clone(), settings.clone()));
        let mut reject = self.reject.lock();
        if *reject > 0 {
            *reject -= 1;
            return Err(PrintError::Rejected("paper out".into()));
        }
        Ok(())
    }
}

#[derive(Default)]
struct RecordingNotifier {
    commits: Mutex<Vec<Commit>>,
}

impl RecordingNotifier {
    fn commits(&self) -> Vec<Commit> {
        self.commits.lock().clone()
    }
}

#[async_trait]
impl CommitNotifier for RecordingNotifier {
    async fn notify(&self, commit: Commit) {
        self.commits.lock().push(commit);
    }
}

/// Surface whose document never becomes ready
struct StuckSurface {
    id: String,
    closed: bool,
}

#[async_trait]
impl RenderSurface for StuckSurface {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_visible(&self) -> bool {
        false
    }

    fn is_destroyed(&self) -> bool {
        self.closed
    }

    async fn load(&mut self, _title: &str, _markup: &str) -> PrintResult<()> {
        Ok(())
    }

    async fn replace_document(&mut self, _title: &str, _markup: &str) -> PrintResult<()> {
        Ok(())
    }

    async fn when_ready(&self, _timeout: Duration) -> PrintResult<()> {
        Err(PrintError::Timeout("document never settled".into()))
    }

    fn staged(&self) -> Option<&StagedDocument> {
        None
    }

    async fn close(&mut self) {
        self.closed = true;
    }
}

struct StuckFactory;

#[async_trait]
impl SurfaceFactory for StuckFactory {
    async fn create(&self, _visible: bool) -> PrintResult<Box<dyn RenderSurface>> {
        Ok(Box::new(StuckSurface {
            id: "stuck".into(),
            closed: false,
        }))
    }
}

struct Harness {
    _dir: TempDir,
    facility: Arc<FakeFacility>,
    notifier: Arc<RecordingNotifier>,
    orchestrator: Arc<BatchOrchestrator>,
}

async fn harness(facility: FakeFacility, config_xml: Option<&str>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let factory = Arc::new(StagedSurfaceFactory::new(dir.path().join("staging")));
    harness_with(dir, facility, config_xml, factory).await
}

async fn harness_with(
    dir: TempDir,
    facility: FakeFacility,
    config_xml: Option<&str>,
    factory: Arc<dyn SurfaceFactory>,
) -> Harness {
    let config_path: PathBuf = dir.path().join("passcard-config.xml");
    if let Some(xml) = config_xml {
        std::fs::write(&config_path, xml).unwrap();
    }
    let store = Arc::new(ConfigStore::new(vec![config_path]));
    store.load().await;

    let facility = Arc::new(facility);
    let notifier = Arc::new(RecordingNotifier::default());
    let orchestrator = BatchOrchestrator::new(
        store,
        Arc::new(SurfaceManager::new(factory)),
        PrintDispatcher::new(facility.clone()),
        notifier.clone(),
        EventBus::new(),
    )
    .with_inter_job_delay(Duration::ZERO);

    Harness {
        _dir: dir,
        facility,
        notifier,
        orchestrator: Arc::new(orchestrator),
    }
}

fn jobs(n: usize) -> Vec<PrintJob> {
    (1..=n)
        .map(|i| PrintJob {
            order_number: "4711".into(),
            pcard_seq: i.to_string(),
            bar_key: "B1".into(),
            ..Default::default()
        })
        .collect()
}

fn device(name: &str) -> PrintOptions {
    PrintOptions {
        device_name: Some(name.into()),
        ..Default::default()
    }
}

fn result_commits(commits: &[Commit]) -> Vec<(bool, Option<String>, u32)> {
    commits
        .iter()
        .filter_map(|c| match c {
            Commit::Result {
                ok,
                error_code,
                cnt_inc,
                ..
            } => Some((*ok, error_code.clone(), *cnt_inc)),
            Commit::Start { .. } => None,
        })
        .collect()
}

#[tokio::test]
async fn unknown_device_fails_whole_batch_without_printing() {
    let h = harness(FakeFacility::new(&["Label-1"]), None).await;

    let summary = h.orchestrator.run(jobs(3), device("Ghost"), None).await;

    assert_eq!(summary.fail_count, 3);
    assert_eq!(summary.ok_count, 0);
    assert!(
        summary
            .results
            .iter()
            .all(|r| r.error == Some(JobErrorCode::PrinterNotFound))
    );
    assert!(h.facility.calls().is_empty());

    let commits = h.notifier.commits();
    assert_eq!(commits.len(), 3);
    assert!(
        result_commits(&commits)
            .iter()
            .all(|(ok, code, inc)| !ok && code.as_deref() == Some("PRINTER_NOT_FOUND") && *inc == 0)
    );
}

#[tokio::test]
async fn fast_batch_emits_results_in_order_then_done() {
    let h = harness(FakeFacility::new(&["Label-1", "LABEL-2"]), None).await;
    let mut events = h.orchestrator.events().subscribe();

    let summary = h
        .orchestrator
        .run(jobs(3), device("label-2"), Some("b-42".into()))
        .await;

    assert_eq!(summary.batch_id, "b-42");
    assert_eq!(summary.ok_count + summary.fail_count, 3);
    assert_eq!(summary.ok_count, 3);

    for expected in 0..3 {
        match events.recv().await.unwrap() {
            PrintEvent::JobResult { batch_id, result } => {
                assert_eq!(batch_id, "b-42");
                assert_eq!(result.index, expected);
                assert!(result.ok);
                assert_eq!(result.preview, None);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
    assert!(matches!(events.recv().await.unwrap(), PrintEvent::BatchDone(s) if s.total == 3));

    let calls = h.facility.calls();
    assert_eq!(calls.len(), 3);
    for (i, (title, settings)) in calls.iter().enumerate() {
        assert!(title.starts_with(&format!("PASSCARD 4711-{}-B1-", i + 1)));
        assert_eq!(settings.device_name.as_deref(), Some("LABEL-2"));
        assert!(settings.silent);
        assert_eq!(settings.margins, MarginType::CustomZero);
        assert_eq!(settings.page_size.width_microns, 79_000);
    }

    let commits = h.notifier.commits();
    assert_eq!(commits.len(), 6);
    assert!(matches!(&commits[0], Commit::Start { state, .. } if state == "PRINTING"));
    assert!(
        result_commits(&commits)
            .iter()
            .all(|(ok, _, inc)| *ok && *inc == 1)
    );
}

#[tokio::test]
async fn fast_batch_falls_back_to_host_default() {
    // Full and NoMargins rejected, NoDevice accepted
    let h = harness(FakeFacility::new(&["Label-1"]).rejecting(2), None).await;

    let summary = h.orchestrator.run(jobs(1), device("Label-1"), None).await;

    assert_eq!(summary.ok_count, 1);
    let calls = h.facility.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[1].1.margins, MarginType::None);
    assert_eq!(calls[2].1.device_name, None);
}

#[tokio::test]
async fn exhausted_tiers_fail_only_that_job() {
    // No device requested: two tiers, both rejected for the first job
    let h = harness(FakeFacility::new(&[]).rejecting(2), None).await;

    let summary = h
        .orchestrator
        .run(jobs(2), PrintOptions::default(), None)
        .await;

    assert_eq!(summary.fail_count, 1);
    assert_eq!(summary.ok_count, 1);
    assert_eq!(summary.results[0].error, Some(JobErrorCode::PrintError));
    assert!(summary.results[1].ok);
    assert_eq!(h.facility.calls().len(), 3);
}

#[tokio::test]
async fn stuck_surface_reports_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness_with(dir, FakeFacility::new(&[]), None, Arc::new(StuckFactory)).await;

    let summary = h
        .orchestrator
        .run(jobs(2), PrintOptions::default(), None)
        .await;

    assert_eq!(summary.fail_count, 2);
    assert!(
        summary
            .results
            .iter()
            .all(|r| r.error == Some(JobErrorCode::LoadOrPrintError))
    );
    assert!(h.facility.calls().is_empty());
}

#[tokio::test]
async fn preview_counts_as_pending() {
    let h = harness(FakeFacility::new(&["Label-1"]), None).await;

    let options = PrintOptions {
        preview: Some(true),
        ..Default::default()
    };
    let summary = h.orchestrator.run(jobs(3), options, None).await;

    assert_eq!(summary.pend_count, 3);
    assert_eq!(summary.ok_count, 0);
    assert!(summary.results.iter().all(|r| r.preview == Some(true)));

    // One multi-page document, shown with the dialog
    let calls = h.facility.calls();
    assert_eq!(calls.len(), 1);
    assert!(!calls[0].1.silent);
    assert!(calls[0].0.starts_with("PASSCARD PREVIEW"));

    let commits = h.notifier.commits();
    assert!(
        commits
            .iter()
            .filter(|c| matches!(c, Commit::Start { .. }))
            .all(|c| matches!(c, Commit::Start { state, .. } if state == "PREVIEW"))
    );
    assert!(result_commits(&commits).iter().all(|(ok, _, inc)| *ok && *inc == 0));
}

#[tokio::test]
async fn preview_counts_as_print_when_configured() {
    let h = harness(
        FakeFacility::new(&[]),
        Some("<cfg><PREVIEW>1</PREVIEW><PREVIEW_COUNT_AS_PRINT>yes</PREVIEW_COUNT_AS_PRINT></cfg>"),
    )
    .await;

    let summary = h
        .orchestrator
        .run(jobs(2), PrintOptions::default(), None)
        .await;

    assert_eq!(summary.pend_count, 2);
    let commits = h.notifier.commits();
    assert!(result_commits(&commits).iter().all(|(_, _, inc)| *inc == 1));
}

#[tokio::test]
async fn spawn_batch_acknowledges_before_completion() {
    let h = harness(FakeFacility::new(&[]), None).await;
    let mut events = h.orchestrator.events().subscribe();

    let accepted = h
        .orchestrator
        .spawn_batch(jobs(2), PrintOptions::default(), Some("bg".into()));

    assert!(accepted.ok);
    assert_eq!(accepted.accepted, 2);
    assert_eq!(accepted.mode, PrintMode::Fast);
    assert_eq!(accepted.batch_id.as_deref(), Some("bg"));

    let done = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            if let PrintEvent::BatchDone(summary) = events.recv().await.unwrap() {
                return summary;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(done.batch_id, "bg");
    assert_eq!(done.ok_count, 2);
}

#[tokio::test]
async fn document_print_rejects_unknown_device() {
    let h = harness(FakeFacility::new(&["Label-1"]), None).await;

    let err = h
        .orchestrator
        .print_document(DocumentSource::Html("<p>x</p>".into()), device("Nope"))
        .await
        .unwrap_err();

    assert!(matches!(err, DocumentError::PrinterNotFound(d) if d == "Nope"));
    assert!(h.facility.calls().is_empty());
}

#[tokio::test]
async fn document_print_uses_fast_surface() {
    let h = harness(FakeFacility::new(&["Label-1"]), None).await;

    h.orchestrator
        .print_document(DocumentSource::Html("<p>x</p>".into()), device("label-1"))
        .await
        .unwrap();

    let calls = h.facility.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].0.starts_with("PASSCARD DOCUMENT"));
    assert_eq!(calls[0].1.device_name.as_deref(), Some("Label-1"));
}
