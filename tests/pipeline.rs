//! End-to-end pipeline scenarios against a stub renderer and a temp
//! directory store: staleness resolution, extraction, bounded-concurrency
//! rendering and local reconciliation wired together the way a run does it.

use async_trait::async_trait;
use msgshot::internal::models::JobMap;
use msgshot::internal::reconcile::{ArtifactStore, LocalStore};
use msgshot::internal::scheduler::render_all;
use msgshot::internal::snapshot::extract_jobs;
use msgshot::internal::stale::filter_local;
use msgshot::render::{RenderError, RenderPage, Renderer};
use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const WARNING_SNAP: &str = "// Jest Snapshot v1, https://goo.gl/fbAQLP\n\nexports[`renders correctly`] = `\nObject {\"text\": \"hi\"}\n`;\n";

/// Renderer stub that returns the wire text as image bytes and tracks how
/// many captures are in flight at once.
struct StubRenderer {
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl StubRenderer {
    fn new() -> Self {
        Self {
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Renderer for StubRenderer {
    async fn open_page(&self) -> Result<Box<dyn RenderPage>, RenderError> {
        Ok(Box::new(StubPage {
            in_flight: Arc::clone(&self.in_flight),
            peak: Arc::clone(&self.peak),
        }))
    }

    async fn shutdown(&self) -> Result<(), RenderError> {
        Ok(())
    }
}

struct StubPage {
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

#[async_trait]
impl RenderPage for StubPage {
    async fn capture(&mut self, wire: &str) -> Result<Vec<u8>, RenderError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(15)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(wire.as_bytes().to_vec())
    }

    async fn close(self: Box<Self>) {}
}

fn extract_all(stale: &[msgshot::internal::stale::StaleFile], out_root: &str) -> JobMap {
    let mut jobs = JobMap::new();
    for file in stale {
        let text = fs::read_to_string(&file.path).unwrap();
        let (file_jobs, errors) = extract_jobs(&text, &file.path, &file.snapshot, out_root);
        assert!(errors.is_empty(), "unexpected extract errors: {errors:?}");
        jobs.extend(file_jobs);
    }
    jobs
}

#[tokio::test]
async fn test_renders_one_snapshot_end_to_end() {
    let workspace = tempfile::tempdir().unwrap();
    let in_root = workspace.path().join("snaps");
    let out_root = workspace.path().join("shots");
    let snap_dir = in_root.join("alerts/__snapshots__");
    fs::create_dir_all(&snap_dir).unwrap();
    fs::write(snap_dir.join("warning.test.js.snap"), WARNING_SNAP).unwrap();

    let in_root = in_root.display().to_string();
    let out_root = out_root.display().to_string();

    let candidates =
        vec![format!("{in_root}/alerts/__snapshots__/warning.test.js.snap")];
    let stale = filter_local(&candidates, &HashSet::new(), true, &in_root, &[]);
    assert_eq!(stale.len(), 1);

    let jobs = extract_all(&stale, &out_root);
    let expected_path = format!("{out_root}/alerts/warning/renders correctly.png");
    assert_eq!(jobs.len(), 1);
    assert_eq!(
        jobs[&expected_path].as_value(),
        &serde_json::json!({"attachments": [{"text": "hi"}]})
    );

    let renderer = StubRenderer::new();
    let outcomes = render_all(&renderer, jobs, 2).await;
    assert_eq!(outcomes.len(), 1);

    for outcome in outcomes {
        LocalStore
            .store(&outcome.path, &outcome.result.unwrap())
            .await
            .unwrap();
    }

    let written = fs::read_to_string(&expected_path).unwrap();
    assert_eq!(written, r#"{"attachments":[{"text":"hi"}]}"#);
}

#[tokio::test]
async fn test_excluded_test_yields_no_jobs() {
    let workspace = tempfile::tempdir().unwrap();
    let in_root = workspace.path().join("snaps");
    let snap_dir = in_root.join("alerts/__snapshots__");
    fs::create_dir_all(&snap_dir).unwrap();
    fs::write(snap_dir.join("warning.test.js.snap"), WARNING_SNAP).unwrap();

    let in_root = in_root.display().to_string();
    let candidates =
        vec![format!("{in_root}/alerts/__snapshots__/warning.test.js.snap")];
    let exclude = vec!["warning".to_string()];

    let stale = filter_local(&candidates, &HashSet::new(), true, &in_root, &exclude);
    assert!(stale.is_empty());
}

#[tokio::test]
async fn test_unmodified_snapshots_are_not_rendered() {
    let in_root = "snaps";
    let candidates = vec![
        "snaps/alerts/__snapshots__/warning.test.js.snap".to_string(),
        "snaps/alerts/__snapshots__/info.test.js.snap".to_string(),
    ];
    let modified: HashSet<String> =
        ["snaps/alerts/__snapshots__/info.test.js.snap".to_string()].into();

    let stale = filter_local(&candidates, &modified, false, in_root, &[]);
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].snapshot.test, "info");
}

#[tokio::test]
async fn test_limit_of_one_serializes_three_jobs() {
    let snap = "exports[`one`] = `{\"text\": \"1\"}`;\nexports[`two`] = `{\"text\": \"2\"}`;\nexports[`three`] = `{\"text\": \"3\"}`;\n";
    let snapshot =
        msgshot::internal::snapshot::SnapshotPath::parse("a/__snapshots__/t.test.js.snap").unwrap();
    let (jobs, errors) = extract_jobs(snap, "t", &snapshot, "out");
    assert!(errors.is_empty());
    assert_eq!(jobs.len(), 3);

    let renderer = StubRenderer::new();
    let peak = Arc::clone(&renderer.peak);
    let outcomes = render_all(&renderer, jobs, 1).await;

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes.iter().all(|o| o.result.is_ok()));
    assert_eq!(peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_rerunning_produces_identical_output_paths() {
    let snapshot = msgshot::internal::snapshot::SnapshotPath::parse(
        "alerts/__snapshots__/warning.test.js.snap",
    )
    .unwrap();

    let (first, _) = extract_jobs(WARNING_SNAP, "f", &snapshot, "out");
    let (second, _) = extract_jobs(WARNING_SNAP, "f", &snapshot, "out");

    let first_keys: Vec<&String> = first.keys().collect();
    let second_keys: Vec<&String> = second.keys().collect();
    assert_eq!(first_keys, second_keys);
}
