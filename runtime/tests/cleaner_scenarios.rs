//! End-to-end runs of the cleaner against in-memory collaborators.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use regsweep_core::error::{Result, SweepError};
use regsweep_core::image::{RawImageRecord, Repository};
use regsweep_core::SweepConfig;
use regsweep_runtime::{
    BatchDeleteResult, Cleaner, ClusterSnapshot, DeletionSink, InventorySource,
    NotificationSink, RepositorySnapshot, SnapshotInventory, SnapshotOrchestrator, TaskSnapshot,
    TaskStatus,
};

const WEB: &str = "123456789012.dkr.ecr.eu-west-2.amazonaws.com/web";
const API: &str = "123456789012.dkr.ecr.eu-west-2.amazonaws.com/api";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn image(digest: &str, tags: &[&str], days_old: i64) -> RawImageRecord {
    RawImageRecord {
        image_digest: Some(digest.to_string()),
        image_tag: None,
        image_tags: Some(tags.iter().map(|t| t.to_string()).collect()),
        image_pushed_at: Some(now() - Duration::days(days_old)),
    }
}

fn repo(name: &str, uri: &str, images: Vec<RawImageRecord>) -> RepositorySnapshot {
    RepositorySnapshot {
        repository: Repository::new(name, uri),
        images,
    }
}

fn running(images: &[&str]) -> TaskSnapshot {
    TaskSnapshot {
        task_id: "task".to_string(),
        desired_status: TaskStatus::Running,
        last_status: TaskStatus::Running,
        images: images.iter().map(|i| i.to_string()).collect(),
    }
}

fn stopped(images: &[&str]) -> TaskSnapshot {
    TaskSnapshot {
        desired_status: TaskStatus::Stopped,
        last_status: TaskStatus::Stopped,
        ..running(images)
    }
}

fn cluster(name: &str, tasks: Vec<TaskSnapshot>) -> SnapshotOrchestrator {
    SnapshotOrchestrator::new(vec![ClusterSnapshot {
        name: name.to_string(),
        tasks,
    }])
}

fn set(digests: &[&str]) -> BTreeSet<String> {
    digests.iter().map(|d| d.to_string()).collect()
}

/// Deletion sink that records every call.
#[derive(Clone, Default)]
struct RecordingSink {
    calls: Arc<Mutex<Vec<(String, Vec<String>)>>>,
}

impl RecordingSink {
    fn deleted(&self, repository: &str) -> BTreeSet<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _)| r == repository)
            .flat_map(|(_, digests)| digests.clone())
            .collect()
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl DeletionSink for RecordingSink {
    async fn delete_images(&self, repository: &str, digests: &[String]) -> Result<BatchDeleteResult> {
        self.calls
            .lock()
            .unwrap()
            .push((repository.to_string(), digests.to_vec()));
        Ok(BatchDeleteResult {
            deleted: digests.to_vec(),
            failures: vec![],
        })
    }
}

/// Notifier that records messages, or fails every send.
#[derive(Clone)]
struct RecordingNotifier {
    messages: Arc<Mutex<Vec<String>>>,
    max_len: usize,
    fail: bool,
}

impl RecordingNotifier {
    fn new(max_len: usize) -> Self {
        Self {
            messages: Arc::default(),
            max_len,
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(4000)
        }
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    fn max_message_length(&self) -> usize {
        self.max_len
    }

    async fn send_message(&self, text: &str) -> Result<()> {
        if self.fail {
            return Err(SweepError::Notification("invalid_auth".to_string()));
        }
        self.messages.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Inventory whose image listing fails for one repository.
struct FlakyInventory {
    inner: SnapshotInventory,
    broken: String,
}

#[async_trait]
impl InventorySource for FlakyInventory {
    async fn list_repositories(&self) -> Result<Vec<Repository>> {
        self.inner.list_repositories().await
    }

    async fn list_images(&self, repository: &str) -> Result<Vec<RawImageRecord>> {
        if repository == self.broken {
            return Err(SweepError::collection("inventory", "AccessDenied"));
        }
        self.inner.list_images(repository).await
    }
}

fn deleting_config(min_image_count: usize) -> SweepConfig {
    SweepConfig {
        min_image_count,
        max_age_days: 7,
        delete_enabled: true,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_mixed_repository_deletes_only_old_unused() {
    // Newest first, as the registry returns them.
    let inventory = SnapshotInventory::new(vec![repo(
        "web",
        WEB,
        vec![
            image("sha256:new1", &["v5"], 1),
            image("sha256:new2", &["v4"], 1),
            image("sha256:used", &["v3"], 10),
            image("sha256:old1", &["v2"], 10),
            image("sha256:old2", &["v1"], 10),
        ],
    )]);
    let orchestrator = cluster("prod", vec![running(&[&format!("{WEB}:v3")])]);
    let sink = RecordingSink::default();

    let report = Cleaner::new(deleting_config(3), Box::new(inventory), Box::new(orchestrator))
        .with_deletion_sink(Box::new(sink.clone()))
        .run(now())
        .await
        .unwrap();

    let web = report.plan.summary.get("web").unwrap();
    assert_eq!(web.delete, set(&["sha256:old1", "sha256:old2"]));
    assert_eq!(sink.deleted("web"), set(&["sha256:old1", "sha256:old2"]));
    assert_eq!(report.deleted_count(), 2);
    assert!(report.deletions.iter().all(|d| d.is_clean()));
}

#[tokio::test]
async fn test_digest_reference_keeps_image() {
    let inventory = SnapshotInventory::new(vec![repo(
        "web",
        WEB,
        vec![image("sha256:pinned", &["v1"], 60), image("sha256:stale", &[], 60)],
    )]);
    let orchestrator = cluster("prod", vec![running(&[&format!("{WEB}@sha256:pinned")])]);

    let plan = Cleaner::new(deleting_config(0), Box::new(inventory), Box::new(orchestrator))
        .plan(now())
        .await
        .unwrap();

    assert_eq!(plan.summary.get("web").unwrap().delete, set(&["sha256:stale"]));
}

#[tokio::test]
async fn test_zero_floor_deletes_everything_old_and_unused() {
    let inventory = SnapshotInventory::new(vec![repo(
        "web",
        WEB,
        vec![
            image("sha256:a", &["v1"], 30),
            image("sha256:b", &[], 30),
            image("sha256:c", &["v3"], 30),
        ],
    )]);
    let orchestrator = cluster("prod", vec![]);

    let plan = Cleaner::new(deleting_config(0), Box::new(inventory), Box::new(orchestrator))
        .plan(now())
        .await
        .unwrap();

    assert_eq!(
        plan.summary.get("web").unwrap().delete,
        set(&["sha256:a", "sha256:b", "sha256:c"])
    );
}

#[tokio::test]
async fn test_small_repository_is_untouched() {
    let inventory = SnapshotInventory::new(vec![repo(
        "web",
        WEB,
        vec![image("sha256:a", &[], 300), image("sha256:b", &[], 300)],
    )]);
    let sink = RecordingSink::default();

    let report = Cleaner::new(
        deleting_config(3),
        Box::new(inventory),
        Box::new(cluster("prod", vec![])),
    )
    .with_deletion_sink(Box::new(sink.clone()))
    .run(now())
    .await
    .unwrap();

    assert!(report.plan.summary.is_empty());
    assert_eq!(sink.call_count(), 0);
}

#[tokio::test]
async fn test_stopped_task_does_not_pin_image() {
    let inventory = SnapshotInventory::new(vec![repo(
        "web",
        WEB,
        vec![image("sha256:old", &["v1"], 30)],
    )]);
    let orchestrator = cluster("prod", vec![stopped(&[&format!("{WEB}:v1")])]);

    let plan = Cleaner::new(deleting_config(0), Box::new(inventory), Box::new(orchestrator))
        .plan(now())
        .await
        .unwrap();

    assert_eq!(plan.summary.get("web").unwrap().delete, set(&["sha256:old"]));
}

#[tokio::test]
async fn test_dry_run_exports_but_never_deletes() {
    let dir = tempfile::tempdir().unwrap();
    let export_path = dir.path().join("to_delete.csv");

    let inventory = SnapshotInventory::new(vec![repo(
        "web",
        WEB,
        vec![image("sha256:old", &[], 30)],
    )]);
    let sink = RecordingSink::default();
    let config = SweepConfig {
        min_image_count: 0,
        export_path: Some(export_path.clone()),
        ..Default::default()
    };

    let report = Cleaner::new(config, Box::new(inventory), Box::new(cluster("prod", vec![])))
        .with_deletion_sink(Box::new(sink.clone()))
        .run(now())
        .await
        .unwrap();

    assert_eq!(sink.call_count(), 0);
    assert!(report.deletions.is_empty());
    assert_eq!(report.exported, Some(1));
    assert_eq!(
        std::fs::read_to_string(&export_path).unwrap(),
        "ImagesToDelete\nweb:sha256:old\n"
    );
}

#[tokio::test]
async fn test_notification_failure_does_not_block_deletion() {
    let inventory = SnapshotInventory::new(vec![repo(
        "web",
        WEB,
        vec![image("sha256:old", &[], 30)],
    )]);
    let sink = RecordingSink::default();
    let config = SweepConfig {
        notify_enabled: true,
        ..deleting_config(0)
    };

    let report = Cleaner::new(config, Box::new(inventory), Box::new(cluster("prod", vec![])))
        .with_deletion_sink(Box::new(sink.clone()))
        .with_notifier(Box::new(RecordingNotifier::failing()))
        .run(now())
        .await
        .unwrap();

    assert!(!report.notified);
    assert_eq!(sink.deleted("web"), set(&["sha256:old"]));
}

#[tokio::test]
async fn test_report_is_split_to_notifier_limit() {
    let inventory = SnapshotInventory::new(vec![
        repo("api", API, vec![image("sha256:a1", &[], 30), image("sha256:a2", &[], 30)]),
        repo("web", WEB, vec![image("sha256:w1", &[], 30)]),
    ]);
    let notifier = RecordingNotifier::new(10);
    let config = SweepConfig {
        min_image_count: 0,
        notify_enabled: true,
        ..Default::default()
    };

    let report = Cleaner::new(config, Box::new(inventory), Box::new(cluster("prod", vec![])))
        .with_notifier(Box::new(notifier.clone()))
        .run(now())
        .await
        .unwrap();

    let messages = notifier.messages.lock().unwrap();
    let expected = "*Total*: 3\n - api: 2\n - web: 1\n";
    assert!(report.notified);
    assert_eq!(messages.len(), (expected.len() + 9) / 10);
    assert!(messages.iter().all(|m| m.chars().count() <= 10));
    assert_eq!(messages.concat(), expected);
}

#[tokio::test]
async fn test_unlistable_repository_is_skipped() {
    let inventory = FlakyInventory {
        inner: SnapshotInventory::new(vec![
            repo("api", API, vec![image("sha256:a", &[], 30)]),
            repo("web", WEB, vec![image("sha256:w", &[], 30)]),
        ]),
        broken: "api".to_string(),
    };

    let plan = Cleaner::new(deleting_config(0), Box::new(inventory), Box::new(cluster("prod", vec![])))
        .plan(now())
        .await
        .unwrap();

    assert_eq!(plan.skipped_repositories, vec!["api"]);
    assert!(plan.summary.get("api").is_none());
    assert_eq!(plan.summary.get("web").unwrap().delete, set(&["sha256:w"]));
}

#[tokio::test]
async fn test_malformed_record_is_dropped() {
    let inventory = SnapshotInventory::new(vec![repo(
        "web",
        WEB,
        vec![
            RawImageRecord {
                image_digest: None,
                image_tag: Some("orphan".to_string()),
                ..Default::default()
            },
            image("sha256:old", &[], 30),
        ],
    )]);

    let plan = Cleaner::new(deleting_config(0), Box::new(inventory), Box::new(cluster("prod", vec![])))
        .plan(now())
        .await
        .unwrap();

    assert_eq!(plan.dropped_records, 1);
    assert_eq!(plan.summary.get("web").unwrap().delete, set(&["sha256:old"]));
}

#[tokio::test]
async fn test_large_delete_set_is_chunked() {
    let images = (0..250)
        .map(|i| image(&format!("sha256:{i:04}"), &[], 30))
        .collect();
    let inventory = SnapshotInventory::new(vec![repo("web", WEB, images)]);
    let sink = RecordingSink::default();

    let report = Cleaner::new(deleting_config(0), Box::new(inventory), Box::new(cluster("prod", vec![])))
        .with_deletion_sink(Box::new(sink.clone()))
        .run(now())
        .await
        .unwrap();

    assert_eq!(sink.call_count(), 3);
    assert_eq!(report.deletions[0].batches, 3);
    assert_eq!(sink.deleted("web").len(), 250);
}

#[tokio::test]
async fn test_invariants_hold_across_repositories() {
    let inventory = SnapshotInventory::new(vec![
        repo(
            "api",
            API,
            vec![
                image("sha256:a0", &["main"], 2),
                image("sha256:a1", &["v9"], 40),
                image("sha256:a2", &["v8"], 40),
                image("sha256:a3", &["v7"], 40),
                image("sha256:a4", &[], 40),
            ],
        ),
        repo(
            "web",
            WEB,
            vec![
                image("sha256:w0", &["v2"], 3),
                image("sha256:w1", &["v1"], 20),
                image("sha256:w2", &[], 20),
                image("sha256:w3", &[], 20),
            ],
        ),
    ]);
    let active = [format!("{API}:v7"), format!("{WEB}@sha256:w3")];
    let orchestrator = cluster(
        "prod",
        vec![running(&active.iter().map(String::as_str).collect::<Vec<_>>())],
    );

    let plan = Cleaner::new(deleting_config(2), Box::new(inventory), Box::new(orchestrator))
        .plan(now())
        .await
        .unwrap();

    assert_eq!(
        plan.summary.get("api").unwrap().delete,
        set(&["sha256:a2", "sha256:a4"])
    );
    assert_eq!(plan.summary.get("web").unwrap().delete, set(&["sha256:w2"]));
    assert_eq!(plan.summary.total_delete_count(), 3);
}
