//! ジョブライフサイクル統合テスト。
//!
//! スクリプト済みフェイクバックエンドで AppService を端から端まで駆動する:
//! アップロード → ポーリング → 完了通知 → ダウンロード。
//! 時間は tokio の仮想クロック（start_paused）で進める。

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use gp_core::domain::banner::Banner;
use gp_core::domain::job::{JobRecord, JobStatus};
use gp_core::domain::settings::ClientSettings;
use gp_core::infra::backend::{BackendApi, BackendError, UploadAck};
use gp_core::usecase::app_service::AppService;
use gp_core::usecase::monitor::{MonitorEvent, SUCCESS_NOTICE};

fn record(id: &str, filename: &str, status: JobStatus) -> JobRecord {
    JobRecord {
        id: id.to_string(),
        status,
        original_filename: filename.to_string(),
        uploaded_at: "2026-08-01T10:30:00Z".to_string(),
        error: None,
        started_at: None,
        completed_at: None,
    }
}

/// 完全なバックエンドフェイク。
/// アップロードごとに払い出す id の列と、id ごとのステータス応答列を持つ。
/// ステータス列の最後の要素は繰り返し返される。
#[derive(Default)]
struct FlowBackend {
    assigned_ids: Mutex<VecDeque<String>>,
    statuses: Mutex<HashMap<String, VecDeque<JobRecord>>>,
    payloads: Mutex<HashMap<String, Vec<u8>>>,
    known_jobs: Mutex<Vec<JobRecord>>,
    process_calls: AtomicUsize,
    fetch_log: Mutex<Vec<String>>,
}

impl FlowBackend {
    fn assign_id(&self, id: &str) {
        self.assigned_ids
            .lock()
            .unwrap()
            .push_back(id.to_string());
    }

    fn script_statuses(&self, id: &str, steps: Vec<JobRecord>) {
        self.statuses
            .lock()
            .unwrap()
            .insert(id.to_string(), steps.into());
    }

    fn set_payload(&self, id: &str, bytes: &[u8]) {
        self.payloads
            .lock()
            .unwrap()
            .insert(id.to_string(), bytes.to_vec());
    }

    fn fetches_for(&self, id: &str) -> usize {
        self.fetch_log
            .lock()
            .unwrap()
            .iter()
            .filter(|f| *f == id)
            .count()
    }
}

#[async_trait]
impl BackendApi for FlowBackend {
    async fn list_jobs(&self) -> Result<Vec<JobRecord>, BackendError> {
        Ok(self.known_jobs.lock().unwrap().clone())
    }

    async fn upload(&self, file_name: &str, _bytes: Vec<u8>) -> Result<UploadAck, BackendError> {
        let id = self
            .assigned_ids
            .lock()
            .unwrap()
            .pop_front()
            .expect("no assigned id scripted");
        Ok(UploadAck {
            id,
            filename: file_name.to_string(),
        })
    }

    async fn start_processing(&self, _id: &str) -> Result<(), BackendError> {
        self.process_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn fetch_status(&self, id: &str) -> Result<JobRecord, BackendError> {
        self.fetch_log.lock().unwrap().push(id.to_string());
        let mut statuses = self.statuses.lock().unwrap();
        let queue = statuses
            .get_mut(id)
            .unwrap_or_else(|| panic!("no status script for {id}"));
        if queue.len() > 1 {
            Ok(queue.pop_front().unwrap())
        } else {
            Ok(queue.front().cloned().unwrap())
        }
    }

    async fn download(&self, id: &str) -> Result<Vec<u8>, BackendError> {
        self.payloads
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| BackendError::Request("no payload scripted".into()))
    }
}

struct Harness {
    backend: Arc<FlowBackend>,
    service: AppService,
    upload_dir: TempDir,
    download_dir: TempDir,
}

fn harness() -> Harness {
    let backend = Arc::new(FlowBackend::default());
    let upload_dir = TempDir::new().unwrap();
    let download_dir = TempDir::new().unwrap();
    let settings = ClientSettings {
        download_dir: Some(download_dir.path().to_path_buf()),
        ..Default::default()
    };
    let service = AppService::new(backend.clone(), settings);
    Harness {
        backend,
        service,
        upload_dir,
        download_dir,
    }
}

fn write_genome(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, b"rs123\t1\t12345\tAA\n").unwrap();
    path
}

async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn upload_poll_complete_download_happy_path() {
    let hx = harness();
    hx.backend.assign_id("abc-123");
    hx.backend.script_statuses(
        "abc-123",
        vec![
            record("abc-123", "sample.txt", JobStatus::Processing),
            record("abc-123", "sample.txt", JobStatus::Processing),
            record("abc-123", "sample.txt", JobStatus::Completed),
        ],
    );
    hx.backend.set_payload("abc-123", b"\x1f\x8b imputed");

    let path = write_genome(&hx.upload_dir, "sample.txt");
    hx.service.select_file(path).unwrap();

    let (job, mut events) = hx.service.upload_selected().await.unwrap();
    assert_eq!(job.id, "abc-123");
    assert_eq!(job.status, JobStatus::Processing);
    assert_eq!(hx.backend.process_calls.load(Ordering::SeqCst), 1);

    let mut notices = vec![];
    while let Some(event) = events.recv().await {
        hx.service.handle_event(&event);
        if let Some(notice) = event.user_notice() {
            notices.push(notice);
        }
    }

    // processing ×2 の後に completed: 成功通知が1回だけ出て監視は止まる
    assert_eq!(notices, vec![SUCCESS_NOTICE.to_string()]);
    assert_eq!(hx.backend.fetches_for("abc-123"), 3);
    settle().await;
    assert!(!hx.service.is_polling());

    let stored = &hx.service.jobs()[0];
    assert_eq!(stored.status, JobStatus::Completed);
    assert!(hx.service.current_job().is_none());
    assert_eq!(
        hx.service.banner(),
        Banner::Success(SUCCESS_NOTICE.to_string())
    );

    // ダウンロードボタン相当: completed になった id で成果物を保存できる
    let saved = hx.service.download("abc-123").await.unwrap();
    assert_eq!(
        saved,
        hx.download_dir.path().join("sample.txt.processed.gz")
    );
    assert_eq!(std::fs::read(&saved).unwrap(), b"\x1f\x8b imputed");

    let summary = hx.service.metrics_summary();
    assert_eq!(summary.uploads_submitted, 1);
    assert_eq!(summary.jobs_completed, 1);
    assert_eq!(summary.downloads_saved, 1);
}

#[tokio::test(start_paused = true)]
async fn backend_reported_failure_surfaces_detail() {
    let hx = harness();
    hx.backend.assign_id("bad-1");
    let mut failed = record("bad-1", "broken.txt", JobStatus::Error);
    failed.error = Some("invalid format".to_string());
    hx.backend.script_statuses(
        "bad-1",
        vec![
            record("bad-1", "broken.txt", JobStatus::Processing),
            failed,
        ],
    );

    let path = write_genome(&hx.upload_dir, "broken.txt");
    hx.service.select_file(path).unwrap();
    let (_, mut events) = hx.service.upload_selected().await.unwrap();

    let mut notices = vec![];
    while let Some(event) = events.recv().await {
        hx.service.handle_event(&event);
        if let Some(notice) = event.user_notice() {
            notices.push(notice);
        }
    }

    assert_eq!(notices, vec!["Processing failed: invalid format".to_string()]);
    assert_eq!(
        hx.service.banner(),
        Banner::Error("Processing failed: invalid format".to_string())
    );

    // ジョブはボードに残り、ステータスは error
    let stored = &hx.service.jobs()[0];
    assert_eq!(stored.status, JobStatus::Error);
    assert_eq!(stored.error.as_deref(), Some("invalid format"));
    assert!(hx.service.current_job().is_none());
    settle().await;
    assert!(!hx.service.is_polling());
}

#[tokio::test(start_paused = true)]
async fn new_upload_supersedes_active_poll() {
    let hx = harness();
    hx.backend.assign_id("slow-1");
    hx.backend.assign_id("fast-2");
    hx.backend.script_statuses(
        "slow-1",
        vec![record("slow-1", "first.txt", JobStatus::Processing)],
    );
    hx.backend.script_statuses(
        "fast-2",
        vec![
            record("fast-2", "second.txt", JobStatus::Processing),
            record("fast-2", "second.txt", JobStatus::Completed),
        ],
    );

    let first = write_genome(&hx.upload_dir, "first.txt");
    hx.service.select_file(first).unwrap();
    let (_, mut first_events) = hx.service.upload_selected().await.unwrap();

    // 最初のジョブを2周期ぶん監視させる
    settle().await;
    tokio::time::advance(std::time::Duration::from_secs(2)).await;
    settle().await;
    tokio::time::advance(std::time::Duration::from_secs(2)).await;
    settle().await;
    assert_eq!(hx.backend.fetches_for("slow-1"), 2);

    // 2つ目のアップロードが現在ジョブを置き換える
    let second = write_genome(&hx.upload_dir, "second.txt");
    hx.service.select_file(second).unwrap();
    let (job2, mut second_events) = hx.service.upload_selected().await.unwrap();
    assert_eq!(job2.id, "fast-2");
    settle().await;

    let slow_fetches = hx.backend.fetches_for("slow-1");
    let mut notices = vec![];
    while let Some(event) = second_events.recv().await {
        hx.service.handle_event(&event);
        if let Some(notice) = event.user_notice() {
            notices.push(notice);
        }
    }

    // 旧ジョブのタイマーは停止済み: フェッチ数は増えない
    assert_eq!(hx.backend.fetches_for("slow-1"), slow_fetches);
    assert_eq!(notices, vec![SUCCESS_NOTICE.to_string()]);

    // 旧チャネルは進捗イベントのみで閉じている
    while let Some(event) = first_events.recv().await {
        assert!(matches!(event, MonitorEvent::StatusFetched { .. }));
    }

    // 旧ジョブのレコードは最後に取得した状態のまま残る
    assert_eq!(
        hx.service
            .jobs()
            .iter()
            .find(|j| j.id == "slow-1")
            .unwrap()
            .status,
        JobStatus::Processing
    );
}

#[tokio::test(start_paused = true)]
async fn bootstrap_then_watch_existing_job() {
    let hx = harness();
    *hx.backend.known_jobs.lock().unwrap() = vec![
        record("old-1", "done.txt", JobStatus::Completed),
        record("run-2", "running.txt", JobStatus::Processing),
    ];
    hx.backend.script_statuses(
        "run-2",
        vec![
            record("run-2", "running.txt", JobStatus::Processing),
            record("run-2", "running.txt", JobStatus::Completed),
        ],
    );
    hx.backend.script_statuses(
        "old-1",
        vec![record("old-1", "done.txt", JobStatus::Completed)],
    );

    let jobs = hx.service.refresh_jobs().await.unwrap();
    assert_eq!(jobs.len(), 2);

    // 実行中のジョブに再アタッチして完了まで追う
    let (job, mut events) = hx.service.watch("run-2").await.unwrap();
    assert_eq!(job.status, JobStatus::Processing);
    assert!(hx.service.is_polling());

    let mut saw_completion = false;
    while let Some(event) = events.recv().await {
        hx.service.handle_event(&event);
        if matches!(event, MonitorEvent::Completed { .. }) {
            saw_completion = true;
        }
    }
    assert!(saw_completion);
    assert_eq!(
        hx.service
            .jobs()
            .iter()
            .find(|j| j.id == "run-2")
            .unwrap()
            .status,
        JobStatus::Completed
    );

    // 終端ジョブの watch はタイマーを起動しない
    let (done, mut closed) = hx.service.watch("old-1").await.unwrap();
    assert!(done.is_terminal());
    assert!(closed.recv().await.is_none());
    assert!(!hx.service.is_polling());
}

#[tokio::test]
async fn uuid_assigned_ids_flow_through() {
    let hx = harness();
    let id = uuid::Uuid::new_v4().to_string();
    hx.backend.assign_id(&id);
    hx.backend
        .script_statuses(&id, vec![record(&id, "sample.txt", JobStatus::Processing)]);

    let path = write_genome(&hx.upload_dir, "sample.txt");
    hx.service.select_file(path).unwrap();
    let (job, _events) = hx.service.upload_selected().await.unwrap();

    assert_eq!(job.id, id);
    assert_eq!(hx.service.current_job().unwrap().id, id);
    hx.service.stop_watching();
}
