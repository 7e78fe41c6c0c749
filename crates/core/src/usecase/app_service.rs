use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::mpsc;

use crate::domain::banner::Banner;
use crate::domain::board::JobBoard;
use crate::domain::error::AppError;
use crate::domain::job::{JobRecord, JobStatus};
use crate::domain::settings::ClientSettings;
use crate::infra::artifact::ArtifactStore;
use crate::infra::backend::BackendApi;
use crate::infra::metrics::{Metrics, MetricsSummary};
use crate::usecase::downloader::Downloader;
use crate::usecase::monitor::{JobMonitor, MonitorEvent};
use crate::usecase::uploader::{self, Uploader};

/// 選択中のファイル（アップロード前の UI 状態）
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub file_name: String,
}

/// アプリケーションサービス: ボード・バナー・選択状態を所有し、
/// 各コントローラをまとめる状態コンテナ。シェル（CLI）から操作される。
pub struct AppService {
    backend: Arc<dyn BackendApi>,
    board: Arc<Mutex<JobBoard>>,
    banner: Mutex<Banner>,
    selected: Mutex<Option<SelectedFile>>,
    uploader: Uploader,
    downloader: Downloader,
    monitor: JobMonitor,
    metrics: Arc<Metrics>,
    settings: ClientSettings,
}

impl AppService {
    pub fn new(backend: Arc<dyn BackendApi>, settings: ClientSettings) -> Self {
        let board = Arc::new(Mutex::new(JobBoard::new()));
        let metrics = Arc::new(Metrics::new());
        let uploader = Uploader::new(backend.clone());
        let downloader = Downloader::new(
            backend.clone(),
            ArtifactStore::new(settings.resolved_download_dir()),
        );
        let monitor = JobMonitor::new(
            backend.clone(),
            board.clone(),
            metrics.clone(),
            settings.poll_interval(),
        );

        Self {
            backend,
            board,
            banner: Mutex::new(Banner::None),
            selected: Mutex::new(None),
            uploader,
            downloader,
            monitor,
            metrics,
            settings,
        }
    }

    // ==================== Selection ====================

    /// ファイルを選択する。拡張子が不正なら選択をクリアして検証エラー。
    pub fn select_file(&self, path: PathBuf) -> Result<SelectedFile, AppError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| AppError::validation("Please select a file first"))?;

        if let Err(e) = uploader::validate_filename(&file_name) {
            *self.selected.lock().unwrap() = None;
            self.banner.lock().unwrap().set_error(e.message.clone());
            return Err(e);
        }

        let selected = SelectedFile { path, file_name };
        *self.selected.lock().unwrap() = Some(selected.clone());

        // 有効な選択は表示中のエラーを打ち消す
        let mut banner = self.banner.lock().unwrap();
        if banner.is_error() {
            banner.clear();
        }

        Ok(selected)
    }

    pub fn selected_file(&self) -> Option<SelectedFile> {
        self.selected.lock().unwrap().clone()
    }

    pub fn clear_selection(&self) {
        *self.selected.lock().unwrap() = None;
    }

    // ==================== Upload ====================

    /// 選択中のファイルをアップロードして処理を開始し、監視を起動する。
    /// 成功時は選択がクリアされる。失敗時はレコードを一切作らない。
    pub async fn upload_selected(
        &self,
    ) -> Result<(JobRecord, mpsc::UnboundedReceiver<MonitorEvent>), AppError> {
        let selected = self
            .selected
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AppError::validation("Please select a file first"))?;

        self.banner.lock().unwrap().clear();

        let bytes = tokio::fs::read(&selected.path).await.map_err(|e| {
            AppError::validation(format!("Cannot read {}: {e}", selected.path.display()))
        })?;

        let started = Instant::now();
        let record = match self
            .uploader
            .upload_and_process(&selected.file_name, bytes)
            .await
        {
            Ok(record) => record,
            Err(e) => {
                self.metrics.inc_upload_failures();
                self.banner.lock().unwrap().set_error(e.message.clone());
                return Err(e);
            }
        };

        self.metrics.inc_uploads_submitted();
        self.metrics
            .record_latency("upload", started.elapsed().as_millis() as u64);

        {
            let mut board = self.board.lock().unwrap();
            board.insert(record.clone());
            board.set_current(&record.id);
        }

        let events = self.monitor.start(&record);

        *self.selected.lock().unwrap() = None;
        self.banner
            .lock()
            .unwrap()
            .set_success(format!("File uploaded successfully! ID: {}", record.id));

        Ok((record, events))
    }

    // ==================== Polling ====================

    /// ジョブの権威ステータスを1回取得してボードに反映する。
    pub async fn fetch_job(&self, id: &str) -> Result<JobRecord, AppError> {
        let record = self
            .backend
            .fetch_status(id)
            .await
            .map_err(|e| AppError::poll_transient(e.to_string()))?;

        let mut board = self.board.lock().unwrap();
        if !board.update(record.clone()) {
            board.insert(record.clone());
        }
        Ok(record)
    }

    /// ジョブを現在ジョブとして監視する。終端なら監視せず閉じたチャネルを返す。
    pub async fn watch(
        &self,
        id: &str,
    ) -> Result<(JobRecord, mpsc::UnboundedReceiver<MonitorEvent>), AppError> {
        let record = self.fetch_job(id).await?;

        if !record.is_terminal() {
            self.board.lock().unwrap().set_current(&record.id);
        }
        let events = self.monitor.start(&record);

        Ok((record, events))
    }

    /// 監視イベントをバナーに反映する（シェルがイベントごとに呼ぶ）。
    pub fn handle_event(&self, event: &MonitorEvent) {
        let Some(notice) = event.user_notice() else {
            return;
        };
        let mut banner = self.banner.lock().unwrap();
        match event {
            MonitorEvent::Completed { .. } => banner.set_success(notice),
            MonitorEvent::Failed { .. } => banner.set_error(notice),
            MonitorEvent::StatusFetched { .. } => {}
        }
    }

    pub fn stop_watching(&self) {
        self.monitor.stop();
    }

    pub fn is_polling(&self) -> bool {
        self.monitor.is_active()
    }

    pub fn watching(&self) -> Option<String> {
        self.monitor.watching()
    }

    // ==================== Download ====================

    /// 完了済みジョブの成果物をローカルに保存する。
    /// 未完了ならネットワークに触れずにエラー。失敗してもボードは変化しない。
    pub async fn download(&self, id: &str) -> Result<PathBuf, AppError> {
        let record = {
            let board = self.board.lock().unwrap();
            board
                .get(id)
                .cloned()
                .ok_or_else(|| AppError::invalid_state(format!("Unknown job: {id}")))?
        };

        if record.status != JobStatus::Completed {
            return Err(AppError::invalid_state(format!(
                "Job is not completed (status: {})",
                record.status.as_str()
            )));
        }

        let started = Instant::now();
        match self.downloader.download(&record).await {
            Ok(path) => {
                self.metrics.inc_downloads_saved();
                self.metrics
                    .record_latency("download", started.elapsed().as_millis() as u64);
                self.banner
                    .lock()
                    .unwrap()
                    .set_success(format!("Saved {}", path.display()));
                Ok(path)
            }
            Err(e) => {
                self.metrics.inc_download_failures();
                self.banner.lock().unwrap().set_error(e.message.clone());
                Err(e)
            }
        }
    }

    // ==================== Queries ====================

    /// ブートストラップ: バックエンドの既知ジョブ一覧でボードを置き換える。
    pub async fn refresh_jobs(&self) -> Result<Vec<JobRecord>, AppError> {
        let jobs = self
            .backend
            .list_jobs()
            .await
            .map_err(|e| AppError::internal(format!("Failed to load jobs: {e}")))?;

        let mut board = self.board.lock().unwrap();
        board.load(jobs);
        Ok(board.list().to_vec())
    }

    pub fn jobs(&self) -> Vec<JobRecord> {
        self.board.lock().unwrap().list().to_vec()
    }

    pub fn current_job(&self) -> Option<JobRecord> {
        self.board.lock().unwrap().current().cloned()
    }

    pub fn banner(&self) -> Banner {
        self.banner.lock().unwrap().clone()
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn metrics_summary(&self) -> MetricsSummary {
        self.metrics.summary()
    }
}
