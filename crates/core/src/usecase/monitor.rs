use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::domain::board::JobBoard;
use crate::domain::job::{JobRecord, JobStatus};
use crate::infra::backend::BackendApi;
use crate::infra::metrics::Metrics;

/// 処理完了時にユーザーへ表示する通知文
pub const SUCCESS_NOTICE: &str = "Processing completed! You can now download your results.";

/// 監視イベント（UI 通知に変換される）
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// 非終端ステータスを取得した（監視継続）
    StatusFetched { job: JobRecord },
    /// 処理が完了した（監視終了）
    Completed { job: JobRecord },
    /// バックエンドが処理失敗を報告した（監視終了）
    Failed { job: JobRecord, detail: String },
}

impl MonitorEvent {
    /// ユーザーに表示する通知文。非終端イベントでは None。
    pub fn user_notice(&self) -> Option<String> {
        match self {
            Self::StatusFetched { .. } => None,
            Self::Completed { .. } => Some(SUCCESS_NOTICE.to_string()),
            Self::Failed { detail, .. } => Some(format!("Processing failed: {detail}")),
        }
    }
}

struct PollTask {
    job_id: String,
    cancel_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// ポーリングコントローラ: 現在ジョブが非終端である間だけ、
/// 一定周期でバックエンドの権威ステータスを取得してボードに反映する。
///
/// タイマーは常に最大1本。新しいジョブの監視開始や teardown では
/// 既存タスクを必ず先にキャンセルする。キャンセルは協調的で、
/// 実行中のフェッチは完了を許すが、結果は現在ジョブの id が
/// 一致する場合にしか適用されない。
pub struct JobMonitor {
    backend: Arc<dyn BackendApi>,
    board: Arc<Mutex<JobBoard>>,
    metrics: Arc<Metrics>,
    poll_interval: Duration,
    task: Mutex<Option<PollTask>>,
}

impl JobMonitor {
    pub fn new(
        backend: Arc<dyn BackendApi>,
        board: Arc<Mutex<JobBoard>>,
        metrics: Arc<Metrics>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            backend,
            board,
            metrics,
            poll_interval,
            task: Mutex::new(None),
        }
    }

    /// 監視中かどうか
    pub fn is_active(&self) -> bool {
        self.task
            .lock()
            .unwrap()
            .as_ref()
            .map(|t| !t.handle.is_finished())
            .unwrap_or(false)
    }

    /// 監視対象のジョブ id（アクティブな場合のみ）
    pub fn watching(&self) -> Option<String> {
        let task = self.task.lock().unwrap();
        task.as_ref()
            .filter(|t| !t.handle.is_finished())
            .map(|t| t.job_id.clone())
    }

    /// ジョブの監視を開始し、イベント受信チャネルを返す。
    /// 既存のタスクは必ず先に停止する。終端ジョブには起動せず、
    /// 閉じたチャネルを返す。
    pub fn start(&self, job: &JobRecord) -> mpsc::UnboundedReceiver<MonitorEvent> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        self.stop();

        if job.is_terminal() {
            log::debug!("job {} already terminal; not polling", job.id);
            return event_rx;
        }

        let (cancel_tx, cancel_rx) = oneshot::channel();
        let handle = tokio::spawn(poll_loop(
            self.backend.clone(),
            self.board.clone(),
            self.metrics.clone(),
            job.id.clone(),
            self.poll_interval,
            cancel_rx,
            event_tx,
        ));

        *self.task.lock().unwrap() = Some(PollTask {
            job_id: job.id.clone(),
            cancel_tx,
            handle,
        });

        event_rx
    }

    /// 監視を協調的に停止する。
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().unwrap().take() {
            log::debug!("cancelling poll task for job {}", task.job_id);
            let _ = task.cancel_tx.send(());
        }
    }
}

impl Drop for JobMonitor {
    fn drop(&mut self) {
        // teardown: 以後 tick が発火しないことを保証する
        if let Some(task) = self.task.lock().unwrap().take() {
            let _ = task.cancel_tx.send(());
            task.handle.abort();
        }
    }
}

async fn poll_loop(
    backend: Arc<dyn BackendApi>,
    board: Arc<Mutex<JobBoard>>,
    metrics: Arc<Metrics>,
    job_id: String,
    poll_interval: Duration,
    mut cancel_rx: oneshot::Receiver<()>,
    event_tx: mpsc::UnboundedSender<MonitorEvent>,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // interval の即時初回 tick は捨てる: 最初のフェッチは1周期後
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = &mut cancel_rx => break,
            _ = ticker.tick() => {}
        }

        metrics.inc_polls_issued();
        let fetched = match backend.fetch_status(&job_id).await {
            Ok(fetched) => fetched,
            Err(e) => {
                // 一時的な取得失敗は致命ではない: 次の tick で再試行する
                metrics.inc_poll_failures();
                log::warn!("status fetch failed for {job_id} (will retry): {e}");
                continue;
            }
        };

        if fetched.id != job_id {
            log::warn!(
                "discarding status response for {} while watching {job_id}",
                fetched.id
            );
            continue;
        }

        let status = fetched.status;
        let applied = {
            let mut board = board.lock().unwrap();
            if board.current_id() != Some(job_id.as_str()) {
                false
            } else {
                board.update(fetched.clone());
                if status.is_terminal() {
                    board.clear_current();
                }
                true
            }
        };

        if !applied {
            // より新しい現在ジョブに追い越された: 結果は適用せず終了
            log::debug!("poll result for {job_id} superseded; stopping");
            break;
        }

        match status {
            JobStatus::Completed => {
                metrics.inc_jobs_completed();
                let _ = event_tx.send(MonitorEvent::Completed { job: fetched });
                break;
            }
            JobStatus::Error => {
                metrics.inc_jobs_failed();
                let detail = fetched
                    .error
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string());
                let _ = event_tx.send(MonitorEvent::Failed {
                    job: fetched,
                    detail,
                });
                break;
            }
            JobStatus::Uploaded | JobStatus::Processing => {
                let _ = event_tx.send(MonitorEvent::StatusFetched { job: fetched });
            }
        }
    }
}
