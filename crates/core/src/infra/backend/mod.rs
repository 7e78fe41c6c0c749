pub mod http;

pub use http::HttpBackend;

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::job::JobRecord;

/// POST /api/upload の受付応答
#[derive(Debug, Clone, Deserialize)]
pub struct UploadAck {
    pub id: String,
    pub filename: String,
}

/// GET /api/files の応答
#[derive(Debug, Deserialize)]
pub struct JobListResponse {
    #[serde(default)]
    pub jobs: Vec<JobRecord>,
}

/// バックエンドエラー
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("HTTP request failed: {0}")]
    Request(String),
    #[error("Request timeout")]
    Timeout,
    #[error("Backend rejected request: {0}")]
    Rejected(String),
    #[error("Response parse error: {0}")]
    Parse(String),
}

impl BackendError {
    /// バックエンドが返した人間可読の detail（あれば）
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Rejected(d) => Some(d),
            _ => None,
        }
    }
}

/// 処理バックエンドへの固定コントラクト（テストではスクリプト済みフェイクが実装する）
#[async_trait]
pub trait BackendApi: Send + Sync {
    /// 既知ジョブ一覧のブートストラップ取得
    async fn list_jobs(&self) -> Result<Vec<JobRecord>, BackendError>;

    /// ファイルを multipart で送信し、払い出された id とファイル名を受け取る
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<UploadAck, BackendError>;

    /// 保存済みファイルの処理開始を指示する（保存と計算開始は独立に失敗しうる）
    async fn start_processing(&self, id: &str) -> Result<(), BackendError>;

    /// ジョブの権威ステータスを取得する
    async fn fetch_status(&self, id: &str) -> Result<JobRecord, BackendError>;

    /// 処理済み成果物をバイナリで取得する
    async fn download(&self, id: &str) -> Result<Vec<u8>, BackendError>;
}
