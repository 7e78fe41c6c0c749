use serde::Serialize;

/// アプリケーション共通エラーコード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    #[serde(rename = "E_VALIDATION")]
    Validation,
    #[serde(rename = "E_UPLOAD_FAILED")]
    UploadFailed,
    #[serde(rename = "E_POLL_TRANSIENT")]
    PollTransient,
    #[serde(rename = "E_JOB_REPORTED")]
    JobReported,
    #[serde(rename = "E_DOWNLOAD_FAILED")]
    DownloadFailed,
    #[serde(rename = "E_INVALID_STATE")]
    InvalidState,
    #[serde(rename = "E_INTERNAL")]
    Internal,
}

/// アプリケーションエラー（UI 表示ペイロード兼用）
#[derive(Debug, Clone, Serialize)]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    pub recoverable: bool,
}

impl AppError {
    /// ローカル検証エラー。ネットワークには一切触れていない。
    pub fn validation(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Validation,
            message: msg.into(),
            recoverable: true,
        }
    }

    /// アップロードまたは処理開始の失敗。ジョブレコードは作られていない。
    pub fn upload_failed(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::UploadFailed,
            message: msg.into(),
            recoverable: true,
        }
    }

    /// 単発のステータス取得失敗。次の tick で再試行される。
    pub fn poll_transient(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::PollTransient,
            message: msg.into(),
            recoverable: true,
        }
    }

    /// バックエンドが終端 error を報告した。
    pub fn job_reported(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::JobReported,
            message: msg.into(),
            recoverable: false,
        }
    }

    /// 成果物の取得・保存失敗。ジョブ状態には影響しない。
    pub fn download_failed(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::DownloadFailed,
            message: msg.into(),
            recoverable: true,
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::InvalidState,
            message: msg.into(),
            recoverable: true,
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Internal,
            message: msg.into(),
            recoverable: false,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}
