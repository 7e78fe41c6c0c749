use serde::{Deserialize, Serialize};

/// ジョブ状態（権威はバックエンド側にある）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Uploaded,
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    /// 終端状態かどうか（到達後はポーリング不要）
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

/// ジョブレコード（1回のアップロードとその処理ライフサイクル）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// バックエンドが払い出す一意ID
    pub id: String,
    pub status: JobStatus,
    /// アップロード時のファイル名（作成後は不変）
    pub original_filename: String,
    /// RFC 3339 タイムスタンプ（作成後は不変）
    pub uploaded_at: String,
    /// status = error のときだけバックエンドが返す失敗詳細
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl JobRecord {
    /// アップロード直後の楽観的レコード（処理開始を待たずに processing 表示する）
    pub fn new_processing(id: String, original_filename: String, now: String) -> Self {
        Self {
            id,
            status: JobStatus::Processing,
            original_filename,
            uploaded_at: now,
            error: None,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
