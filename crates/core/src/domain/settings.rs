use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// クライアント設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSettings {
    /// バックエンド API のベース URL
    pub api_base_url: String,
    /// ステータスポーリング間隔（ミリ秒）
    pub poll_interval_ms: u64,
    /// HTTP リクエストタイムアウト（秒）
    pub request_timeout_secs: u64,
    /// 成果物の保存先（None なら OS のダウンロードディレクトリ）
    pub download_dir: Option<PathBuf>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000".to_string(),
            poll_interval_ms: 2_000,
            request_timeout_secs: 30,
            download_dir: None,
        }
    }
}

impl ClientSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// 保存先ディレクトリを解決する
    pub fn resolved_download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
