use std::sync::Arc;

use crate::domain::error::AppError;
use crate::domain::job::JobRecord;
use crate::infra::backend::{BackendApi, BackendError};

/// 受理する入力ファイルの拡張子
pub const ACCEPTED_EXTENSION: &str = ".txt";

/// サイズ上限の目安（強制はバックエンドの責務。クライアントは警告のみ）
pub const SOFT_MAX_UPLOAD_BYTES: u64 = 1024 * 1024 * 1024;

/// ファイル名が受理可能か検証する。ネットワークには触れない。
pub fn validate_filename(file_name: &str) -> Result<(), AppError> {
    if file_name.ends_with(ACCEPTED_EXTENSION) {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "Please select a {ACCEPTED_EXTENSION} file"
        )))
    }
}

/// アップロードコントローラ: ファイル → 新規ジョブレコード
pub struct Uploader {
    backend: Arc<dyn BackendApi>,
}

impl Uploader {
    pub fn new(backend: Arc<dyn BackendApi>) -> Self {
        Self { backend }
    }

    /// 2段階でバックエンドに投入する: バイト保存 → 処理開始。
    /// どちらかが失敗したら全体を中断し、ジョブレコードは作らない。
    pub async fn upload_and_process(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<JobRecord, AppError> {
        validate_filename(file_name)?;

        if bytes.len() as u64 > SOFT_MAX_UPLOAD_BYTES {
            log::warn!(
                "{} exceeds the 1GB guidance ({} bytes); backend may reject it",
                file_name,
                bytes.len()
            );
        }

        let ack = self
            .backend
            .upload(file_name, bytes)
            .await
            .map_err(to_upload_error)?;

        self.backend
            .start_processing(&ack.id)
            .await
            .map_err(to_upload_error)?;

        // 楽観的レコード: バックエンド側の uploaded → processing の帳簿を待たない
        let now = chrono::Utc::now().to_rfc3339();
        Ok(JobRecord::new_processing(ack.id, ack.filename, now))
    }
}

fn to_upload_error(e: BackendError) -> AppError {
    log::error!("upload aborted: {e}");
    match e.detail() {
        Some(detail) => AppError::upload_failed(detail),
        None => AppError::upload_failed("Upload failed"),
    }
}
