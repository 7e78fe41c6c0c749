use std::path::PathBuf;
use std::sync::Arc;

use crate::domain::error::AppError;
use crate::domain::job::JobRecord;
use crate::infra::artifact::ArtifactStore;
use crate::infra::backend::BackendApi;

/// ダウンロードコントローラ: 完了済みジョブの成果物 → ローカルファイル
pub struct Downloader {
    backend: Arc<dyn BackendApi>,
    store: ArtifactStore,
}

impl Downloader {
    pub fn new(backend: Arc<dyn BackendApi>, store: ArtifactStore) -> Self {
        Self { backend, store }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// 成果物を取得して `<original_filename>.processed.gz` として保存する。
    /// 失敗してもジョブ状態には影響しない。再ダウンロードは何度でも可能。
    pub async fn download(&self, job: &JobRecord) -> Result<PathBuf, AppError> {
        let bytes = self.backend.download(&job.id).await.map_err(|e| {
            log::error!("artifact fetch failed for {}: {e}", job.id);
            AppError::download_failed("Download failed")
        })?;

        self.store
            .save(&job.original_filename, &bytes)
            .await
            .map_err(|e| {
                log::error!("artifact save failed for {}: {e}", job.id);
                AppError::download_failed("Download failed")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use crate::domain::error::ErrorCode;
    use crate::domain::job::JobStatus;
    use crate::infra::backend::{BackendError, UploadAck};

    struct PayloadBackend {
        payload: Option<Vec<u8>>,
    }

    #[async_trait]
    impl BackendApi for PayloadBackend {
        async fn list_jobs(&self) -> Result<Vec<JobRecord>, BackendError> {
            Ok(vec![])
        }

        async fn upload(&self, _: &str, _: Vec<u8>) -> Result<UploadAck, BackendError> {
            Err(BackendError::Request("not scripted".into()))
        }

        async fn start_processing(&self, _: &str) -> Result<(), BackendError> {
            Err(BackendError::Request("not scripted".into()))
        }

        async fn fetch_status(&self, _: &str) -> Result<JobRecord, BackendError> {
            Err(BackendError::Request("not scripted".into()))
        }

        async fn download(&self, _: &str) -> Result<Vec<u8>, BackendError> {
            match &self.payload {
                Some(bytes) => Ok(bytes.clone()),
                None => Err(BackendError::Request("connection reset".into())),
            }
        }
    }

    fn completed_job() -> JobRecord {
        JobRecord {
            id: "abc-123".to_string(),
            status: JobStatus::Completed,
            original_filename: "sample.txt".to_string(),
            uploaded_at: "2026-08-01T10:30:00Z".to_string(),
            error: None,
            started_at: None,
            completed_at: None,
        }
    }

    #[tokio::test]
    async fn test_download_saves_named_artifact() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(PayloadBackend {
            payload: Some(b"gzip-bytes".to_vec()),
        });
        let downloader = Downloader::new(backend, ArtifactStore::new(dir.path().to_path_buf()));

        let path = downloader.download(&completed_job()).await.unwrap();
        assert_eq!(path, dir.path().join("sample.txt.processed.gz"));
        assert_eq!(std::fs::read(&path).unwrap(), b"gzip-bytes");
    }

    #[tokio::test]
    async fn test_fetch_failure_surfaces_generic_error() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(PayloadBackend { payload: None });
        let downloader = Downloader::new(backend, ArtifactStore::new(dir.path().to_path_buf()));

        let err = downloader.download(&completed_job()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DownloadFailed);
        assert_eq!(err.message, "Download failed");
        assert!(!dir.path().join("sample.txt.processed.gz").exists());
    }

    #[tokio::test]
    async fn test_redownload_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(PayloadBackend {
            payload: Some(b"gzip-bytes".to_vec()),
        });
        let downloader = Downloader::new(backend, ArtifactStore::new(dir.path().to_path_buf()));

        let first = downloader.download(&completed_job()).await.unwrap();
        let second = downloader.download(&completed_job()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(std::fs::read(&second).unwrap(), b"gzip-bytes");
    }
}
