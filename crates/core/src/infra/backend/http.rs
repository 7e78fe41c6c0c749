use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{BackendApi, BackendError, JobListResponse, UploadAck};
use crate::domain::job::JobRecord;

/// バックエンドのエラーボディ（人間可読の detail を運ぶ）
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

/// reqwest ベースのバックエンドクライアント
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 非成功ステータスをエラーボディの detail 込みで Rejected に変換する
    async fn accept(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.detail);
        Err(BackendError::Rejected(
            detail.unwrap_or_else(|| status.to_string()),
        ))
    }
}

fn map_send_error(e: reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout
    } else {
        BackendError::Request(e.to_string())
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn list_jobs(&self) -> Result<Vec<JobRecord>, BackendError> {
        let response = self
            .client
            .get(self.url("/api/files"))
            .send()
            .await
            .map_err(map_send_error)?;

        let list: JobListResponse = Self::accept(response)
            .await?
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))?;

        Ok(list.jobs)
    }

    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<UploadAck, BackendError> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("text/plain")
            .map_err(|e| BackendError::Request(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.url("/api/upload"))
            .multipart(form)
            .send()
            .await
            .map_err(map_send_error)?;

        Self::accept(response)
            .await?
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))
    }

    async fn start_processing(&self, id: &str) -> Result<(), BackendError> {
        let response = self
            .client
            .post(self.url(&format!("/api/process/{id}")))
            .send()
            .await
            .map_err(map_send_error)?;

        Self::accept(response).await?;
        Ok(())
    }

    async fn fetch_status(&self, id: &str) -> Result<JobRecord, BackendError> {
        let response = self
            .client
            .get(self.url(&format!("/api/status/{id}")))
            .send()
            .await
            .map_err(map_send_error)?;

        Self::accept(response)
            .await?
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))
    }

    async fn download(&self, id: &str) -> Result<Vec<u8>, BackendError> {
        let response = self
            .client
            .get(self.url(&format!("/api/download/{id}")))
            .send()
            .await
            .map_err(map_send_error)?;

        let bytes = Self::accept(response)
            .await?
            .bytes()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        Ok(bytes.to_vec())
    }
}
