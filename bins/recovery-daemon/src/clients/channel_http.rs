use crate::config::ChannelConfig;
use async_trait::async_trait;
use recovery_core::channel::{ChannelId, ChannelTransport};
use recovery_core::error::ChannelError;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client for the profile channel service: `list`, `download` and `upload`
/// endpoints keyed by channel id.
pub struct ChannelHttpClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListBody {
    #[serde(default)]
    profile_ids: Vec<String>,
}

#[derive(Deserialize)]
struct DownloadBody {
    data: String,
}

#[derive(Serialize)]
struct UploadBody<'a> {
    data: &'a str,
    uuid: &'a str,
}

impl ChannelHttpClient {
    pub fn new(cfg: &ChannelConfig) -> Result<Self, ChannelError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| ChannelError::Transport(format!("client: {}", e)))?;
        Ok(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn list_url(&self, channel: &ChannelId) -> String {
        format!("{}/list/{}", self.base_url, channel)
    }

    pub fn download_url(&self, channel: &ChannelId, data_id: &str) -> String {
        format!("{}/download/{}/{}", self.base_url, channel, data_id)
    }

    pub fn upload_url(&self, channel: &ChannelId) -> String {
        format!("{}/upload/{}", self.base_url, channel)
    }

    fn transport(label: &str, err: reqwest::Error) -> ChannelError {
        ChannelError::Transport(format!("{}: {}", label, err))
    }

    fn check_status(label: &str, status: StatusCode) -> Result<(), ChannelError> {
        if status == StatusCode::NOT_FOUND {
            return Err(ChannelError::NotFound);
        }
        if !status.is_success() {
            return Err(ChannelError::Transport(format!("{}: status {}", label, status)));
        }
        Ok(())
    }
}

#[async_trait]
impl ChannelTransport for ChannelHttpClient {
    async fn list(&self, channel: &ChannelId) -> Result<Vec<String>, ChannelError> {
        let resp = self
            .http
            .get(self.list_url(channel))
            .send()
            .await
            .map_err(|e| Self::transport("list", e))?;
        match Self::check_status("list", resp.status()) {
            // the service has nothing under a channel nobody uploaded to yet
            Err(ChannelError::NotFound) => return Ok(Vec::new()),
            other => other?,
        }
        let body: ListBody = resp.json().await.map_err(|e| Self::transport("list", e))?;
        Ok(body.profile_ids)
    }

    async fn download(&self, channel: &ChannelId, data_id: &str) -> Result<Vec<u8>, ChannelError> {
        let resp = self
            .http
            .get(self.download_url(channel, data_id))
            .send()
            .await
            .map_err(|e| Self::transport("download", e))?;
        Self::check_status("download", resp.status())?;
        let body: DownloadBody = resp
            .json()
            .await
            .map_err(|e| Self::transport("download", e))?;
        Ok(body.data.into_bytes())
    }

    async fn upload(
        &self,
        channel: &ChannelId,
        data_id: &str,
        data: Vec<u8>,
    ) -> Result<(), ChannelError> {
        let text = String::from_utf8(data)
            .map_err(|_| ChannelError::Transport("upload: payload is not text".to_string()))?;
        let resp = self
            .http
            .post(self.upload_url(channel))
            .json(&UploadBody {
                data: &text,
                uuid: data_id,
            })
            .send()
            .await
            .map_err(|e| Self::transport("upload", e))?;
        Self::check_status("upload", resp.status())
    }
}
