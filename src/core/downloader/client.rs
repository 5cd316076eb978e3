use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use tracing::debug;

use crate::core::error::{InstallError, InstallResult};

/// Body and declared media type of a fetched resource.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Moves bytes from a URL into memory. One attempt per call; retries, if
/// any, are the implementation's business.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> InstallResult<Fetched>;
}

/// `reqwest`-backed transport that also understands `file://` URLs.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn get_http(&self, url: Url) -> InstallResult<Fetched> {
        let failed = |reason: String| InstallError::DownloadFailed {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("HTTP {}", status.as_u16())));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;

        debug!("Fetched {} ({} bytes)", url, bytes.len());
        Ok(Fetched {
            bytes: bytes.to_vec(),
            content_type,
        })
    }

    async fn get_file(&self, url: Url) -> InstallResult<Fetched> {
        let path = url.to_file_path().map_err(|_| InstallError::DownloadFailed {
            url: url.to_string(),
            reason: "invalid file:// path".into(),
        })?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| InstallError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Fetched {
            bytes,
            content_type: None,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> InstallResult<Fetched> {
        let parsed = Url::parse(url).map_err(|e| InstallError::DownloadFailed {
            url: url.to_string(),
            reason: format!("invalid url: {e}"),
        })?;

        match parsed.scheme() {
            "http" | "https" => self.get_http(parsed).await,
            "file" => self.get_file(parsed).await,
            other => Err(InstallError::DownloadFailed {
                url: url.to_string(),
                reason: format!("unsupported scheme: {other}"),
            }),
        }
    }
}
