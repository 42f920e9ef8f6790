use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use keno_logging::{keno_info, keno_warn};
use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::{FailureKind, FetchError};

/// Remote function that runs the archive extraction and streams its progress.
pub const DEFAULT_ENDPOINT: &str =
    "https://functions.poehali.dev/c7064f76-e7ac-4b9f-8d0c-50d663670a04";

/// Response body as it arrives, chunk by chunk.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, FetchError>> + Send>>;

#[derive(Debug, Clone)]
pub struct TriggerSettings {
    pub endpoint: String,
    pub connect_timeout: Duration,
    /// Upper bound on waiting for the response headers.
    pub response_timeout: Duration,
    /// Upper bound on silence between two body chunks.
    pub read_timeout: Duration,
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            connect_timeout: Duration::from_secs(10),
            response_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(60),
        }
    }
}

/// Starts a job and hands back its streaming body.
#[async_trait::async_trait]
pub trait JobClient: Send + Sync {
    /// Issues the trigger call. Resolves once headers arrive with a success
    /// status; the body is left unread.
    async fn trigger(&self) -> Result<BodyStream, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestJobClient {
    settings: TriggerSettings,
    client: reqwest::Client,
}

impl ReqwestJobClient {
    pub fn new(settings: TriggerSettings) -> Result<Self, FetchError> {
        // No total request timeout: the body is expected to stay open for the
        // whole job. Idle gaps are bounded by the read timeout instead.
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .read_timeout(settings.read_timeout)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }
}

#[async_trait::async_trait]
impl JobClient for ReqwestJobClient {
    async fn trigger(&self) -> Result<BodyStream, FetchError> {
        let url = Url::parse(&self.settings.endpoint)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;

        keno_info!("Triggering job at {}", url);
        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .send();
        let response = tokio::time::timeout(self.settings.response_timeout, request)
            .await
            .map_err(|_| {
                FetchError::new(
                    FailureKind::Timeout,
                    format!(
                        "no response within {:?}",
                        self.settings.response_timeout
                    ),
                )
            })?
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            keno_warn!("Job trigger rejected with status {}", status);
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        keno_info!("Job accepted with status {}", status);
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(map_reqwest_error));
        Ok(Box::pin(body))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
