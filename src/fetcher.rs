use std::time::Duration;

use anyhow::Context as _;
use bytes::Bytes;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use tokio::sync::Semaphore;
use url::Url;

use crate::error::ContentError;

const MAX_ATTEMPTS: usize = 5;
const MAX_WAIT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    semaphore: std::sync::Arc<Semaphore>,
}

impl Fetcher {
    pub fn new(user_agent: &str, max_concurrency: usize) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(Duration::from_secs(30))
            .build()
            .context("build reqwest client")?;
        Ok(Self {
            client,
            semaphore: std::sync::Arc::new(Semaphore::new(max_concurrency.max(1))),
        })
    }

    pub async fn get_bytes(&self, url: &Url) -> Result<(Bytes, HeaderMap), ContentError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| unavailable(url, e))?;

        let mut backoff = Duration::from_millis(250);

        for attempt in 1..=MAX_ATTEMPTS {
            let resp = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| unavailable(url, e))?;

            let status = resp.status();
            let headers = resp.headers().clone();

            if status.is_success() {
                let bytes = resp.bytes().await.map_err(|e| unavailable(url, e))?;
                tracing::debug!(%url, bytes = bytes.len(), "fetched");
                return Ok((bytes, headers));
            }

            if status.as_u16() == 429 || status.as_u16() == 503 {
                if attempt == MAX_ATTEMPTS {
                    break;
                }
                let wait = retry_after_duration(&headers).unwrap_or(backoff);
                tracing::warn!(
                    %status,
                    attempt,
                    wait_ms = wait.as_millis(),
                    "throttled; backing off"
                );
                tokio::time::sleep(wait).await;
                backoff = (backoff * 2).min(MAX_WAIT);
                continue;
            }

            if status.is_server_error() {
                return Err(unavailable(url, format!("status {status}")));
            }

            return Err(ContentError::Rejected {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Err(unavailable(url, "still throttled after retries"))
    }

    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &Url,
    ) -> Result<T, ContentError> {
        let (bytes, _headers) = self.get_bytes(url).await?;
        serde_json::from_slice(&bytes).map_err(|source| ContentError::Malformed {
            url: url.to_string(),
            source,
        })
    }
}

fn unavailable(url: &Url, reason: impl std::fmt::Display) -> ContentError {
    ContentError::Unavailable {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

fn retry_after_duration(headers: &HeaderMap) -> Option<Duration> {
    let v = headers.get(RETRY_AFTER)?;
    let s = v.to_str().ok()?.trim();
    let seconds: u64 = s.parse().ok()?;
    Some(Duration::from_secs(seconds).min(MAX_WAIT))
}
