//! HTTP client used to fetch package archives.

use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::Client;
use std::io::Write;
use std::time::Duration;

use super::retry::{MAX_RETRIES, RETRY_DELAY_MS, check_retryable, is_retryable};

/// reqwest client with the retry policy of [`super::retry`].
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    retry_delay: Duration,
}

impl HttpClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
        }
    }

    /// Client identifying itself as `pvp/<version>`.
    pub fn with_user_agent(version: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("pvp/{}", version))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::new(client))
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Stream the body of `url` into the writer returned by `create_writer`.
    ///
    /// The writer is created only once the server has answered with a success
    /// status, and again for every retry, so each attempt starts from an empty
    /// file.
    #[tracing::instrument(skip(self, create_writer))]
    pub async fn download_file<W, F>(&self, url: &str, create_writer: F) -> Result<u64>
    where
        W: Write,
        F: Fn() -> Result<W>,
    {
        debug!("Downloading {}...", url);
        let create_writer = &create_writer;
        self.with_retry("download", move || {
            self.download_file_once(url, create_writer)
        })
        .await
    }

    async fn download_file_once<W, F>(&self, url: &str, create_writer: &F) -> Result<u64>
    where
        W: Write,
        F: Fn() -> Result<W>,
    {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to start download request")?;

        let mut response = response.error_for_status().map_err(check_retryable)?;

        let mut writer = create_writer()?;
        let mut downloaded_bytes: u64 = 0;

        while let Some(chunk) = response
            .chunk()
            .await
            .context("Failed to read chunk from download stream")?
        {
            writer
                .write_all(&chunk)
                .context("Failed to write chunk to file")?;
            downloaded_bytes += chunk.len() as u64;
        }
        writer.flush().context("Failed to flush downloaded file")?;

        debug!(
            "Downloaded {:.2} MB",
            downloaded_bytes as f64 / (1024.0 * 1024.0)
        );

        Ok(downloaded_bytes)
    }

    async fn with_retry<F, Fut, T>(&self, operation_name: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if !is_retryable(&e) => {
                    debug!("{}: non-retryable error: {}", operation_name, e);
                    return Err(e);
                }
                Err(e) if attempt >= MAX_RETRIES => {
                    return Err(e.context(format!(
                        "{} failed after {} attempts",
                        operation_name, MAX_RETRIES
                    )));
                }
                Err(e) => {
                    warn!(
                        "{}: attempt {}/{} failed ({:#}), retrying in {}ms...",
                        operation_name,
                        attempt,
                        MAX_RETRIES,
                        e,
                        self.retry_delay.as_millis()
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::NonRetryableError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn client() -> HttpClient {
        HttpClient::new(Client::new()).with_retry_delay(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_download_file_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/foo-1.0.tar.gz")
            .with_status(200)
            .with_body("archive bytes")
            .create_async()
            .await;

        let bytes = client()
            .download_file(&format!("{}/foo-1.0.tar.gz", server.url()), || {
                Ok(std::io::sink())
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(bytes, 13);
    }

    #[tokio::test]
    async fn test_download_file_not_found_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/missing.tar.gz")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;
        let writers = AtomicUsize::new(0);

        let err = client()
            .download_file(&format!("{}/missing.tar.gz", server.url()), || {
                writers.fetch_add(1, Ordering::SeqCst);
                Ok(std::io::sink())
            })
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert!(err.downcast_ref::<NonRetryableError>().is_some());
        assert_eq!(writers.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_download_file_retries_server_errors() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/flaky.tar.gz")
            .with_status(502)
            .expect(MAX_RETRIES)
            .create_async()
            .await;

        let err = client()
            .download_file(&format!("{}/flaky.tar.gz", server.url()), || {
                Ok(std::io::sink())
            })
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert!(format!("{:#}", err).contains("failed after 3 attempts"));
    }

    #[tokio::test]
    async fn test_with_retry_recovers() {
        let calls = Arc::new(AtomicUsize::new(0));

        let result = client()
            .with_retry("test", || {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(anyhow::anyhow!("connection reset"))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_stops_on_non_retryable() {
        let calls = Arc::new(AtomicUsize::new(0));

        let result = client()
            .with_retry("test", || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(anyhow::Error::from(NonRetryableError::Forbidden))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
