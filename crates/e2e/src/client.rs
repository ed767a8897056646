//! HTTP client used by the harness

use tracing::debug;

use crate::error::{E2eError, E2eResult};

/// Closeable HTTP client.
///
/// Once closed every call fails with [`E2eError::ClientClosed`], including a
/// second `close`.
pub struct HttpClient {
    inner: Option<reqwest::Client>,
}

impl HttpClient {
    pub fn new() -> E2eResult<Self> {
        let inner = reqwest::Client::builder().build()?;
        Ok(Self { inner: Some(inner) })
    }

    /// Request builder for an absolute URL
    pub fn target(&self, url: impl Into<String>) -> E2eResult<Target<'_>> {
        let client = self.inner.as_ref().ok_or(E2eError::ClientClosed)?;
        Ok(Target {
            client,
            url: url.into(),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    /// Release the connection pool
    pub fn close(&mut self) -> E2eResult<()> {
        match self.inner.take() {
            Some(_) => {
                debug!("HTTP client closed");
                Ok(())
            }
            None => Err(E2eError::ClientClosed),
        }
    }
}

/// A single request target
pub struct Target<'a> {
    client: &'a reqwest::Client,
    url: String,
}

impl Target<'_> {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// GET the target and return the full body as text.
    /// Any non-success status is an error.
    pub async fn get_text(&self) -> E2eResult<String> {
        debug!("GET {}", self.url);
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(E2eError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}
