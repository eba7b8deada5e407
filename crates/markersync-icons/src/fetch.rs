//! Bounded-time HTTP downloads of icon assets.

use std::time::Duration;

use reqwest::StatusCode;

use crate::error::IconError;

/// Largest icon body accepted, in bytes.
pub const MAX_ICON_BYTES: usize = 1_048_576;

/// Downloads icon images over HTTP.
///
/// Both the connect phase and the whole request are capped at the same
/// timeout, and bodies at [`MAX_ICON_BYTES`]. Only a `200 OK` counts as
/// success.
#[derive(Debug, Clone)]
pub struct AssetFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl AssetFetcher {
    /// Build a fetcher.
    ///
    /// # Errors
    ///
    /// Returns [`IconError::Client`] if the TLS backend cannot initialise.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, IconError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| IconError::Client(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    /// Download `url` and return the body.
    ///
    /// # Errors
    ///
    /// Returns [`IconError::FetchTimeout`] if the request exceeds the
    /// timeout and [`IconError::FetchFailed`] for any other transport error,
    /// a non-200 status, or a body over [`MAX_ICON_BYTES`].
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, IconError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(url, &e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(IconError::FetchFailed {
                url: url.to_owned(),
                reason: format!("server returned {status}"),
            });
        }

        if response
            .content_length()
            .is_some_and(|len| usize::try_from(len).unwrap_or(usize::MAX) > MAX_ICON_BYTES)
        {
            return Err(too_large(url));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| self.transport_error(url, &e))?
        {
            if body.len().saturating_add(chunk.len()) > MAX_ICON_BYTES {
                return Err(too_large(url));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }

    fn transport_error(&self, url: &str, err: &reqwest::Error) -> IconError {
        if err.is_timeout() {
            IconError::FetchTimeout {
                url: url.to_owned(),
                timeout: self.timeout,
            }
        } else {
            IconError::FetchFailed {
                url: url.to_owned(),
                reason: err.to_string(),
            }
        }
    }
}

fn too_large(url: &str) -> IconError {
    IconError::FetchFailed {
        url: url.to_owned(),
        reason: format!("body exceeds {MAX_ICON_BYTES} bytes"),
    }
}
