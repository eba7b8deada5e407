//! Error types for icon provisioning.
//!
//! None of these reach the reconciliation engine: the provisioner logs them
//! and hands out the default icon instead.

use std::time::Duration;

use markersync_overlay::OverlayError;

/// Errors raised while provisioning one icon.
#[derive(Debug, thiserror::Error)]
pub enum IconError {
    /// The URL template failed to parse or render.
    #[error("icon URL template error: {0}")]
    Template(String),

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(String),

    /// The download failed or returned something other than 200.
    #[error("fetching {url} failed: {reason}")]
    FetchFailed {
        /// The URL being fetched.
        url: String,
        /// What went wrong.
        reason: String,
    },

    /// The download did not finish in time.
    #[error("fetching {url} timed out after {timeout:?}")]
    FetchTimeout {
        /// The URL being fetched.
        url: String,
        /// The configured limit.
        timeout: Duration,
    },

    /// The rendering service refused the downloaded image.
    #[error("registering icon {icon_id} failed: {source}")]
    RegisterFailed {
        /// The icon ID being registered.
        icon_id: String,
        /// The service's error.
        #[source]
        source: OverlayError,
    },
}
