//! Error types for the sync binary.
//!
//! [`EngineError`] is the top-level error type that wraps every failure
//! mode during start-up and the sync run.

/// Top-level error for the sync binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: markersync_core::config::ConfigError,
    },

    /// The record store could not be opened.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: markersync_store::StoreError,
    },

    /// The icon provisioner could not be built.
    #[error("icon error: {source}")]
    Icons {
        /// The underlying icon error.
        #[from]
        source: markersync_icons::IconError,
    },

    /// The namespace could not be bootstrapped.
    #[error("lifecycle error: {source}")]
    Lifecycle {
        /// The underlying lifecycle error.
        #[from]
        source: markersync_core::lifecycle::LifecycleError,
    },

    /// Observer API server failed to start.
    #[error("observer error: {source}")]
    Observer {
        /// The underlying startup error.
        #[from]
        source: markersync_observer::startup::StartupError,
    },
}
