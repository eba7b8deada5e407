//! Per-identity icon cache.
//!
//! [`IconProvisioner::get_icon`] resolves an entity to an icon handle.
//! The first call for an identity renders the URL, downloads the image, and
//! registers it as `skin_<identity>`; the handle is then cached for the life
//! of the provisioner. Concurrent calls for the same identity share one
//! download. A failed attempt is not cached: the caller gets the default
//! icon and the next call tries again.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use markersync_overlay::OverlayService;
use markersync_types::{IconHandle, LiveEntity};
use tokio::sync::{Mutex, OnceCell, Semaphore};

use crate::error::IconError;
use crate::fetch::AssetFetcher;
use crate::template::{DEFAULT_URL_TEMPLATE, IconUrlTemplate};

/// Prefix of every registered icon ID.
pub const ICON_ID_PREFIX: &str = "skin_";

/// Settings for an [`IconProvisioner`].
#[derive(Debug, Clone)]
pub struct ProvisionerConfig {
    /// When `false`, every entity gets the default icon and nothing is
    /// downloaded.
    pub enabled: bool,
    /// `minijinja` template producing the icon URL.
    pub url_template: String,
    /// Connect and total request timeout.
    pub timeout: Duration,
    /// Maximum downloads in flight at once.
    pub max_concurrent_fetches: usize,
    /// `User-Agent` header sent with downloads.
    pub user_agent: String,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url_template: DEFAULT_URL_TEMPLATE.to_owned(),
            timeout: Duration::from_secs(5),
            max_concurrent_fetches: 4,
            user_agent: "markersync-icon-fetcher".to_owned(),
        }
    }
}

type IconCell = Arc<OnceCell<IconHandle>>;

/// Resolves entities to icon handles, provisioning each identity at most
/// once per successful attempt.
#[derive(Debug)]
pub struct IconProvisioner<O> {
    overlay: Arc<O>,
    enabled: bool,
    template: IconUrlTemplate,
    fetcher: AssetFetcher,
    fetch_permits: Semaphore,
    cache: Mutex<HashMap<String, IconCell>>,
}

impl<O: OverlayService> IconProvisioner<O> {
    /// Build a provisioner registering icons on `overlay`.
    ///
    /// # Errors
    ///
    /// Returns [`IconError::Template`] if the URL template does not parse
    /// and [`IconError::Client`] if the HTTP client cannot be built.
    pub fn new(overlay: Arc<O>, config: &ProvisionerConfig) -> Result<Self, IconError> {
        let template = IconUrlTemplate::new(&config.url_template)?;
        let fetcher = AssetFetcher::new(config.timeout, &config.user_agent)?;
        Ok(Self {
            overlay,
            enabled: config.enabled,
            template,
            fetcher,
            fetch_permits: Semaphore::new(config.max_concurrent_fetches.max(1)),
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Whether personalised icons are provisioned at all.
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Icon handle for `entity`. Never fails: any provisioning error is
    /// logged and the service's default icon is returned.
    pub async fn get_icon(&self, entity: &LiveEntity) -> IconHandle {
        if !self.enabled {
            return self.overlay.default_icon();
        }

        let cell = self.cell_for(&entity.identity).await;
        match cell.get_or_try_init(|| self.provision(entity)).await {
            Ok(handle) => handle.clone(),
            Err(e) => {
                tracing::warn!(
                    identity = entity.identity,
                    name = entity.display_name,
                    error = %e,
                    "Icon provisioning failed, using default icon"
                );
                self.overlay.default_icon()
            }
        }
    }

    /// Handle already provisioned for `identity`, if any.
    pub async fn cached(&self, identity: &str) -> Option<IconHandle> {
        self.cache
            .lock()
            .await
            .get(identity)
            .and_then(|cell| cell.get().cloned())
    }

    /// Number of identities with a provisioned icon.
    pub async fn cached_count(&self) -> usize {
        self.cache
            .lock()
            .await
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    async fn cell_for(&self, identity: &str) -> IconCell {
        Arc::clone(
            self.cache
                .lock()
                .await
                .entry(identity.to_owned())
                .or_default(),
        )
    }

    async fn provision(&self, entity: &LiveEntity) -> Result<IconHandle, IconError> {
        let url = self.template.render(&entity.identity, &entity.display_name)?;

        let bytes = {
            let _permit = self
                .fetch_permits
                .acquire()
                .await
                .map_err(|e| IconError::FetchFailed {
                    url: url.clone(),
                    reason: e.to_string(),
                })?;
            self.fetcher.fetch(&url).await?
        };

        let icon_id = format!("{ICON_ID_PREFIX}{}", entity.identity);
        let handle = self
            .overlay
            .register_icon(&icon_id, &entity.display_name, bytes)
            .await
            .map_err(|source| IconError::RegisterFailed {
                icon_id: icon_id.clone(),
                source,
            })?;

        tracing::debug!(identity = entity.identity, icon = %handle, "Provisioned icon");
        Ok(handle)
    }
}
