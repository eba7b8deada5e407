//! Icon provisioning for live map markers.
//!
//! Each entity gets a personalised icon the first time its marker is
//! created: the icon URL is rendered from a template, the image is
//! downloaded, and the bytes are registered with the rendering service.
//! Any failure along the way falls back to the service's default icon;
//! icon trouble never blocks a marker.
//!
//! # Modules
//!
//! - [`template`] -- [`IconUrlTemplate`], `minijinja` URL rendering
//! - [`fetch`] -- [`AssetFetcher`], bounded-time HTTP downloads
//! - [`provisioner`] -- [`IconProvisioner`], the per-identity cache
//! - [`error`] -- [`IconError`]

pub mod error;
pub mod fetch;
pub mod provisioner;
pub mod template;

pub use error::IconError;
pub use fetch::{AssetFetcher, MAX_ICON_BYTES};
pub use provisioner::{IconProvisioner, ProvisionerConfig};
pub use template::{DEFAULT_URL_TEMPLATE, IconUrlTemplate};
