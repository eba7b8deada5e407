//! Type-safe identifier wrappers around [`String`].
//!
//! Marker IDs and icon handles are both plain strings on the rendering
//! service side. Wrapping them keeps a marker ID from being passed where an
//! icon handle is expected (and vice versa) and keeps the identity-to-marker
//! mapping in one place.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Generates a newtype wrapper around [`String`] with standard derives.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[serde(transparent)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier string.
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Borrow the raw identifier string.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Return the inner [`String`].
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id! {
    /// Identifier of a marker inside the overlay namespace.
    ///
    /// Always `prefix + identity`; see [`MarkerId::for_identity`].
    MarkerId
}

define_string_id! {
    /// Handle to an icon asset registered with the rendering service.
    IconHandle
}

/// Identifier of the icon every rendering service ships with.
pub const DEFAULT_ICON_ID: &str = "default";

impl MarkerId {
    /// Derive the marker ID for a live entity identity.
    ///
    /// The mapping is a plain concatenation, so two distinct identities can
    /// never produce the same marker ID under one prefix.
    pub fn for_identity(prefix: &str, identity: &str) -> Self {
        let mut raw = String::with_capacity(prefix.len().saturating_add(identity.len()));
        raw.push_str(prefix);
        raw.push_str(identity);
        Self(raw)
    }
}

impl IconHandle {
    /// The shared fallback icon handle.
    pub fn default_icon() -> Self {
        Self::new(DEFAULT_ICON_ID)
    }

    /// Whether this handle points at the shared fallback icon.
    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_ICON_ID
    }
}
