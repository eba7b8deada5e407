//! Icon URL rendering via `minijinja`.
//!
//! The template sees two variables: `identity` (the stable entity token)
//! and `name` (the display name). Both arrive percent-encoded as single
//! URL path segments, so `#`, `?`, `/` and spaces in a name cannot change
//! which resource is fetched.

use minijinja::{Environment, context};
use reqwest::Url;

use crate::error::IconError;

/// Helm render of the entity's skin, keyed by display name.
pub const DEFAULT_URL_TEMPLATE: &str = "https://mineskin.eu/helm/{{ name }}/100.png";

const TEMPLATE_NAME: &str = "icon_url";

/// A compiled icon URL template.
#[derive(Debug)]
pub struct IconUrlTemplate {
    env: Environment<'static>,
}

impl IconUrlTemplate {
    /// Compile `source`.
    ///
    /// # Errors
    ///
    /// Returns [`IconError::Template`] if the template does not parse.
    pub fn new(source: &str) -> Result<Self, IconError> {
        let mut env = Environment::new();
        env.add_template_owned(TEMPLATE_NAME, source.to_owned())
            .map_err(|e| IconError::Template(format!("failed to add icon URL template: {e}")))?;
        Ok(Self { env })
    }

    /// Render the URL for one entity.
    ///
    /// # Errors
    ///
    /// Returns [`IconError::Template`] if rendering fails or yields an empty
    /// string.
    pub fn render(&self, identity: &str, name: &str) -> Result<String, IconError> {
        let identity = encode_segment(identity)?;
        let name = encode_segment(name)?;
        let url = self
            .env
            .get_template(TEMPLATE_NAME)
            .map_err(|e| IconError::Template(format!("missing icon URL template: {e}")))?
            .render(context! { identity => identity, name => name })
            .map_err(|e| IconError::Template(format!("icon URL render failed: {e}")))?;

        let url = url.trim();
        if url.is_empty() {
            return Err(IconError::Template("icon URL rendered empty".to_owned()));
        }
        Ok(url.to_owned())
    }
}

/// Percent-encode `raw` as one URL path segment.
fn encode_segment(raw: &str) -> Result<String, IconError> {
    let mut url = Url::parse("http://segment.invalid/")
        .map_err(|e| IconError::Template(format!("segment encoder: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| IconError::Template("segment encoder has no path".to_owned()))?
        .pop_if_empty()
        .push(raw);
    Ok(url.path().trim_start_matches('/').to_owned())
}

impl Default for IconUrlTemplate {
    fn default() -> Self {
        let mut env = Environment::new();
        // The built-in template is a constant known to parse.
        let _ = env.add_template(TEMPLATE_NAME, DEFAULT_URL_TEMPLATE);
        Self { env }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_template_uses_display_name() {
        let url = IconUrlTemplate::default().render("a1", "Alice").unwrap();
        assert_eq!(url, "https://mineskin.eu/helm/Alice/100.png");
    }

    #[test]
    fn reserved_characters_in_name_are_encoded() {
        let url = IconUrlTemplate::default()
            .render("t9", "Ann#Lee /x?y")
            .unwrap();
        assert_eq!(url, "https://mineskin.eu/helm/Ann%23Lee%20%2Fx%3Fy/100.png");
    }

    #[test]
    fn identity_is_encoded_too() {
        let tpl = IconUrlTemplate::new("http://skins.local/{{ identity }}.png").unwrap();
        assert_eq!(
            tpl.render("a/b", "Bob").unwrap(),
            "http://skins.local/a%2Fb.png"
        );
    }

    #[test]
    fn custom_template_can_use_identity() {
        let tpl = IconUrlTemplate::new("http://skins.local/{{ identity }}.png?n={{ name }}").unwrap();
        let url = tpl.render("tok-9", "Bob").unwrap();
        assert_eq!(url, "http://skins.local/tok-9.png?n=Bob");
    }

    #[test]
    fn broken_template_is_rejected() {
        assert!(matches!(
            IconUrlTemplate::new("http://x/{{ name"),
            Err(IconError::Template(_))
        ));
    }

    #[test]
    fn empty_render_is_an_error() {
        let tpl = IconUrlTemplate::new("{{ missing }}").unwrap();
        assert!(tpl.render("a1", "Alice").is_err());
    }
}
