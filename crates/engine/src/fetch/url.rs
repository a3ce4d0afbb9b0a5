//! URL normalization for manifest entries and cache keys.

use url::Url;

/// Error type for URL normalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize an absolute URL string.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };
    let parsed = Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    finish(parsed)
}

/// Resolve a manifest or request URL against the application origin.
///
/// Root-relative paths (`/orders`) are joined onto `origin`; anything else
/// goes through [`canonicalize`].
pub fn resolve(origin: &Url, input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    if trimmed.starts_with('/') && !trimmed.starts_with("//") {
        let joined = origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
        return finish(joined);
    }

    canonicalize(trimmed)
}

/// Whether `url` shares scheme, host and port with `origin`.
pub fn same_origin(origin: &Url, url: &Url) -> bool {
    origin.origin() == url.origin()
}

fn finish(mut parsed: Url) -> Result<Url, UrlError> {
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let lowered = host.to_lowercase();
        parsed.set_host(Some(&lowered)).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("http://localhost:5000").unwrap()
    }

    #[test]
    fn test_canonicalize_default_scheme() {
        let url = canonicalize("cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/css/bootstrap.rtl.min.css").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("cdn.jsdelivr.net"));
    }

    #[test]
    fn test_canonicalize_lowercase_host() {
        let url = canonicalize("https://CODE.JQUERY.COM/jquery-3.6.0.min.js").unwrap();
        assert_eq!(url.host_str(), Some("code.jquery.com"));
    }

    #[test]
    fn test_canonicalize_remove_fragment_keep_query() {
        let url = canonicalize("https://fonts.googleapis.com/css2?family=Tajawal&display=swap#x").unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.query(), Some("family=Tajawal&display=swap"));
    }

    #[test]
    fn test_canonicalize_unsupported_scheme() {
        assert!(matches!(canonicalize("file:///etc/passwd"), Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_canonicalize_empty() {
        assert!(matches!(canonicalize("   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_resolve_root_relative() {
        let url = resolve(&origin(), "/static/css/main.css").unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/static/css/main.css");

        let root = resolve(&origin(), "/").unwrap();
        assert_eq!(root.as_str(), "http://localhost:5000/");
    }

    #[test]
    fn test_resolve_absolute_passes_through() {
        let url = resolve(&origin(), "https://code.jquery.com/jquery-3.6.0.min.js").unwrap();
        assert_eq!(url.host_str(), Some("code.jquery.com"));
    }

    #[test]
    fn test_resolve_protocol_relative_is_not_joined() {
        let url = resolve(&origin(), "//cdn.jsdelivr.net/npm/x.js");
        assert!(url.is_err() || url.unwrap().host_str() != Some("localhost"));
    }

    #[test]
    fn test_same_origin() {
        let origin = origin();
        assert!(same_origin(&origin, &Url::parse("http://localhost:5000/orders").unwrap()));
        assert!(!same_origin(&origin, &Url::parse("http://localhost:5001/orders").unwrap()));
        assert!(!same_origin(&origin, &Url::parse("https://localhost:5000/orders").unwrap()));
    }
}
