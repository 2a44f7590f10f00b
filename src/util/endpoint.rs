use thiserror::Error;
use url::Url;

/// Errors that can occur while resolving an API path against the base URL.
#[derive(Error, Debug)]
pub enum EndpointError {
    /// The base URL or path could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The base URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The path was not absolute (`/api/...`).
    #[error("API path must start with '/': {0}")]
    RelativePath(String),
    /// The path would leave the API host (e.g. `//other.host/...`).
    #[error("API path points outside {base}: {path}")]
    CrossOrigin { base: String, path: String },
}

/// Resolves an absolute API path (e.g. `/api/refresh`) against `base`.
///
/// Only the scheme, host and port of `base` survive; any path on the base is
/// replaced, matching how the web client issues same-origin requests.
///
/// # Examples
///
/// ```
/// use anilog::util::resolve_endpoint;
///
/// let url = resolve_endpoint("https://anilog.example.com", "/api/refresh").unwrap();
/// assert_eq!(url.as_str(), "https://anilog.example.com/api/refresh");
///
/// assert!(resolve_endpoint("ftp://anilog.example.com", "/api/refresh").is_err());
/// assert!(resolve_endpoint("https://anilog.example.com", "api/refresh").is_err());
/// ```
pub fn resolve_endpoint(base: &str, path: &str) -> Result<Url, EndpointError> {
    let base = Url::parse(base)?;

    match base.scheme() {
        "http" | "https" => {}
        scheme => return Err(EndpointError::UnsupportedScheme(scheme.to_owned())),
    }

    if !path.starts_with('/') {
        return Err(EndpointError::RelativePath(path.to_owned()));
    }

    // `//host` and `/\host` are scheme-relative for http(s) URLs.
    if path[1..].starts_with(['/', '\\']) {
        return Err(cross_origin(&base, path));
    }

    let url = base.join(path)?;
    if url.origin() != base.origin() {
        return Err(cross_origin(&base, path));
    }
    Ok(url)
}

fn cross_origin(base: &Url, path: &str) -> EndpointError {
    EndpointError::CrossOrigin {
        base: base.origin().ascii_serialization(),
        path: path.to_owned(),
    }
}
