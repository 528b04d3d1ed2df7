//! Redirect target checks
//!
//! A target is handed back to visitors in a `Location` header, so only
//! absolute `http`/`https` URLs with a host are stored. Script-capable and
//! local schemes get their own error so the owner sees why.

use url::Url;

use crate::errors::LinkgateError;

#[derive(Debug, PartialEq, Eq)]
pub enum TargetUrlError {
    Empty,
    /// Script-capable or local scheme, e.g. `javascript:`
    BlockedScheme(String),
    /// Any other non-web scheme, e.g. `ftp:` or `mailto:`
    UnsupportedScheme(String),
    MissingHost,
    Malformed(String),
}

impl std::fmt::Display for TargetUrlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "URL cannot be empty"),
            Self::BlockedScheme(scheme) => write!(f, "Scheme not allowed: {}:", scheme),
            Self::UnsupportedScheme(scheme) => write!(
                f,
                "Unsupported scheme {}:, only http and https targets are stored",
                scheme
            ),
            Self::MissingHost => write!(f, "URL has no host"),
            Self::Malformed(msg) => write!(f, "Invalid URL format: {}", msg),
        }
    }
}

impl std::error::Error for TargetUrlError {}

const BLOCKED_SCHEMES: &[&str] = &["javascript", "vbscript", "data", "file", "about", "blob"];

/// Check a trimmed target URL before it is stored
pub fn validate_url(raw: &str) -> Result<(), TargetUrlError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(TargetUrlError::Empty);
    }

    let parsed = Url::parse(raw).map_err(|e| TargetUrlError::Malformed(e.to_string()))?;

    // Url 已把 scheme 规范为小写
    match parsed.scheme() {
        "http" | "https" => {}
        scheme if BLOCKED_SCHEMES.contains(&scheme) => {
            return Err(TargetUrlError::BlockedScheme(scheme.to_string()));
        }
        scheme => return Err(TargetUrlError::UnsupportedScheme(scheme.to_string())),
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(TargetUrlError::MissingHost);
    }
    Ok(())
}

impl From<TargetUrlError> for LinkgateError {
    fn from(error: TargetUrlError) -> Self {
        let message = match &error {
            TargetUrlError::Empty => "URL cannot be empty".to_string(),
            TargetUrlError::BlockedScheme(_) => "This URL protocol is not allowed".to_string(),
            TargetUrlError::UnsupportedScheme(_) => {
                "URL must start with http:// or https://".to_string()
            }
            TargetUrlError::MissingHost => "URL must include a host".to_string(),
            TargetUrlError::Malformed(msg) => format!("Invalid URL format: {}", msg),
        };
        LinkgateError::validation("target_url", message)
    }
}
