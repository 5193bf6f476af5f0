//! Source URL validation performed before a job is created.
//!
//! Rejected requests never reach the job store; the orchestrator only sees
//! rows built from a URL that passed [`validate_source_url`].

use url::Url;

/// Longest URL accepted at intake.
pub const MAX_URL_LEN: usize = 500;

/// Hosts accepted when the config does not name any.
pub const DEFAULT_ALLOWED_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtu.be",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntakeError {
    #[error("URL cannot be empty")]
    Empty,
    #[error("URL is too long")]
    TooLong,
    #[error("Invalid URL format")]
    Malformed,
    #[error("Unsupported URL")]
    UnsupportedHost,
}

/// Validate a user-supplied source URL.
///
/// `allowed_hosts`: `None` uses [`DEFAULT_ALLOWED_HOSTS`]; an empty slice accepts
/// any http(s) host. Host matching is exact and case-insensitive.
pub fn validate_source_url(raw: &str, allowed_hosts: Option<&[String]>) -> Result<Url, IntakeError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(IntakeError::Empty);
    }
    if raw.len() > MAX_URL_LEN {
        return Err(IntakeError::TooLong);
    }

    let url = Url::parse(raw).map_err(|_| IntakeError::Malformed)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(IntakeError::Malformed);
    }
    let host = url
        .host_str()
        .ok_or(IntakeError::Malformed)?
        .to_ascii_lowercase();

    let allowed = match allowed_hosts {
        Some([]) => true,
        Some(hosts) => hosts.iter().any(|h| h.eq_ignore_ascii_case(&host)),
        None => DEFAULT_ALLOWED_HOSTS.contains(&host.as_str()),
    };
    if !allowed {
        return Err(IntakeError::UnsupportedHost);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_default_video_hosts() {
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?v=dQw4w9WgXcQ",
            "http://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "  https://youtu.be/dQw4w9WgXcQ  ",
        ] {
            assert!(validate_source_url(url, None).is_ok(), "{url}");
        }
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(validate_source_url("", None), Err(IntakeError::Empty));
        assert_eq!(validate_source_url("   ", None), Err(IntakeError::Empty));
        assert_eq!(
            validate_source_url("not a url", None),
            Err(IntakeError::Malformed)
        );
        assert_eq!(
            validate_source_url("ftp://youtube.com/x", None),
            Err(IntakeError::Malformed)
        );
        assert_eq!(
            validate_source_url("https://vimeo.com/123456", None),
            Err(IntakeError::UnsupportedHost)
        );
        let long = format!("https://youtu.be/{}", "a".repeat(MAX_URL_LEN));
        assert_eq!(validate_source_url(&long, None), Err(IntakeError::TooLong));
    }

    #[test]
    fn explicit_allow_list() {
        let hosts = vec!["Vimeo.com".to_string()];
        assert!(validate_source_url("https://vimeo.com/1", Some(&hosts)).is_ok());
        assert_eq!(
            validate_source_url("https://youtu.be/x", Some(&hosts)),
            Err(IntakeError::UnsupportedHost)
        );
        let any: Vec<String> = Vec::new();
        assert!(validate_source_url("https://example.org/v.mp4", Some(&any)).is_ok());
    }
}
