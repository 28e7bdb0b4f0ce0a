//! Instance name handling

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::error::{Error, Result};

static SYS_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9]{32}$").expect("valid sys_id regex"));

/// Turns `dev00000` or `https://dev00000.service-now.com/` into a base URL.
///
/// Plain `http://` URLs are refused unless `allow_insecure_http` is set,
/// which is only meant for local mock servers and TLS terminating proxies.
pub fn normalize_instance(instance: &str, allow_insecure_http: bool) -> Result<Url> {
    let instance = instance.trim();
    if instance.contains("://") {
        let trimmed = instance.trim_end_matches('/');
        if trimmed.starts_with("http://") && !allow_insecure_http {
            return Err(Error::Instance("Must provide https:// url not http://".to_string()));
        }
        return Ok(Url::parse(trimmed)?);
    }
    if !instance.is_empty() && !instance.contains('.') {
        return Ok(Url::parse(&format!("https://{}.service-now.com", instance))?);
    }

    Err(Error::Instance(
        "Instance name not well-formed. Pass a full URL or instance name.".to_string(),
    ))
}

/// Instance URL as a string without the trailing slash `Url` likes to add
pub(crate) fn base_str(url: &Url) -> &str {
    url.as_str().trim_end_matches('/')
}

/// Attempt to guess if this is a probable sys_id
pub fn guess_is_sys_id(value: &str) -> bool {
    SYS_ID.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_name() {
        let url = normalize_instance("dev00000", false).unwrap();
        assert_eq!(base_str(&url), "https://dev00000.service-now.com");
    }

    #[test]
    fn test_full_url() {
        let url = normalize_instance("https://dev00000.service-now.com/", false).unwrap();
        assert_eq!(base_str(&url), "https://dev00000.service-now.com");
    }

    #[test]
    fn test_http_rejected() {
        assert!(matches!(
            normalize_instance("http://dev00000.service-now.com", false),
            Err(Error::Instance(_))
        ));
        assert!(normalize_instance("http://127.0.0.1:8080", true).is_ok());
    }

    #[test]
    fn test_dotted_name_rejected() {
        assert!(matches!(
            normalize_instance("dev00000.service-now.com", false),
            Err(Error::Instance(_))
        ));
        assert!(normalize_instance("", false).is_err());
    }

    #[test]
    fn test_guess_is_sys_id() {
        assert!(guess_is_sys_id("6816f79cc0a8016401c5a33be04be441"));
        assert!(!guess_is_sys_id("6816f79cc0a8016401c5a33be04be44"));
        assert!(!guess_is_sys_id("6816f79c-c0a8-0164-01c5-a33be04be441"));
    }
}
