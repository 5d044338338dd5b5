use anyhow::{anyhow, Result};
use reqwest::Url;

/// Parse "true"/"false"/"1"/"0" from an owned String.
pub fn parse_bool_flag(s: String) -> Option<bool> {
    parse_bool_str(&s)
}

/// Parse "true"/"false"/"1"/"0" from a &str.
pub fn parse_bool_str(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Returns true for localhost, loopback IPv4/IPv6, and 0.0.0.0 URLs.
pub fn is_local_endpoint_url(url: &str) -> bool {
    let parsed = match Url::parse(url.trim()) {
        Ok(parsed) => parsed,
        Err(_) => return false,
    };

    match parsed.host_str() {
        Some(host) => {
            let normalized = host.trim().to_ascii_lowercase();
            normalized == "localhost"
                || normalized == "[::1]"
                || normalized == "0.0.0.0"
                || normalized.starts_with("127.")
        }
        None => false,
    }
}

/// Joins percent-encoded path segments onto a base URL, keeping any path
/// prefix the base already has.
pub fn endpoint_url(base_url: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base_url.trim())
        .map_err(|error| anyhow!("invalid base URL '{base_url}': {error}"))?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("base URL '{base_url}' cannot carry a path"))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_helpers() {
        assert_eq!(parse_bool_str("true"), Some(true));
        assert_eq!(parse_bool_str("0"), Some(false));
        assert_eq!(parse_bool_flag("YES".to_string()), Some(true));
        assert_eq!(parse_bool_flag("off".to_string()), Some(false));
        assert_eq!(parse_bool_str("maybe"), None);
    }

    #[test]
    fn test_is_local_endpoint_url_normalizes_case_and_space() {
        assert!(is_local_endpoint_url(" HTTP://LOCALHOST:3001/api "));
        assert!(is_local_endpoint_url("http://127.0.0.1:3001"));
        assert!(is_local_endpoint_url("http://[::1]:3001"));
        assert!(is_local_endpoint_url("http://0.0.0.0:3001"));
        assert!(!is_local_endpoint_url("https://evil-localhost.com/api"));
        assert!(!is_local_endpoint_url("https://ccui.example.com"));
    }

    #[test]
    fn test_endpoint_url_encodes_segments_and_keeps_prefix() {
        let url = endpoint_url("http://localhost:3001", &["api", "stream", "a b/c"])
            .expect("url builds");
        assert_eq!(url.as_str(), "http://localhost:3001/api/stream/a%20b%2Fc");

        let url = endpoint_url("https://host/ccui/", &["api", "models"]).expect("url builds");
        assert_eq!(url.as_str(), "https://host/ccui/api/models");
    }

    #[test]
    fn test_endpoint_url_rejects_garbage() {
        assert!(endpoint_url("not a url", &["api"]).is_err());
        assert!(endpoint_url("mailto:me@example.com", &["api"]).is_err());
    }
}
