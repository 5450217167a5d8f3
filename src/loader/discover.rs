//! Remote repository discovery over HTTP.
//!
//! The authoritative mapping from a package name to its repository is
//! served by the package's own domain: a `<meta name="go-import">` tag in
//! the document at `https://<name>?go-get=1`. The tag's content is
//! `prefix vcs repo`; the prefix must be a prefix of the requested name,
//! and may be shorter, revealing the true module root of a deep package
//! path.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

/// The ceiling on the discovery request; a slow domain is treated as
/// having no answer.
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(1);

/// Look up the remote URL for a package name, returning the remote and
/// the possibly-truncated package name. Falls back to `https://<name>`
/// when the domain has no answer.
pub fn remote_for_package(pkg: &str) -> (String, String) {
    let fallback = (format!("https://{pkg}"), pkg.to_string());

    let url = format!("https://{pkg}?go-get=1");
    let client = match reqwest::blocking::Client::builder()
        .timeout(LOOKUP_TIMEOUT)
        .build()
    {
        Ok(client) => client,
        Err(_) => return fallback,
    };
    let body = match client.get(&url).send().and_then(|response| response.text()) {
        Ok(body) => body,
        Err(err) => {
            tracing::debug!("discovery request for {pkg} failed: {err}");
            return fallback;
        }
    };

    match parse_import_meta(pkg, &body) {
        Some((remote, name)) => (remote, name),
        None => fallback,
    }
}

/// Scan a lenient HTML document for a `go-import` meta tag whose prefix
/// covers the requested package, returning `(repo, prefix)`.
pub fn parse_import_meta(pkg: &str, body: &str) -> Option<(String, String)> {
    static META: OnceLock<Regex> = OnceLock::new();
    static ATTR: OnceLock<Regex> = OnceLock::new();
    let meta = META.get_or_init(|| Regex::new(r"(?is)<meta\s[^>]*>").unwrap());
    let attr = ATTR.get_or_init(|| {
        Regex::new(r#"(?is)\b(name|content)\s*=\s*["']([^"']*)["']"#).unwrap()
    });

    // Meta tags only matter in the head.
    let head = body
        .find("<body")
        .map(|index| &body[..index])
        .unwrap_or(body);

    for tag in meta.find_iter(head) {
        let mut name = None;
        let mut content = None;
        for capture in attr.captures_iter(tag.as_str()) {
            match capture[1].to_ascii_lowercase().as_str() {
                "name" => name = Some(capture[2].to_string()),
                "content" => content = Some(capture[2].to_string()),
                _ => {}
            }
        }
        if name.as_deref() != Some("go-import") {
            continue;
        }
        let content = content.unwrap_or_default();
        let fields: Vec<&str> = content.split_whitespace().collect();
        if fields.len() != 3 {
            continue;
        }
        // The prefix must cover the package we asked about; an exact match
        // or a shorter module root both qualify.
        if !pkg.starts_with(fields[0]) {
            continue;
        }
        return Some((fields[2].to_string(), fields[0].to_string()));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exact() {
        let body = r#"<html><head>
<meta name="go-import" content="example.com/avery git https://code.example.com/avery.git">
</head><body></body></html>"#;
        let (remote, name) = parse_import_meta("example.com/avery", body).unwrap();
        assert_eq!(remote, "https://code.example.com/avery.git");
        assert_eq!(name, "example.com/avery");
    }

    #[test]
    fn test_parse_truncates_to_prefix() {
        let body = r#"<meta name="go-import" content="example.com/avery git https://code.example.com/avery">"#;
        let (_, name) = parse_import_meta("example.com/avery/sub/pkg", body).unwrap();
        assert_eq!(name, "example.com/avery");
    }

    #[test]
    fn test_parse_ignores_foreign_prefix() {
        let body = r#"<meta name="go-import" content="other.com/thing git https://code.example.com/thing">"#;
        assert!(parse_import_meta("example.com/avery", body).is_none());
    }

    #[test]
    fn test_parse_ignores_other_meta() {
        let body = r#"<meta name="go-source" content="example.com/avery home dir file">
<meta charset="utf-8">"#;
        assert!(parse_import_meta("example.com/avery", body).is_none());
    }

    #[test]
    fn test_parse_ignores_body() {
        let body = r#"<html><head></head><body>
<meta name="go-import" content="example.com/avery git https://evil.example.com/avery">
</body></html>"#;
        assert!(parse_import_meta("example.com/avery", body).is_none());
    }

    #[test]
    fn test_parse_requires_three_fields() {
        let body = r#"<meta name="go-import" content="example.com/avery git">"#;
        assert!(parse_import_meta("example.com/avery", body).is_none());
    }
}
