//! URL extraction from chat text.
//!
//! Finds chat attachment paths (`/Content/Attachments/...`) and web URLs,
//! and resolves relative ones against an optional base site.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Attachment paths, optionally wrapped in parentheses, ending at a space or `)`.
static ATTACHMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:|\()/Content/Attachments/.*?(?: |\))").expect("attachment regex is valid")
});

/// Bare or schemed web URLs.
static WEB_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:https?://.)?(?:www\.)?[-a-zA-Z0-9@%._+~#=]{2,256}\.[a-z]{2,6}\b(?:[-a-zA-Z0-9@:%_+.~#?&/=]*)",
    )
    .expect("url regex is valid")
});

/// A URL found in text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedUrl {
    /// Absolute form, resolved against the base site when one was given.
    pub url: String,
    /// The URL as it appears in the text (brackets and line breaks removed).
    pub raw: String,
}

/// Extract attachment paths first, then web URLs from the remaining text.
pub fn extract_urls(text: &str, base_site: Option<&str>) -> Vec<ExtractedUrl> {
    let mut raw_urls: Vec<&str> = ATTACHMENT.find_iter(text).map(|m| m.as_str()).collect();

    let mut remaining = text.to_string();
    for attachment in &raw_urls {
        remaining = remaining.replace(attachment, "");
    }
    raw_urls.extend(WEB_URL.find_iter(&remaining).map(|m| m.as_str()));

    let base = base_site.and_then(|site| match Url::parse(site) {
        Ok(base) => Some(base),
        Err(e) => {
            tracing::warn!(base_site = site, error = %e, "invalid base site, keeping relative urls");
            None
        }
    });

    let extracted: Vec<ExtractedUrl> = raw_urls
        .into_iter()
        .map(|found| {
            let raw: String = found
                .chars()
                .filter(|c| !matches!(c, '(' | ')' | '\n'))
                .collect::<String>()
                .trim()
                .to_string();
            let url = match &base {
                Some(base) if !raw.starts_with("http://") && !raw.starts_with("https://") => base
                    .join(&raw)
                    .map(String::from)
                    .unwrap_or_else(|_| raw.clone()),
                _ => raw.clone(),
            };
            ExtractedUrl { url, raw }
        })
        .collect();

    tracing::debug!(count = extracted.len(), "extracted urls");
    extracted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_and_web_url() {
        let text = "look at /Content/Attachments/cat.png and https://example.com/page";
        let found = extract_urls(text, Some("https://chat.example.org"));
        assert_eq!(
            found,
            vec![
                ExtractedUrl {
                    url: "https://chat.example.org/Content/Attachments/cat.png".to_string(),
                    raw: "/Content/Attachments/cat.png".to_string(),
                },
                ExtractedUrl {
                    url: "https://example.com/page".to_string(),
                    raw: "https://example.com/page".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_parenthesized_attachment() {
        let found = extract_urls("image (/Content/Attachments/x.jpg) here", None);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].raw, "/Content/Attachments/x.jpg");
        assert_eq!(found[0].url, "/Content/Attachments/x.jpg");
    }

    #[test]
    fn test_bare_domain_resolves_against_base() {
        let found = extract_urls("see docs.rs for more", Some("https://base.example/"));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].raw, "docs.rs");
        assert_eq!(found[0].url, "https://base.example/docs.rs");
    }

    #[test]
    fn test_no_urls() {
        assert!(extract_urls("nothing to see here", None).is_empty());
    }
}
