//! Post URL parsing and validation.
//!
//! A [`PostReference`] is only ever produced by [`PostReference::parse`], which
//! accepts status URLs on the primary host or its short alias:
//! - https://twitter.com/USER/status/ID
//! - https://www.twitter.com/USER/status/ID
//! - https://x.com/USER/status/ID
//! - Any of the above with a query string or fragment (both are stripped)

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status URL pattern. Capture groups: 1 = host, 2 = username, 3 = status id.
static STATUS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.)?(twitter\.com|x\.com)/([A-Za-z0-9_]+)/status/(\d+)")
        .expect("status URL pattern is valid")
});

/// Errors that can occur while resolving a post URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PostUrlError {
    /// Input was empty after trimming.
    #[error("URL is required")]
    Missing,

    /// Input did not match the status URL pattern.
    #[error("Invalid Twitter URL")]
    InvalidUrl,
}

/// Result type for post URL resolution.
pub type PostUrlResult<T> = Result<T, PostUrlError>;

/// Host a post URL was written against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostHost {
    /// twitter.com
    Twitter,
    /// x.com
    X,
}

impl PostHost {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostHost::Twitter => "twitter.com",
            PostHost::X => "x.com",
        }
    }
}

impl fmt::Display for PostHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized reference to a single post.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostReference {
    /// Numeric status id
    pub id: String,
    /// Author handle from the URL path
    pub username: String,
    /// Host the URL used
    pub host: PostHost,
    /// Source URL with query string and fragment removed
    pub url: String,
}

impl PostReference {
    /// Resolve a raw, untrusted URL into a post reference.
    pub fn parse(raw: &str) -> PostUrlResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PostUrlError::Missing);
        }

        let clean = strip_query(raw);
        let caps = STATUS_URL.captures(clean).ok_or(PostUrlError::InvalidUrl)?;

        let host = match &caps[1] {
            "twitter.com" => PostHost::Twitter,
            _ => PostHost::X,
        };

        Ok(Self {
            id: caps[3].to_string(),
            username: caps[2].to_string(),
            host,
            url: clean.to_string(),
        })
    }

    /// Path component of the status URL (`/USER/status/ID`).
    pub fn status_path(&self) -> String {
        format!("/{}/status/{}", self.username, self.id)
    }
}

impl fmt::Display for PostReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// Drop everything from the first `?` or `#` onwards.
fn strip_query(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success_cases() {
        let post = PostReference::parse("https://x.com/user/status/123?foo=bar").unwrap();
        assert_eq!(post.id, "123");
        assert_eq!(post.username, "user");
        assert_eq!(post.host, PostHost::X);
        assert_eq!(post.url, "https://x.com/user/status/123");

        let post = PostReference::parse("https://twitter.com/jack/status/20").unwrap();
        assert_eq!(post.id, "20");
        assert_eq!(post.host, PostHost::Twitter);

        // www prefix and plain http
        assert_eq!(
            PostReference::parse("http://www.twitter.com/a_b/status/1460323737035677698").unwrap().id,
            "1460323737035677698"
        );

        // Trailing media path is tolerated
        assert_eq!(
            PostReference::parse("https://x.com/user/status/987/video/1").unwrap().id,
            "987"
        );

        // Fragment and surrounding whitespace
        let post = PostReference::parse("  https://x.com/user/status/55#top  ").unwrap();
        assert_eq!(post.id, "55");
        assert_eq!(post.url, "https://x.com/user/status/55");
    }

    #[test]
    fn test_parse_error_cases() {
        assert_eq!(PostReference::parse(""), Err(PostUrlError::Missing));
        assert_eq!(PostReference::parse("   "), Err(PostUrlError::Missing));

        for bad in [
            "not a url",
            "https://example.com/user/status/123",
            "https://fxtwitter.com/user/status/123",
            "https://x.com/user/status/",
            "https://x.com/user/status/abc",
            "https://x.com/status/123",
            "ftp://x.com/user/status/123",
            "https://mobile.twitter.com/user/status/123",
            "x.com/user/status/123",
            // Query stripping happens before matching
            "https://example.com/?u=https://x.com/user/status/123",
        ] {
            assert_eq!(PostReference::parse(bad), Err(PostUrlError::InvalidUrl), "{bad}");
        }
    }

    #[test]
    fn test_id_is_exact_digit_group() {
        for id in ["1", "42", "1234567890123456789"] {
            let url = format!("https://twitter.com/someone/status/{id}?s=20&t=abc");
            assert_eq!(PostReference::parse(&url).unwrap().id, id);
        }
    }

    #[test]
    fn test_status_path() {
        let post = PostReference::parse("https://x.com/user/status/123").unwrap();
        assert_eq!(post.status_path(), "/user/status/123");
    }

    #[test]
    fn test_error_display() {
        assert_eq!(PostUrlError::Missing.to_string(), "URL is required");
        assert_eq!(PostUrlError::InvalidUrl.to_string(), "Invalid Twitter URL");
    }
}
