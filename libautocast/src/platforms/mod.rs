//! Platform registry and publisher abstraction
//!
//! Every supported social network is described by a static [`PlatformSpec`]
//! entry: content length limit, hashtag cap, media requirement, the fallback
//! hashtag set used when generation yields none, and the store column that
//! holds the remote post id. Code that needs per-platform behaviour looks it
//! up here instead of branching on the platform name.
//!
//! # Examples
//!
//! ```
//! use libautocast::platforms::{MediaRequirement, Platform};
//!
//! let spec = Platform::Instagram.spec();
//! assert_eq!(spec.max_length, 80);
//! assert_eq!(spec.media, MediaRequirement::Image);
//! assert_eq!("tiktok".parse::<Platform>().unwrap(), Platform::TikTok);
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AutocastError, PlatformError, Result};
use crate::types::Post;

pub mod facebook;
pub mod instagram;
pub mod linkedin;
pub mod tiktok;
pub mod x;

// Mock publisher is available for all builds (not just tests) to support integration tests
pub mod mock;

/// Supported target platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    LinkedIn,
    Facebook,
    Instagram,
    X,
    TikTok,
}

impl Platform {
    /// All platforms in registry order
    pub const ALL: [Platform; 5] = [
        Platform::LinkedIn,
        Platform::Facebook,
        Platform::Instagram,
        Platform::X,
        Platform::TikTok,
    ];

    /// Lowercase identifier used in config, storage and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::LinkedIn => "linkedin",
            Platform::Facebook => "facebook",
            Platform::Instagram => "instagram",
            Platform::X => "x",
            Platform::TikTok => "tiktok",
        }
    }

    /// Capability entry for this platform
    pub fn spec(&self) -> &'static PlatformSpec {
        &REGISTRY[*self as usize]
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = AutocastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "linkedin" => Ok(Platform::LinkedIn),
            "facebook" => Ok(Platform::Facebook),
            "instagram" => Ok(Platform::Instagram),
            "x" | "twitter" => Ok(Platform::X),
            "tiktok" => Ok(Platform::TikTok),
            other => Err(AutocastError::InvalidInput(format!(
                "Unknown platform '{}'. Valid options: linkedin, facebook, instagram, x, tiktok",
                other
            ))),
        }
    }
}

/// What a platform needs besides text before it accepts a post
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaRequirement {
    /// Text-only posts are accepted
    Optional,
    /// An image URL must be attached
    Image,
    /// Either a video URL or a video script must be present
    VideoOrScript,
}

/// Static capability description of one platform
#[derive(Debug)]
pub struct PlatformSpec {
    pub platform: Platform,
    pub display_name: &'static str,
    /// Maximum content length in characters (hashtags excluded)
    pub max_length: usize,
    /// Maximum number of hashtags kept for a post, `None` when unbounded
    pub hashtag_cap: Option<usize>,
    pub media: MediaRequirement,
    /// Whether generated content carries a structured video script
    pub supports_script: bool,
    pub default_hashtags: &'static [&'static str],
    /// Column of the `posts` table holding this platform's remote post id
    pub remote_id_column: &'static str,
}

// Indexed by `Platform as usize`; keep in enum order.
static REGISTRY: [PlatformSpec; 5] = [
    PlatformSpec {
        platform: Platform::LinkedIn,
        display_name: "LinkedIn",
        max_length: 200,
        hashtag_cap: None,
        media: MediaRequirement::Optional,
        supports_script: false,
        default_hashtags: &["Nextjs", "Nodejs", "WebDevelopment", "AI", "Automation"],
        remote_id_column: "linkedin_post_id",
    },
    PlatformSpec {
        platform: Platform::Facebook,
        display_name: "Facebook",
        max_length: 150,
        hashtag_cap: None,
        media: MediaRequirement::Optional,
        supports_script: false,
        default_hashtags: &["WebDev", "AI", "Automation", "Tech", "Programming"],
        remote_id_column: "facebook_post_id",
    },
    PlatformSpec {
        platform: Platform::Instagram,
        display_name: "Instagram",
        max_length: 80,
        hashtag_cap: Some(10),
        media: MediaRequirement::Image,
        supports_script: false,
        default_hashtags: &["WebDevelopment", "AIAutomation", "Nextjs", "Tech", "Code"],
        remote_id_column: "instagram_post_id",
    },
    PlatformSpec {
        platform: Platform::X,
        display_name: "X",
        max_length: 280,
        hashtag_cap: Some(3),
        media: MediaRequirement::Optional,
        supports_script: false,
        default_hashtags: &["AI", "Automation", "Tech"],
        remote_id_column: "x_post_id",
    },
    PlatformSpec {
        platform: Platform::TikTok,
        display_name: "TikTok",
        max_length: 75,
        hashtag_cap: Some(5),
        media: MediaRequirement::VideoOrScript,
        supports_script: true,
        default_hashtags: &["WebDev", "AI", "Coding", "TechTok"],
        remote_id_column: "tiktok_post_id",
    },
];

impl PlatformSpec {
    /// Fallback hashtags as owned strings
    pub fn default_hashtag_list(&self) -> Vec<String> {
        self.default_hashtags.iter().map(|t| t.to_string()).collect()
    }

    /// Truncate a hashtag list to this platform's cap
    pub fn cap_hashtags<'a>(&self, hashtags: &'a [String]) -> &'a [String] {
        match self.hashtag_cap {
            Some(cap) if hashtags.len() > cap => &hashtags[..cap],
            _ => hashtags,
        }
    }

    /// Check that a publish request satisfies the platform's requirements
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Validation` when the content is empty or the
    /// media requirement is not met.
    pub fn check_request(&self, request: &PublishRequest) -> std::result::Result<(), PlatformError> {
        if request.content.trim().is_empty() {
            return Err(PlatformError::Validation(format!(
                "{} post content cannot be empty",
                self.display_name
            )));
        }

        let has_media = request.media_url.as_deref().is_some_and(|m| !m.trim().is_empty());
        let has_script = request
            .video_script
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty());

        match self.media {
            MediaRequirement::Optional => Ok(()),
            MediaRequirement::Image if has_media => Ok(()),
            MediaRequirement::Image => Err(PlatformError::Validation(format!(
                "{} posts require an image URL",
                self.display_name
            ))),
            MediaRequirement::VideoOrScript if has_media || has_script => Ok(()),
            MediaRequirement::VideoOrScript => Err(PlatformError::Validation(format!(
                "{} posts require either a video URL or a video script",
                self.display_name
            ))),
        }
    }
}

/// Everything a publisher needs to put one post on its platform
#[derive(Debug, Clone, PartialEq)]
pub struct PublishRequest {
    pub platform: Platform,
    pub content: String,
    pub hashtags: Vec<String>,
    pub media_url: Option<String>,
    pub video_script: Option<String>,
}

impl PublishRequest {
    /// Build a request from a stored post
    pub fn from_post(post: &Post) -> Self {
        Self {
            platform: post.platform,
            content: post.content.clone(),
            hashtags: post.hashtags.clone(),
            media_url: post.media_url.clone(),
            video_script: post.video_script.clone(),
        }
    }
}

/// Successful publish as reported by a platform
#[derive(Debug, Clone, PartialEq)]
pub struct PublishReceipt {
    /// Platform-assigned identifier of the created post
    pub remote_id: String,
    pub message: Option<String>,
}

/// Publisher trait for dispatching one post to one platform
///
/// Implementations perform the platform's HTTP calls and report failures as
/// `PlatformError`s. Normalizing those failures into result values is the
/// job of [`crate::publisher::PublishGateway`].
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Platform this publisher posts to
    fn platform(&self) -> Platform;

    /// Whether credentials required for posting are present
    fn is_configured(&self) -> bool;

    /// Publish the request and return the remote post id
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Authentication` for rejected credentials,
    /// `PlatformError::RateLimit` for throttling, `PlatformError::Network` for
    /// transport failures and `PlatformError::Posting` for anything else.
    async fn publish(&self, request: &PublishRequest) -> Result<PublishReceipt>;
}

/// Append hashtags to content as a trailing `#tag` paragraph
pub(crate) fn append_hashtags(content: &str, hashtags: &[String]) -> String {
    if hashtags.is_empty() {
        return content.to_string();
    }
    format!("{}\n\n{}", content, hashtag_line(hashtags))
}

/// Render hashtags as a space separated `#tag` list
pub(crate) fn hashtag_line(hashtags: &[String]) -> String {
    hashtags
        .iter()
        .map(|tag| format!("#{}", tag.trim_start_matches('#')))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Truncate to at most `max_chars` characters, ending with "..." when cut
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str("...");
    truncated
}

/// Map a transport-level reqwest failure for `platform`
pub(crate) fn map_transport_error(platform: Platform, error: reqwest::Error) -> PlatformError {
    let name = platform.spec().display_name;
    if error.is_timeout() || error.is_connect() {
        PlatformError::Network(format!("{} request failed: {}", name, error))
    } else if error.is_decode() {
        PlatformError::Posting(format!("{} returned an unreadable response: {}", name, error))
    } else {
        PlatformError::Network(format!("{} request failed: {}", name, error))
    }
}

/// Turn a non-success HTTP response into a `PlatformError`
///
/// Successful responses are passed through untouched.
pub(crate) async fn check_status(
    platform: Platform,
    response: reqwest::Response,
) -> std::result::Result<reqwest::Response, PlatformError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(map_status_error(platform, status.as_u16(), &body))
}

/// HTTP client with the timeout used for every platform call
pub(crate) fn http_client(platform: Platform) -> std::result::Result<reqwest::Client, PlatformError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .map_err(|e| {
            PlatformError::Posting(format!(
                "Failed to build {} HTTP client: {}",
                platform.spec().display_name,
                e
            ))
        })
}

/// Check the status and decode a JSON body; an empty body decodes to `null`
pub(crate) async fn read_json(
    platform: Platform,
    response: reqwest::Response,
) -> std::result::Result<serde_json::Value, PlatformError> {
    let response = check_status(platform, response).await?;
    let text = response
        .text()
        .await
        .map_err(|e| map_transport_error(platform, e))?;

    if text.trim().is_empty() {
        return Ok(serde_json::Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| {
        PlatformError::Posting(format!(
            "{} returned invalid JSON: {}",
            platform.spec().display_name,
            e
        ))
    })
}

/// String or numeric id at a JSON pointer
pub(crate) fn id_at(body: &serde_json::Value, pointer: &str) -> Option<String> {
    match body.pointer(pointer)? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Placeholder stored when a platform accepts a post without returning its id
pub(crate) const UNKNOWN_REMOTE_ID: &str = "unknown";

pub(crate) fn map_status_error(platform: Platform, status: u16, body: &str) -> PlatformError {
    let name = platform.spec().display_name;
    let detail = truncate_chars(body.trim(), 200);

    match status {
        401 => PlatformError::Authentication(format!(
            "{} authentication failed (HTTP 401): {}. Refresh the access token.",
            name, detail
        )),
        403 => PlatformError::Authentication(format!(
            "{} permission denied (HTTP 403): {}. Check the app permissions.",
            name, detail
        )),
        429 => PlatformError::RateLimit(format!(
            "{} rate limit exceeded (HTTP 429): {}",
            name, detail
        )),
        400 | 422 => PlatformError::Validation(format!(
            "{} rejected the post (HTTP {}): {}",
            name, status, detail
        )),
        500..=599 => PlatformError::Network(format!(
            "{} server error (HTTP {}): {}",
            name, status, detail
        )),
        _ => PlatformError::Posting(format!("{} returned HTTP {}: {}", name, status, detail)),
    }
}
