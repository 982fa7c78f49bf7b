//! Image generation types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported output resolutions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageSize {
    /// 256x256
    #[serde(rename = "256x256")]
    S256,
    /// 512x512
    #[serde(rename = "512x512")]
    S512,
    /// 1024x1024
    #[serde(rename = "1024x1024")]
    S1024,
}

impl ImageSize {
    /// All accepted resolutions
    pub const ALL: [ImageSize; 3] = [Self::S256, Self::S512, Self::S1024];

    /// Returns the wire representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S256 => "256x256",
            Self::S512 => "512x512",
            Self::S1024 => "1024x1024",
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|size| size.as_str() == s)
            .ok_or_else(|| format!("unsupported resolution: {}", s))
    }
}

/// Image generation request
#[derive(Debug, Clone, Serialize)]
pub struct ImageRequest {
    /// Model to use (empty = provider default)
    pub model: String,
    /// Text prompt
    pub prompt: String,
    /// Number of images
    pub n: u32,
    /// Output size
    pub size: ImageSize,
}

/// A single generated image descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    /// Hosted image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Base64 payload (when requested instead of a URL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b64_json: Option<String>,
    /// Prompt as rewritten by the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revised_prompt: Option<String>,
}

impl GeneratedImage {
    /// Image with a hosted URL
    #[must_use]
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            b64_json: None,
            revised_prompt: None,
        }
    }

    /// Whether the descriptor carries any image data
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.url.as_deref().is_some_and(|u| !u.is_empty())
            || self.b64_json.as_deref().is_some_and(|b| !b.is_empty())
    }
}
