use crate::error::CoreResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExpectedSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Compressed budget for the entry document and everything it references.
    pub max_initial_kb: u64,
    /// Compressed budget for unreferenced (polite-load) files.
    pub max_subload_kb: u64,
    pub max_uncompressed_kb: u64,
    pub max_initial_requests: usize,
    pub max_total_requests: usize,
    pub max_external_hosts: usize,
    pub max_file_count: usize,
    pub max_file_kb: u64,
    pub max_image_kb: u64,
    pub max_font_kb: u64,
    pub max_animation_seconds: f64,
    pub max_animation_loops: u32,
    /// Regex sources for clickthrough variable names.
    pub clicktag_patterns: Vec<String>,
    pub expected_size: Option<ExpectedSize>,
    /// Hosts (and their subdomains) approved for external scripts and styles.
    pub allowed_hosts: Vec<String>,
    /// Lowercase file extensions accepted inside a bundle.
    pub allowed_extensions: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_initial_kb: 150,
            max_subload_kb: 1000,
            max_uncompressed_kb: 10 * 1024,
            max_initial_requests: 10,
            max_total_requests: 15,
            max_external_hosts: 5,
            max_file_count: 100,
            max_file_kb: 250,
            max_image_kb: 100,
            max_font_kb: 100,
            max_animation_seconds: 15.0,
            max_animation_loops: 3,
            clicktag_patterns: vec![r"click[Tt][Aa][Gg]\d*".to_string()],
            expected_size: None,
            allowed_hosts: [
                "s0.2mdn.net",
                "s1.2mdn.net",
                "tpc.googlesyndication.com",
                "ajax.googleapis.com",
                "fonts.googleapis.com",
                "fonts.gstatic.com",
                "cdnjs.cloudflare.com",
                "code.createjs.com",
                "cdn.jsdelivr.net",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            allowed_extensions: [
                "html", "htm", "js", "css", "json", "xml", "txt", "png", "jpg", "jpeg", "gif",
                "svg", "webp", "woff", "woff2", "ttf", "otf", "eot", "mp4", "webm", "ogg", "mp3",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl Settings {
    pub fn from_json_str(s: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_json_file(path: &Path) -> CoreResult<Self> {
        let body = std::fs::read_to_string(path)?;
        Self::from_json_str(&body)
    }

    pub fn kb(v: u64) -> u64 {
        v.saturating_mul(1024)
    }
}
