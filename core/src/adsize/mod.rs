pub mod css;

use crate::archive::Archive;
use crate::resolver::markup::{cached, inline_styles, scan_tags, script_blocks, style_blocks, Tag};
use crate::resolver::paths::{is_external, resolve_path};
use css::{largest, scan_css_text, SizeCandidate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum SizeMethod {
    Meta,
    GwdAdmetadata,
    CssRule,
    CssMedia,
    CssFile,
    InlineStyle,
}

impl SizeMethod {
    pub fn is_css(self) -> bool {
        !matches!(self, SizeMethod::Meta | SizeMethod::GwdAdmetadata)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SizeSource {
    pub method: SizeMethod,
    pub snippet: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdSize {
    pub width: u32,
    pub height: u32,
    pub source: SizeSource,
}

impl AdSize {
    pub fn label(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// IAB fixed-size ad units recognised as standard.
pub const IAB_STANDARD_SIZES: [(u32, u32); 22] = [
    (300, 250),
    (728, 90),
    (160, 600),
    (300, 600),
    (320, 50),
    (320, 100),
    (970, 250),
    (970, 90),
    (336, 280),
    (468, 60),
    (234, 60),
    (120, 600),
    (300, 50),
    (300, 1050),
    (250, 250),
    (200, 200),
    (180, 150),
    (125, 125),
    (120, 60),
    (88, 31),
    (320, 480),
    (480, 320),
];

pub fn is_standard_size(width: u32, height: u32) -> bool {
    IAB_STANDARD_SIZES.contains(&(width, height))
}

fn content_width_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"(?i)width\s*=\s*(\d+)")
}

fn content_height_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"(?i)height\s*=\s*(\d+)")
}

fn wxh_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"^\s*(\d+)\s*[xX×]\s*(\d+)\s*$")
}

fn gwd_type_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r#"(?i)type\s*=\s*["']?text/gwd-admetadata"#)
}

fn capture_u32(re: &Regex, text: &str) -> Option<u32> {
    re.captures(text)?.get(1)?.as_str().parse().ok()
}

fn meta_tag_snippet(tag: &Tag) -> String {
    let attrs: Vec<String> = tag
        .attrs
        .iter()
        .map(|(k, v)| match v {
            Some(v) => format!("{}=\"{}\"", k, v),
            None => k.clone(),
        })
        .collect();
    format!("<meta {}>", attrs.join(" "))
}

fn from_ad_size_meta(metas: &[Tag], path: &str) -> Option<AdSize> {
    for tag in metas {
        let is_ad_size = tag
            .attr("name")
            .map(|n| n.trim().eq_ignore_ascii_case("ad.size"))
            .unwrap_or(false);
        if !is_ad_size {
            continue;
        }
        let content = tag.attr("content").unwrap_or("");
        let width = capture_u32(content_width_re(), content);
        let height = capture_u32(content_height_re(), content);
        if let (Some(width), Some(height)) = (width, height) {
            if width > 0 && height > 0 {
                return Some(AdSize {
                    width,
                    height,
                    source: SizeSource {
                        method: SizeMethod::Meta,
                        snippet: meta_tag_snippet(tag),
                        path: path.to_string(),
                    },
                });
            }
        }
    }
    None
}

fn from_wxh_meta_name(metas: &[Tag], path: &str) -> Option<AdSize> {
    for tag in metas {
        let name = match tag.attr("name") {
            Some(n) => n,
            None => continue,
        };
        let caps = match wxh_name_re().captures(name) {
            Some(c) => c,
            None => continue,
        };
        let width: u32 = caps.get(1).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
        let height: u32 = caps.get(2).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
        if width > 0 && height > 0 {
            return Some(AdSize {
                width,
                height,
                source: SizeSource {
                    method: SizeMethod::Meta,
                    snippet: meta_tag_snippet(tag),
                    path: path.to_string(),
                },
            });
        }
    }
    None
}

fn json_dimension(v: Option<&Value>) -> Option<u32> {
    let v = v?;
    let n = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches("px").parse::<f64>().ok()?,
        _ => return None,
    };
    if n >= 1.0 && n <= u32::MAX as f64 {
        Some(n as u32)
    } else {
        None
    }
}

fn from_gwd_metadata(html: &str, path: &str) -> Option<AdSize> {
    for (attrs, body) in script_blocks(html) {
        if !gwd_type_re().is_match(&attrs) {
            continue;
        }
        let parsed: Value = match serde_json::from_str(body.text.trim()) {
            Ok(v) => v,
            Err(_) => continue,
        };
        let props = match parsed.get("creativeProperties") {
            Some(p) => p,
            None => continue,
        };
        let width = json_dimension(props.get("maxWidth")).or_else(|| json_dimension(props.get("minWidth")));
        let height =
            json_dimension(props.get("maxHeight")).or_else(|| json_dimension(props.get("minHeight")));
        if let (Some(width), Some(height)) = (width, height) {
            let snippet = format!(
                "creativeProperties: minWidth={} maxWidth={} minHeight={} maxHeight={}",
                props.get("minWidth").unwrap_or(&Value::Null),
                props.get("maxWidth").unwrap_or(&Value::Null),
                props.get("minHeight").unwrap_or(&Value::Null),
                props.get("maxHeight").unwrap_or(&Value::Null),
            );
            return Some(AdSize {
                width,
                height,
                source: SizeSource {
                    method: SizeMethod::GwdAdmetadata,
                    snippet,
                    path: path.to_string(),
                },
            });
        }
    }
    None
}

/// Every CSS size candidate for the entry document, in source priority
/// order: inline styles, `<style>` blocks, then linked stylesheets.
pub fn css_size_candidates(archive: &Archive, entry: &str, html: &str) -> Vec<SizeCandidate> {
    let mut out = Vec::new();
    for style in inline_styles(html) {
        out.extend(scan_css_text(
            &style.text,
            SizeMethod::InlineStyle,
            SizeMethod::InlineStyle,
            entry,
        ));
    }
    for block in style_blocks(html) {
        out.extend(scan_css_text(
            &block.text,
            SizeMethod::CssRule,
            SizeMethod::CssMedia,
            entry,
        ));
    }
    for link in scan_tags(html, &["link"]) {
        let is_stylesheet = link
            .attr("rel")
            .map(|r| r.split_whitespace().any(|t| t.eq_ignore_ascii_case("stylesheet")))
            .unwrap_or(false);
        let href = match link.attr("href") {
            Some(h) if is_stylesheet && !is_external(h) => h,
            _ => continue,
        };
        let css_path = match resolve_path(entry, href).and_then(|p| archive.resolve_ci(&p)) {
            Some(p) => p.to_string(),
            None => continue,
        };
        if let Some(css) = archive.text_ci(&css_path) {
            out.extend(scan_css_text(
                &css,
                SizeMethod::CssFile,
                SizeMethod::CssFile,
                &css_path,
            ));
        }
    }
    out
}

pub fn detect_ad_size(archive: &Archive, entry: &str) -> Option<AdSize> {
    let html = archive.text_ci(entry)?.into_owned();
    let metas = scan_tags(&html, &["meta"]);

    let detected = from_ad_size_meta(&metas, entry)
        .or_else(|| from_wxh_meta_name(&metas, entry))
        .or_else(|| from_gwd_metadata(&html, entry))
        .or_else(|| {
            let candidates = css_size_candidates(archive, entry, &html);
            largest(&candidates).map(|c| AdSize {
                width: c.width,
                height: c.height,
                source: SizeSource {
                    method: c.method,
                    snippet: c.snippet.clone(),
                    path: c.path.clone(),
                },
            })
        });

    match &detected {
        Some(size) => debug!(
            entry = %entry,
            size = %size.label(),
            method = ?size.source.method,
            "ad size detected"
        ),
        None => debug!(entry = %entry, "ad size undetected"),
    }
    detected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(files: Vec<(&str, &str)>) -> Option<AdSize> {
        let archive = Archive::from_files(
            "t",
            files.into_iter().map(|(p, c)| (p, c.as_bytes().to_vec())),
        );
        detect_ad_size(&archive, "index.html")
    }

    #[test]
    fn ad_size_meta_wins() {
        let s = detect(vec![(
            "index.html",
            r#"<meta name="ad.size" content="width=300, height=250"><style>#a{width:728px;height:90px}</style>"#,
        )])
        .expect("size");
        assert_eq!((s.width, s.height), (300, 250));
        assert_eq!(s.source.method, SizeMethod::Meta);
    }

    #[test]
    fn wxh_meta_name() {
        let s = detect(vec![("index.html", r#"<meta name="160x600" content="">"#)]).expect("size");
        assert_eq!((s.width, s.height), (160, 600));
        assert_eq!(s.source.method, SizeMethod::Meta);
    }

    #[test]
    fn gwd_metadata_prefers_max() {
        let html = r#"<script type="text/gwd-admetadata">{"creativeProperties":{"minWidth":300,"maxWidth":320,"minHeight":50,"maxHeight":"100"}}</script>"#;
        let s = detect(vec![("index.html", html)]).expect("size");
        assert_eq!((s.width, s.height), (320, 100));
        assert_eq!(s.source.method, SizeMethod::GwdAdmetadata);
    }

    #[test]
    fn linked_stylesheet_can_win_on_area() {
        let s = detect(vec![
            (
                "index.html",
                r#"<link rel="stylesheet" href="css/ad.css"><div style="width:100px;height:100px"></div>"#,
            ),
            ("css/ad.css", "#stage { width: 970px; height: 250px; }"),
        ])
        .expect("size");
        assert_eq!((s.width, s.height), (970, 250));
        assert_eq!(s.source.method, SizeMethod::CssFile);
        assert_eq!(s.source.path, "css/ad.css");
    }

    #[test]
    fn undetected_is_none() {
        assert!(detect(vec![("index.html", "<html><body>hi</body></html>")]).is_none());
        assert!(detect(vec![]).is_none());
    }
}
