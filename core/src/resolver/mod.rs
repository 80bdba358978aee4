pub mod markup;
pub mod paths;

use crate::archive::{extension_of, Archive};
use markup::{css_urls, inline_styles, line_at, scan_tags, style_blocks};
use paths::{is_external, is_secure, resolve_path};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum RefType {
    Image,
    Script,
    Stylesheet,
    Media,
    Font,
    Anchor,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reference {
    pub from: String,
    #[serde(rename = "type")]
    pub ref_type: RefType,
    pub url: String,
    /// Resolved archive path; `None` for external URLs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized: Option<String>,
    pub in_zip: bool,
    pub external: bool,
    pub secure: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl Reference {
    /// Anchors are navigation targets, not loads.
    pub fn is_load(&self) -> bool {
        self.ref_type != RefType::Anchor
    }
}

const FONT_EXTENSIONS: [&str; 5] = ["woff", "woff2", "ttf", "otf", "eot"];

fn css_ref_type(url: &str) -> RefType {
    let path = paths::strip_query_and_fragment(url);
    match extension_of(path).as_deref() {
        Some("css") => RefType::Stylesheet,
        Some(ext) if FONT_EXTENSIONS.contains(&ext) => RefType::Font,
        _ => RefType::Image,
    }
}

fn is_stylesheet_link(rel: Option<&str>) -> bool {
    rel.map(|r| {
        r.split_whitespace()
            .any(|t| t.eq_ignore_ascii_case("stylesheet"))
    })
    .unwrap_or(false)
}

/// Build a reference from a raw attribute value. Fragment-only values
/// yield `None`; blank values are kept unresolved so they can be reported.
pub fn make_reference(
    archive: &Archive,
    from: &str,
    ref_type: RefType,
    url: &str,
    line: Option<usize>,
) -> Option<Reference> {
    if url.trim().is_empty() {
        return Some(Reference {
            from: from.to_string(),
            ref_type,
            url: url.to_string(),
            normalized: None,
            in_zip: false,
            external: false,
            secure: true,
            line,
        });
    }
    let url = url.trim();
    if is_external(url) {
        return Some(Reference {
            from: from.to_string(),
            ref_type,
            url: url.to_string(),
            normalized: None,
            in_zip: false,
            external: true,
            secure: is_secure(url),
            line,
        });
    }
    let normalized = resolve_path(from, url)?;
    let in_zip = archive.resolve_ci(&normalized).is_some();
    Some(Reference {
        from: from.to_string(),
        ref_type,
        url: url.to_string(),
        normalized: Some(normalized),
        in_zip,
        external: false,
        secure: true,
        line,
    })
}

struct Collector<'a> {
    archive: &'a Archive,
    seen: HashSet<(String, RefType, String)>,
    out: Vec<Reference>,
}

impl<'a> Collector<'a> {
    fn push(&mut self, from: &str, ref_type: RefType, url: &str, line: usize) {
        let key = (from.to_string(), ref_type, url.trim().to_string());
        if self.seen.contains(&key) {
            return;
        }
        if let Some(r) = make_reference(self.archive, from, ref_type, url, Some(line)) {
            self.seen.insert(key);
            self.out.push(r);
        }
    }

    fn push_css(&mut self, from: &str, css: &str, base_offset: usize, text_for_lines: &str) {
        for (url, off) in css_urls(css) {
            let line = line_at(text_for_lines, base_offset + off);
            self.push(from, css_ref_type(&url), &url, line);
        }
    }
}

/// Every reference reachable from the entry document; empty when the entry
/// is missing.
pub fn resolve_references(archive: &Archive, entry: &str) -> Vec<Reference> {
    let html = match archive.text_ci(entry) {
        Some(t) => t.into_owned(),
        None => return Vec::new(),
    };
    let entry_path = archive.resolve_ci(entry).unwrap_or(entry).to_string();
    let mut c = Collector {
        archive,
        seen: HashSet::new(),
        out: Vec::new(),
    };

    let tags = scan_tags(
        &html,
        &["img", "script", "link", "a", "video", "audio", "source"],
    );
    for tag in &tags {
        let line = tag.line;
        match tag.name.as_str() {
            "img" => {
                if let Some(src) = tag.attr("src") {
                    c.push(&entry_path, RefType::Image, src, line);
                }
            }
            "script" => {
                if let Some(src) = tag.attr("src") {
                    c.push(&entry_path, RefType::Script, src, line);
                }
            }
            "link" => {
                if is_stylesheet_link(tag.attr("rel")) {
                    if let Some(href) = tag.attr("href") {
                        c.push(&entry_path, RefType::Stylesheet, href, line);
                    }
                }
            }
            "a" => {
                if let Some(href) = tag.attr("href") {
                    c.push(&entry_path, RefType::Anchor, href, line);
                }
            }
            "video" | "audio" | "source" => {
                if let Some(src) = tag.attr("src") {
                    c.push(&entry_path, RefType::Media, src, line);
                }
                if let Some(poster) = tag.attr("poster") {
                    c.push(&entry_path, RefType::Image, poster, line);
                }
            }
            _ => {}
        }
    }

    for style in inline_styles(&html) {
        c.push_css(&entry_path, &style.text, style.offset, &html);
    }
    for block in style_blocks(&html) {
        c.push_css(&entry_path, &block.text, block.offset, &html);
    }

    // Linked stylesheets, one level: their own url()s resolve relative to
    // the stylesheet's directory; @import targets are recorded, not followed.
    let linked: Vec<String> = c
        .out
        .iter()
        .filter(|r| r.ref_type == RefType::Stylesheet && r.in_zip && r.from == entry_path)
        .filter_map(|r| r.normalized.as_deref())
        .filter_map(|n| archive.resolve_ci(n))
        .map(|p| p.to_string())
        .collect();
    for css_path in linked {
        if let Some(css) = archive.text_ci(&css_path) {
            let css = css.into_owned();
            c.push_css(&css_path, &css, 0, &css);
        }
    }

    debug!(entry = %entry_path, references = c.out.len(), "references resolved");
    c.out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_reference_types_follow_extension() {
        assert_eq!(css_ref_type("f/a.woff2?#iefix"), RefType::Font);
        assert_eq!(css_ref_type("theme.css"), RefType::Stylesheet);
        assert_eq!(css_ref_type("bg.jpg"), RefType::Image);
    }

    #[test]
    fn external_references_have_no_normalized_path() {
        let a = Archive::from_files("t", vec![("index.html", Vec::new())]);
        let r = make_reference(&a, "index.html", RefType::Script, "http://x.com/a.js", None)
            .expect("reference");
        assert!(r.external);
        assert!(!r.secure);
        assert!(!r.in_zip);
        assert!(r.normalized.is_none());
    }

    #[test]
    fn blank_values_are_kept_unresolved() {
        let a = Archive::from_files(
            "t",
            vec![("index.html", br#"<img src="   "><script src=""></script>"#.to_vec())],
        );
        let refs = resolve_references(&a, "index.html");
        assert_eq!(refs.len(), 2);
        assert!(refs
            .iter()
            .all(|r| r.normalized.is_none() && !r.in_zip && !r.external));
        assert_eq!(refs[0].url, "   ");
    }
}
