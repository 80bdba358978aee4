use regex::Regex;
use std::sync::OnceLock;

pub(crate) fn cached(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static pattern must compile"))
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(
        &RE,
        r#"(?s)<([a-zA-Z][a-zA-Z0-9-]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#,
    )
}

fn attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(
        &RE,
        r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#,
    )
}

fn style_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"(?is)<style\b[^>]*>(.*?)</style\s*>")
}

fn script_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"(?is)<script\b([^>]*)>(.*?)</script\s*>")
}

fn css_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(
        &RE,
        r#"(?i)url\(\s*(?:"([^"]*)"|'([^']*)'|([^)"'\s]*))\s*\)"#,
    )
}

fn css_import_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r#"(?i)@import\s+(?:"([^"]+)"|'([^']+)')"#)
}

/// 1-based line number of a byte offset.
pub fn line_at(text: &str, offset: usize) -> usize {
    let end = offset.min(text.len());
    text.as_bytes()[..end].iter().filter(|b| **b == b'\n').count() + 1
}

fn blank_range(buf: &mut [u8], start: usize, end: usize) {
    for b in &mut buf[start..end] {
        if *b != b'\n' {
            *b = b' ';
        }
    }
}

/// Replace `<!-- ... -->` with spaces, preserving offsets and newlines.
pub fn mask_html_comments(html: &str) -> String {
    mask_delimited(html, "<!--", "-->")
}

pub fn mask_css_comments(css: &str) -> String {
    mask_delimited(css, "/*", "*/")
}

fn mask_delimited(text: &str, open: &str, close: &str) -> String {
    let mut buf = text.as_bytes().to_vec();
    let mut idx = 0;
    while let Some(pos) = text[idx..].find(open) {
        let start = idx + pos;
        let end = match text[start + open.len()..].find(close) {
            Some(e) => start + open.len() + e + close.len(),
            None => text.len(),
        };
        blank_range(&mut buf, start, end);
        idx = end;
        if idx >= text.len() {
            break;
        }
    }
    // Only ASCII bytes were replaced by ASCII spaces inside whole delimited
    // runs, so multi-byte sequences outside them are untouched.
    String::from_utf8(buf).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// Hide the bodies of raw-text elements (`script`, `style`) from the tag
/// scanner while keeping their opening tags visible.
fn mask_raw_text_bodies(html: &str) -> String {
    let mut buf = html.as_bytes().to_vec();
    for re in [script_block_re(), style_block_re()] {
        for caps in re.captures_iter(html) {
            let body = match caps.get(caps.len() - 1) {
                Some(m) => m,
                None => continue,
            };
            blank_range(&mut buf, body.start(), body.end());
        }
    }
    String::from_utf8(buf).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    /// Attributes in source order; names lowercased, values verbatim.
    pub attrs: Vec<(String, Option<String>)>,
    pub offset: usize,
    pub line: usize,
}

impl Tag {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .and_then(|(_, v)| v.as_deref())
    }

    /// Presence check for boolean attributes such as `autoplay` or `muted`.
    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|(k, _)| k == name)
    }
}

fn parse_attrs(raw: &str) -> Vec<(String, Option<String>)> {
    attr_re()
        .captures_iter(raw)
        .filter_map(|c| {
            let name = c.get(1)?.as_str().to_ascii_lowercase();
            let value = c
                .get(2)
                .or_else(|| c.get(3))
                .or_else(|| c.get(4))
                .map(|m| m.as_str().to_string());
            Some((name, value))
        })
        .collect()
}

/// All start tags in `html`, in document order. Pass an empty `names` slice
/// to collect every element.
pub fn scan_tags(html: &str, names: &[&str]) -> Vec<Tag> {
    let masked = mask_raw_text_bodies(&mask_html_comments(html));
    let mut out = Vec::new();
    for caps in tag_re().captures_iter(&masked) {
        let (whole, name) = match (caps.get(0), caps.get(1)) {
            (Some(w), Some(n)) => (w, n.as_str().to_ascii_lowercase()),
            _ => continue,
        };
        if !names.is_empty() && !names.iter().any(|n| *n == name) {
            continue;
        }
        let raw_attrs = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        out.push(Tag {
            name,
            attrs: parse_attrs(raw_attrs),
            offset: whole.start(),
            line: line_at(html, whole.start()),
        });
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Embedded {
    pub text: String,
    pub offset: usize,
}

pub fn style_blocks(html: &str) -> Vec<Embedded> {
    let masked = mask_html_comments(html);
    style_block_re()
        .captures_iter(&masked)
        .filter_map(|c| c.get(1))
        .map(|m| Embedded {
            text: html[m.start()..m.end()].to_string(),
            offset: m.start(),
        })
        .collect()
}

/// Bodies of `<script>` elements, with the raw attribute string of the tag.
pub fn script_blocks(html: &str) -> Vec<(String, Embedded)> {
    let masked = mask_html_comments(html);
    script_block_re()
        .captures_iter(&masked)
        .filter_map(|c| {
            let attrs = c.get(1)?.as_str().to_string();
            let body = c.get(2)?;
            Some((
                attrs,
                Embedded {
                    text: html[body.start()..body.end()].to_string(),
                    offset: body.start(),
                },
            ))
        })
        .collect()
}

pub fn inline_styles(html: &str) -> Vec<Embedded> {
    let masked = mask_raw_text_bodies(&mask_html_comments(html));
    let mut out = Vec::new();
    for caps in tag_re().captures_iter(&masked) {
        let raw = match caps.get(2) {
            Some(m) => m,
            None => continue,
        };
        for ac in attr_re().captures_iter(raw.as_str()) {
            let is_style = ac
                .get(1)
                .map(|n| n.as_str().eq_ignore_ascii_case("style"))
                .unwrap_or(false);
            if !is_style {
                continue;
            }
            if let Some(v) = ac.get(2).or_else(|| ac.get(3)).or_else(|| ac.get(4)) {
                out.push(Embedded {
                    text: v.as_str().to_string(),
                    offset: raw.start() + v.start(),
                });
            }
        }
    }
    out
}

/// `url(...)` and `@import "..."` targets in a stylesheet, with offsets.
pub fn css_urls(css: &str) -> Vec<(String, usize)> {
    let masked = mask_css_comments(css);
    let mut out: Vec<(String, usize)> = Vec::new();
    for caps in css_url_re().captures_iter(&masked) {
        let m = match caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)) {
            Some(m) => m,
            None => continue,
        };
        let value = m.as_str().trim();
        if value.is_empty() {
            continue;
        }
        out.push((value.to_string(), m.start()));
    }
    for caps in css_import_re().captures_iter(&masked) {
        if let Some(m) = caps.get(1).or_else(|| caps.get(2)) {
            out.push((m.as_str().trim().to_string(), m.start()));
        }
    }
    out.sort_by_key(|(_, off)| *off);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_carry_lines_and_attributes() {
        let html = "<html>\n<body>\n<img class=x src='a.png' alt=\"b > c\">\n</body></html>";
        let tags = scan_tags(html, &["img"]);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].line, 3);
        assert_eq!(tags[0].attr("src"), Some("a.png"));
        assert_eq!(tags[0].attr("alt"), Some("b > c"));
    }

    #[test]
    fn comments_and_script_bodies_are_not_tags() {
        let html = "<!-- <img src=\"gone.png\"> -->\n<script>var s = '<img src=\"fake.png\">';</script>\n<img src=\"real.png\">";
        let tags = scan_tags(html, &["img"]);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].attr("src"), Some("real.png"));
        assert_eq!(tags[0].line, 3);
    }

    #[test]
    fn boolean_attributes_are_present_without_values() {
        let tags = scan_tags("<video autoplay muted src=v.mp4>", &["video"]);
        assert!(tags[0].has_attr("autoplay"));
        assert!(tags[0].has_attr("muted"));
        assert_eq!(tags[0].attr("autoplay"), None);
        assert_eq!(tags[0].attr("src"), Some("v.mp4"));
    }

    #[test]
    fn css_urls_in_all_quote_styles() {
        let css = "a{background:url(a.png)}\n/* url(no.png) */\nb{background:url( \"b.png\" )} c{src:url('c.woff')}\n@import 'd.css';";
        let urls: Vec<String> = css_urls(css).into_iter().map(|(u, _)| u).collect();
        assert_eq!(urls, vec!["a.png", "b.png", "c.woff", "d.css"]);
    }

    #[test]
    fn inline_style_offsets_point_into_source() {
        let html = "<div style=\"background:url(x.png)\"></div>";
        let styles = inline_styles(html);
        assert_eq!(styles.len(), 1);
        assert_eq!(&html[styles[0].offset..styles[0].offset + styles[0].text.len()], styles[0].text);
    }
}
