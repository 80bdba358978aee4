use crate::adsize::SizeMethod;
use crate::resolver::markup::{cached, mask_css_comments};
use regex::Regex;
use std::sync::OnceLock;

/// Values below this are treated as decorative (borders, spacers).
pub const MIN_CSS_DIMENSION: u32 = 10;

const SNIPPET_MAX_CHARS: usize = 160;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeCandidate {
    pub width: u32,
    pub height: u32,
    pub method: SizeMethod,
    pub snippet: String,
    pub path: String,
}

impl SizeCandidate {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

fn width_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"(?i)(?:^|[^-\w])width\s*:\s*(\d+)(?:\.\d+)?px")
}

fn height_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"(?i)(?:^|[^-\w])height\s*:\s*(\d+)(?:\.\d+)?px")
}

fn rule_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"([^{}]*)\{([^{}]*)\}")
}

fn media_start_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"(?i)@media\b")
}

/// Last declared value of `re` in `decls` that clears the decorative floor.
fn last_dimension(re: &Regex, decls: &str) -> Option<u32> {
    re.captures_iter(decls)
        .filter_map(|c| c.get(1)?.as_str().parse::<u32>().ok())
        .filter(|v| *v >= MIN_CSS_DIMENSION)
        .last()
}

fn dimensions_in(decls: &str) -> Option<(u32, u32)> {
    let w = last_dimension(width_re(), decls)?;
    let h = last_dimension(height_re(), decls)?;
    Some((w, h))
}

fn snippet_of(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= SNIPPET_MAX_CHARS {
        collapsed
    } else {
        let mut s: String = collapsed.chars().take(SNIPPET_MAX_CHARS).collect();
        s.push('…');
        s
    }
}

/// Byte ranges of top-level `@media { ... }` blocks: (whole block, body).
fn media_blocks(css: &str) -> Vec<((usize, usize), (usize, usize))> {
    let bytes = css.as_bytes();
    let mut out = Vec::new();
    let mut search_from = 0;
    while let Some(m) = media_start_re().find_at(css, search_from) {
        let open = match css[m.end()..].find('{') {
            Some(i) => m.end() + i,
            None => break,
        };
        let mut depth = 0usize;
        let mut close = None;
        for (i, b) in bytes.iter().enumerate().skip(open) {
            match b {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        close = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }
        // Unterminated block: take the rest of the text as its body.
        let close = close.unwrap_or(css.len());
        out.push(((m.start(), (close + 1).min(css.len())), (open + 1, close)));
        search_from = (close + 1).min(css.len());
        if search_from >= css.len() {
            break;
        }
    }
    out
}

fn rule_candidates(css: &str, method: SizeMethod, path: &str) -> Vec<SizeCandidate> {
    rule_re()
        .captures_iter(css)
        .filter_map(|c| {
            let whole = c.get(0)?;
            let decls = c.get(2)?.as_str();
            let (width, height) = dimensions_in(decls)?;
            Some(SizeCandidate {
                width,
                height,
                method,
                snippet: snippet_of(whole.as_str()),
                path: path.to_string(),
            })
        })
        .collect()
}

pub fn scan_css_text(
    css: &str,
    block_method: SizeMethod,
    media_method: SizeMethod,
    path: &str,
) -> Vec<SizeCandidate> {
    let css = mask_css_comments(css);
    let mut out = Vec::new();

    let blocks = media_blocks(&css);
    for (_, (body_start, body_end)) in &blocks {
        out.extend(rule_candidates(&css[*body_start..*body_end], media_method, path));
    }

    let mut rest = css.clone().into_bytes();
    for ((start, end), _) in &blocks {
        for b in &mut rest[*start..*end] {
            if *b != b'\n' {
                *b = b' ';
            }
        }
    }
    let rest = String::from_utf8_lossy(&rest).into_owned();
    out.extend(rule_candidates(&rest, block_method, path));

    if out.is_empty() {
        if let Some((width, height)) = dimensions_in(&css) {
            out.push(SizeCandidate {
                width,
                height,
                method: block_method,
                snippet: snippet_of(&css),
                path: path.to_string(),
            });
        }
    }
    out
}

pub fn largest(candidates: &[SizeCandidate]) -> Option<&SizeCandidate> {
    let mut best: Option<&SizeCandidate> = None;
    for c in candidates {
        if best.map(|b| c.area() > b.area()).unwrap_or(true) {
            best = Some(c);
        }
    }
    best
}
