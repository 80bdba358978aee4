use crate::checks::{cached, no_primary};
use crate::error::CoreResult;
use crate::eval::context::{CheckContext, SourceKind, ALL_SOURCES, CODE_SOURCES};
use crate::eval::finding::{Offender, Severity, Verdict};
use crate::eval::registry::CheckDef;
use crate::policy::types::{Priority, ProfileScope};
use crate::resolver::markup::{inline_styles, line_at, mask_css_comments, mask_html_comments, scan_tags, style_blocks};
use regex::Regex;
use std::sync::OnceLock;

pub const CHECKS: &[CheckDef] = &[
    CheckDef {
        id: "html-doctype",
        title: "HTML5 doctype",
        description: "The entry document should start with <!DOCTYPE html>.",
        profiles: ProfileScope::IAB,
        priority: Priority::Recommended,
        run: doctype,
    },
    CheckDef {
        id: "html-charset",
        title: "Character encoding",
        description: "The entry document should declare its character encoding.",
        profiles: ProfileScope::BOTH,
        priority: Priority::Advisory,
        run: charset,
    },
    CheckDef {
        id: "html-structure",
        title: "Document structure",
        description: "The entry document should contain <html>, <head> and <body> elements.",
        profiles: ProfileScope::BOTH,
        priority: Priority::Recommended,
        run: structure,
    },
    CheckDef {
        id: "anim-duration",
        title: "Animation length",
        description: "Animations must stop within the configured time and loop limits.",
        profiles: ProfileScope::IAB,
        priority: Priority::Recommended,
        run: animation_length,
    },
    CheckDef {
        id: "media-autoplay-audio",
        title: "Autoplay with sound",
        description: "Audio must never start without user interaction.",
        profiles: ProfileScope::IAB,
        priority: Priority::Required,
        run: autoplay_audio,
    },
    CheckDef {
        id: "debug-console",
        title: "Debug output",
        description: "console logging and debugger statements should be stripped before delivery.",
        profiles: ProfileScope::BOTH,
        priority: Priority::Advisory,
        run: debug_output,
    },
];

fn doctype_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"(?is)^\s*<!doctype\s+([^>]*)>")
}

fn rule_body_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"\{([^{}]*)\}")
}

fn time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"(?i)^([0-9]*\.?[0-9]+)(ms|s)$")
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"^[0-9]*\.?[0-9]+$")
}

fn js_infinite_repeat_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"\brepeat\s*:\s*-1\b")
}

fn console_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"\bconsole\.(?:log|debug|trace)\s*\(|\bdebugger\s*;")
}

fn doctype(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    let (entry, html) = match (ctx.primary, ctx.html) {
        (Some(p), Some(h)) => (p, h),
        _ => return Ok(no_primary()),
    };
    let masked = mask_html_comments(html.trim_start_matches('\u{feff}'));
    Ok(match doctype_re().captures(&masked).and_then(|c| c.get(1)) {
        Some(m) if m.as_str().trim().eq_ignore_ascii_case("html") => Verdict::pass("HTML5 doctype"),
        Some(m) => Verdict::warn("legacy doctype; use <!DOCTYPE html>").with_offenders(vec![
            Offender::at(entry, Some(1), format!("<!DOCTYPE {}>", m.as_str().trim())),
        ]),
        None => Verdict::warn("missing <!DOCTYPE html>").with_offenders(vec![Offender::file(entry)]),
    })
}

fn charset(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    let (entry, html) = match (ctx.primary, ctx.html) {
        (Some(p), Some(h)) => (p, h),
        _ => return Ok(no_primary()),
    };
    let declared = scan_tags(html, &["meta"]).into_iter().find_map(|t| {
        if let Some(cs) = t.attr("charset") {
            return Some(cs.trim().to_string());
        }
        let is_content_type = t
            .attr("http-equiv")
            .map(|v| v.trim().eq_ignore_ascii_case("content-type"))
            .unwrap_or(false);
        let content = t.attr("content")?;
        let idx = content.to_ascii_lowercase().find("charset=")?;
        if is_content_type {
            Some(content[idx + "charset=".len()..].trim().to_string())
        } else {
            None
        }
    });
    Ok(match declared {
        Some(cs) => Verdict::pass(format!("charset {}", cs)),
        None => Verdict::warn("no <meta charset> declaration").with_offenders(vec![Offender::file(entry)]),
    })
}

fn structure(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    let (entry, html) = match (ctx.primary, ctx.html) {
        (Some(p), Some(h)) => (p, h),
        _ => return Ok(no_primary()),
    };
    let tags = scan_tags(html, &["html", "head", "body"]);
    let missing: Vec<&str> = ["html", "head", "body"]
        .into_iter()
        .filter(|n| !tags.iter().any(|t| t.name == *n))
        .collect();
    Ok(if missing.is_empty() {
        Verdict::pass("html, head and body present")
    } else {
        let offenders = missing
            .iter()
            .map(|n| Offender::detail(entry, format!("missing <{}>", n)))
            .collect();
        Verdict::warn(format!("missing element(s): {}", missing.join(", "))).with_offenders(offenders)
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Iterations {
    Count(f64),
    Infinite,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationSpec {
    pub seconds: f64,
    pub iterations: Iterations,
}

/// Split on `sep` outside parentheses, dropping empty pieces.
fn split_top_level(s: &str, sep: impl Fn(char) -> bool) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if depth == 0 && sep(c) => {
                out.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    out.push(&s[start..]);
    out.into_iter().map(str::trim).filter(|p| !p.is_empty()).collect()
}

fn parse_time(token: &str) -> Option<f64> {
    let caps = time_re().captures(token.trim())?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2)?.as_str();
    Some(if unit.eq_ignore_ascii_case("ms") {
        value / 1000.0
    } else {
        value
    })
}

fn parse_iterations(token: &str) -> Option<Iterations> {
    let t = token.trim();
    if t.eq_ignore_ascii_case("infinite") {
        return Some(Iterations::Infinite);
    }
    if number_re().is_match(t) {
        return t.parse().ok().map(Iterations::Count);
    }
    None
}

/// One entry per comma-separated animation in an `animation` shorthand.
fn parse_shorthand(value: &str) -> Vec<(Option<f64>, Option<Iterations>)> {
    split_top_level(value, |c| c == ',')
        .into_iter()
        .filter(|item| !item.eq_ignore_ascii_case("none"))
        .map(|item| {
            let mut duration = None;
            let mut iterations = None;
            for token in split_top_level(item, char::is_whitespace) {
                if let Some(t) = parse_time(token) {
                    if duration.is_none() {
                        duration = Some(t);
                    }
                } else if let Some(it) = parse_iterations(token) {
                    iterations = Some(it);
                }
            }
            (duration, iterations)
        })
        .collect()
}

/// Animations declared in one rule body, with longhands overriding the
/// shorthand and shorter lists repeating as CSS specifies.
pub fn animations_in_block(body: &str) -> Vec<AnimationSpec> {
    let mut shorthand: Vec<(Option<f64>, Option<Iterations>)> = Vec::new();
    let mut durations: Vec<f64> = Vec::new();
    let mut counts: Vec<Iterations> = Vec::new();
    for decl in body.split(';') {
        let (prop, value) = match decl.split_once(':') {
            Some((p, v)) => (p.trim().to_ascii_lowercase(), v.trim()),
            None => continue,
        };
        let value = value.trim_end_matches("!important").trim();
        match prop.as_str() {
            "animation" | "-webkit-animation" => shorthand = parse_shorthand(value),
            "animation-duration" | "-webkit-animation-duration" => {
                durations = split_top_level(value, |c| c == ',')
                    .into_iter()
                    .filter_map(parse_time)
                    .collect();
            }
            "animation-iteration-count" | "-webkit-animation-iteration-count" => {
                counts = split_top_level(value, |c| c == ',')
                    .into_iter()
                    .filter_map(parse_iterations)
                    .collect();
            }
            _ => {}
        }
    }
    let n = shorthand.len().max(durations.len()).max(counts.len());
    (0..n)
        .map(|i| {
            let from_short = shorthand.get(i).copied().unwrap_or((None, None));
            let seconds = if durations.is_empty() {
                from_short.0.unwrap_or(0.0)
            } else {
                durations[i % durations.len()]
            };
            let iterations = if counts.is_empty() {
                from_short.1.unwrap_or(Iterations::Count(1.0))
            } else {
                counts[i % counts.len()]
            };
            AnimationSpec { seconds, iterations }
        })
        .collect()
}

pub fn animation_problems(spec: &AnimationSpec, max_seconds: f64, max_loops: u32) -> Vec<String> {
    let mut out = Vec::new();
    match spec.iterations {
        Iterations::Infinite => out.push("infinite animation loop".to_string()),
        Iterations::Count(count) => {
            if count > max_loops as f64 {
                out.push(format!("{} iterations (limit {})", count, max_loops));
            }
            let total = spec.seconds * count;
            if total > max_seconds {
                out.push(format!("runs {:.1}s (limit {}s)", total, max_seconds));
            }
        }
    }
    out
}

fn css_rule_bodies(css: &str) -> Vec<(String, usize)> {
    let masked = mask_css_comments(css);
    rule_body_re()
        .captures_iter(&masked)
        .filter_map(|c| c.get(1))
        .map(|m| (m.as_str().to_string(), m.start()))
        .collect()
}

fn animation_length(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    if ctx.primary.is_none() {
        return Ok(no_primary());
    }
    let max_seconds = ctx.settings.max_animation_seconds;
    let max_loops = ctx.settings.max_animation_loops;
    let mut offenders = Vec::new();
    for src in ctx.sources(&ALL_SOURCES) {
        let bodies: Vec<(String, usize)> = match src.kind {
            SourceKind::Stylesheet => css_rule_bodies(&src.text),
            SourceKind::Html => {
                let mut b: Vec<(String, usize)> = Vec::new();
                for block in style_blocks(&src.text) {
                    b.extend(
                        css_rule_bodies(&block.text)
                            .into_iter()
                            .map(|(body, off)| (body, block.offset + off)),
                    );
                }
                b.extend(inline_styles(&src.text).into_iter().map(|s| (s.text, s.offset)));
                b
            }
            SourceKind::Script => Vec::new(),
        };
        for (body, offset) in bodies {
            for spec in animations_in_block(&body) {
                for problem in animation_problems(&spec, max_seconds, max_loops) {
                    offenders.push(Offender::at(
                        src.path.clone(),
                        Some(line_at(&src.text, offset)),
                        problem,
                    ));
                }
            }
        }
    }
    offenders.extend(
        ctx.scan_sources(js_infinite_repeat_re(), &CODE_SOURCES)
            .into_iter()
            .map(|o| Offender {
                detail: Some("infinite tween repeat (repeat: -1)".to_string()),
                ..o
            }),
    );
    Ok(Verdict::from_offenders(
        offenders,
        Severity::WARN,
        "animations stop within the limits",
        |n| format!("{} animation(s) exceed time or loop limits", n),
    ))
}

fn autoplay_audio(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    let (entry, html) = match (ctx.primary, ctx.html) {
        (Some(p), Some(h)) => (p, h),
        _ => return Ok(no_primary()),
    };
    let offenders = scan_tags(html, &["video", "audio"])
        .into_iter()
        .filter(|t| t.has_attr("autoplay") && !t.has_attr("muted"))
        .map(|t| Offender::at(entry, Some(t.line), format!("<{} autoplay> without muted", t.name)))
        .collect();
    Ok(Verdict::from_offenders(
        offenders,
        Severity::FAIL,
        "no media autoplays with sound",
        |n| format!("{} media element(s) autoplay with sound", n),
    ))
}

fn debug_output(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    if ctx.primary.is_none() {
        return Ok(no_primary());
    }
    Ok(Verdict::from_offenders(
        ctx.scan_sources(console_re(), &CODE_SOURCES),
        Severity::WARN,
        "no debug output",
        |n| format!("{} console/debugger statement(s)", n),
    ))
}
