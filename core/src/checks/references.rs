use crate::checks::{cached, is_system_file};
use crate::error::CoreResult;
use crate::eval::context::CheckContext;
use crate::eval::finding::{Offender, Severity, Verdict};
use crate::eval::registry::CheckDef;
use crate::policy::types::{Priority, ProfileScope};
use crate::resolver::Reference;
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

pub const CHECKS: &[CheckDef] = &[
    CheckDef {
        id: "ref-missing",
        title: "Missing assets",
        description: "Every relative reference must resolve to a file inside the bundle.",
        profiles: ProfileScope::BOTH,
        priority: Priority::Required,
        run: missing_assets,
    },
    CheckDef {
        id: "ref-case-mismatch",
        title: "Path case mismatches",
        description: "References must match file names exactly; ad servers are case-sensitive.",
        profiles: ProfileScope::BOTH,
        priority: Priority::Required,
        run: case_mismatches,
    },
    CheckDef {
        id: "ref-invalid-url",
        title: "Invalid URL references",
        description: "References must not use backslashes, file: URLs, drive letters or malformed absolute URLs.",
        profiles: ProfileScope::BOTH,
        priority: Priority::Required,
        run: invalid_urls,
    },
    CheckDef {
        id: "ref-orphans",
        title: "Unreferenced files",
        description: "Files nothing references still count toward subload weight.",
        profiles: ProfileScope::BOTH,
        priority: Priority::Advisory,
        run: orphaned_files,
    },
    CheckDef {
        id: "ref-root-relative",
        title: "Root-relative paths",
        description: "Paths starting with '/' break when the creative is served from a CDN sub-path.",
        profiles: ProfileScope::CM360,
        priority: Priority::Recommended,
        run: root_relative,
    },
];

fn drive_letter_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"^[a-zA-Z]:[\\/]")
}

fn ref_offender(r: &Reference, detail: impl Into<String>) -> Offender {
    Offender::at(r.from.clone(), r.line, detail)
}

fn missing_assets(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    let offenders = ctx
        .references()
        .iter()
        .filter(|r| !r.external && !r.in_zip)
        .filter_map(|r| {
            let normalized = r.normalized.as_deref()?;
            Some(ref_offender(r, format!("{} -> {} not found", r.url, normalized)))
        })
        .collect();
    Ok(Verdict::from_offenders(
        offenders,
        Severity::FAIL,
        "all referenced assets are packaged",
        |n| format!("{} reference(s) point at missing files", n),
    ))
}

fn case_mismatches(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    let offenders = ctx
        .references()
        .iter()
        .filter(|r| r.in_zip)
        .filter_map(|r| {
            let normalized = r.normalized.as_deref()?;
            if ctx.archive.contains(normalized) {
                return None;
            }
            let stored = ctx.archive.resolve_ci(normalized)?;
            Some(ref_offender(
                r,
                format!("{} only matches {} ignoring case", r.url, stored),
            ))
        })
        .collect();
    Ok(Verdict::from_offenders(
        offenders,
        Severity::FAIL,
        "reference casing matches file names",
        |n| format!("{} reference(s) differ from file names only by case", n),
    ))
}

/// Why a raw reference is malformed, if it is.
pub fn url_problem(raw: &str) -> Option<&'static str> {
    let u = raw.trim();
    if u.is_empty() {
        return Some("empty or whitespace-only URL");
    }
    let lower = u.to_ascii_lowercase();
    if lower.starts_with("data:") || lower.starts_with("javascript:") {
        return None;
    }
    if u.contains('\\') {
        return Some("backslash in path");
    }
    if lower.starts_with("file:") {
        return Some("file: URL points at the author's machine");
    }
    if drive_letter_re().is_match(u) {
        return Some("absolute drive-letter path");
    }
    if lower.starts_with("http:") || lower.starts_with("https:") {
        return match Url::parse(u) {
            Ok(url) if url.host_str().map(|h| !h.is_empty()).unwrap_or(false) => None,
            _ => Some("unparseable absolute URL"),
        };
    }
    if u.starts_with("//") && Url::parse(&format!("https:{}", u)).is_err() {
        return Some("unparseable protocol-relative URL");
    }
    None
}

fn invalid_urls(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    let offenders = ctx
        .references()
        .iter()
        .filter_map(|r| url_problem(&r.url).map(|why| ref_offender(r, format!("{}: {}", r.url, why))))
        .collect();
    Ok(Verdict::from_offenders(
        offenders,
        Severity::FAIL,
        "all references are well-formed",
        |n| format!("{} malformed reference(s)", n),
    ))
}

fn orphaned_files(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    let offenders: Vec<Offender> = ctx
        .partial
        .partition
        .subload
        .iter()
        .filter(|p| !is_system_file(p))
        .map(|p| Offender::detail(p.clone(), format!("{} compressed", super::fmt_kb(ctx.compressed_size(p)))))
        .collect();
    Ok(Verdict::from_offenders(
        offenders,
        Severity::WARN,
        "every file is referenced",
        |n| format!("{} file(s) are never referenced and load as subload weight", n),
    ))
}

fn root_relative(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    let offenders = ctx
        .references()
        .iter()
        .filter(|r| !r.external)
        .filter(|r| {
            let u = r.url.trim();
            u.starts_with('/') && !u.starts_with("//")
        })
        .map(|r| ref_offender(r, r.url.clone()))
        .collect();
    Ok(Verdict::from_offenders(
        offenders,
        Severity::WARN,
        "no root-relative paths",
        |n| format!("{} root-relative reference(s)", n),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_problems() {
        assert_eq!(url_problem("img\\a.png"), Some("backslash in path"));
        assert_eq!(url_problem("C:/Users/me/a.png"), Some("absolute drive-letter path"));
        assert_eq!(url_problem("file:///tmp/a.png"), Some("file: URL points at the author's machine"));
        assert_eq!(url_problem("https://"), Some("unparseable absolute URL"));
        assert_eq!(url_problem("https://example.com/a.js"), None);
        assert_eq!(url_problem("img/a.png"), None);
        assert_eq!(url_problem("   "), Some("empty or whitespace-only URL"));
        assert_eq!(url_problem("data:image/png;base64,\\x"), None);
    }
}
