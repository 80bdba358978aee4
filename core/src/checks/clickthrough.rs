use crate::checks::{cached, file_name, no_primary, not_applicable};
use crate::error::{CoreError, CoreResult};
use crate::eval::context::{CheckContext, CODE_SOURCES};
use crate::eval::finding::{Offender, Severity, Verdict};
use crate::eval::registry::CheckDef;
use crate::policy::types::{Priority, ProfileScope};
use crate::resolver::RefType;
use regex::Regex;
use std::sync::OnceLock;

pub const CHECKS: &[CheckDef] = &[
    CheckDef {
        id: "click-tag-declared",
        title: "clickTag declared",
        description: "CM360 injects the landing page through a global clickTag variable.",
        profiles: ProfileScope::CM360,
        priority: Priority::Required,
        run: clicktag_declared,
    },
    CheckDef {
        id: "click-hardcoded",
        title: "Hard-coded clickthrough",
        description: "Landing pages must not be hard-coded; trafficking replaces them at serve time.",
        profiles: ProfileScope::CM360,
        priority: Priority::Required,
        run: hardcoded_clickthrough,
    },
    CheckDef {
        id: "click-tag-used",
        title: "clickTag wired to exit",
        description: "A declared clickTag should be passed to window.open or an exit call.",
        profiles: ProfileScope::CM360,
        priority: Priority::Recommended,
        run: clicktag_used,
    },
    CheckDef {
        id: "click-enabler-exit",
        title: "Studio Enabler exit",
        description: "Creatives loading Enabler.js should register exits through Enabler.exit.",
        profiles: ProfileScope::CM360,
        priority: Priority::Advisory,
        run: enabler_exit,
    },
];

fn name_alternation(patterns: &[String]) -> CoreResult<String> {
    if patterns.iter().all(|p| p.trim().is_empty()) {
        return Err(CoreError::InvalidInput(
            "clicktag_patterns must contain at least one pattern".to_string(),
        ));
    }
    let parts: Vec<String> = patterns
        .iter()
        .filter(|p| !p.trim().is_empty())
        .map(|p| format!("(?:{})", p.trim()))
        .collect();
    Ok(parts.join("|"))
}

/// `var clickTag =`, `window.clickTag =`, `window["clickTag"] =`.
pub fn declaration_regex(patterns: &[String]) -> CoreResult<Regex> {
    let names = name_alternation(patterns)?;
    Ok(Regex::new(&format!(
        r#"(?:\bvar|\blet|\bconst|window\.|window\[\s*["'])\s*(?:{})\b\s*(?:["']\s*\])?\s*="#,
        names
    ))?)
}

/// The clickTag handed to `window.open`, an exit call or a location assignment.
pub fn usage_regex(patterns: &[String]) -> CoreResult<Regex> {
    let names = name_alternation(patterns)?;
    Ok(Regex::new(&format!(
        r#"(?:window\.open|\bexit\w*)\s*\([^)]*?\b(?:{names})\b|location(?:\.href)?\s*=\s*(?:window\.)?(?:{names})\b"#,
        names = names
    ))?)
}

fn open_literal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r#"(?i)window\.open\s*\(\s*["'`]https?://[^"'`]*"#)
}

fn enabler_exit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"Enabler\.(?:exit|exitOverride|dynamicExit)\s*\(")
}

fn clicktag_declared(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    if ctx.primary.is_none() {
        return Ok(no_primary());
    }
    let re = declaration_regex(&ctx.settings.clicktag_patterns)?;
    let found = ctx.scan_sources(&re, &CODE_SOURCES);
    Ok(match found.first() {
        Some(first) => Verdict::pass(format!(
            "clickTag declared in {}",
            first.path
        )),
        None => Verdict::fail("no clickTag declaration found").with_offenders(
            ctx.primary
                .map(|p| vec![Offender::detail(p, "expected e.g. var clickTag = \"...\";")])
                .unwrap_or_default(),
        ),
    })
}

fn hardcoded_clickthrough(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    if ctx.primary.is_none() {
        return Ok(no_primary());
    }
    let mut offenders: Vec<Offender> = ctx
        .references()
        .iter()
        .filter(|r| r.ref_type == RefType::Anchor)
        .filter(|r| {
            let lower = r.url.trim().to_ascii_lowercase();
            lower.starts_with("http://") || lower.starts_with("https://")
        })
        .map(|r| Offender::at(r.from.clone(), r.line, format!("<a href=\"{}\">", r.url)))
        .collect();
    offenders.extend(ctx.scan_sources(open_literal_re(), &CODE_SOURCES));
    Ok(Verdict::from_offenders(
        offenders,
        Severity::FAIL,
        "no hard-coded landing pages",
        |n| format!("{} hard-coded clickthrough URL(s)", n),
    ))
}

fn clicktag_used(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    if ctx.primary.is_none() {
        return Ok(no_primary());
    }
    let declared = declaration_regex(&ctx.settings.clicktag_patterns)?;
    if !ctx.any_source_matches(&declared, &CODE_SOURCES) {
        return Ok(not_applicable("no clickTag declared"));
    }
    let used = usage_regex(&ctx.settings.clicktag_patterns)?;
    Ok(if ctx.any_source_matches(&used, &CODE_SOURCES) {
        Verdict::pass("clickTag is passed to an exit")
    } else {
        Verdict::warn("clickTag is declared but never passed to window.open or an exit call")
    })
}

fn enabler_exit(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    if ctx.primary.is_none() {
        return Ok(no_primary());
    }
    let enabler: Vec<Offender> = ctx
        .references()
        .iter()
        .filter(|r| r.ref_type == RefType::Script)
        .filter(|r| {
            let path = crate::resolver::paths::strip_query_and_fragment(&r.url);
            file_name(path).eq_ignore_ascii_case("enabler.js")
        })
        .map(|r| Offender::at(r.from.clone(), r.line, r.url.clone()))
        .collect();
    if enabler.is_empty() {
        return Ok(not_applicable("Enabler.js not referenced"));
    }
    Ok(if ctx.any_source_matches(enabler_exit_re(), &CODE_SOURCES) {
        Verdict::pass("Enabler exit registered")
    } else {
        Verdict::warn("Enabler.js is loaded but Enabler.exit is never called").with_offenders(enabler)
    })
}
