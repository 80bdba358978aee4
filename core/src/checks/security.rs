use crate::checks::{cached, no_primary};
use crate::error::CoreResult;
use crate::eval::context::{CheckContext, SourceKind, CODE_SOURCES};
use crate::eval::finding::{Offender, Severity, Verdict};
use crate::eval::registry::CheckDef;
use crate::policy::allowlist::HostAllowlist;
use crate::policy::types::{Priority, ProfileScope};
use crate::resolver::paths::host_of;
use crate::resolver::RefType;
use regex::Regex;
use std::sync::OnceLock;

pub const CHECKS: &[CheckDef] = &[
    CheckDef {
        id: "sec-insecure-http",
        title: "Insecure references",
        description: "Assets must load over HTTPS; publishers serve creatives on secure pages.",
        profiles: ProfileScope::BOTH,
        priority: Priority::Required,
        run: insecure_http,
    },
    CheckDef {
        id: "sec-protocol-relative",
        title: "Protocol-relative URLs",
        description: "Protocol-relative URLs resolve to file: or http: outside secure pages; use https.",
        profiles: ProfileScope::BOTH,
        priority: Priority::Recommended,
        run: protocol_relative,
    },
    CheckDef {
        id: "sec-eval",
        title: "Dynamic code execution",
        description: "eval, new Function and document.write are blocked by many publishers.",
        profiles: ProfileScope::IAB,
        priority: Priority::Recommended,
        run: dynamic_code,
    },
    CheckDef {
        id: "sec-storage",
        title: "Client storage access",
        description: "Cookies and browser storage require consent handling by the publisher.",
        profiles: ProfileScope::IAB,
        priority: Priority::Recommended,
        run: client_storage,
    },
    CheckDef {
        id: "sec-frame-escape",
        title: "Frame escaping",
        description: "Creatives must not reach into or navigate the host page.",
        profiles: ProfileScope::BOTH,
        priority: Priority::Required,
        run: frame_escape,
    },
    CheckDef {
        id: "sec-host-allowlist",
        title: "Approved external hosts",
        description: "External scripts, stylesheets and fonts should come from approved hosts.",
        profiles: ProfileScope::CM360,
        priority: Priority::Recommended,
        run: host_allowlist,
    },
];

const SCRIPT_SOURCES: [SourceKind; 1] = [SourceKind::Script];

fn http_literal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r#"(?i)\bhttp://[^\s"'`)<>]+"#)
}

fn dynamic_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"\beval\s*\(|\bnew\s+Function\s*\(|\bdocument\.write(?:ln)?\s*\(")
}

fn storage_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"\b(?:localStorage|sessionStorage|indexedDB)\b|\bdocument\.cookie\b")
}

fn frame_escape_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(
        &RE,
        r"\b(?:top|parent)\.location\b|\bwindow\.top\.|\bparent\.document\b",
    )
}

/// XML namespace identifiers are never fetched.
fn is_namespace_uri(text: &str) -> bool {
    text.to_ascii_lowercase().starts_with("http://www.w3.org/")
}

fn insecure_http(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    if ctx.primary.is_none() {
        return Ok(no_primary());
    }
    let mut offenders: Vec<Offender> = ctx
        .references()
        .iter()
        .filter(|r| r.is_load() && !r.secure)
        .map(|r| Offender::at(r.from.clone(), r.line, r.url.clone()))
        .collect();
    offenders.extend(
        ctx.scan_sources(http_literal_re(), &SCRIPT_SOURCES)
            .into_iter()
            .filter(|o| !o.detail.as_deref().map(is_namespace_uri).unwrap_or(false)),
    );
    Ok(Verdict::from_offenders(
        offenders,
        Severity::FAIL,
        "all assets load over HTTPS",
        |n| format!("{} insecure http: URL(s)", n),
    ))
}

fn protocol_relative(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    let offenders = ctx
        .references()
        .iter()
        .filter(|r| r.url.trim().starts_with("//"))
        .map(|r| Offender::at(r.from.clone(), r.line, r.url.clone()))
        .collect();
    Ok(Verdict::from_offenders(
        offenders,
        Severity::WARN,
        "no protocol-relative URLs",
        |n| format!("{} protocol-relative URL(s); use https://", n),
    ))
}

fn dynamic_code(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    if ctx.primary.is_none() {
        return Ok(no_primary());
    }
    Ok(Verdict::from_offenders(
        ctx.scan_sources(dynamic_code_re(), &CODE_SOURCES),
        Severity::WARN,
        "no dynamic code execution",
        |n| format!("{} eval/Function/document.write call(s)", n),
    ))
}

fn client_storage(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    if ctx.primary.is_none() {
        return Ok(no_primary());
    }
    Ok(Verdict::from_offenders(
        ctx.scan_sources(storage_re(), &CODE_SOURCES),
        Severity::WARN,
        "no cookie or storage access",
        |n| format!("{} cookie/storage access(es)", n),
    ))
}

fn frame_escape(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    if ctx.primary.is_none() {
        return Ok(no_primary());
    }
    Ok(Verdict::from_offenders(
        ctx.scan_sources(frame_escape_re(), &CODE_SOURCES),
        Severity::FAIL,
        "creative stays inside its frame",
        |n| format!("{} attempt(s) to access the host page", n),
    ))
}

fn host_allowlist(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    let allow = HostAllowlist::from_patterns(&ctx.settings.allowed_hosts)?;
    let offenders = ctx
        .references()
        .iter()
        .filter(|r| r.external)
        .filter(|r| matches!(r.ref_type, RefType::Script | RefType::Stylesheet | RefType::Font))
        .filter_map(|r| {
            let host = host_of(&r.url)?;
            if allow.matches_url(&r.url) {
                None
            } else {
                Some(Offender::at(
                    r.from.clone(),
                    r.line,
                    format!("{} ({})", r.url, host),
                ))
            }
        })
        .collect();
    Ok(Verdict::from_offenders(
        offenders,
        Severity::WARN,
        "external scripts and styles come from approved hosts",
        |n| format!("{} reference(s) to unapproved hosts", n),
    ))
}
