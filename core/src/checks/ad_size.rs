use crate::adsize::css::largest;
use crate::adsize::{css_size_candidates, is_standard_size, SizeMethod};
use crate::checks::{no_primary, not_applicable};
use crate::error::CoreResult;
use crate::eval::context::CheckContext;
use crate::eval::finding::{Offender, Verdict};
use crate::eval::registry::CheckDef;
use crate::policy::types::{Priority, ProfileScope};

pub const CHECKS: &[CheckDef] = &[
    CheckDef {
        id: "size-declared",
        title: "Ad size declaration",
        description: "The entry document should declare its size with <meta name=\"ad.size\">.",
        profiles: ProfileScope::CM360,
        priority: Priority::Required,
        run: size_declared,
    },
    CheckDef {
        id: "size-standard",
        title: "Standard IAB size",
        description: "Fixed-size creatives should use one of the IAB standard ad units.",
        profiles: ProfileScope::IAB,
        priority: Priority::Recommended,
        run: size_standard,
    },
    CheckDef {
        id: "size-expected",
        title: "Expected dimensions",
        description: "The detected size must match the booked placement size when one is configured.",
        profiles: ProfileScope::BOTH,
        priority: Priority::Required,
        run: size_expected,
    },
    CheckDef {
        id: "size-css-mismatch",
        title: "Declared vs. styled size",
        description: "The declared size should agree with the largest container sized in CSS.",
        profiles: ProfileScope::BOTH,
        priority: Priority::Advisory,
        run: size_css_mismatch,
    },
];

fn size_declared(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    if ctx.primary.is_none() {
        return Ok(no_primary());
    }
    Ok(match ctx.ad_size() {
        Some(size) if size.source.method == SizeMethod::Meta => {
            Verdict::pass(format!("declared {} via meta tag", size.label()))
        }
        Some(size) => Verdict::warn(format!(
            "size {} inferred from {:?}; add <meta name=\"ad.size\" content=\"width={},height={}\">",
            size.label(),
            size.source.method,
            size.width,
            size.height
        ))
        .with_offenders(vec![Offender::detail(
            size.source.path.clone(),
            size.source.snippet.clone(),
        )]),
        None => Verdict::fail("ad size could not be determined"),
    })
}

fn size_standard(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    Ok(match ctx.ad_size() {
        Some(size) if is_standard_size(size.width, size.height) => {
            Verdict::pass(format!("{} is a standard IAB size", size.label()))
        }
        Some(size) => Verdict::warn(format!("{} is not a standard IAB size", size.label())),
        None => Verdict::warn("ad size undetected; cannot compare with IAB sizes"),
    })
}

fn size_expected(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    let expected = match &ctx.settings.expected_size {
        Some(e) => e,
        None => return Ok(Verdict::pass("no expected size configured")),
    };
    let want = format!("{}x{}", expected.width, expected.height);
    Ok(match ctx.ad_size() {
        None => Verdict::warn(format!("expected {} but ad size is undetected", want)),
        Some(size) if size.width == expected.width && size.height == expected.height => {
            Verdict::pass(format!("matches expected {}", want))
        }
        Some(size) => Verdict::fail(format!("detected {} but expected {}", size.label(), want))
            .with_offenders(vec![Offender::detail(
                size.source.path.clone(),
                size.source.snippet.clone(),
            )]),
    })
}

fn size_css_mismatch(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    let (entry, html) = match (ctx.primary, ctx.html) {
        (Some(p), Some(h)) => (p, h),
        _ => return Ok(no_primary()),
    };
    let size = match ctx.ad_size() {
        Some(s) if !s.source.method.is_css() => s,
        Some(_) => return Ok(not_applicable("size was taken from CSS")),
        None => return Ok(not_applicable("no declared size")),
    };
    let candidates = css_size_candidates(ctx.archive, entry, html);
    let stage = match largest(&candidates) {
        Some(c) => c,
        None => return Ok(not_applicable("no sized container in CSS")),
    };
    Ok(if stage.width == size.width && stage.height == size.height {
        Verdict::pass(format!("stage CSS agrees with {}", size.label()))
    } else {
        Verdict::warn(format!(
            "declared {} but largest CSS container is {}x{}",
            size.label(),
            stage.width,
            stage.height
        ))
        .with_offenders(vec![Offender::detail(stage.path.clone(), stage.snippet.clone())])
    })
}
