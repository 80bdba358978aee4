use crate::archive::extension_of;
use crate::checks::{fmt_kb, is_system_file};
use crate::error::CoreResult;
use crate::eval::context::CheckContext;
use crate::eval::finding::{Offender, Severity, Verdict};
use crate::eval::registry::CheckDef;
use crate::metrics::external_hosts;
use crate::policy::settings::Settings;
use crate::policy::types::{Priority, ProfileScope};

pub const CHECKS: &[CheckDef] = &[
    CheckDef {
        id: "weight-initial",
        title: "Initial load weight",
        description: "Compressed size of the entry document and everything it references.",
        profiles: ProfileScope::BOTH,
        priority: Priority::Required,
        run: initial_weight,
    },
    CheckDef {
        id: "weight-subload",
        title: "Subload weight",
        description: "Compressed size of files loaded after the initial phase.",
        profiles: ProfileScope::IAB,
        priority: Priority::Recommended,
        run: subload_weight,
    },
    CheckDef {
        id: "weight-uncompressed",
        title: "Total uncompressed size",
        description: "Sum of raw file sizes across the whole bundle.",
        profiles: ProfileScope::CM360,
        priority: Priority::Required,
        run: uncompressed_weight,
    },
    CheckDef {
        id: "requests-initial",
        title: "Initial requests",
        description: "Number of files fetched during the initial load.",
        profiles: ProfileScope::IAB,
        priority: Priority::Required,
        run: initial_requests,
    },
    CheckDef {
        id: "requests-total",
        title: "Total requests",
        description: "Number of files in the bundle, each one a request when served.",
        profiles: ProfileScope::IAB,
        priority: Priority::Recommended,
        run: total_requests,
    },
    CheckDef {
        id: "hosts-external",
        title: "External hosts",
        description: "Each host an asset loads from costs a DNS lookup and connection; anchor targets are not counted.",
        profiles: ProfileScope::BOTH,
        priority: Priority::Advisory,
        run: hosts_external,
    },
    CheckDef {
        id: "weight-large-file",
        title: "Oversized files",
        description: "Individual files above the per-file compressed limit.",
        profiles: ProfileScope::BOTH,
        priority: Priority::Recommended,
        run: large_files,
    },
    CheckDef {
        id: "weight-images",
        title: "Image weight",
        description: "Individual images above the per-image compressed limit.",
        profiles: ProfileScope::IAB,
        priority: Priority::Advisory,
        run: image_weight,
    },
    CheckDef {
        id: "weight-fonts",
        title: "Font weight",
        description: "Combined compressed size of packaged fonts.",
        profiles: ProfileScope::IAB,
        priority: Priority::Advisory,
        run: font_weight,
    },
    CheckDef {
        id: "media-packaged-video",
        title: "Packaged video",
        description: "Video should be streamed from a media host rather than packaged.",
        profiles: ProfileScope::IAB,
        priority: Priority::Recommended,
        run: packaged_video,
    },
];

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "webp", "svg"];
const FONT_EXTENSIONS: [&str; 5] = ["woff", "woff2", "ttf", "otf", "eot"];
const VIDEO_EXTENSIONS: [&str; 6] = ["mp4", "webm", "ogv", "mov", "avi", "m4v"];
const TOP_OFFENDERS: usize = 5;

fn has_extension(path: &str, set: &[&str]) -> bool {
    extension_of(path)
        .map(|e| set.contains(&e.as_str()))
        .unwrap_or(false)
}

fn size_offender(ctx: &CheckContext<'_>, path: &str) -> Offender {
    Offender::detail(path, format!("{} compressed", fmt_kb(ctx.compressed_size(path))))
}

fn heaviest<'p, I>(ctx: &CheckContext<'_>, paths: I) -> Vec<Offender>
where
    I: Iterator<Item = &'p String>,
{
    let mut sized: Vec<(u64, &String)> = paths.map(|p| (ctx.compressed_size(p), p)).collect();
    sized.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    sized
        .into_iter()
        .take(TOP_OFFENDERS)
        .map(|(n, p)| Offender::detail(p.clone(), format!("{} compressed", fmt_kb(n))))
        .collect()
}

fn initial_weight(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    let used = ctx.metrics().initial_bytes;
    let limit = Settings::kb(ctx.settings.max_initial_kb);
    Ok(if used > limit {
        Verdict::fail(format!(
            "initial load is {} (limit {} KB)",
            fmt_kb(used),
            ctx.settings.max_initial_kb
        ))
        .with_offenders(heaviest(ctx, ctx.partial.partition.initial.iter()))
    } else {
        Verdict::pass(format!(
            "initial load is {} (limit {} KB)",
            fmt_kb(used),
            ctx.settings.max_initial_kb
        ))
    })
}

fn subload_weight(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    let used = ctx.metrics().subload_bytes;
    let limit = Settings::kb(ctx.settings.max_subload_kb);
    Ok(if used > limit {
        Verdict::warn(format!(
            "subload is {} (limit {} KB)",
            fmt_kb(used),
            ctx.settings.max_subload_kb
        ))
        .with_offenders(heaviest(ctx, ctx.partial.partition.subload.iter()))
    } else {
        Verdict::pass(format!(
            "subload is {} (limit {} KB)",
            fmt_kb(used),
            ctx.settings.max_subload_kb
        ))
    })
}

fn uncompressed_weight(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    let used = ctx.metrics().total_bytes;
    let limit = Settings::kb(ctx.settings.max_uncompressed_kb);
    let msg = format!(
        "bundle is {} uncompressed (limit {} KB)",
        fmt_kb(used),
        ctx.settings.max_uncompressed_kb
    );
    Ok(if used > limit {
        Verdict::fail(msg)
    } else {
        Verdict::pass(msg)
    })
}

fn initial_requests(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    let n = ctx.metrics().initial_requests;
    let max = ctx.settings.max_initial_requests;
    Ok(if n > max {
        let offenders = ctx
            .partial
            .partition
            .initial
            .iter()
            .map(|p| Offender::file(p.clone()))
            .collect();
        Verdict::fail(format!("{} initial requests (limit {})", n, max)).with_offenders(offenders)
    } else {
        Verdict::pass(format!("{} initial requests (limit {})", n, max))
    })
}

fn total_requests(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    let n = ctx.metrics().total_requests;
    let max = ctx.settings.max_total_requests;
    Ok(if n > max {
        Verdict::warn(format!("{} total requests (limit {})", n, max))
    } else {
        Verdict::pass(format!("{} total requests (limit {})", n, max))
    })
}

fn hosts_external(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    let hosts = external_hosts(ctx.references(), true);
    let max = ctx.settings.max_external_hosts;
    Ok(if hosts.len() > max {
        let offenders = hosts
            .iter()
            .map(|h| Offender::detail(h.clone(), "external host"))
            .collect();
        Verdict::warn(format!("{} external hosts (limit {})", hosts.len(), max)).with_offenders(offenders)
    } else {
        Verdict::pass(format!("{} external hosts (limit {})", hosts.len(), max))
    })
}

fn large_files(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    let limit = Settings::kb(ctx.settings.max_file_kb);
    let offenders = ctx
        .files
        .iter()
        .filter(|p| !is_system_file(p))
        .filter(|p| ctx.compressed_size(p) > limit)
        .map(|p| size_offender(ctx, p))
        .collect();
    Ok(Verdict::from_offenders(
        offenders,
        Severity::WARN,
        "no file exceeds the per-file limit",
        |n| format!("{} file(s) above {} KB", n, ctx.settings.max_file_kb),
    ))
}

fn image_weight(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    let limit = Settings::kb(ctx.settings.max_image_kb);
    let offenders = ctx
        .files
        .iter()
        .filter(|p| !is_system_file(p) && has_extension(p, &IMAGE_EXTENSIONS))
        .filter(|p| ctx.compressed_size(p) > limit)
        .map(|p| size_offender(ctx, p))
        .collect();
    Ok(Verdict::from_offenders(
        offenders,
        Severity::WARN,
        "all images within the per-image limit",
        |n| format!("{} image(s) above {} KB", n, ctx.settings.max_image_kb),
    ))
}

fn font_weight(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    let fonts: Vec<&str> = ctx
        .files
        .iter()
        .copied()
        .filter(|p| !is_system_file(p) && has_extension(p, &FONT_EXTENSIONS))
        .collect();
    if fonts.is_empty() {
        return Ok(Verdict::pass("no packaged fonts"));
    }
    let total: u64 = fonts.iter().map(|p| ctx.compressed_size(p)).sum();
    let limit = Settings::kb(ctx.settings.max_font_kb);
    let msg = format!(
        "{} font file(s) total {} (limit {} KB)",
        fonts.len(),
        fmt_kb(total),
        ctx.settings.max_font_kb
    );
    Ok(if total > limit {
        Verdict::warn(msg).with_offenders(fonts.iter().map(|p| size_offender(ctx, p)).collect())
    } else {
        Verdict::pass(msg)
    })
}

fn packaged_video(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    let offenders = ctx
        .files
        .iter()
        .filter(|p| !is_system_file(p) && has_extension(p, &VIDEO_EXTENSIONS))
        .map(|p| size_offender(ctx, p))
        .collect();
    Ok(Verdict::from_offenders(
        offenders,
        Severity::WARN,
        "no packaged video",
        |n| format!("{} video file(s) packaged in the bundle", n),
    ))
}
