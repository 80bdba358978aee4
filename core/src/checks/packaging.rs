use crate::archive::entry::html_candidates;
use crate::archive::extension_of;
use crate::checks::{file_name, is_system_file};
use crate::error::CoreResult;
use crate::eval::context::CheckContext;
use crate::eval::finding::{Offender, Severity, Verdict};
use crate::eval::registry::CheckDef;
use crate::policy::types::{Priority, ProfileScope};

pub const CHECKS: &[CheckDef] = &[
    CheckDef {
        id: "pkg-primary",
        title: "Primary HTML document",
        description: "The bundle must contain an HTML entry document.",
        profiles: ProfileScope::BOTH,
        priority: Priority::Required,
        run: primary_document,
    },
    CheckDef {
        id: "pkg-multiple-html",
        title: "Multiple HTML documents",
        description: "CM360 serves a single entry document; extra HTML files are ambiguous.",
        profiles: ProfileScope::CM360,
        priority: Priority::Recommended,
        run: multiple_html,
    },
    CheckDef {
        id: "pkg-file-count",
        title: "File count",
        description: "Bundles may not exceed the configured number of files.",
        profiles: ProfileScope::CM360,
        priority: Priority::Required,
        run: file_count,
    },
    CheckDef {
        id: "pkg-file-types",
        title: "Allowed file types",
        description: "Every packaged file must use an accepted extension.",
        profiles: ProfileScope::CM360,
        priority: Priority::Required,
        run: file_types,
    },
    CheckDef {
        id: "pkg-nested-archive",
        title: "Nested archives",
        description: "Archives inside the bundle are never unpacked by ad servers.",
        profiles: ProfileScope::BOTH,
        priority: Priority::Required,
        run: nested_archives,
    },
    CheckDef {
        id: "pkg-system-files",
        title: "System files",
        description: "OS metadata files (__MACOSX, .DS_Store, Thumbs.db) should be removed.",
        profiles: ProfileScope::BOTH,
        priority: Priority::Recommended,
        run: system_files,
    },
    CheckDef {
        id: "pkg-filenames",
        title: "File name characters",
        description: "File names should use ASCII letters, digits, '.', '_' and '-' only.",
        profiles: ProfileScope::CM360,
        priority: Priority::Recommended,
        run: filenames,
    },
    CheckDef {
        id: "pkg-flash",
        title: "Flash content",
        description: "SWF/FLA files are no longer served by any publisher.",
        profiles: ProfileScope::BOTH,
        priority: Priority::Required,
        run: flash_content,
    },
];

const ARCHIVE_EXTENSIONS: [&str; 7] = ["zip", "rar", "7z", "tar", "gz", "tgz", "bz2"];
const FLASH_EXTENSIONS: [&str; 2] = ["swf", "fla"];

fn primary_document(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    Ok(match ctx.primary {
        Some(p) => Verdict::pass(format!("entry document: {}", p)),
        None => Verdict::fail("no HTML entry document found in bundle"),
    })
}

fn multiple_html(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    let docs = html_candidates(ctx.archive);
    if docs.len() <= 1 {
        return Ok(Verdict::pass("single HTML document"));
    }
    let offenders = docs
        .iter()
        .map(|p| {
            if Some(*p) == ctx.primary {
                Offender::detail(*p, "selected as primary")
            } else {
                Offender::file(*p)
            }
        })
        .collect();
    Ok(Verdict::warn(format!("{} HTML documents in bundle", docs.len())).with_offenders(offenders))
}

fn file_count(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    let n = ctx.files.len();
    let max = ctx.settings.max_file_count;
    Ok(if n > max {
        Verdict::fail(format!("bundle contains {} files (limit {})", n, max))
    } else {
        Verdict::pass(format!("{} files (limit {})", n, max))
    })
}

fn file_types(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    let allowed = &ctx.settings.allowed_extensions;
    let offenders = ctx
        .files
        .iter()
        .filter(|p| !is_system_file(p))
        .filter_map(|p| match extension_of(p) {
            Some(ext) if allowed.iter().any(|a| a.eq_ignore_ascii_case(&ext)) => None,
            Some(ext) => Some(Offender::detail(*p, format!(".{} is not an accepted type", ext))),
            None => Some(Offender::detail(*p, "file has no extension")),
        })
        .collect();
    Ok(Verdict::from_offenders(
        offenders,
        Severity::FAIL,
        "all file types accepted",
        |n| format!("{} file(s) with unaccepted types", n),
    ))
}

fn nested_archives(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    let offenders = ctx
        .files
        .iter()
        .filter(|p| {
            extension_of(p)
                .map(|e| ARCHIVE_EXTENSIONS.contains(&e.as_str()))
                .unwrap_or(false)
        })
        .map(|p| Offender::file(*p))
        .collect();
    Ok(Verdict::from_offenders(
        offenders,
        Severity::FAIL,
        "no nested archives",
        |n| format!("{} nested archive(s) found", n),
    ))
}

fn system_files(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    let offenders = ctx
        .files
        .iter()
        .filter(|p| is_system_file(p))
        .map(|p| Offender::file(*p))
        .collect();
    Ok(Verdict::from_offenders(
        offenders,
        Severity::WARN,
        "no system files",
        |n| format!("{} system file(s) should be removed", n),
    ))
}

fn filename_problem(path: &str) -> Option<&'static str> {
    if path.chars().any(|c| c.is_whitespace()) {
        return Some("contains whitespace");
    }
    if !path.is_ascii() {
        return Some("contains non-ASCII characters");
    }
    let ok = path
        .split('/')
        .all(|seg| seg.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')));
    if ok {
        None
    } else {
        Some("contains special characters")
    }
}

fn filenames(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    let offenders = ctx
        .files
        .iter()
        .filter(|p| !is_system_file(p))
        .filter_map(|p| filename_problem(p).map(|why| Offender::detail(*p, why)))
        .collect();
    Ok(Verdict::from_offenders(
        offenders,
        Severity::WARN,
        "file names are portable",
        |n| format!("{} file name(s) may break on ad servers", n),
    ))
}

fn flash_content(ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    let offenders = ctx
        .files
        .iter()
        .filter(|p| {
            extension_of(file_name(p))
                .map(|e| FLASH_EXTENSIONS.contains(&e.as_str()))
                .unwrap_or(false)
        })
        .map(|p| Offender::file(*p))
        .collect();
    Ok(Verdict::from_offenders(
        offenders,
        Severity::FAIL,
        "no Flash content",
        |n| format!("{} Flash file(s) found", n),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_rules() {
        assert_eq!(filename_problem("img/logo-1_a.png"), None);
        assert_eq!(filename_problem("img/my logo.png"), Some("contains whitespace"));
        assert_eq!(filename_problem("img/logó.png"), Some("contains non-ASCII characters"));
        assert_eq!(filename_problem("img/logo(1).png"), Some("contains special characters"));
    }
}
