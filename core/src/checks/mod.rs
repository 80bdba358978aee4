pub mod ad_size;
pub mod clickthrough;
pub mod markup;
pub mod packaging;
pub mod references;
pub mod security;
pub mod weight;

use crate::archive::entry::MACOS_RESOURCE_DIR;
use crate::eval::finding::Verdict;

pub(crate) use crate::resolver::markup::cached;

pub(crate) fn fmt_kb(bytes: u64) -> String {
    format!("{:.1} KB", bytes as f64 / 1024.0)
}

pub(crate) fn no_primary() -> Verdict {
    Verdict::warn("no primary HTML document; check skipped")
}

pub(crate) fn not_applicable(reason: &str) -> Verdict {
    Verdict::pass(format!("not applicable: {}", reason))
}

pub(crate) fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

const SYSTEM_FILE_NAMES: [&str; 3] = [".ds_store", "thumbs.db", "desktop.ini"];

/// OS metadata files that archivers add behind the author's back.
pub(crate) fn is_system_file(path: &str) -> bool {
    if path.starts_with(MACOS_RESOURCE_DIR) {
        return true;
    }
    let name = file_name(path);
    name.starts_with("._") || SYSTEM_FILE_NAMES.contains(&name.to_ascii_lowercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_files() {
        assert!(is_system_file("__MACOSX/a/._index.html"));
        assert!(is_system_file("img/.DS_Store"));
        assert!(is_system_file("Thumbs.db"));
        assert!(!is_system_file("img/logo.png"));
    }

    #[test]
    fn kilobytes_have_one_decimal() {
        assert_eq!(fmt_kb(1536), "1.5 KB");
    }
}
