use crate::archive::{extension_of, Archive};

/// Resource-fork folder that macOS Finder adds to zips.
pub const MACOS_RESOURCE_DIR: &str = "__MACOSX/";

pub fn is_html_path(path: &str) -> bool {
    matches!(extension_of(path).as_deref(), Some("html") | Some("htm"))
}

pub fn html_candidates(archive: &Archive) -> Vec<&str> {
    archive
        .paths()
        .filter(|p| !p.starts_with(MACOS_RESOURCE_DIR))
        .filter(|p| is_html_path(p))
        .collect()
}

/// Choose the entry document: `index.html`/`index.htm` first, then the
/// shallowest document, then lexicographic order.
pub fn find_primary(archive: &Archive) -> Option<String> {
    let mut candidates = html_candidates(archive);
    candidates.sort_by_key(|p| {
        let file = p.rsplit('/').next().unwrap_or(p).to_ascii_lowercase();
        let is_index = file == "index.html" || file == "index.htm";
        (!is_index, p.matches('/').count(), p.to_string())
    });
    candidates.first().map(|p| p.to_string())
}
