/// Schemes that are never resolved against the archive.
const EXTERNAL_PREFIXES: [&str; 6] = ["http:", "https:", "data:", "javascript:", "mailto:", "tel:"];

pub fn is_external(url: &str) -> bool {
    let u = url.trim();
    if u.starts_with("//") {
        return true;
    }
    let lower = u.to_ascii_lowercase();
    EXTERNAL_PREFIXES.iter().any(|p| lower.starts_with(p))
}

/// Everything except plain `http:` counts as secure; internal paths are
/// served from the same origin as the creative.
pub fn is_secure(url: &str) -> bool {
    !url.trim().to_ascii_lowercase().starts_with("http:")
}

pub fn strip_query_and_fragment(url: &str) -> &str {
    let end = url.find(|c| c == '?' || c == '#').unwrap_or(url.len());
    &url[..end]
}

pub fn dir_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[..i],
        None => "",
    }
}

/// Resolve `url` as referenced from the archive file `from`.
///
/// Returns `None` when nothing is left after stripping the query string and
/// fragment (e.g. `#top`).
pub fn resolve_path(from: &str, url: &str) -> Option<String> {
    let url = strip_query_and_fragment(url.trim());
    if url.is_empty() {
        return None;
    }

    let (mut segs, rel): (Vec<&str>, &str) = match url.strip_prefix('/') {
        Some(rest) => (Vec::new(), rest),
        None => {
            let rest = url.strip_prefix("./").unwrap_or(url);
            let base = dir_of(from)
                .split('/')
                .filter(|s| !s.is_empty())
                .collect();
            (base, rest)
        }
    };

    for seg in rel.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segs.pop();
            }
            s => segs.push(s),
        }
    }

    if segs.is_empty() {
        None
    } else {
        Some(segs.join("/"))
    }
}

pub fn host_of(url: &str) -> Option<String> {
    let u = url.trim();
    let parsed = if u.starts_with("//") {
        url::Url::parse(&format!("https:{}", u)).ok()?
    } else {
        url::Url::parse(u).ok()?
    };
    parsed.host_str().map(|h| h.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_slash_and_bare_relative_agree() {
        assert_eq!(
            resolve_path("dir/index.html", "./a/b.png"),
            resolve_path("dir/index.html", "a/b.png")
        );
        assert_eq!(
            resolve_path("dir/index.html", "a/b.png").as_deref(),
            Some("dir/a/b.png")
        );
    }

    #[test]
    fn leading_slash_is_archive_root() {
        assert_eq!(
            resolve_path("dir/index.html", "/img/a.png").as_deref(),
            Some("img/a.png")
        );
    }

    #[test]
    fn parent_segments_pop() {
        assert_eq!(
            resolve_path("css/main.css", "../img/bg.jpg").as_deref(),
            Some("img/bg.jpg")
        );
        assert_eq!(
            resolve_path("a/b/c.html", "../../x/./y.png").as_deref(),
            Some("x/y.png")
        );
    }

    #[test]
    fn popping_past_root_is_a_no_op() {
        assert_eq!(
            resolve_path("index.html", "../../logo.png").as_deref(),
            Some("logo.png")
        );
        assert_eq!(
            resolve_path("dir/index.html", "../../../logo.png").as_deref(),
            Some("logo.png")
        );
        assert_eq!(resolve_path("index.html", ".."), None);
    }

    #[test]
    fn query_and_fragment_are_stripped() {
        assert_eq!(
            resolve_path("index.html", "app.js?v=3#x").as_deref(),
            Some("app.js")
        );
        assert_eq!(resolve_path("index.html", "#top"), None);
    }

    #[test]
    fn external_detection() {
        assert!(is_external("https://a.com/x.js"));
        assert!(is_external("HTTP://a.com/x.js"));
        assert!(is_external("data:image/png;base64,AAA"));
        assert!(is_external("javascript:void(0)"));
        assert!(is_external("//cdn.example.com/x.js"));
        assert!(!is_external("img/a.png"));
        assert!(!is_secure("http://a.com"));
        assert!(is_secure("https://a.com"));
    }

    #[test]
    fn hosts_are_lowercased() {
        assert_eq!(host_of("https://CDN.Example.com/a.js").as_deref(), Some("cdn.example.com"));
        assert_eq!(host_of("//s0.2mdn.net/x.js").as_deref(), Some("s0.2mdn.net"));
        assert_eq!(host_of("data:image/png;base64,AA"), None);
    }
}
