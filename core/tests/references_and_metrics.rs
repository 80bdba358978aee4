use creative_audit_core::archive::Archive;
use creative_audit_core::metrics::size_cache::SizeCache;
use creative_audit_core::metrics::{compute_load_metrics, partition_files};
use creative_audit_core::resolver::paths::resolve_path;
use creative_audit_core::resolver::{resolve_references, RefType};
use std::collections::BTreeSet;

fn archive(files: &[(&str, &str)]) -> Archive {
    Archive::from_files(
        "t",
        files.iter().map(|(p, c)| (*p, c.as_bytes().to_vec())),
    )
}

#[test]
fn dot_slash_prefix_is_equivalent() {
    for url in ["a/b.png", "img/x.gif", "../css/site.css", "deep/er/file.js"] {
        assert_eq!(
            resolve_path("dir/index.html", &format!("./{}", url)),
            resolve_path("dir/index.html", url)
        );
    }
    assert_eq!(
        resolve_path("dir/index.html", "./a/b.png").as_deref(),
        Some("dir/a/b.png")
    );
}

#[test]
fn popping_past_the_root_stays_at_the_root() {
    assert_eq!(resolve_path("index.html", "../../x.png").as_deref(), Some("x.png"));
    assert_eq!(resolve_path("a/index.html", "../../../b/x.png").as_deref(), Some("b/x.png"));
    assert_eq!(resolve_path("index.html", ".."), None);
}

#[test]
fn every_relative_reference_is_found() {
    let a = archive(&[
        (
            "index.html",
            r#"<html><head>
<link rel="stylesheet" href="css/style.css">
<script src="js/app.js"></script>
</head><body>
<img src="img/a.png"><img src="./img/a.png"><img src="img/b.png?v=2">
<div style="background:url('img/bg.jpg')"></div>
</body></html>"#,
        ),
        ("css/style.css", "@font-face{src:url(../fonts/f.woff2)} .x{background:url(\"../img/b.png\")}"),
        ("js/app.js", "1"),
        ("img/a.png", "a"),
        ("img/b.png", "b"),
        ("img/bg.jpg", "bg"),
        ("fonts/f.woff2", "font"),
    ]);
    let refs = resolve_references(&a, "index.html");
    assert!(refs.iter().all(|r| r.in_zip && !r.external), "{:?}", refs);

    let from_html: Vec<_> = refs.iter().filter(|r| r.from == "index.html").collect();
    // `img/a.png` and `./img/a.png` are distinct markup references.
    assert_eq!(from_html.len(), 6);

    let css_refs: Vec<_> = refs.iter().filter(|r| r.from == "css/style.css").collect();
    assert_eq!(css_refs.len(), 2);
    assert!(css_refs
        .iter()
        .any(|r| r.ref_type == RefType::Font && r.normalized.as_deref() == Some("fonts/f.woff2")));
    assert!(css_refs
        .iter()
        .any(|r| r.ref_type == RefType::Image && r.normalized.as_deref() == Some("img/b.png")));
}

#[test]
fn external_references_only_count_as_hosts() {
    let a = archive(&[
        (
            "index.html",
            r#"<script src="https://s0.2mdn.net/ads/studio/Enabler.js"></script>
<script src="https://cdn.example.com/lib.js"></script>
<a href="https://www.example.com/landing">go</a>
<img src="a.png">"#,
        ),
        ("a.png", "a"),
    ]);
    let refs = resolve_references(&a, "index.html");
    let m = compute_load_metrics(&refs, &a, Some("index.html"), &SizeCache::new());
    assert_eq!(m.initial_requests, 2);
    assert_eq!(m.total_requests, 2);
    assert_eq!(m.initial_hosts, 2);
    assert_eq!(m.total_hosts, 3);
}

#[test]
fn phase_partition_covers_every_file_once() {
    let a = archive(&[
        ("index.html", r#"<img src="used.png"><img src="missing.png">"#),
        ("used.png", "u"),
        ("unused.png", "x"),
        ("extra.js", "var a = 1;"),
        ("sub/other.html", "<p>"),
    ]);
    let refs = resolve_references(&a, "index.html");
    let part = partition_files(&refs, &a, Some("index.html"));
    let m = compute_load_metrics(&refs, &a, Some("index.html"), &SizeCache::new());

    assert_eq!(m.initial_requests + m.subload_requests, m.total_requests);
    assert!(part.initial.is_disjoint(&part.subload));
    let union: BTreeSet<String> = part.initial.union(&part.subload).cloned().collect();
    let all: BTreeSet<String> = a.paths().map(|p| p.to_string()).collect();
    assert_eq!(union, all);

    assert!(part.subload.contains("extra.js"));
    assert!(part.subload.contains("unused.png"));
    assert!(part.initial.contains("used.png"));
    assert_eq!(m.total_bytes, a.total_bytes());
}
