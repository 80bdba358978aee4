use creative_audit_core::archive::{find_primary, Archive};
use creative_audit_core::eval::finding::Severity;
use creative_audit_core::eval::runner::RunOptions;
use creative_audit_core::report::{render_findings_csv, ReportEnvelope};
use creative_audit_core::validator::BundleValidator;
use sha2::{Digest, Sha256};
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

const INDEX: &str = r#"<!DOCTYPE html><html><head><meta name="ad.size" content="width=728,height=90"></head><body><img src="img/logo.png"></body></html>"#;

fn write_zip(path: &std::path::Path, entries: &[(&str, &[u8])]) {
    let f = std::fs::File::create(path).unwrap();
    let mut zw = ZipWriter::new(f);
    let opts = FileOptions::<()>::default().compression_method(CompressionMethod::Deflated);
    zw.add_directory("img/", opts).unwrap();
    for (name, bytes) in entries {
        zw.start_file(*name, opts).unwrap();
        zw.write_all(bytes).unwrap();
    }
    zw.finish().unwrap();
}

#[test]
fn zip_reader_normalizes_names_and_hashes_raw_bytes() {
    let td = tempfile::tempdir().unwrap();
    let zip_path = td.path().join("creative.zip");
    write_zip(
        &zip_path,
        &[
            ("index.html", INDEX.as_bytes()),
            ("./img/logo.png", b"png"),
            ("__MACOSX/._index.html", b"fork"),
        ],
    );

    let bytes = std::fs::read(&zip_path).unwrap();
    let expected_id = hex::encode(Sha256::digest(&bytes));
    let archive = Archive::from_zip_bytes("creative.zip", bytes).unwrap();

    assert_eq!(archive.id(), expected_id);
    assert_eq!(archive.len(), 3);
    assert!(archive.contains("img/logo.png"));
    assert!(!archive.contains("img/"));
    assert_eq!(archive.resolve_ci("IMG/LOGO.PNG"), Some("img/logo.png"));
    assert_eq!(find_primary(&archive).as_deref(), Some("index.html"));
}

#[test]
fn validate_zip_end_to_end() {
    let td = tempfile::tempdir().unwrap();
    let zip_path = td.path().join("leaderboard.zip");
    write_zip(
        &zip_path,
        &[("index.html", INDEX.as_bytes()), ("img/logo.png", b"png")],
    );
    let r = BundleValidator::default()
        .validate_zip(&zip_path, &RunOptions::default())
        .unwrap();
    assert_eq!(r.bundle_name, "leaderboard.zip");
    let size = r.ad_size.unwrap();
    assert_eq!((size.width, size.height), (728, 90));
    assert!(r.references.iter().all(|x| x.in_zip));
    assert_eq!(r.initial_requests, 2);
}

#[test]
fn corrupt_zip_is_an_error() {
    let err = Archive::from_zip_bytes("bad.zip", b"not a zip".to_vec()).unwrap_err();
    assert!(err.to_string().starts_with("zip error"));
}

#[test]
fn dir_reader_matches_in_memory_archive() {
    let td = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(td.path().join("img")).unwrap();
    std::fs::write(td.path().join("index.html"), INDEX).unwrap();
    std::fs::write(td.path().join("img").join("logo.png"), b"png").unwrap();

    let from_dir = Archive::from_dir("creative", td.path()).unwrap();
    let in_memory = Archive::from_files(
        "creative",
        vec![
            ("img/logo.png", b"png".to_vec()),
            ("index.html", INDEX.as_bytes().to_vec()),
        ],
    );
    assert_eq!(from_dir.id(), in_memory.id());
    assert_eq!(from_dir.files(), in_memory.files());

    let r = BundleValidator::default()
        .validate_dir(td.path(), &RunOptions::default())
        .unwrap();
    assert_eq!(r.bundle_id, in_memory.id());
}

#[test]
fn csv_report_is_sorted_with_unix_newlines() {
    let validator = BundleValidator::default();
    let opts = RunOptions {
        include: vec!["size-declared".to_string(), "pkg-primary".to_string()],
        ..RunOptions::default()
    };
    let good = Archive::from_files(
        "b-good",
        vec![
            ("index.html", INDEX.as_bytes().to_vec()),
            ("img/logo.png", b"png".to_vec()),
        ],
    );
    let empty = Archive::from_files("a-empty", vec![("readme.txt", b"hi".to_vec())]);
    let results = vec![
        validator.validate_archive(&good, &opts),
        validator.validate_archive(&empty, &opts),
    ];
    assert_eq!(results[1].summary.status, Severity::FAIL);

    let csv = render_findings_csv(&results).unwrap();
    assert!(!csv.contains('\r'));
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "bundle_id,bundle_name,check_id,title,severity,profiles,messages,offenders"
    );
    assert_eq!(lines.len(), 5);
    assert!(lines[1].contains(",a-empty,pkg-primary,"));
    assert!(lines[2].contains(",a-empty,size-declared,"));
    assert!(lines[3].contains(",b-good,pkg-primary,"));
    assert!(lines[4].contains(",b-good,size-declared,"));

    let env = ReportEnvelope::new(results).unwrap();
    let json = env.to_json_pretty().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["results"].as_array().unwrap().len(), 2);
    assert!(parsed["generated_at_utc"].as_str().unwrap().ends_with('Z'));
}
