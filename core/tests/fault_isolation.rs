use creative_audit_core::archive::Archive;
use creative_audit_core::error::{CoreError, CoreResult};
use creative_audit_core::eval::context::CheckContext;
use creative_audit_core::eval::finding::{Severity, Verdict};
use creative_audit_core::eval::registry::{registry, CheckDef};
use creative_audit_core::eval::runner::{run_checks_with, ExecutionMode, RunOptions};
use creative_audit_core::metrics::size_cache::SizeCache;
use creative_audit_core::policy::settings::Settings;
use creative_audit_core::policy::types::{Priority, ProfileScope};
use creative_audit_core::validator::summary::aggregate;
use creative_audit_core::validator::BundleValidator;

fn always_panics(_ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    panic!("boom");
}

fn always_errors(_ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    Err(CoreError::InvalidInput("rule exploded".to_string()))
}

fn always_passes(_ctx: &CheckContext<'_>) -> CoreResult<Verdict> {
    Ok(Verdict::pass("fine"))
}

fn def(id: &'static str, run: fn(&CheckContext<'_>) -> CoreResult<Verdict>) -> CheckDef {
    CheckDef {
        id,
        title: id,
        description: "instrumented rule",
        profiles: ProfileScope::BOTH,
        priority: Priority::Required,
        run,
    }
}

fn fixture() -> Archive {
    Archive::from_files(
        "fixture",
        vec![
            (
                "index.html",
                br#"<meta name="ad.size" content="width=300,height=250"><img src="a.png">"#.to_vec(),
            ),
            ("a.png", b"png".to_vec()),
        ],
    )
}

fn run_with(defs: &[CheckDef], mode: ExecutionMode) -> Vec<creative_audit_core::eval::finding::Finding> {
    let archive = fixture();
    let settings = Settings::default();
    let sizes = SizeCache::new();
    let validator = BundleValidator::new(settings.clone());
    let partial = validator.prepare(&archive, &sizes);
    let ctx = CheckContext::new(&archive, &partial, &settings, &sizes, None);
    run_checks_with(
        defs,
        &ctx,
        &RunOptions {
            mode,
            ..RunOptions::default()
        },
    )
}

#[test]
fn panicking_and_erroring_checks_become_failures() {
    for mode in [ExecutionMode::Parallel, ExecutionMode::Sequential] {
        let defs = vec![
            def("ok-1", always_passes),
            def("panics", always_panics),
            def("errors", always_errors),
            def("ok-2", always_passes),
        ];
        let findings = run_with(&defs, mode);
        assert_eq!(findings.len(), defs.len());

        let panicked = findings.iter().find(|f| f.id == "panics").unwrap();
        assert_eq!(panicked.severity, Severity::FAIL);
        assert_eq!(panicked.messages, vec!["check panicked: boom".to_string()]);

        let errored = findings.iter().find(|f| f.id == "errors").unwrap();
        assert_eq!(errored.severity, Severity::FAIL);
        assert_eq!(
            errored.messages,
            vec!["check error: invalid input: rule exploded".to_string()]
        );

        assert!(findings
            .iter()
            .filter(|f| f.id.starts_with("ok-"))
            .all(|f| f.severity == Severity::PASS));
        assert_eq!(aggregate(&findings).status, Severity::FAIL);
    }
}

#[test]
fn one_throwing_rule_among_the_builtin_set() {
    let mut defs: Vec<CheckDef> = registry().to_vec();
    defs[3] = def("instrumented-panic", always_panics);
    let findings = run_with(&defs, ExecutionMode::Parallel);
    assert_eq!(findings.len(), registry().len());
    let f = findings
        .iter()
        .find(|f| f.id == "instrumented-panic")
        .unwrap();
    assert_eq!(f.severity, Severity::FAIL);
}

#[test]
fn sequential_mode_keeps_declaration_order() {
    let findings = run_with(registry(), ExecutionMode::Sequential);
    let ids: Vec<&str> = findings.iter().map(|f| f.id.as_str()).collect();
    let declared: Vec<&str> = registry().iter().map(|d| d.id).collect();
    assert_eq!(ids, declared);
}
