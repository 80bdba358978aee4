mod cli;

use clap::Parser;
use cli::{Cli, OutputFormat};
use creative_audit_core::eval::finding::Severity;
use creative_audit_core::eval::runner::RunOptions;
use creative_audit_core::policy::settings::Settings;
use creative_audit_core::report::{render_findings_csv, ReportEnvelope};
use creative_audit_core::validator::{BundleResult, BundleValidator};
use std::path::Path;
use tracing_subscriber::{fmt, EnvFilter};

fn audit(validator: &BundleValidator, input: &Path, opts: &RunOptions) -> BundleResult {
    let outcome = if input.is_dir() {
        validator.validate_dir(input, opts)
    } else {
        validator.validate_zip(input, opts)
    };
    match outcome {
        Ok(r) => r,
        Err(e) => {
            eprintln!("validator error: {}: {}", input.display(), e);
            std::process::exit(1);
        }
    }
}

fn main() {
    let cli = Cli::parse();

    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let settings = match &cli.settings {
        Some(p) => match Settings::from_json_file(p) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("invalid settings file {}: {}", p.display(), e);
                std::process::exit(2);
            }
        },
        None => Settings::default(),
    };

    let opts = cli.run_options();
    let validator = BundleValidator::new(settings);
    let results: Vec<BundleResult> = cli
        .inputs
        .iter()
        .map(|input| audit(&validator, input, &opts))
        .collect();
    let any_fail = results.iter().any(|r| r.summary.status == Severity::FAIL);
    tracing::info!(bundles = results.len(), any_fail, "run complete");

    let rendered = match cli.format {
        OutputFormat::Json => ReportEnvelope::new(results).and_then(|env| env.to_json_pretty()),
        OutputFormat::Csv => render_findings_csv(&results),
    };
    match rendered {
        Ok(out) => print!("{}", if out.ends_with('\n') { out } else { out + "\n" }),
        Err(e) => {
            eprintln!("validator error: {}", e);
            std::process::exit(1);
        }
    }
    std::process::exit(if any_fail { 1 } else { 0 });
}
