use crate::error::{CoreError, CoreResult};
use crate::eval::finding::{Offender, Severity};
use crate::policy::types::Profile;
use crate::validator::BundleResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportEnvelope {
    pub generated_at_utc: String,
    pub tool_version: String,
    pub results: Vec<BundleResult>,
}

impl ReportEnvelope {
    pub fn new(results: Vec<BundleResult>) -> CoreResult<Self> {
        Ok(Self {
            generated_at_utc: now_rfc3339_utc()?,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            results,
        })
    }

    pub fn to_json_pretty(&self) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn now_rfc3339_utc() -> CoreResult<String> {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .map_err(|e| CoreError::InvalidInput(format!("timestamp formatting: {}", e)))
}

fn severity_label(s: Severity) -> &'static str {
    match s {
        Severity::PASS => "PASS",
        Severity::WARN => "WARN",
        Severity::FAIL => "FAIL",
    }
}

fn profile_label(p: Profile) -> &'static str {
    match p {
        Profile::CM360 => "CM360",
        Profile::IAB => "IAB",
    }
}

fn offender_label(o: &Offender) -> String {
    let mut s = o.path.clone();
    if let Some(line) = o.line {
        s.push_str(&format!(":{}", line));
    }
    if let Some(d) = &o.detail {
        s.push_str(&format!(" ({})", d));
    }
    s
}

pub fn render_findings_csv(results: &[BundleResult]) -> CoreResult<String> {
    let mut rows: Vec<[String; 8]> = Vec::new();
    for r in results {
        for f in &r.findings {
            rows.push([
                r.bundle_id.clone(),
                r.bundle_name.clone(),
                f.id.clone(),
                f.title.clone(),
                severity_label(f.severity).to_string(),
                f.profiles
                    .iter()
                    .map(|p| profile_label(*p))
                    .collect::<Vec<_>>()
                    .join(";"),
                f.messages.join(";"),
                f.offenders.iter().map(offender_label).collect::<Vec<_>>().join(";"),
            ]);
        }
    }
    rows.sort_by(|a, b| (&a[1], &a[0], &a[2]).cmp(&(&b[1], &b[0], &b[2])));

    let mut wtr = csv::WriterBuilder::new().from_writer(vec![]);
    wtr.write_record([
        "bundle_id",
        "bundle_name",
        "check_id",
        "title",
        "severity",
        "profiles",
        "messages",
        "offenders",
    ])?;
    for row in &rows {
        wtr.write_record(row)?;
    }
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).replace("\r\n", "\n"))
}
