use crate::eval::finding::{Finding, Severity};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Summary {
    pub status: Severity,
    pub total_findings: usize,
    pub fails: usize,
    pub warns: usize,
    pub pass: usize,
}

/// FAIL if any finding failed, else WARN if any warned, else PASS.
/// Priority tiers play no part.
pub fn aggregate(findings: &[Finding]) -> Summary {
    let mut fails = 0;
    let mut warns = 0;
    let mut pass = 0;
    for f in findings {
        match f.severity {
            Severity::FAIL => fails += 1,
            Severity::WARN => warns += 1,
            Severity::PASS => pass += 1,
        }
    }
    let status = if fails > 0 {
        Severity::FAIL
    } else if warns > 0 {
        Severity::WARN
    } else {
        Severity::PASS
    };
    Summary {
        status,
        total_findings: findings.len(),
        fails,
        warns,
        pass,
    }
}
