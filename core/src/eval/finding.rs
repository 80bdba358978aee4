use crate::policy::types::{Priority, Profile};
use serde::{Deserialize, Serialize};

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    PASS,
    WARN,
    FAIL,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Offender {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Offender {
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            line: None,
            detail: None,
        }
    }

    pub fn at(path: impl Into<String>, line: Option<usize>, detail: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            line,
            detail: Some(detail.into()),
        }
    }

    pub fn detail(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::at(path, None, detail)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub severity: Severity,
    pub messages: Vec<String>,
    pub offenders: Vec<Offender>,
}

impl Verdict {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            messages: vec![message.into()],
            offenders: Vec::new(),
        }
    }

    pub fn pass(message: impl Into<String>) -> Self {
        Self::new(Severity::PASS, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(Severity::WARN, message)
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::new(Severity::FAIL, message)
    }

    pub fn with_offenders(mut self, offenders: Vec<Offender>) -> Self {
        self.offenders = offenders;
        self
    }

    /// PASS when `offenders` is empty, otherwise `severity` with the
    /// offenders attached and a message built from their count.
    pub fn from_offenders(
        offenders: Vec<Offender>,
        severity: Severity,
        pass_message: &str,
        bad_message: impl FnOnce(usize) -> String,
    ) -> Self {
        if offenders.is_empty() {
            Self::pass(pass_message)
        } else {
            let msg = bad_message(offenders.len());
            Self::new(severity, msg).with_offenders(offenders)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Finding {
    pub id: String,
    pub title: String,
    pub severity: Severity,
    pub messages: Vec<String>,
    pub offenders: Vec<Offender>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<Profile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
