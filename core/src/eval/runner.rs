use crate::eval::context::CheckContext;
use crate::eval::finding::{Finding, Verdict};
use crate::eval::registry::{registry, CheckDef};
use crate::policy::types::{Priority, Profile};
use rayon::prelude::*;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::warn;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    #[default]
    Parallel,
    Sequential,
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub profile: Option<Profile>,
    pub priorities: Option<Vec<Priority>>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub mode: ExecutionMode,
}

/// Apply profile, priority, include and exclude filters, keeping
/// declaration order.
pub fn select_checks<'r>(defs: &'r [CheckDef], opts: &RunOptions) -> Vec<&'r CheckDef> {
    defs.iter()
        .filter(|d| opts.profile.map(|p| d.profiles.includes(p)).unwrap_or(true))
        .filter(|d| {
            opts.priorities
                .as_ref()
                .map(|ps| ps.contains(&d.priority))
                .unwrap_or(true)
        })
        .filter(|d| opts.include.is_empty() || opts.include.iter().any(|i| i == d.id))
        .filter(|d| !opts.exclude.iter().any(|e| e == d.id))
        .collect()
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

pub fn execute(def: &CheckDef, ctx: &CheckContext<'_>) -> Finding {
    let outcome = catch_unwind(AssertUnwindSafe(|| (def.run)(ctx)));
    let verdict = match outcome {
        Ok(Ok(v)) => v,
        Ok(Err(e)) => {
            warn!(check_id = def.id, error = %e, "check returned an error");
            Verdict::fail(format!("check error: {}", e))
        }
        Err(payload) => {
            let msg = panic_message(payload.as_ref());
            warn!(check_id = def.id, panic = %msg, "check panicked");
            Verdict::fail(format!("check panicked: {}", msg))
        }
    };
    Finding {
        id: def.id.to_string(),
        title: def.title.to_string(),
        severity: verdict.severity,
        messages: verdict.messages,
        offenders: verdict.offenders,
        profiles: def.profiles.tags(),
        priority: Some(def.priority),
        description: Some(def.description.to_string()),
    }
}

pub fn run_checks_with(defs: &[CheckDef], ctx: &CheckContext<'_>, opts: &RunOptions) -> Vec<Finding> {
    let selected = select_checks(defs, opts);
    match opts.mode {
        ExecutionMode::Parallel => selected.par_iter().map(|d| execute(d, ctx)).collect(),
        ExecutionMode::Sequential => selected.iter().map(|d| execute(d, ctx)).collect(),
    }
}

pub fn run_checks(ctx: &CheckContext<'_>, opts: &RunOptions) -> Vec<Finding> {
    run_checks_with(registry(), ctx, opts)
}
