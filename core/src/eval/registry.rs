use crate::checks;
use crate::error::{CoreError, CoreResult};
use crate::eval::context::CheckContext;
use crate::eval::finding::Verdict;
use crate::policy::types::{Priority, ProfileScope};
use std::collections::BTreeSet;
use std::sync::OnceLock;

pub type CheckFn = fn(&CheckContext<'_>) -> CoreResult<Verdict>;

#[derive(Clone, Copy)]
pub struct CheckDef {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub profiles: ProfileScope,
    pub priority: Priority,
    pub run: CheckFn,
}

impl std::fmt::Debug for CheckDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckDef")
            .field("id", &self.id)
            .field("profiles", &self.profiles)
            .field("priority", &self.priority)
            .finish()
    }
}

pub fn registry() -> &'static [CheckDef] {
    static REGISTRY: OnceLock<Vec<CheckDef>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut all = Vec::new();
        all.extend_from_slice(checks::packaging::CHECKS);
        all.extend_from_slice(checks::references::CHECKS);
        all.extend_from_slice(checks::ad_size::CHECKS);
        all.extend_from_slice(checks::weight::CHECKS);
        all.extend_from_slice(checks::clickthrough::CHECKS);
        all.extend_from_slice(checks::security::CHECKS);
        all.extend_from_slice(checks::markup::CHECKS);
        all
    })
}

pub fn find_check(id: &str) -> Option<&'static CheckDef> {
    registry().iter().find(|c| c.id == id)
}

/// Reject rule sets with duplicate or empty ids.
pub fn validate_registry(defs: &[CheckDef]) -> CoreResult<()> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for d in defs {
        if d.id.trim().is_empty() {
            return Err(CoreError::InvalidInput("check with empty id".to_string()));
        }
        if !seen.insert(d.id) {
            return Err(CoreError::InvalidInput(format!(
                "duplicate check id: {}",
                d.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_is_valid() {
        validate_registry(registry()).unwrap();
        assert!(registry().len() >= 40);
        assert!(registry().iter().all(|c| !c.title.is_empty() && !c.description.is_empty()));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let d = registry()[0];
        let err = validate_registry(&[d, d]).unwrap_err();
        assert!(err.to_string().contains("duplicate check id"));
    }

    #[test]
    fn lookup_by_id() {
        assert!(find_check("ref-missing").is_some());
        assert!(find_check("nope").is_none());
    }
}
