use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Profile {
    CM360,
    IAB,
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProfileScope {
    CM360,
    IAB,
    BOTH,
}

impl ProfileScope {
    pub fn includes(self, profile: Profile) -> bool {
        match self {
            ProfileScope::BOTH => true,
            ProfileScope::CM360 => profile == Profile::CM360,
            ProfileScope::IAB => profile == Profile::IAB,
        }
    }

    pub fn tags(self) -> Vec<Profile> {
        match self {
            ProfileScope::BOTH => vec![Profile::CM360, Profile::IAB],
            ProfileScope::CM360 => vec![Profile::CM360],
            ProfileScope::IAB => vec![Profile::IAB],
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Required,
    Recommended,
    Advisory,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_scope_includes_every_profile() {
        assert!(ProfileScope::BOTH.includes(Profile::CM360));
        assert!(ProfileScope::BOTH.includes(Profile::IAB));
        assert!(!ProfileScope::IAB.includes(Profile::CM360));
        assert_eq!(ProfileScope::BOTH.tags().len(), 2);
    }
}
