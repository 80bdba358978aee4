use crate::error::{CoreError, CoreResult};
use idna::domain_to_ascii;
use url::Url;

/// Approved external hosts. An entry matches itself and its subdomains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostAllowlist {
    hosts: Vec<String>,
}

fn canonical_host(host: &str) -> Option<String> {
    let trimmed = host.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return None;
    }
    domain_to_ascii(trimmed)
        .ok()
        .map(|h| h.to_ascii_lowercase())
}

impl HostAllowlist {
    pub fn from_patterns(patterns: &[String]) -> CoreResult<Self> {
        let mut hosts = Vec::with_capacity(patterns.len());
        for p in patterns {
            let host = canonical_host(p).ok_or_else(|| {
                CoreError::InvalidInput(format!("invalid allowlist host: {}", p))
            })?;
            if host.contains('/') || host.contains(':') {
                return Err(CoreError::InvalidInput(format!(
                    "allowlist entries must be bare hosts: {}",
                    p
                )));
            }
            hosts.push(host);
        }
        hosts.sort();
        hosts.dedup();
        Ok(Self { hosts })
    }

    pub fn matches_host(&self, host: &str) -> bool {
        let host = match canonical_host(host) {
            Some(h) => h,
            None => return false,
        };
        self.hosts
            .iter()
            .any(|a| host == *a || host.ends_with(&format!(".{}", a)))
    }

    /// Absolute or protocol-relative http(s) URL whose host is approved.
    pub fn matches_url(&self, raw: &str) -> bool {
        let raw = raw.trim();
        let parsed = if raw.starts_with("//") {
            Url::parse(&format!("https:{}", raw))
        } else {
            Url::parse(raw)
        };
        let url = match parsed {
            Ok(u) => u,
            Err(_) => return false,
        };
        let scheme = url.scheme().to_ascii_lowercase();
        if scheme != "https" && scheme != "http" {
            return false;
        }
        match url.host_str() {
            Some(h) => self.matches_host(h),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(hosts: &[&str]) -> HostAllowlist {
        HostAllowlist::from_patterns(&hosts.iter().map(|s| s.to_string()).collect::<Vec<_>>())
            .unwrap()
    }

    #[test]
    fn subdomains_match_but_lookalikes_do_not() {
        let a = list(&["2mdn.net"]);
        assert!(a.matches_host("s0.2mdn.net"));
        assert!(a.matches_host("2MDN.net"));
        assert!(!a.matches_host("evil2mdn.net"));
    }

    #[test]
    fn urls_are_parsed() {
        let a = list(&["ajax.googleapis.com"]);
        assert!(a.matches_url("https://ajax.googleapis.com/ajax/libs/jquery.js"));
        assert!(a.matches_url("//ajax.googleapis.com/x.js"));
        assert!(!a.matches_url("data:text/javascript,1"));
        assert!(!a.matches_url("https://cdn.example.com/x.js"));
    }

    #[test]
    fn bad_entries_are_rejected() {
        assert!(HostAllowlist::from_patterns(&["https://x.com/".to_string()]).is_err());
        assert!(HostAllowlist::from_patterns(&["".to_string()]).is_err());
    }
}
