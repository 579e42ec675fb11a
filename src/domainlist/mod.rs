//! Domain allow/deny lists consulted before any SMTP traffic.

mod blocklist;
mod error;

pub use blocklist::{Blocklist, RefreshingBlocklist};
pub use error::{BlocklistError, DomainBlockedError};

use std::collections::HashSet;

use crate::address::EmailAddress;

/// Allow-list entries win over deny-list entries. Comparison is on the
/// lower-cased domain and on its ACE form.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainListChecker {
    allow: HashSet<String>,
    deny: HashSet<String>,
}

impl Default for DomainListChecker {
    fn default() -> Self {
        Self {
            allow: HashSet::new(),
            deny: HashSet::from(["localhost".to_string()]),
        }
    }
}

impl DomainListChecker {
    /// A checker with no entries at all.
    pub fn empty() -> Self {
        Self {
            allow: HashSet::new(),
            deny: HashSet::new(),
        }
    }

    pub fn with_allowed<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allow.extend(Blocklist::new(domains).into_domains());
        self
    }

    pub fn with_denied<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.deny.extend(Blocklist::new(domains).into_domains());
        self
    }

    pub fn with_blocklist(mut self, list: &Blocklist) -> Self {
        self.deny.extend(list.clone().into_domains());
        self
    }

    pub fn is_blocked(&self, domain: &str) -> bool {
        let key = list_key(domain);
        !self.allow.contains(&key) && self.deny.contains(&key)
    }

    pub fn check(&self, address: &EmailAddress) -> Result<(), DomainBlockedError> {
        let domain = list_key(address.domain());
        let ace = list_key(address.ace_domain());
        if self.allow.contains(&domain) || self.allow.contains(&ace) {
            return Ok(());
        }
        if self.deny.contains(&domain) || self.deny.contains(&ace) {
            return Err(DomainBlockedError {
                domain: address.domain().to_string(),
            });
        }
        Ok(())
    }
}

/// The form list entries are stored in: no root dot, lower case.
fn list_key(domain: &str) -> String {
    domain.trim_end_matches('.').to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(raw: &str) -> EmailAddress {
        EmailAddress::parse(raw).expect("valid address")
    }

    #[test]
    fn localhost_denied_by_default() {
        let checker = DomainListChecker::default();
        assert!(checker.check(&addr("root@localhost")).is_err());
        assert!(checker.check(&addr("root@example.com")).is_ok());
    }

    #[test]
    fn allow_wins_over_deny() {
        let checker = DomainListChecker::empty()
            .with_denied(["mailinator.com", "example.org"])
            .with_allowed(["Example.org"]);
        assert!(checker.is_blocked("MAILINATOR.com."));
        assert!(!checker.is_blocked("example.org"));
        assert!(checker.check(&addr("x@example.org")).is_ok());
        assert_eq!(
            checker.check(&addr("x@Mailinator.com")),
            Err(DomainBlockedError {
                domain: "Mailinator.com".to_string()
            })
        );
    }

    #[test]
    fn idn_domain_matched_on_ace_form() {
        let list = Blocklist::parse("xn--exmple-cua.com\n");
        let checker = DomainListChecker::empty().with_blocklist(&list);
        assert!(checker.check(&addr("a@exämple.com")).is_err());
    }

    #[test]
    fn fully_qualified_domain_matches_its_entry() {
        let checker = DomainListChecker::empty().with_denied(["mailinator.com"]);
        assert_eq!(
            checker.check(&addr("x@mailinator.com.")),
            Err(DomainBlockedError {
                domain: "mailinator.com.".to_string()
            })
        );
        assert!(DomainListChecker::default().check(&addr("root@LocalHost.")).is_err());

        let allowed = checker.with_allowed(["mailinator.com"]);
        assert!(allowed.check(&addr("x@mailinator.com.")).is_ok());
    }
}
