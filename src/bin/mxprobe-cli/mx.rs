use std::time::Duration;

use mxprobe::{MxError, Verdict, mx};

#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
#[derive(Debug, Clone)]
pub struct MxSummary {
    pub domain: String,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Vec::is_empty"))]
    pub hosts: Vec<String>,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub error: Option<String>,
    #[cfg_attr(feature = "with-serde", serde(skip))]
    pub verdict: Verdict,
}

impl MxSummary {
    fn from_error(domain: &str, error: &MxError) -> Self {
        let verdict = match error {
            MxError::DnsTimeout { .. } | MxError::NoNameserver { .. } | MxError::ResolverInit { .. } => {
                Verdict::Unknown
            }
            _ => Verdict::Undeliverable,
        };
        Self {
            domain: domain.to_string(),
            hosts: Vec::new(),
            error: Some(error.to_string()),
            verdict,
        }
    }

    pub fn human_summary(&self) -> String {
        match &self.error {
            Some(error) => format!("error: {error}"),
            None => format!("hosts: {}", self.hosts.join(", ")),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.verdict {
            Verdict::Deliverable => 0,
            Verdict::Undeliverable => 2,
            Verdict::Unknown => 3,
        }
    }
}

pub fn resolve(domain: &str, timeout: Duration) -> MxSummary {
    let domain = domain.trim();
    match mx::resolve_domain(domain, timeout) {
        Ok(candidates) => MxSummary {
            domain: domain.to_string(),
            hosts: candidates.hosts().to_vec(),
            error: None,
            verdict: Verdict::Deliverable,
        },
        Err(err) => MxSummary::from_error(domain, &err),
    }
}
