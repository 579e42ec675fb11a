use mxprobe::{
    ProbeReport, SmtpMessages, ValidationError, ValidationOptions, Verdict, validate_detailed,
};

#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
#[derive(Debug)]
pub struct CheckRow {
    pub address: String,
    pub verdict: Verdict,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub error: Option<String>,
    pub candidates: Vec<String>,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub smtp: Option<SmtpMessages>,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Vec::is_empty"))]
    pub transcript: Vec<ProbeReport>,
}

impl CheckRow {
    pub fn human_summary(&self) -> String {
        match &self.error {
            Some(error) => format!("{} :: {error}", self.verdict),
            None => self.verdict.to_string(),
        }
    }
}

pub fn check(raw: &str, options: &ValidationOptions, keep_transcript: bool) -> CheckRow {
    let report = validate_detailed(raw.trim(), options);
    let verdict = report.verdict();
    let (error, smtp) = match &report.result {
        Ok(_) => (None, None),
        Err(err) => (Some(err.to_string()), smtp_messages(err)),
    };
    CheckRow {
        address: report.address,
        verdict,
        error,
        candidates: report.candidates,
        smtp,
        transcript: if keep_transcript {
            report.probes
        } else {
            Vec::new()
        },
    }
}

fn smtp_messages(err: &ValidationError) -> Option<SmtpMessages> {
    match err {
        ValidationError::Deliverability(err) => err.messages().cloned(),
        _ => None,
    }
}

/// 0 all deliverable, 2 any undeliverable, 3 any unknown and none undeliverable.
pub fn exit_code(rows: &[CheckRow]) -> i32 {
    if rows.iter().any(|row| row.verdict == Verdict::Undeliverable) {
        2
    } else if rows.iter().any(|row| row.verdict == Verdict::Unknown) {
        3
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(verdict: Verdict) -> CheckRow {
        CheckRow {
            address: "user@example.com".into(),
            verdict,
            error: None,
            candidates: Vec::new(),
            smtp: None,
            transcript: Vec::new(),
        }
    }

    #[test]
    fn undeliverable_outranks_unknown() {
        assert_eq!(exit_code(&[row(Verdict::Deliverable)]), 0);
        assert_eq!(exit_code(&[row(Verdict::Unknown), row(Verdict::Deliverable)]), 3);
        assert_eq!(exit_code(&[row(Verdict::Unknown), row(Verdict::Undeliverable)]), 2);
    }

    #[test]
    fn offline_check_reports_format_errors() {
        let options = ValidationOptions {
            check_dns: false,
            check_smtp: false,
            ..ValidationOptions::default()
        };
        let row = check("  broken-address ", &options, false);
        assert_eq!(row.verdict, Verdict::Undeliverable);
        assert_eq!(row.address, "broken-address");
        assert!(row.error.is_some());
    }
}
