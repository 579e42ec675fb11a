use std::borrow::Cow;

use crate::mx::AddressFamilies;

pub const DEFAULT_SMTP_PORT: u16 = 25;
pub const DEFAULT_HELO_HOST: &str = "localhost";

/// Controls how a single mail host is interrogated.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOptions {
    pub port: u16,
    pub helo_host: Option<String>,
    pub skip_tls: bool,
    pub families: AddressFamilies,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_SMTP_PORT,
            helo_host: None,
            skip_tls: false,
            families: AddressFamilies::BOTH,
        }
    }
}

impl ProbeOptions {
    /// Returns the identity sent with `EHLO`/`HELO`, falling back to
    /// [`DEFAULT_HELO_HOST`] when unset or blank.
    pub fn helo_host(&self) -> Cow<'_, str> {
        self.helo_host
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(Cow::Borrowed)
            .unwrap_or(Cow::Borrowed(DEFAULT_HELO_HOST))
    }
}
