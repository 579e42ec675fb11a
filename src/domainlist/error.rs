use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("domain '{domain}' is blocklisted")]
pub struct DomainBlockedError {
    pub domain: String,
}

#[derive(Debug, Error)]
pub enum BlocklistError {
    #[error("failed to read blocklist {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BlocklistError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }
}
