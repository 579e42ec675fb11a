use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::debug;

use super::BlocklistError;

/// A set of lower-cased domains, one per line in its source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blocklist {
    domains: HashSet<String>,
}

impl Blocklist {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            domains: domains
                .into_iter()
                .filter_map(|d| normalize_entry(d.as_ref()))
                .collect(),
        }
    }

    /// Parses blocklist text. Blank lines and `#` comments are ignored.
    pub fn parse(text: &str) -> Self {
        Self::new(text.lines())
    }

    /// Loads a blocklist file; a missing file yields an empty list.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BlocklistError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let list = Self::parse(&text);
                debug!(path = %path.display(), entries = list.len(), "blocklist loaded");
                Ok(list)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "blocklist file missing, using empty list");
                Ok(Self::default())
            }
            Err(err) => Err(BlocklistError::read(path, err)),
        }
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.domains.contains(&domain.trim_end_matches('.').to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub(crate) fn into_domains(self) -> HashSet<String> {
        self.domains
    }
}

fn normalize_entry(line: &str) -> Option<String> {
    let entry = line.split('#').next().unwrap_or_default().trim();
    if entry.is_empty() {
        None
    } else {
        Some(entry.trim_end_matches('.').to_ascii_lowercase())
    }
}

/// File-backed blocklist re-read once it is older than `max_age`.
///
/// Freshness is a plain timestamp comparison performed by the owner through
/// [`refresh_if_stale`](Self::refresh_if_stale).
#[derive(Debug)]
pub struct RefreshingBlocklist {
    path: PathBuf,
    max_age: Duration,
    loaded_at: Instant,
    list: Blocklist,
}

impl RefreshingBlocklist {
    pub fn open(path: impl Into<PathBuf>, max_age: Duration) -> Result<Self, BlocklistError> {
        let path = path.into();
        let list = Blocklist::load(&path)?;
        Ok(Self {
            path,
            max_age,
            loaded_at: Instant::now(),
            list,
        })
    }

    pub fn is_stale(&self) -> bool {
        self.loaded_at.elapsed() >= self.max_age
    }

    /// Reloads the file when stale. Returns whether a reload happened.
    pub fn refresh_if_stale(&mut self) -> Result<bool, BlocklistError> {
        if !self.is_stale() {
            return Ok(false);
        }
        self.refresh()?;
        Ok(true)
    }

    pub fn refresh(&mut self) -> Result<(), BlocklistError> {
        self.list = Blocklist::load(&self.path)?;
        self.loaded_at = Instant::now();
        Ok(())
    }

    pub fn blocklist(&self) -> &Blocklist {
        &self.list
    }
}
