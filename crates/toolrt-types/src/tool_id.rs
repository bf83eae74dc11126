//! `<backend>:<tool>` identifier parsing and formatting.
//!
//! This is the single source of truth for the wire format described in the
//! external-interfaces section: exactly one `:` splits a backend-qualified
//! id; zero colons means "no backend specified" (the bare name is used as a
//! tool name one layer up, where the runner requires a namespace); more than
//! one colon, an empty string, or an empty side next to a present colon are
//! all malformed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, TaxonomyError};

/// A parsed `<backend>:<tool>` identifier.
///
/// `backend` is empty when the original string had no colon at all (a bare
/// tool name not yet routed to a backend). Backend-qualified ids always have
/// a non-empty `backend`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolId {
    pub backend: String,
    pub name: String,
}

impl ToolId {
    pub fn new(backend: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            name: name.into(),
        }
    }

    /// A bare tool name with no backend component.
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            backend: String::new(),
            name: name.into(),
        }
    }

    pub fn has_backend(&self) -> bool {
        !self.backend.is_empty()
    }

    /// Parse the wire format. See module docs for the exact grammar.
    pub fn parse(s: &str) -> Result<Self, TaxonomyError> {
        if s.is_empty() {
            return Err(TaxonomyError::new(
                ErrorKind::InvalidToolId,
                "tool id is empty".to_string(),
            ));
        }

        let colon_count = s.matches(':').count();
        match colon_count {
            0 => Ok(Self::bare(s)),
            1 => {
                // unwrap: colon_count == 1 guarantees split_once finds it.
                let (backend, name) = s.split_once(':').unwrap_or((s, ""));
                if backend.is_empty() || name.is_empty() {
                    return Err(TaxonomyError::new(
                        ErrorKind::InvalidToolId,
                        format!("malformed tool id {s:?}: empty side next to ':'"),
                    ));
                }
                Ok(Self::new(backend, name))
            }
            _ => Err(TaxonomyError::new(
                ErrorKind::InvalidToolId,
                format!("malformed tool id {s:?}: more than one ':'"),
            )),
        }
    }

    /// Format a backend/name pair as the wire string. A bare (empty) backend
    /// formats as just the tool name.
    pub fn format(backend: &str, name: &str) -> String {
        if backend.is_empty() {
            name.to_string()
        } else {
            format!("{backend}:{name}")
        }
    }
}

impl FromStr for ToolId {
    type Err = TaxonomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Self::format(&self.backend, &self.name))
    }
}
