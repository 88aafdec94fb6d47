//! Error types.
//!
//! Only settings and store failures are ever returned to a caller as hard
//! errors. Bad config entries and permission strings are reported and skipped;
//! scan timeouts and aborts are result states, not errors.

use std::path::PathBuf;

/// A config entry or permission named a block, entity or group that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} `{name}`")]
pub struct UnknownSubject {
    pub kind: &'static str,
    pub name: String,
}
impl UnknownSubject {
    pub fn material(name: &str) -> Self {
        Self { kind: "block", name: name.to_owned() }
    }
    pub fn entity(name: &str) -> Self {
        Self { kind: "entity", name: name.to_owned() }
    }
    pub fn subject(name: &str) -> Self {
        Self { kind: "block, entity or group", name: name.to_owned() }
    }
}

/// A settings entry that was skipped while loading.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigIssue {
    #[error("{section}: malformed entry `{key}`: {reason}")]
    Malformed {
        section: String,
        key: String,
        reason: String,
    },
    #[error("{section}: {source}")]
    Unknown {
        section: String,
        #[source]
        source: UnknownSubject,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to parse limits settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read limits settings from {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record store unavailable: {0}")]
    Unavailable(String),
    #[error("record store io failure on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed record {path:?}: {source}")]
    Nbt {
        path: PathBuf,
        #[source]
        source: fastnbt::error::Error,
    },
}

/// Reasons a limit permission string was ignored.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PermissionError {
    #[error("wildcard limit permission `{0}` is not supported")]
    Wildcard(String),
    #[error("limit permission `{0}` does not look like <gamemode>.island.limit.<subject>.<number>")]
    Malformed(String),
    #[error("limit permission `{perm}`: {source}")]
    Unknown {
        perm: String,
        #[source]
        source: UnknownSubject,
    },
}
