//! Group rosters: the read side of group name to peer list.
//!
//! Rosters are owned outside the core. The dispatcher asks on every send
//! and never caches, so edits take effect on the next dispatch.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use ipchat_transport::PeerAddress;

use crate::ProtocolError;

/// Read interface over a group roster.
pub trait GroupRoster: Send + Sync {
    /// Members of `name` in roster order, or `None` if no such group.
    fn lookup_group(&self, name: &str) -> Result<Option<Vec<PeerAddress>>, ProtocolError>;

    /// All group names, sorted.
    fn group_names(&self) -> Result<Vec<String>, ProtocolError>;
}

/// In-memory roster.
#[derive(Debug, Clone, Default)]
pub struct StaticRoster {
    groups: HashMap<String, Vec<PeerAddress>>,
}

impl StaticRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with_group(mut self, name: impl Into<String>, members: Vec<PeerAddress>) -> Self {
        self.insert(name, members);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, members: Vec<PeerAddress>) {
        self.groups.insert(name.into(), members);
    }
}

impl GroupRoster for StaticRoster {
    fn lookup_group(&self, name: &str) -> Result<Option<Vec<PeerAddress>>, ProtocolError> {
        Ok(self.groups.get(name).cloned())
    }

    fn group_names(&self) -> Result<Vec<String>, ProtocolError> {
        let mut names: Vec<String> = self.groups.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

/// Roster backed by a JSON file mapping group names to address lists:
///
/// ```json
/// { "friends": ["192.168.1.20", "192.168.1.21:4000"] }
/// ```
///
/// Re-read on every lookup. A missing file is an empty roster.
#[derive(Debug, Clone)]
pub struct JsonFileRoster {
    path: PathBuf,
    default_port: u16,
}

impl JsonFileRoster {
    pub fn new(path: impl Into<PathBuf>, default_port: u16) -> Self {
        Self {
            path: path.into(),
            default_port,
        }
    }

    fn load(&self) -> Result<BTreeMap<String, Vec<PeerAddress>>, ProtocolError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("roster {} not found, treating as empty", self.path.display());
                return Ok(BTreeMap::new());
            }
            Err(e) => return Err(self.error(e.to_string())),
        };

        let raw: BTreeMap<String, Vec<String>> =
            serde_json::from_str(&text).map_err(|e| self.error(e.to_string()))?;

        raw.into_iter()
            .map(|(name, members)| {
                let peers = members
                    .iter()
                    .map(|m| PeerAddress::parse(m, self.default_port))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| self.error(format!("group {name:?}: {e}")))?;
                Ok((name, peers))
            })
            .collect()
    }

    fn error(&self, reason: String) -> ProtocolError {
        ProtocolError::Roster {
            path: self.path.display().to_string(),
            reason,
        }
    }
}

impl GroupRoster for JsonFileRoster {
    fn lookup_group(&self, name: &str) -> Result<Option<Vec<PeerAddress>>, ProtocolError> {
        Ok(self.load()?.remove(name))
    }

    fn group_names(&self) -> Result<Vec<String>, ProtocolError> {
        Ok(self.load()?.into_keys().collect())
    }
}
