//! Static cluster directory, loaded once at boot.

use std::fmt;
use std::fs;
use std::path::Path;

use tracing::warn;

use crate::MemberId;
use crate::error::ConfigError;

/// Resolved peer address from the configuration file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberAddr {
    pub id: MemberId,
    pub host: String,
    pub port: u16,
}

impl fmt::Display for MemberAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.id, self.host, self.port)
    }
}

/// Ordered member directory; immutable for the process lifetime.
///
/// Iteration follows file order. Duplicate ids keep the last entry.
#[derive(Clone, Debug)]
pub struct ClusterConfig {
    members: Vec<MemberAddr>,
}

impl ClusterConfig {
    /// Reads and parses the configuration file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or no well-formed line remains.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::parse(&text)
    }

    /// Parses configuration text: one `id,host,port` entry per line, blank
    /// lines and `#` comments skipped. Malformed lines are logged and
    /// skipped rather than failing the whole file.
    ///
    /// # Errors
    ///
    /// Fails with [`ConfigError::Empty`] when nothing well-formed remains.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut members: Vec<MemberAddr> = Vec::new();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some(addr) = parse_line(line) else {
                warn!(line = index + 1, content = raw, "skipping malformed config line");
                continue;
            };
            if let Some(existing) = members.iter_mut().find(|m| m.id == addr.id) {
                *existing = addr;
            } else {
                members.push(addr);
            }
        }
        if members.is_empty() {
            return Err(ConfigError::Empty);
        }
        Ok(Self { members })
    }

    #[must_use]
    pub fn get(&self, id: &MemberId) -> Option<&MemberAddr> {
        self.members.iter().find(|m| m.id == *id)
    }

    #[must_use]
    pub fn contains(&self, id: &MemberId) -> bool {
        self.get(id).is_some()
    }

    pub fn members(&self) -> impl Iterator<Item = &MemberAddr> {
        self.members.iter()
    }

    pub fn member_ids(&self) -> impl Iterator<Item = &MemberId> {
        self.members.iter().map(|m| &m.id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Quorum size `N/2 + 1`: any two majorities share an acceptor.
    #[must_use]
    pub fn majority(&self) -> usize {
        self.members.len() / 2 + 1
    }
}

fn parse_line(line: &str) -> Option<MemberAddr> {
    let mut fields = line.split(',');
    let id = fields.next()?.trim();
    let host = fields.next()?.trim();
    let port = fields.next()?.trim();
    if fields.next().is_some() || id.is_empty() || host.is_empty() {
        return None;
    }
    let port: u16 = port.parse().ok().filter(|port| *port != 0)?;
    Some(MemberAddr {
        id: MemberId(id.to_owned()),
        host: host.to_owned(),
        port,
    })
}
