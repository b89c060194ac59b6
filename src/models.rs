use std::net::{IpAddr, Ipv4Addr};

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

const BASIC_PREFIX: &str = "Basic ";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryRecord {
    pub id: u64,
    pub address: String,
    pub mirrors: Vec<String>,
    pub name: String,
    pub description: String,
    pub version: u32,
    pub enabled: bool,
    #[serde(deserialize_with = "crate::de::uppercase")]
    pub fingerprint: String,
    pub last_modified: String,
    pub entity_tag: String,
    pub updated: i64,
    pub timestamp: i64,
    pub authentication: String,
}

impl RepositoryRecord {
    /// Decode the stored HTTP basic credentials into a username/password pair.
    pub fn authentication_pair(&self) -> Option<(String, String)> {
        let encoded = self.authentication.strip_prefix(BASIC_PREFIX)?;
        let decoded = STANDARD.decode(encoded).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;

        Some((username.to_owned(), password.to_owned()))
    }

    /// Store the credentials as HTTP basic authentication value. Credentials are only kept if
    /// both parts are non-empty.
    pub fn set_authentication(&mut self, username: &str, password: &str) {
        self.authentication = if username.is_empty() || password.is_empty() {
            String::new()
        } else {
            format!(
                "{BASIC_PREFIX}{}",
                STANDARD.encode(format!("{username}:{password}"))
            )
        };
    }

    pub const fn synced(&self) -> bool {
        self.updated > 0
    }
}

#[derive(Serialize)]
pub struct RepoSummary {
    pub id: u64,
    pub name: String,
    pub address: String,
    pub enabled: bool,
}

impl From<&RepositoryRecord> for RepoSummary {
    fn from(record: &RepositoryRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            address: record.address.clone(),
            enabled: record.enabled,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub address: IpAddr,
    pub port: u16,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            address: IpAddr::V4(if cfg!(debug_assertions) {
                Ipv4Addr::LOCALHOST
            } else {
                Ipv4Addr::UNSPECIFIED
            }),
            port: 8080,
            log_level: "info".to_owned(),
        }
    }
}
