use serde::{Deserialize, Serialize};
use std::fmt;

/// Content hash of a raw scan document; primary key of a stored scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Fingerprint {
    fn from(s: String) -> Self {
        Fingerprint(s)
    }
}

impl From<&str> for Fingerprint {
    fn from(s: &str) -> Self {
        Fingerprint(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanMetadata {
    pub id: Fingerprint,
    pub args: String,
    pub elapsed_time: f64,
    pub num_hosts: u32,
}

/// One host x port observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRecord {
    pub scan_id: Fingerprint,
    pub host_ip: String,
    pub host_dns: String,
    pub port_id: u16,
    pub protocol: String,
    pub port_state: String,
    pub port_reason: String,
    pub service_name: String,
    pub port_script: String,
    pub ostype: String,
    pub uptime: String,
}

/// Everything derived from one scan document, ready to be stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedScan {
    pub metadata: ScanMetadata,
    pub ports: Vec<PortRecord>,
}

impl NormalizedScan {
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.metadata.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostEntry {
    pub scan_id: Fingerprint,
    pub host_ip: String,
}
