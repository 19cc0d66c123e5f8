//! Storage gateway contract and an in-memory implementation.

use std::sync::{Mutex, MutexGuard};

use crate::{Fingerprint, HostEntry, NormalizedScan, PortRecord, Result, ScanMetadata, VaultError};

/// Keyed storage for ingested scans.
///
/// `insert_scan` is the write path callers should use: it checks for a
/// duplicate and writes the metadata and all port rows as one unit. The
/// single-row inserts exist for tooling that assembles a scan by hand.
pub trait ScanStore {
    fn check_duplicate(&self, id: &Fingerprint) -> Result<bool>;

    fn insert_metadata(&self, meta: &ScanMetadata) -> Result<()>;

    fn insert_port(&self, record: &PortRecord) -> Result<()>;

    /// Stores a whole scan if its fingerprint is unknown, otherwise fails
    /// with [`VaultError::DuplicateScan`] and writes nothing.
    fn insert_scan(&self, scan: &NormalizedScan) -> Result<()>;

    /// Up to `max_results` scan ids, most recently ingested first.
    fn get_scans(&self, max_results: u32) -> Result<Vec<Fingerprint>>;

    fn get_metadata(&self, id: &Fingerprint) -> Result<Option<ScanMetadata>>;

    /// Port records whose host address starts with `host_prefix` and/or
    /// that belong to scan `id`. With neither filter the result is empty.
    fn search_host(&self, host_prefix: Option<&str>, id: Option<&Fingerprint>) -> Result<Vec<PortRecord>>;

    fn search_by_fingerprint(&self, id: &Fingerprint) -> Result<Vec<PortRecord>>;

    /// Distinct (scan, host) pairs in ingestion order.
    fn list_hosts(&self, max_results: u32) -> Result<Vec<HostEntry>>;
}

#[derive(Debug, Default)]
struct Tables {
    metadata: Vec<ScanMetadata>,
    results: Vec<PortRecord>,
}

/// Process-local store with the same duplicate and ordering rules as the
/// SQLite gateway.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| VaultError::storage("memory store lock poisoned"))
    }
}

impl ScanStore for MemoryStore {
    fn check_duplicate(&self, id: &Fingerprint) -> Result<bool> {
        Ok(self.lock()?.metadata.iter().any(|m| &m.id == id))
    }

    fn insert_metadata(&self, meta: &ScanMetadata) -> Result<()> {
        let mut t = self.lock()?;
        if t.metadata.iter().any(|m| m.id == meta.id) {
            return Err(VaultError::Conflict(format!("metadata.id {}", meta.id)));
        }
        t.metadata.push(meta.clone());
        Ok(())
    }

    fn insert_port(&self, record: &PortRecord) -> Result<()> {
        let mut t = self.lock()?;
        if !t.metadata.iter().any(|m| m.id == record.scan_id) {
            return Err(VaultError::invalid_record("results.scan_id", format!("unknown scan {}", record.scan_id)));
        }
        t.results.push(record.clone());
        Ok(())
    }

    fn insert_scan(&self, scan: &NormalizedScan) -> Result<()> {
        let mut t = self.lock()?;
        if t.metadata.iter().any(|m| &m.id == scan.fingerprint()) {
            return Err(VaultError::DuplicateScan(scan.fingerprint().clone()));
        }
        t.metadata.push(scan.metadata.clone());
        t.results.extend(scan.ports.iter().cloned());
        Ok(())
    }

    fn get_scans(&self, max_results: u32) -> Result<Vec<Fingerprint>> {
        let t = self.lock()?;
        Ok(t.metadata.iter().rev().take(max_results as usize).map(|m| m.id.clone()).collect())
    }

    fn get_metadata(&self, id: &Fingerprint) -> Result<Option<ScanMetadata>> {
        Ok(self.lock()?.metadata.iter().find(|m| &m.id == id).cloned())
    }

    fn search_host(&self, host_prefix: Option<&str>, id: Option<&Fingerprint>) -> Result<Vec<PortRecord>> {
        if host_prefix.is_none() && id.is_none() {
            return Ok(Vec::new());
        }
        let t = self.lock()?;
        Ok(t
            .results
            .iter()
            .filter(|r| host_prefix.map_or(true, |p| r.host_ip.starts_with(p)))
            .filter(|r| id.map_or(true, |id| &r.scan_id == id))
            .cloned()
            .collect())
    }

    fn search_by_fingerprint(&self, id: &Fingerprint) -> Result<Vec<PortRecord>> {
        self.search_host(None, Some(id))
    }

    fn list_hosts(&self, max_results: u32) -> Result<Vec<HostEntry>> {
        let t = self.lock()?;
        let mut hosts: Vec<HostEntry> = Vec::new();
        for r in &t.results {
            if hosts.len() >= max_results as usize {
                break;
            }
            if !hosts.iter().any(|h| h.scan_id == r.scan_id && h.host_ip == r.host_ip) {
                hosts.push(HostEntry { scan_id: r.scan_id.clone(), host_ip: r.host_ip.clone() });
            }
        }
        Ok(hosts)
    }
}
