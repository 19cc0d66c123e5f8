//! Ingestion and lookup over an injected [`ScanStore`].

use serde::Serialize;
use std::sync::Mutex;
use tracing::{info, warn};

use scanvault_core::store::ScanStore;
use scanvault_core::{Fingerprint, HostEntry, PortRecord, Result, VaultError};

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub fingerprint: Fingerprint,
    pub total_hosts: u32,
    pub records: usize,
}

/// One stored scan plus the port records that matched the query.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub nmapid: Fingerprint,
    pub args: String,
    pub scanned_hosts: u32,
    pub elapsed_time: f64,
    pub scans: Vec<PortRecord>,
}

/// Lookup filters. With neither `host_prefix` nor `fingerprint` the newest
/// scans are listed, capped by `max_results`.
#[derive(Debug, Clone, Default)]
pub struct ScanQuery {
    pub host_prefix: Option<String>,
    pub fingerprint: Option<Fingerprint>,
    pub max_results: Option<u32>,
}

impl ScanQuery {
    pub fn latest(max_results: Option<u32>) -> Self {
        ScanQuery { max_results, ..Default::default() }
    }

    pub fn host(prefix: impl Into<String>) -> Self {
        ScanQuery { host_prefix: Some(prefix.into()), ..Default::default() }
    }

    pub fn scan(id: impl Into<Fingerprint>) -> Self {
        ScanQuery { fingerprint: Some(id.into()), ..Default::default() }
    }
}

pub struct ScanService<S> {
    store: Mutex<S>,
    default_max_results: u32,
}

impl<S: ScanStore> ScanService<S> {
    pub fn new(store: S, default_max_results: u32) -> Self {
        ScanService { store: Mutex::new(store), default_max_results }
    }

    fn with_store<T>(&self, f: impl FnOnce(&S) -> Result<T>) -> Result<T> {
        let store = self.store.lock().map_err(|_| VaultError::storage("store lock poisoned"))?;
        f(&store)
    }

    /// Normalizes and stores one document. Nothing is written unless the
    /// whole document parses and its fingerprint is new.
    pub fn ingest(&self, bytes: &[u8]) -> Result<IngestReport> {
        let scan = nmap_xml::normalize(bytes)?;
        let report = IngestReport {
            fingerprint: scan.fingerprint().clone(),
            total_hosts: scan.metadata.num_hosts,
            records: scan.ports.len(),
        };
        match self.with_store(|s| s.insert_scan(&scan)) {
            Ok(()) => {
                info!(fingerprint = %report.fingerprint, hosts = report.total_hosts, records = report.records, "ingested scan");
                Ok(report)
            }
            Err(e) => {
                warn!(fingerprint = %report.fingerprint, error = %e, "ingest rejected");
                Err(e)
            }
        }
    }

    /// Every port list is filtered by all supplied criteria, whichever
    /// path found the scan.
    pub fn lookup(&self, query: &ScanQuery) -> Result<Vec<ScanReport>> {
        // an empty prefix would match every address, so it means no filter
        let host_prefix = query.host_prefix.as_deref().filter(|p| !p.is_empty());
        self.with_store(|store| {
            let ids = if host_prefix.is_some() || query.fingerprint.is_some() {
                let mut ids: Vec<Fingerprint> = Vec::new();
                for rec in store.search_host(host_prefix, query.fingerprint.as_ref())? {
                    if !ids.contains(&rec.scan_id) {
                        ids.push(rec.scan_id);
                    }
                }
                ids
            } else {
                store.get_scans(query.max_results.unwrap_or(self.default_max_results))?
            };

            let mut reports = Vec::with_capacity(ids.len());
            for id in ids {
                let Some(meta) = store.get_metadata(&id)? else { continue };
                let scans = match host_prefix {
                    Some(prefix) => store.search_host(Some(prefix), Some(&id))?,
                    None => store.search_by_fingerprint(&id)?,
                };
                reports.push(ScanReport {
                    nmapid: meta.id,
                    args: meta.args,
                    scanned_hosts: meta.num_hosts,
                    elapsed_time: meta.elapsed_time,
                    scans,
                });
            }
            Ok(reports)
        })
    }

    pub fn hosts(&self, max_results: Option<u32>) -> Result<Vec<HostEntry>> {
        self.with_store(|s| s.list_hosts(max_results.unwrap_or(self.default_max_results)))
    }
}
