use crate::error::storage_err;
use crate::{insert, query, Db};
use rusqlite::{Transaction, TransactionBehavior};
use scanvault_core::store::ScanStore;
use scanvault_core::{Fingerprint, HostEntry, NormalizedScan, PortRecord, Result, ScanMetadata, VaultError};
use tracing::{debug, info};

impl ScanStore for Db {
    fn check_duplicate(&self, id: &Fingerprint) -> Result<bool> {
        query::scan_exists(&self.conn, id).map_err(storage_err)
    }

    fn insert_metadata(&self, meta: &ScanMetadata) -> Result<()> {
        insert::metadata(&self.conn, meta).map_err(storage_err)
    }

    fn insert_port(&self, record: &PortRecord) -> Result<()> {
        insert::port(&self.conn, record).map_err(storage_err)
    }

    fn insert_scan(&self, scan: &NormalizedScan) -> Result<()> {
        // IMMEDIATE takes the write lock up front so two writers cannot both
        // pass the existence check.
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate).map_err(storage_err)?;
        if !insert::metadata_if_absent(&tx, &scan.metadata).map_err(storage_err)? {
            debug!(fingerprint = %scan.fingerprint(), "scan already stored");
            return Err(VaultError::DuplicateScan(scan.fingerprint().clone()));
        }
        for rec in &scan.ports {
            insert::port(&tx, rec).map_err(storage_err)?;
        }
        tx.commit().map_err(storage_err)?;
        info!(fingerprint = %scan.fingerprint(), records = scan.ports.len(), "stored scan");
        Ok(())
    }

    fn get_scans(&self, max_results: u32) -> Result<Vec<Fingerprint>> {
        query::scan_ids(&self.conn, max_results).map_err(storage_err)
    }

    fn get_metadata(&self, id: &Fingerprint) -> Result<Option<ScanMetadata>> {
        query::metadata(&self.conn, id).map_err(storage_err)
    }

    fn search_host(&self, host_prefix: Option<&str>, id: Option<&Fingerprint>) -> Result<Vec<PortRecord>> {
        query::ports(&self.conn, host_prefix, id).map_err(storage_err)
    }

    fn search_by_fingerprint(&self, id: &Fingerprint) -> Result<Vec<PortRecord>> {
        query::ports(&self.conn, None, Some(id)).map_err(storage_err)
    }

    fn list_hosts(&self, max_results: u32) -> Result<Vec<HostEntry>> {
        query::hosts(&self.conn, max_results).map_err(storage_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open() -> (tempfile::TempDir, Db) {
        let dir = tempfile::tempdir().unwrap();
        let db = Db::open_or_create(dir.path().join("scans.db")).unwrap();
        (dir, db)
    }

    fn record(id: &Fingerprint, host: &str, port: u16) -> PortRecord {
        PortRecord {
            scan_id: id.clone(),
            host_ip: host.to_string(),
            host_dns: String::new(),
            port_id: port,
            protocol: "tcp".into(),
            port_state: "open".into(),
            port_reason: "syn-ack".into(),
            service_name: "http".into(),
            port_script: String::new(),
            ostype: String::new(),
            uptime: String::new(),
        }
    }

    fn scan(id: &str, hosts: &[(&str, u16)]) -> NormalizedScan {
        let fp = Fingerprint::from(id);
        NormalizedScan {
            metadata: ScanMetadata { id: fp.clone(), args: format!("nmap {id}"), elapsed_time: 2.25, num_hosts: hosts.len() as u32 },
            ports: hosts.iter().map(|(h, p)| record(&fp, h, *p)).collect(),
        }
    }

    #[test]
    fn insert_scan_then_read_back() {
        let (_dir, db) = open();
        let s = scan("aa", &[("10.0.0.5", 22), ("10.0.0.5", 80)]);
        db.insert_scan(&s).unwrap();

        assert!(db.check_duplicate(s.fingerprint()).unwrap());
        assert_eq!(db.get_metadata(s.fingerprint()).unwrap(), Some(s.metadata.clone()));
        assert_eq!(db.search_by_fingerprint(s.fingerprint()).unwrap(), s.ports);
    }

    #[test]
    fn duplicate_scan_writes_nothing() {
        let (_dir, db) = open();
        let s = scan("aa", &[("10.0.0.5", 22)]);
        db.insert_scan(&s).unwrap();
        let err = db.insert_scan(&s).unwrap_err();
        assert!(matches!(err, VaultError::DuplicateScan(_)));
        assert_eq!(db.search_by_fingerprint(s.fingerprint()).unwrap().len(), 1);
    }

    #[test]
    fn failed_port_insert_rolls_back_metadata() {
        let (_dir, db) = open();
        let mut s = scan("bb", &[("10.0.0.5", 22)]);
        // a record pointing at another scan violates the foreign key
        s.ports.push(record(&Fingerprint::from("missing"), "10.0.0.6", 22));
        assert!(matches!(db.insert_scan(&s), Err(VaultError::InvalidRecord { .. })));
        assert!(!db.check_duplicate(s.fingerprint()).unwrap());
        assert!(db.search_host(Some("10.0.0"), None).unwrap().is_empty());
    }

    #[test]
    fn plain_metadata_insert_conflicts_on_same_id() {
        let (_dir, db) = open();
        let s = scan("cc", &[]);
        db.insert_metadata(&s.metadata).unwrap();
        assert!(matches!(db.insert_metadata(&s.metadata), Err(VaultError::Conflict(_))));
        db.insert_port(&record(s.fingerprint(), "192.168.0.1", 443)).unwrap();
        assert_eq!(db.search_by_fingerprint(s.fingerprint()).unwrap().len(), 1);
    }

    #[test]
    fn host_prefix_search() {
        let (_dir, db) = open();
        db.insert_scan(&scan("aa", &[("10.0.0.5", 22), ("10.0.1.5", 22)])).unwrap();
        db.insert_scan(&scan("bb", &[("10.0.0.7", 443)])).unwrap();

        let hits = db.search_host(Some("10.0.0"), None).unwrap();
        let hosts: Vec<_> = hits.iter().map(|r| r.host_ip.as_str()).collect();
        assert_eq!(hosts, vec!["10.0.0.5", "10.0.0.7"]);

        let scoped = db.search_host(Some("10.0.0"), Some(&Fingerprint::from("bb"))).unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].host_ip, "10.0.0.7");

        assert!(db.search_host(Some("10.0.0%"), None).unwrap().is_empty());
        assert!(db.search_host(None, None).unwrap().is_empty());
    }

    #[test]
    fn get_scans_returns_newest_first_up_to_limit() {
        let (_dir, db) = open();
        for id in ["s1", "s2", "s3", "s4", "s5"] {
            db.insert_scan(&scan(id, &[("172.16.0.1", 80)])).unwrap();
        }
        let ids = db.get_scans(2).unwrap();
        assert_eq!(ids, vec![Fingerprint::from("s5"), Fingerprint::from("s4")]);
        assert_eq!(db.get_scans(10).unwrap().len(), 5);
    }

    #[test]
    fn list_hosts_is_distinct_per_scan() {
        let (_dir, db) = open();
        db.insert_scan(&scan("aa", &[("10.0.0.5", 22), ("10.0.0.5", 80), ("10.0.0.6", 22)])).unwrap();
        let hosts = db.list_hosts(10).unwrap();
        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts[0].host_ip, "10.0.0.5");
        assert_eq!(hosts[1].host_ip, "10.0.0.6");
    }

    #[test]
    fn second_connection_sees_duplicate() {
        let (dir, db) = open();
        let other = Db::open_or_create(dir.path().join("scans.db")).unwrap();
        let s = scan("x", &[("10.0.0.5", 22)]);

        db.insert_scan(&s).unwrap();
        assert!(matches!(other.insert_scan(&s), Err(VaultError::DuplicateScan(ref id)) if id == s.fingerprint()));
        assert_eq!(db.search_by_fingerprint(s.fingerprint()).unwrap().len(), 1);
    }

    #[test]
    fn concurrent_writers_store_scan_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scans.db");
        Db::open_or_create(&path).unwrap();
        let s = scan("race", &[("10.0.0.5", 22), ("10.0.0.5", 80)]);

        let outcomes: Vec<Result<()>> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..4)
                .map(|_| {
                    let db = Db::open_or_create(&path).unwrap();
                    let s = &s;
                    scope.spawn(move || db.insert_scan(s))
                })
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes.iter().filter(|r| r.is_err()).all(|r| matches!(r, Err(VaultError::DuplicateScan(_)))));
        let db = Db::open_or_create(&path).unwrap();
        assert_eq!(db.search_by_fingerprint(s.fingerprint()).unwrap().len(), 2);
    }

    #[test]
    fn missing_table_is_storage_unavailable() {
        let (_dir, db) = open();
        let s = scan("aa", &[("10.0.0.5", 22)]);
        db.insert_scan(&s).unwrap();
        db.conn.execute_batch("DROP TABLE results").unwrap();

        assert!(matches!(db.search_by_fingerprint(s.fingerprint()), Err(VaultError::StorageUnavailable(_))));
        assert!(matches!(db.list_hosts(5), Err(VaultError::StorageUnavailable(_))));
        let next = scan("bb", &[("10.0.0.6", 22)]);
        assert!(matches!(db.insert_scan(&next), Err(VaultError::StorageUnavailable(_))));
        assert!(!db.check_duplicate(next.fingerprint()).unwrap());
    }

    #[test]
    fn unknown_scan_has_no_metadata() {
        let (_dir, db) = open();
        assert_eq!(db.get_metadata(&Fingerprint::from("nope")).unwrap(), None);
        assert!(!db.check_duplicate(&Fingerprint::from("nope")).unwrap());
    }
}
