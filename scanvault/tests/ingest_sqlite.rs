use results_sqlite::Db;
use scanvault::service::{ScanQuery, ScanService};
use scanvault_core::VaultError;

const FULL: &str = include_str!("../../modules/nmap-xml/testdata/full_scan.xml");
const MINIMAL: &str = include_str!("../../modules/nmap-xml/testdata/minimal_scan.xml");

fn service(dir: &tempfile::TempDir) -> ScanService<Db> {
    let db = Db::open_or_create(dir.path().join("nmap_data.db")).unwrap();
    ScanService::new(db, 5)
}

#[test]
fn fixture_round_trips_through_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&dir);

    let report = svc.ingest(FULL.as_bytes()).unwrap();
    assert_eq!(report.total_hosts, 256);
    assert_eq!(report.records, 3);

    let reports = svc.lookup(&ScanQuery::scan(report.fingerprint.clone())).unwrap();
    assert_eq!(reports.len(), 1);
    let scan = &reports[0];
    assert_eq!(scan.args, "nmap -sV -O -oX - 10.0.0.0/24");
    assert_eq!(scan.scans.len(), 3);
    assert_eq!(scan.scans[1].port_script, "http-title, Site & Title");
    assert_eq!(scan.scans[2].ostype, "");
}

#[test]
fn host_prefix_only_lists_matching_hosts() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&dir);
    svc.ingest(FULL.as_bytes()).unwrap();

    let reports = svc.lookup(&ScanQuery::host("10.0.0")).unwrap();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].scans.iter().all(|p| p.host_ip == "10.0.0.5"));
    assert_eq!(reports[0].scans.len(), 2);

    assert!(svc.lookup(&ScanQuery::host("10.0.3")).unwrap().is_empty());
}

#[test]
fn duplicate_upload_is_rejected_without_new_rows() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&dir);
    let first = svc.ingest(FULL.as_bytes()).unwrap();

    let err = svc.ingest(FULL.as_bytes()).unwrap_err();
    assert!(matches!(err, VaultError::DuplicateScan(ref id) if *id == first.fingerprint));

    let reports = svc.lookup(&ScanQuery::scan(first.fingerprint)).unwrap();
    assert_eq!(reports[0].scans.len(), 3);
}

#[test]
fn malformed_upload_leaves_store_empty() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&dir);
    let cut = &FULL.as_bytes()[..FULL.len() - 20];
    assert!(matches!(svc.ingest(cut), Err(VaultError::MalformedDocument(_))));
    assert!(svc.lookup(&ScanQuery::latest(None)).unwrap().is_empty());
}

#[test]
fn scans_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let id = service(&dir).ingest(MINIMAL.as_bytes()).unwrap().fingerprint;

    let reopened = service(&dir);
    let reports = reopened.lookup(&ScanQuery::latest(Some(2))).unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].nmapid, id);
    assert!(reports[0].scans.is_empty());
}

#[test]
fn listing_caps_at_max_results() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&dir);
    for i in 0..5 {
        let doc = MINIMAL.replace("192.0.2.1", &format!("192.0.2.{}", i + 10));
        svc.ingest(doc.as_bytes()).unwrap();
    }
    assert_eq!(svc.lookup(&ScanQuery::latest(Some(2))).unwrap().len(), 2);
    assert_eq!(svc.lookup(&ScanQuery::latest(None)).unwrap().len(), 5);
}
