use crate::models::{host_from_row, metadata_from_row, port_from_row, PORT_COLUMNS};
use crate::Db;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};
use scanvault_core::{Fingerprint, HostEntry, PortRecord, ScanMetadata};

impl Db {
    pub fn table_exists(&self, name: &str) -> Result<bool> {
        let cnt: i64 = self.conn.query_row(
            "SELECT COUNT(1) FROM sqlite_master WHERE type='table' AND name=?",
            [name],
            |r| r.get(0),
        )?;
        Ok(cnt > 0)
    }
}

pub(crate) fn scan_exists(conn: &Connection, id: &Fingerprint) -> rusqlite::Result<bool> {
    conn.query_row("SELECT EXISTS(SELECT 1 FROM metadata WHERE id=?)", [id.as_str()], |r| r.get(0))
}

pub(crate) fn scan_ids(conn: &Connection, max_results: u32) -> rusqlite::Result<Vec<Fingerprint>> {
    let mut stmt = conn.prepare("SELECT id FROM metadata ORDER BY rowid DESC LIMIT ?")?;
    let rows = stmt.query_map([max_results], |r| r.get::<_, String>(0).map(Fingerprint::from))?;
    rows.collect()
}

pub(crate) fn metadata(conn: &Connection, id: &Fingerprint) -> rusqlite::Result<Option<ScanMetadata>> {
    conn.query_row(
        "SELECT id, args, elapsed_time, num_hosts FROM metadata WHERE id=?",
        [id.as_str()],
        metadata_from_row,
    )
    .optional()
}

/// Prefix match uses `substr` rather than LIKE so `%` and `_` in the
/// prefix match literally.
pub(crate) fn ports(conn: &Connection, host_prefix: Option<&str>, id: Option<&Fingerprint>) -> rusqlite::Result<Vec<PortRecord>> {
    let (filter, args): (&str, Vec<&str>) = match (host_prefix, id) {
        (Some(p), Some(id)) => ("substr(host_ip, 1, length(?1)) = ?1 AND scan_id = ?2", vec![p, id.as_str()]),
        (Some(p), None) => ("substr(host_ip, 1, length(?1)) = ?1", vec![p]),
        (None, Some(id)) => ("scan_id = ?1", vec![id.as_str()]),
        (None, None) => return Ok(Vec::new()),
    };
    let sql = format!("SELECT {PORT_COLUMNS} FROM results WHERE {filter} ORDER BY result_id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(args), port_from_row)?;
    rows.collect()
}

pub(crate) fn hosts(conn: &Connection, max_results: u32) -> rusqlite::Result<Vec<HostEntry>> {
    let mut stmt = conn.prepare(
        "SELECT scan_id, host_ip FROM results GROUP BY scan_id, host_ip ORDER BY MIN(result_id) LIMIT ?",
    )?;
    let rows = stmt.query_map(params![max_results], host_from_row)?;
    rows.collect()
}
