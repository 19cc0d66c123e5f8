use rusqlite::{params, Connection};
use scanvault_core::{PortRecord, ScanMetadata};

/// Plain insert; a second row with the same id fails on the primary key.
pub(crate) fn metadata(conn: &Connection, meta: &ScanMetadata) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO metadata(id, args, elapsed_time, num_hosts) VALUES (?,?,?,?)",
        params![meta.id.as_str(), meta.args, meta.elapsed_time, meta.num_hosts],
    )?;
    Ok(())
}

/// Returns false when a scan with this id already exists.
pub(crate) fn metadata_if_absent(conn: &Connection, meta: &ScanMetadata) -> rusqlite::Result<bool> {
    let n = conn.execute(
        "INSERT INTO metadata(id, args, elapsed_time, num_hosts) VALUES (?,?,?,?) ON CONFLICT(id) DO NOTHING",
        params![meta.id.as_str(), meta.args, meta.elapsed_time, meta.num_hosts],
    )?;
    Ok(n == 1)
}

pub(crate) fn port(conn: &Connection, rec: &PortRecord) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO results(scan_id, host_ip, host_dns, port_id, protocol, port_state, port_reason, service_name, port_script, ostype, uptime)
         VALUES (?,?,?,?,?,?,?,?,?,?,?)",
    )?;
    stmt.execute(params![
        rec.scan_id.as_str(),
        rec.host_ip,
        rec.host_dns,
        rec.port_id,
        rec.protocol,
        rec.port_state,
        rec.port_reason,
        rec.service_name,
        rec.port_script,
        rec.ostype,
        rec.uptime,
    ])?;
    Ok(())
}
