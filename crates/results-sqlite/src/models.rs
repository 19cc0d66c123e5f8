use rusqlite::Row;
use scanvault_core::{Fingerprint, HostEntry, PortRecord, ScanMetadata};

pub(crate) const PORT_COLUMNS: &str =
    "scan_id, host_ip, host_dns, port_id, protocol, port_state, port_reason, service_name, port_script, ostype, uptime";

pub(crate) fn metadata_from_row(r: &Row<'_>) -> rusqlite::Result<ScanMetadata> {
    Ok(ScanMetadata {
        id: Fingerprint::from(r.get::<_, String>(0)?),
        args: r.get(1)?,
        elapsed_time: r.get(2)?,
        num_hosts: r.get(3)?,
    })
}

/// Expects the columns in `PORT_COLUMNS` order.
pub(crate) fn port_from_row(r: &Row<'_>) -> rusqlite::Result<PortRecord> {
    Ok(PortRecord {
        scan_id: Fingerprint::from(r.get::<_, String>(0)?),
        host_ip: r.get(1)?,
        host_dns: r.get(2)?,
        port_id: r.get(3)?,
        protocol: r.get(4)?,
        port_state: r.get(5)?,
        port_reason: r.get(6)?,
        service_name: r.get(7)?,
        port_script: r.get(8)?,
        ostype: r.get(9)?,
        uptime: r.get(10)?,
    })
}

pub(crate) fn host_from_row(r: &Row<'_>) -> rusqlite::Result<HostEntry> {
    Ok(HostEntry { scan_id: Fingerprint::from(r.get::<_, String>(0)?), host_ip: r.get(1)? })
}
