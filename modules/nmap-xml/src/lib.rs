//! Normalizes nmap XML reports into flat scan records.
//!
//! `normalize` is pure: it parses and validates the document, fingerprints
//! the raw bytes and returns one metadata record plus one record per
//! host x port. Storing the result is up to the caller.

mod dom;
mod fingerprint;

pub use fingerprint::fingerprint;

use dom::Element;
use scanvault_core::{Fingerprint, NormalizedScan, PortRecord, Result, ScanMetadata, VaultError};
use tracing::debug;

/// Parses `bytes` as an nmap report.
///
/// Fails with `MalformedDocument` when the bytes are not well-formed XML and
/// with `InvalidRecord` when a field every nmap report carries is missing or
/// unparsable.
pub fn normalize(bytes: &[u8]) -> Result<NormalizedScan> {
    let root = dom::parse(bytes)?;
    let id = fingerprint(bytes);
    let metadata = run_metadata(&root, &id)?;

    let mut ports = Vec::new();
    for host in root.children("host") {
        host_records(host, &id, &mut ports)?;
    }

    debug!(fingerprint = %id, hosts = metadata.num_hosts, records = ports.len(), "normalized scan");
    Ok(NormalizedScan { metadata, ports })
}

fn run_metadata(root: &Element, id: &Fingerprint) -> Result<ScanMetadata> {
    let args = required(root, &[], "args", "nmaprun@args")?;
    let total = required(root, &["runstats", "hosts"], "total", "runstats/hosts@total")?;
    let elapsed = required(root, &["runstats", "finished"], "elapsed", "runstats/finished@elapsed")?;

    let num_hosts = total
        .trim()
        .parse::<u32>()
        .map_err(|e| VaultError::invalid_record("runstats/hosts@total", format!("{e}: {total:?}")))?;
    let elapsed_time = elapsed
        .trim()
        .parse::<f64>()
        .map_err(|e| VaultError::invalid_record("runstats/finished@elapsed", format!("{e}: {elapsed:?}")))?;

    Ok(ScanMetadata { id: id.clone(), args: args.to_string(), elapsed_time, num_hosts })
}

fn host_records(host: &Element, id: &Fingerprint, out: &mut Vec<PortRecord>) -> Result<()> {
    let Some(ports) = host.child("ports") else { return Ok(()) };

    let host_ip = required(host, &["address"], "addr", "host/address@addr")?;
    let host_dns = host
        .child("hostnames")
        .map(|names| names.children("hostname").filter_map(|h| h.attr("name")).collect::<Vec<_>>().join(", "))
        .unwrap_or_default();
    let ostype = optional(host, &["os", "osmatch"], Pick::Attr("name"));
    let uptime = optional(host, &["uptime"], Pick::Attr("seconds"));

    for port in ports.children("port") {
        let raw_port = required(port, &[], "portid", "port@portid")?;
        let port_id = raw_port
            .trim()
            .parse::<u16>()
            .map_err(|e| VaultError::invalid_record("port@portid", format!("{e}: {raw_port:?}")))?;

        out.push(PortRecord {
            scan_id: id.clone(),
            host_ip: host_ip.to_string(),
            host_dns: host_dns.clone(),
            port_id,
            protocol: required(port, &[], "protocol", "port@protocol")?.to_string(),
            port_state: required(port, &["state"], "state", "port/state@state")?.to_string(),
            port_reason: required(port, &["state"], "reason", "port/state@reason")?.to_string(),
            service_name: required(port, &["service"], "name", "port/service@name")?.to_string(),
            port_script: optional(port, &["script"], Pick::AllValues),
            ostype: ostype.clone(),
            uptime: uptime.clone(),
        });
    }
    Ok(())
}

fn required<'a>(node: &'a Element, path: &[&str], attr: &str, field: &str) -> Result<&'a str> {
    node.find(path)
        .and_then(|n| n.attr(attr))
        .ok_or_else(|| VaultError::invalid_record(field, "missing"))
}

enum Pick<'a> {
    Attr(&'a str),
    /// Every attribute value of the element, joined with ", ".
    AllValues,
}

/// Lookup for data nmap only emits for some scans (scripts, OS detection,
/// uptime). A missing element, a missing attribute and an empty list all
/// yield an empty string; none of them is an error.
fn optional(node: &Element, path: &[&str], pick: Pick<'_>) -> String {
    let Some(el) = node.find(path) else { return String::new() };
    match pick {
        Pick::Attr(key) => el.attr(key).unwrap_or_default().to_string(),
        Pick::AllValues => el.attr_values().collect::<Vec<_>>().join(", "),
    }
}
