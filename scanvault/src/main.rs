use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::info;

use results_sqlite::Db;
use scanvault::config::{self, Config};
use scanvault::logging;
use scanvault::service::{ScanQuery, ScanReport, ScanService};
use scanvault_core::PortRecord;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat { Text, Json, Jsonl }

#[derive(Debug, Parser)]
#[command(name = "scanvault", version, about = "Store nmap XML reports in SQLite and query them")]
struct Cli {
    /// Optional config file (YAML). If omitted, loads ./scanvault.yaml if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// SQLite database path (overrides database.path from the config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print version information
    Version,
    /// Serve the HTTP API
    #[cfg(feature = "server")]
    Serve {
        /// Listen address (default: server.bind from config, else 127.0.0.1:5000)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Ingest one or more nmap XML files
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// List the most recently ingested scans
    Scans {
        /// Number of scans to list (default: query.default_max_results, else 5)
        #[arg(long)]
        max_results: Option<u32>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Show every scan that saw a host whose address starts with PREFIX
    Host {
        prefix: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Show one scan by fingerprint
    Show {
        fingerprint: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// List distinct hosts per scan
    Hosts {
        #[arg(long)]
        max_results: Option<u32>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Write one scan's port records as CSV
    Export {
        fingerprint: String,
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(cli.config.as_deref())?;
    logging::init_tracing(&cfg.log_level(), &cfg.log_format())?;

    if let Commands::Version = cli.command {
        println!("scanvault {} (core {})", env!("CARGO_PKG_VERSION"), scanvault_core::version());
        return Ok(());
    }

    let db_path = cli.db.clone().unwrap_or_else(|| cfg.db_path());
    let db = Db::open_or_create(&db_path).with_context(|| format!("opening scan database {}", db_path.display()))?;
    let service = ScanService::new(db, cfg.default_max_results());

    match cli.command {
        Commands::Version => {}
        #[cfg(feature = "server")]
        Commands::Serve { bind } => serve(service, &cfg, bind)?,
        Commands::Ingest { files, format } => ingest(&service, &files, format)?,
        Commands::Scans { max_results, format } => {
            print_reports(service.lookup(&ScanQuery::latest(max_results))?, format)?
        }
        Commands::Host { prefix, format } => print_reports(service.lookup(&ScanQuery::host(prefix))?, format)?,
        Commands::Show { fingerprint, format } => {
            print_reports(service.lookup(&ScanQuery::scan(fingerprint))?, format)?
        }
        Commands::Hosts { max_results, format } => {
            let hosts = service.hosts(max_results)?;
            match format {
                OutputFormat::Text => {
                    for h in &hosts { println!("{} {}", h.scan_id, h.host_ip); }
                }
                OutputFormat::Json => println!("{}", serde_json::to_string(&hosts)?),
                OutputFormat::Jsonl => {
                    for h in &hosts { println!("{}", serde_json::to_string(h)?); }
                }
            }
        }
        Commands::Export { fingerprint, out } => {
            let reports = service.lookup(&ScanQuery::scan(fingerprint.as_str()))?;
            let report = reports.into_iter().next().ok_or_else(|| anyhow!("scan not found: {fingerprint}"))?;
            write_csv(&out, &report.scans)?;
            info!(fingerprint = %report.nmapid, rows = report.scans.len(), out = %out.display(), "exported scan");
        }
    }
    Ok(())
}

#[cfg(feature = "server")]
fn serve(service: ScanService<Db>, cfg: &Config, bind: Option<String>) -> Result<()> {
    let bind = bind.unwrap_or_else(|| cfg.bind());
    let max_body = cfg.max_body_bytes();
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(scanvault::api::serve(std::sync::Arc::new(service), &bind, max_body))
}

fn ingest(service: &ScanService<Db>, files: &[PathBuf], format: OutputFormat) -> Result<()> {
    let mut failed = 0usize;
    for file in files {
        let bytes = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
        let (line, obj) = match service.ingest(&bytes) {
            Ok(r) => (
                format!("{}: stored {} ({} hosts, {} records)", file.display(), r.fingerprint, r.total_hosts, r.records),
                serde_json::json!({ "file": file, "status": "Success", "fingerprint": r.fingerprint, "total_hosts": r.total_hosts, "records": r.records }),
            ),
            Err(e) => {
                failed += 1;
                (
                    format!("{}: rejected: {}", file.display(), e),
                    serde_json::json!({ "file": file, "status": "Failed", "reason": e.to_string() }),
                )
            }
        };
        match format {
            OutputFormat::Text => println!("{}", line),
            OutputFormat::Json | OutputFormat::Jsonl => println!("{}", serde_json::to_string(&obj)?),
        }
    }
    if failed > 0 {
        return Err(anyhow!("{} of {} files rejected", failed, files.len()));
    }
    Ok(())
}

fn print_reports(reports: Vec<ScanReport>, format: OutputFormat) -> Result<()> {
    if reports.is_empty() {
        return Err(anyhow!("scan not found"));
    }
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&reports)?),
        OutputFormat::Jsonl => {
            for r in &reports { println!("{}", serde_json::to_string(r)?); }
        }
        OutputFormat::Text => {
            for r in &reports {
                println!("{}  hosts={} elapsed={}s  {}", r.nmapid, r.scanned_hosts, r.elapsed_time, r.args);
                for p in &r.scans {
                    let dns = if p.host_dns.is_empty() { String::new() } else { format!(" ({})", p.host_dns) };
                    println!("  {}{} {}/{} {} {} {}", p.host_ip, dns, p.port_id, p.protocol, p.port_state, p.port_reason, p.service_name);
                }
            }
        }
    }
    Ok(())
}

fn write_csv(path: &std::path::Path, records: &[PortRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(std::fs::File::create(path)?);
    wtr.write_record(["scan_id","host_ip","host_dns","port_id","protocol","port_state","port_reason","service_name","port_script","ostype","uptime"])?;
    for p in records {
        let port = p.port_id.to_string();
        let row: [&str; 11] = [
            p.scan_id.as_str(), &p.host_ip, &p.host_dns, &port, &p.protocol, &p.port_state,
            &p.port_reason, &p.service_name, &p.port_script, &p.ostype, &p.uptime,
        ];
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}
