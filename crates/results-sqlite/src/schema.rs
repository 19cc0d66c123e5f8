pub const MIG_0001_INIT: &str = r#"
BEGIN;

CREATE TABLE IF NOT EXISTS metadata (
  id              TEXT PRIMARY KEY,
  args            TEXT NOT NULL,
  elapsed_time    REAL NOT NULL,
  num_hosts       INTEGER NOT NULL CHECK (num_hosts >= 0)
);

CREATE TABLE IF NOT EXISTS results (
  result_id       INTEGER PRIMARY KEY AUTOINCREMENT,
  scan_id         TEXT NOT NULL REFERENCES metadata(id) ON DELETE CASCADE,
  host_ip         TEXT NOT NULL,
  host_dns        TEXT NOT NULL DEFAULT '',
  port_id         INTEGER NOT NULL CHECK (port_id BETWEEN 0 AND 65535),
  protocol        TEXT NOT NULL,
  port_state      TEXT NOT NULL,
  port_reason     TEXT NOT NULL,
  service_name    TEXT NOT NULL,
  port_script     TEXT NOT NULL DEFAULT '',
  ostype          TEXT NOT NULL DEFAULT '',
  uptime          TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_results_scan ON results(scan_id);
CREATE INDEX IF NOT EXISTS idx_results_host ON results(host_ip);

COMMIT;
"#
;
