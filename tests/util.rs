use std::fs;
use std::path::{Path, PathBuf};

use nats_tls::cert::Certificate;
use tempfile::TempDir;

/// A cluster layout with small keys so tests stay fast.
pub const CLUSTER_CONFIG: &str = r#"
default:
  path: certs
  ttl: 1 year
  key_length: 1024
  subject:
    org: Acme
    country: EE
ca:
  ttl: 10 years
  subject:
    cn: Acme NATS CA
route:
  dns: [route.nats.internal]
  subject:
    cn: route
server:
  ttl: 90 days
  dns: [nats.internal]
  subject:
    cn: nats.internal
client:
  path: clients
  subject:
    cn: client
account:
  name: sys-account
  subject:
    cn: SYS
"#;

/// Writes `yaml` to `<tempdir>/nats-tls.yaml` and returns both.
pub fn write_config(yaml: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("nats-tls.yaml");
    fs::write(&path, yaml).expect("Failed to write config");
    (dir, path)
}

pub fn read_cert(path: &Path) -> Certificate {
    let pem = fs::read_to_string(path).expect("Failed to read certificate");
    Certificate::from_pem(&pem).expect("Failed to parse certificate")
}
