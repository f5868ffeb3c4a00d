//! PEM output. Each entity gets `<name>-key.pem` and `<name>.pem` in its
//! output directory.
//!
//! Existing files are replaced in place: there is no atomic rename, no backup
//! and no check that the certificate being replaced has expired. Overwrites are
//! logged at `warn` level.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{PkiError, Result};
use crate::key::KeyPair;

pub const PRIVATE_KEY_LABEL: &str = "RSA PRIVATE KEY";
pub const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// Convert DER‑encoded data into a PEM‑encoded string with the provided label.
pub fn der_to_pem(der: &[u8], label: &str) -> String {
    let pem = pem::Pem::new(label, der);
    pem::encode_config(&pem, pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF))
}

pub fn key_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}-key.pem"))
}

pub fn cert_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.pem"))
}

/// Writes `key` as a PKCS#1 PEM block to `<dir>/<name>-key.pem`.
pub fn write_key(key: &KeyPair, dir: &Path, name: &str) -> Result<PathBuf> {
    let path = key_path(dir, name);
    write_pem(&path, &key.to_pkcs1_der()?, PRIVATE_KEY_LABEL)?;
    Ok(path)
}

/// Writes DER certificate bytes as a PEM block to `<dir>/<name>.pem`.
pub fn write_cert(cert_der: &[u8], dir: &Path, name: &str) -> Result<PathBuf> {
    let path = cert_path(dir, name);
    write_pem(&path, cert_der, CERTIFICATE_LABEL)?;
    Ok(path)
}

fn write_pem(path: &Path, der: &[u8], label: &str) -> Result<()> {
    let write_error = |e: std::io::Error| PkiError::FileWriteError(format!("{}: {e}", path.display()));

    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(write_error)?;
    }
    if path.exists() {
        warn!(path = %path.display(), "Overwriting existing file");
    }
    fs::write(path, der_to_pem(der, label)).map_err(write_error)
}
