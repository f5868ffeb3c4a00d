//! The issuance run: CA first, then every leaf in name order.
//!
//! The run stops at the first error. Files written before the failure are left
//! on disk.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::cert::Certificate;
use crate::cert::extensions::ExtendedKeyUsageOption;
use crate::cert::params::{CertificationRequestInfo, Validity};
use crate::config::{CertSpec, ResolvedConfig};
use crate::error::Result;
use crate::issuer::{CertificateAuthority, Issuer};
use crate::key::{KeyPair, hex};
use crate::pem_utils;

const EXPIRATION_FORMAT: &[time::format_description::FormatItem<'static>] =
    time::macros::format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// What was written for one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCertificate {
    pub name: String,
    pub serial: Vec<u8>,
    pub key_path: PathBuf,
    pub cert_path: PathBuf,
}

/// Generates the CA key and self-signed certificate and writes both.
pub fn issue_ca(spec: &CertSpec) -> Result<(CertificateAuthority, IssuedCertificate)> {
    info!(name = %spec.name, bits = spec.key_bits, "Creating CA key and certificate");
    log_expiration(spec);

    let ca = CertificateAuthority::generate(
        spec.subject.to_distinguished_name(),
        spec.key_bits,
        Validity::until(spec.expiration()),
    )?;
    let issued = write(spec, ca.key(), ca.certificate())?;
    info!(path = %spec.output_path.display(), key_id = %hex(ca.key_id()), "CA key and cert created");
    Ok((ca, issued))
}

/// Generates a leaf key and a CA-signed certificate usable for both client
/// and server authentication, and writes both.
pub fn issue_leaf(spec: &CertSpec, ca: &CertificateAuthority) -> Result<IssuedCertificate> {
    info!(name = %spec.name, bits = spec.key_bits, "Creating key and certificate");
    log_expiration(spec);

    let key = KeyPair::generate_rsa(spec.key_bits)?;
    let request = CertificationRequestInfo::builder()
        .subject(spec.subject.to_distinguished_name())
        .subject_public_key(key.public_key().clone())
        .usages(vec![
            ExtendedKeyUsageOption::ClientAuth,
            ExtendedKeyUsageOption::ServerAuth,
        ])
        .dns_names(spec.subject_alt_names.clone())
        .build();
    let cert = ca.issue(&request, Validity::until(spec.expiration()))?;

    let issued = write(spec, &key, &cert)?;
    info!(path = %spec.output_path.display(), "Created");
    Ok(issued)
}

/// Runs the whole pipeline over a resolved configuration.
///
/// Returns one record per entity, CA first, in issuance order.
pub fn run(config: &ResolvedConfig) -> Result<Vec<IssuedCertificate>> {
    let (ca, ca_issued) = issue_ca(&config.ca)?;

    let mut issued = Vec::with_capacity(config.leaves.len() + 1);
    issued.push(ca_issued);
    for leaf in &config.leaves {
        issued.push(issue_leaf(leaf, &ca)?);
    }

    info!(count = issued.len(), "All certificates issued");
    Ok(issued)
}

fn write(spec: &CertSpec, key: &KeyPair, cert: &Certificate) -> Result<IssuedCertificate> {
    let key_path = pem_utils::write_key(key, &spec.output_path, &spec.name)?;
    let cert_path = pem_utils::write_cert(&cert.to_der()?, &spec.output_path, &spec.name)?;
    debug!(name = %spec.name, serial = %hex(cert.serial_number()), "Wrote key and certificate");
    Ok(IssuedCertificate {
        name: spec.name.clone(),
        serial: cert.serial_number().to_vec(),
        key_path,
        cert_path,
    })
}

fn log_expiration(spec: &CertSpec) {
    match spec.expiration().format(EXPIRATION_FORMAT) {
        Ok(formatted) => info!(ttl = spec.ttl.raw(), "Certificate valid until {formatted}"),
        Err(_) => info!(ttl = spec.ttl.raw(), "Certificate valid until {}", spec.expiration()),
    }
}
