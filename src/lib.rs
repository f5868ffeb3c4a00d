//! # nats-tls - Private PKI bootstrap for NATS clusters
//!
//! nats-tls creates a self-signed root Certificate Authority and then issues
//! RSA key/certificate pairs for cluster routes, servers, clients and accounts,
//! all signed by that CA. Everything is driven by one YAML file; a `default`
//! section holds values that every other section inherits unless it sets them.
//!
//! Built entirely on rustcrypto libraries, no OpenSSL or ring.
//!
//! ## Pipeline
//!
//! 1. [`config::ResolvedConfig`] reads the file, merges every section over the
//!    defaults and turns relative TTLs (`"1 year"`, `"90 days"`) into absolute
//!    expirations, all against the same "now".
//! 2. [`pipeline::issue_ca`] generates the CA key and self-signed certificate.
//! 3. [`pipeline::issue_leaf`] runs once per leaf, in name order, signing with
//!    the CA.
//! 4. [`pem_utils`] writes `<name>-key.pem` (PKCS#1) and `<name>.pem` for each.
//!
//! The first error aborts the run; nothing already written is rolled back.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use nats_tls::{config::ResolvedConfig, pipeline};
//!
//! # fn main() -> Result<(), nats_tls::error::PkiError> {
//! let config = ResolvedConfig::load(Path::new("nats-tls.yaml"), false)?;
//! for issued in pipeline::run(&config)? {
//!     println!("{} -> {}", issued.name, issued.cert_path.display());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Certificate Profile
//!
//! - **CA**: basicConstraints `CA:TRUE` (critical), keyUsage keyCertSign and
//!   cRLSign (critical), subjectKeyIdentifier.
//! - **Leaves**: basicConstraints `CA:FALSE` (critical), keyUsage
//!   digitalSignature and keyEncipherment (critical), extendedKeyUsage
//!   clientAuth and serverAuth, DNS subjectAltNames, subjectKeyIdentifier and an
//!   authorityKeyIdentifier equal to the CA's subjectKeyIdentifier.
//! - Key identifiers are the SHA-1 of the RSA modulus; serials are 128-bit random.
//!
//! ## Module Organization
//!
//! - [`config`]: configuration model, default merging and path resolution
//! - [`ttl`]: TTL strings and calendar arithmetic
//! - [`key`]: RSA key generation, key identifiers and signing
//! - [`cert`]: certificate encoding, decoding and inspection
//! - [`issuer`]: the CA and certificate issuing
//! - [`pipeline`]: the end-to-end run
//! - [`pem_utils`]: PEM output
//! - [`error`]: error types

pub mod cert;
pub mod config;
pub mod error;
pub mod issuer;
pub mod key;
pub mod pem_utils;
pub mod pipeline;
pub mod serial;
pub mod tbs_certificate;
pub mod ttl;
