//! use nats_tls::error::PkiError;

use thiserror::Error;

/// Represents errors that can occur while bootstrapping the PKI.
///
/// Every failure aborts the run; the variants only differ in the message they
/// carry and the stage that produced them.
#[derive(Debug, Error, Clone)]
pub enum PkiError {
    /// The configuration file could not be read.
    #[error("Failed to read config: {0}")]
    ConfigReadError(String),

    /// The configuration is malformed, including bad TTL strings.
    #[error("Failed to parse config: {0}")]
    ConfigParseError(String),

    /// An entity could not be resolved against the default template.
    #[error("Failed to resolve config: {0}")]
    MergeResolutionError(String),

    /// Error during RSA key generation.
    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    /// Error while building, encoding or signing a certificate.
    #[error("Failed to encode certificate: {0}")]
    CertificateEncodingError(String),

    /// Error while writing PEM output.
    #[error("Failed to write file: {0}")]
    FileWriteError(String),

    /// Error during data decoding.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),

    /// Error due to invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, PkiError>;

impl From<der::Error> for PkiError {
    fn from(err: der::Error) -> Self {
        PkiError::CertificateEncodingError(err.to_string())
    }
}

impl From<rsa::Error> for PkiError {
    fn from(err: rsa::Error) -> Self {
        PkiError::KeyGenerationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for PkiError {
    fn from(err: serde_yaml::Error) -> Self {
        PkiError::ConfigParseError(err.to_string())
    }
}
