use der::Encode;
use der::flagset::FlagSet;
use x509_cert::certificate::CertificateInner;
use x509_cert::name::Name;

use crate::cert::Certificate;
use crate::cert::SignatureAlgorithm;
use crate::cert::extensions::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage, KeyUsages,
    SubjectAltName, SubjectKeyIdentifier,
};
use crate::cert::params::{CertificationRequestInfo, DistinguishedName, ExtensionParam, Validity};
use crate::error::{PkiError, Result};
use crate::key::{self, KeyPair};
use crate::serial::random_serial;
use crate::tbs_certificate::TbsCertificate;

/// Represents an entity capable of issuing certificates.
pub trait Issuer {
    /// Returns the encoded name placed in the issuer field.
    fn issuer_name(&self) -> &Name;

    /// Returns the signing key of the issuer.
    fn signing_key(&self) -> &KeyPair;

    /// Key identifier written to the authority key identifier extension, if any.
    fn authority_key_id(&self) -> Option<Vec<u8>>;

    /// Issues a certificate based on the provided certification request information.
    ///
    /// CA requests get key usage {keyCertSign, cRLSign}; everything else gets
    /// {digitalSignature, keyEncipherment}. Each call draws a fresh random serial.
    fn issue(
        &self,
        cert_request: &CertificationRequestInfo,
        validity: Validity,
    ) -> Result<Certificate> {
        let basic_constraints = BasicConstraints {
            is_ca: cert_request.is_ca,
            max_path_length: None,
        };
        let subject_key_id = SubjectKeyIdentifier(key::key_id(&cert_request.subject_public_key));

        let mut extensions: Vec<ExtensionParam> = vec![
            ExtensionParam::from_extension(basic_constraints, true)?,
            ExtensionParam::from_extension(subject_key_id, false)?,
        ];

        if let Some(key_identifier) = self.authority_key_id() {
            let authority_key_id = AuthorityKeyIdentifier { key_identifier };
            extensions.push(ExtensionParam::from_extension(authority_key_id, false)?);
        }

        let key_usage_flags: FlagSet<KeyUsages> = if cert_request.is_ca {
            KeyUsages::KeyCertSign | KeyUsages::CRLSign
        } else {
            KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment
        };
        extensions.push(ExtensionParam::from_extension(KeyUsage(key_usage_flags), true)?);

        if !cert_request.usages.is_empty() {
            let extended_key_usage = ExtendedKeyUsage {
                usage: cert_request.usages.clone(),
            };
            extensions.push(ExtensionParam::from_extension(extended_key_usage, false)?);
        }

        if !cert_request.dns_names.is_empty() {
            let san = SubjectAltName {
                names: cert_request.dns_names.clone(),
            };
            extensions.push(ExtensionParam::from_extension(san, false)?);
        }

        extensions.extend(cert_request.extensions.iter().cloned());

        let subject_public_key = x509_cert::spki::SubjectPublicKeyInfoOwned::from_key(
            cert_request.subject_public_key.clone(),
        )
        .map_err(|e| PkiError::CertificateEncodingError(format!("subject public key: {e}")))?;

        let signature_algo = SignatureAlgorithm::Sha256WithRSA;
        let tbs_cert = TbsCertificate {
            serial_number: random_serial(),
            signature_algorithm: signature_algo.clone(),
            issuer: self.issuer_name().clone(),
            validity,
            subject: cert_request.subject.as_x509_name()?,
            subject_public_key,
            extensions,
        };

        let tbs_cert_inner = tbs_cert.to_tbs_certificate_inner()?;
        let signature = self.signing_key().sign_data(&tbs_cert_inner.to_der()?)?;

        let cert_inner = CertificateInner {
            tbs_certificate: tbs_cert_inner,
            signature_algorithm: signature_algo.into(),
            signature: der::asn1::BitString::from_bytes(&signature)?,
        };

        Ok(Certificate { inner: cert_inner })
    }
}

// Helper struct for self-signed certificates
struct SelfIssuer<'a> {
    name: Name,
    key: &'a KeyPair,
}

impl Issuer for SelfIssuer<'_> {
    fn issuer_name(&self) -> &Name {
        &self.name
    }

    fn signing_key(&self) -> &KeyPair {
        self.key
    }

    // A root's own subject key identifier already names its key.
    fn authority_key_id(&self) -> Option<Vec<u8>> {
        None
    }
}

impl Certificate {
    /// Creates a new self-signed certificate.
    pub fn new_self_signed(
        cert_info: &CertificationRequestInfo,
        key: &KeyPair,
        validity: Validity,
    ) -> Result<Self> {
        let self_issuer = SelfIssuer {
            name: cert_info.subject.as_x509_name()?,
            key,
        };
        self_issuer.issue(cert_info, validity)
    }
}

/// The in-memory root CA: its certificate, its private key and its key id.
///
/// Built once per run and only ever borrowed by leaf issuance.
#[derive(Debug)]
pub struct CertificateAuthority {
    cert: Certificate,
    key: KeyPair,
    key_id: Vec<u8>,
}

impl CertificateAuthority {
    /// Generates a key of `key_bits` and a self-signed CA certificate for it.
    pub fn generate(
        subject: DistinguishedName,
        key_bits: usize,
        validity: Validity,
    ) -> Result<Self> {
        let key = KeyPair::generate_rsa(key_bits)?;
        let cert_info = CertificationRequestInfo::builder()
            .subject(subject)
            .subject_public_key(key.public_key().clone())
            .is_ca(true)
            .build();
        let cert = Certificate::new_self_signed(&cert_info, &key, validity)?;
        let key_id = key.key_id();
        Ok(Self { cert, key, key_id })
    }

    pub fn certificate(&self) -> &Certificate {
        &self.cert
    }

    pub fn key(&self) -> &KeyPair {
        &self.key
    }

    /// The CA's subject key identifier.
    pub fn key_id(&self) -> &[u8] {
        &self.key_id
    }
}

impl Issuer for CertificateAuthority {
    // The issuer of everything we sign is the subject of our certificate.
    fn issuer_name(&self) -> &Name {
        &self.cert.inner.tbs_certificate.subject
    }

    fn signing_key(&self) -> &KeyPair {
        &self.key
    }

    fn authority_key_id(&self) -> Option<Vec<u8>> {
        Some(self.key_id.clone())
    }
}
