pub mod extensions;
pub mod params;

use der::{Decode, DecodePem, Encode, EncodePem};
use extensions::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, ExtendedKeyUsageOption, KeyUsage,
    SubjectAltName, SubjectKeyIdentifier, ToAndFromX509Extension,
};
use params::DistinguishedName;
use rsa::RsaPublicKey;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::signature::Verifier;
use sha2::Sha256;
use time::OffsetDateTime;
use x509_cert::certificate::CertificateInner;

use crate::error::{PkiError, Result};

/// Represents the supported signature algorithms for certificates.
///
/// Every key this tool generates is RSA, so certificates are always signed
/// with PKCS#1 v1.5 over SHA-256.
#[derive(Debug, Clone)]
pub enum SignatureAlgorithm {
    /// SHA-256 with RSA encryption.
    Sha256WithRSA,
}

impl From<SignatureAlgorithm> for x509_cert::spki::AlgorithmIdentifierOwned {
    fn from(value: SignatureAlgorithm) -> Self {
        match value {
            SignatureAlgorithm::Sha256WithRSA => x509_cert::spki::AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
                parameters: Some(der::asn1::AnyRef::NULL.into()),
            },
        }
    }
}

/// Represents an X.509 certificate.
///
/// Besides DER and PEM encoding this exposes the fields the tool sets, so
/// written certificates can be read back and checked.
#[derive(Debug, Clone)]
pub struct Certificate {
    /// The inner representation of the certificate.
    pub inner: CertificateInner,
}

impl Certificate {
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner = CertificateInner::from_der(der)
            .map_err(|e| PkiError::DecodingError(format!("certificate: {e}")))?;
        Ok(Self { inner })
    }

    pub fn from_pem(pem: &str) -> Result<Self> {
        let inner = CertificateInner::from_pem(pem)
            .map_err(|e| PkiError::DecodingError(format!("certificate: {e}")))?;
        Ok(Self { inner })
    }

    /// Encodes the certificate into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.inner
            .to_der()
            .map_err(|e| PkiError::CertificateEncodingError(e.to_string()))
    }

    /// Encodes the certificate into PEM format.
    pub fn to_pem(&self) -> Result<String> {
        self.inner
            .to_pem(pkcs8::LineEnding::LF)
            .map_err(|e| PkiError::CertificateEncodingError(e.to_string()))
    }

    /// Big-endian serial number bytes.
    pub fn serial_number(&self) -> &[u8] {
        self.inner.tbs_certificate.serial_number.as_bytes()
    }

    pub fn subject(&self) -> Result<DistinguishedName> {
        DistinguishedName::from_x509_name(&self.inner.tbs_certificate.subject)
    }

    pub fn issuer(&self) -> Result<DistinguishedName> {
        DistinguishedName::from_x509_name(&self.inner.tbs_certificate.issuer)
    }

    pub fn is_self_issued(&self) -> bool {
        self.inner.tbs_certificate.subject == self.inner.tbs_certificate.issuer
    }

    pub fn not_after(&self) -> Result<OffsetDateTime> {
        let seconds = self.inner.tbs_certificate.validity.not_after.to_unix_duration().as_secs();
        i64::try_from(seconds)
            .ok()
            .and_then(|s| OffsetDateTime::from_unix_timestamp(s).ok())
            .ok_or_else(|| PkiError::DecodingError(format!("notAfter {seconds} out of range")))
    }

    pub fn public_key(&self) -> Result<RsaPublicKey> {
        let spki = self.inner.tbs_certificate.subject_public_key_info.to_der()?;
        RsaPublicKey::from_public_key_der(&spki)
            .map_err(|e| PkiError::DecodingError(format!("subject public key: {e}")))
    }

    /// Decodes the extension `E`, or `None` when the certificate lacks it.
    pub fn extension<E: ToAndFromX509Extension>(&self) -> Result<Option<(E, bool)>> {
        let Some(extensions) = &self.inner.tbs_certificate.extensions else {
            return Ok(None);
        };
        extensions
            .iter()
            .find(|ext| ext.extn_id == E::OID)
            .map(|ext| {
                E::from_x509_extension_value(ext.extn_value.as_bytes())
                    .map(|value| (value, ext.critical))
            })
            .transpose()
    }

    pub fn is_ca(&self) -> Result<bool> {
        Ok(self
            .extension::<BasicConstraints>()?
            .is_some_and(|(bc, _)| bc.is_ca))
    }

    pub fn dns_names(&self) -> Result<Vec<String>> {
        Ok(self
            .extension::<SubjectAltName>()?
            .map(|(san, _)| san.names)
            .unwrap_or_default())
    }

    pub fn key_usage(&self) -> Result<Option<KeyUsage>> {
        Ok(self.extension::<KeyUsage>()?.map(|(ku, _)| ku))
    }

    pub fn extended_key_usage(&self) -> Result<Vec<ExtendedKeyUsageOption>> {
        Ok(self
            .extension::<ExtendedKeyUsage>()?
            .map(|(eku, _)| eku.usage)
            .unwrap_or_default())
    }

    pub fn subject_key_id(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.extension::<SubjectKeyIdentifier>()?.map(|(ski, _)| ski.0))
    }

    pub fn authority_key_id(&self) -> Result<Option<Vec<u8>>> {
        Ok(self
            .extension::<AuthorityKeyIdentifier>()?
            .map(|(aki, _)| aki.key_identifier))
    }

    /// Checks the certificate signature against `issuer_key`.
    ///
    /// # Errors
    /// Returns [`PkiError::InvalidInput`] when the signature does not verify.
    pub fn verify_signed_by(&self, issuer_key: &RsaPublicKey) -> Result<()> {
        if self.inner.signature_algorithm.oid != const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION
        {
            return Err(PkiError::DecodingError(format!(
                "unsupported signature algorithm {}",
                self.inner.signature_algorithm.oid
            )));
        }
        let tbs = self.inner.tbs_certificate.to_der()?;
        let signature = Signature::try_from(self.inner.signature.raw_bytes())
            .map_err(|e| PkiError::DecodingError(format!("signature: {e}")))?;
        VerifyingKey::<Sha256>::new(issuer_key.clone())
            .verify(&tbs, &signature)
            .map_err(|e| PkiError::InvalidInput(format!("signature does not verify: {e}")))
    }
}
