use std::time::Duration as StdDuration;

use bon::Builder;
use const_oid::ObjectIdentifier;
use der::DateTime;
use der::asn1::{Any, GeneralizedTime, PrintableStringRef, SetOfVec, UtcTime, Utf8StringRef};
use rsa::RsaPublicKey;
use time::OffsetDateTime;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{RdnSequence, RelativeDistinguishedName};

use super::extensions::ToAndFromX509Extension;
use crate::cert::extensions::ExtendedKeyUsageOption;
use crate::error::{PkiError, Result};

/// Parameters for building an X.509 certificate.
///
/// # Fields
/// * `subject` - The distinguished name of the certificate subject.
/// * `subject_public_key` - The public key of the certificate subject.
/// * `usages` - A list of extended key usage options.
/// * `dns_names` - DNS subject alternative names.
/// * `is_ca` - Indicates if the certificate is a CA.
/// * `extensions` - Additional X.509 extensions.
#[derive(Clone, Debug, Builder)]
pub struct CertificationRequestInfo {
    pub subject: DistinguishedName,
    pub subject_public_key: RsaPublicKey,
    #[builder(default)]
    pub usages: Vec<ExtendedKeyUsageOption>,
    #[builder(default)]
    pub dns_names: Vec<String>,
    #[builder(default)]
    pub is_ca: bool,
    #[builder(default)]
    pub extensions: Vec<ExtensionParam>,
}

/// Subject or issuer name of a certificate.
///
/// Only the attributes this tool configures are modelled; empty attributes are
/// left out of the encoded name.
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    #[builder(default)]
    pub common_name: String,
    pub organization: Option<String>,
    pub country: Option<String>,
}

impl DistinguishedName {
    /// Converts the distinguished name to an X.509-compatible format.
    ///
    /// Attributes are emitted in the conventional C, O, CN order; the country
    /// is a PrintableString, everything else UTF8String.
    pub fn as_x509_name(&self) -> Result<x509_cert::name::DistinguishedName> {
        let mut rdns = Vec::new();
        if let Some(country) = self.country.as_deref().filter(|c| !c.is_empty()) {
            let value = PrintableStringRef::new(country).map_err(|e| {
                PkiError::InvalidInput(format!("country '{country}' is not printable: {e}"))
            })?;
            rdns.push(single_attribute(const_oid::db::rfc4519::C, Any::encode_from(&value)?)?);
        }
        if let Some(org) = self.organization.as_deref().filter(|o| !o.is_empty()) {
            let value = Utf8StringRef::new(org)?;
            rdns.push(single_attribute(const_oid::db::rfc4519::O, Any::encode_from(&value)?)?);
        }
        if !self.common_name.is_empty() {
            let value = Utf8StringRef::new(&self.common_name)?;
            rdns.push(single_attribute(const_oid::db::rfc4519::CN, Any::encode_from(&value)?)?);
        }
        Ok(RdnSequence(rdns))
    }

    /// Creates a `DistinguishedName` from an X.509-compatible format.
    pub fn from_x509_name(x509dn: &x509_cert::name::DistinguishedName) -> Result<Self> {
        let mut name = DistinguishedName::default();

        for rdn in x509dn.0.iter() {
            for attr in rdn.0.iter() {
                match attr.oid {
                    const_oid::db::rfc4519::CN => name.common_name = attribute_string(attr)?,
                    const_oid::db::rfc4519::O => name.organization = Some(attribute_string(attr)?),
                    const_oid::db::rfc4519::C => name.country = Some(attribute_string(attr)?),
                    _ => {}
                }
            }
        }

        Ok(name)
    }
}

fn attribute_string(attr: &AttributeTypeAndValue) -> Result<String> {
    if let Ok(s) = attr.value.decode_as::<String>() {
        return Ok(s);
    }
    attr.value
        .decode_as::<PrintableStringRef<'_>>()
        .map(|s| s.to_string())
        .map_err(|e| PkiError::DecodingError(format!("name attribute {}: {e}", attr.oid)))
}

fn single_attribute(oid: ObjectIdentifier, value: Any) -> Result<RelativeDistinguishedName> {
    let set = SetOfVec::try_from(vec![AttributeTypeAndValue { oid, value }])?;
    Ok(RelativeDistinguishedName(set))
}

/// Certificate validity period.
///
/// # Fields
/// * `not_before` - The start of the validity period.
/// * `not_after` - The end of the validity period.
#[derive(Clone, Debug)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// A validity period starting now and ending at `expiration`.
    pub fn until(expiration: OffsetDateTime) -> Self {
        Self {
            not_before: OffsetDateTime::now_utc(),
            not_after: expiration,
        }
    }

    pub fn to_x509_validity(&self) -> Result<x509_cert::time::Validity> {
        Ok(x509_cert::time::Validity {
            not_before: to_x509_time(self.not_before)?,
            not_after: to_x509_time(self.not_after)?,
        })
    }
}

/// UTCTime through 2049, GeneralizedTime from 2050 on (RFC 5280 4.1.2.5).
fn to_x509_time(at: OffsetDateTime) -> Result<x509_cert::time::Time> {
    let seconds = u64::try_from(at.unix_timestamp()).map_err(|_| {
        PkiError::CertificateEncodingError(format!("validity time {at} predates the epoch"))
    })?;
    let date_time = DateTime::from_unix_duration(StdDuration::from_secs(seconds))?;
    let time = if date_time.year() < 2050 {
        x509_cert::time::Time::UtcTime(UtcTime::from_date_time(date_time)?)
    } else {
        x509_cert::time::Time::GeneralTime(GeneralizedTime::from_date_time(date_time))
    };
    Ok(time)
}

/// Represents an X.509 extension.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a specific extension.
    pub fn from_extension<E: ToAndFromX509Extension>(extension: E, critical: bool) -> Result<Self> {
        Ok(Self {
            oid: E::OID,
            critical,
            value: extension.to_x509_extension_value()?,
        })
    }

    /// Decodes an `ExtensionParam` into a specific extension.
    pub fn to_extension<E: ToAndFromX509Extension>(&self) -> Result<E> {
        E::from_x509_extension_value(&self.value)
    }
}
