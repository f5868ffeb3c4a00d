use std::fmt;

use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey as RsaSigningKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha1::{Digest, Sha1};
use sha2::Sha256;

use crate::error::{PkiError, Result};

/// An RSA key pair generated for one CA or leaf certificate.
pub struct KeyPair {
    private: Box<RsaPrivateKey>,
    public: RsaPublicKey,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("bits", &(self.public.size() * 8))
            .field("key_id", &hex(&self.key_id()))
            .finish_non_exhaustive()
    }
}

impl KeyPair {
    /// Generate an RSA key pair with the specified number of bits.
    pub fn generate_rsa(bits: usize) -> Result<Self> {
        let mut rng = rand_core::OsRng;
        let private = RsaPrivateKey::new(&mut rng, bits).map_err(|e| {
            PkiError::KeyGenerationError(format!("{bits}-bit RSA key: {e}"))
        })?;
        let public = RsaPublicKey::from(&private);
        Ok(KeyPair {
            private: Box::new(private),
            public,
        })
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    /// SHA-1 over the big-endian bytes of the public modulus.
    ///
    /// Used both as this key's subject key identifier and, for a CA, as the
    /// authority key identifier of every certificate it signs.
    pub fn key_id(&self) -> Vec<u8> {
        key_id(&self.public)
    }

    /// Signs `data` with RSASSA-PKCS1-v1_5 over SHA-256.
    pub fn sign_data(&self, data: &[u8]) -> Result<Vec<u8>> {
        let signing_key = RsaSigningKey::<Sha256>::new(self.private.as_ref().clone());
        let signature = signing_key
            .try_sign(data)
            .map_err(|e| PkiError::CertificateEncodingError(format!("signing: {e}")))?;
        Ok(signature.to_vec())
    }

    /// The private key as PKCS#1 `RSAPrivateKey` DER.
    pub fn to_pkcs1_der(&self) -> Result<Vec<u8>> {
        let document = self
            .private
            .to_pkcs1_der()
            .map_err(|e| PkiError::FileWriteError(format!("PKCS#1 encoding: {e}")))?;
        Ok(document.as_bytes().to_vec())
    }
}

pub fn key_id(public: &RsaPublicKey) -> Vec<u8> {
    Sha1::digest(public.n().to_bytes_be()).to_vec()
}

/// Colon separated upper-case hex, the way key ids are usually displayed.
pub fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(":")
}
