//! PKCS#12 Store Decoding
//!
//! Decodes a password-protected PKCS#12 container into the certificates and
//! private keys needed by the trust and key managers.

use crate::error::{Result, TlsConfigError};

use std::fmt;
use std::io::Read;
use p12_keystore::{KeyStore, KeyStoreEntry};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use tracing::{debug, warn};
use zeroize::Zeroizing;

/// Upper bound on the size of a store stream.
pub const MAX_STORE_BYTES: u64 = 4 * 1024 * 1024;

/// A decoded PKCS#12 store.
///
/// Remembers the password it was opened with, since PKCS#12 protects the
/// private keys with the store password.
pub struct Pkcs12Store {
    inner: KeyStore,
    password: Zeroizing<String>,
}

/// A private key entry together with its certificate chain, leaf first.
pub struct StoredKey {
    pub alias: String,
    pub chain: Vec<CertificateDer<'static>>,
    pub key: PrivateKeyDer<'static>,
}

impl fmt::Debug for StoredKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredKey")
            .field("alias", &self.alias)
            .field("chain_len", &self.chain.len())
            .finish()
    }
}

impl Pkcs12Store {
    /// Read a whole stream and decode it as PKCS#12.
    ///
    /// `label` names the store in error messages ("truststore", "keystore").
    /// Streams longer than [`MAX_STORE_BYTES`] are rejected.
    pub fn decode<R: Read + ?Sized>(reader: &mut R, password: &str, label: &str) -> Result<Self> {
        let mut data = Vec::new();
        reader
            .take(MAX_STORE_BYTES + 1)
            .read_to_end(&mut data)
            .map_err(|e| TlsConfigError::Decode(format!("Failed to read {} stream: {}", label, e)))?;

        if data.is_empty() {
            return Err(TlsConfigError::Decode(format!("{} stream is empty", label)));
        }

        if data.len() as u64 > MAX_STORE_BYTES {
            return Err(TlsConfigError::Decode(format!(
                "{} stream exceeds {} bytes",
                label, MAX_STORE_BYTES
            )));
        }

        debug!(store = label, bytes = data.len(), "decoding PKCS#12 store");
        let store = Self::from_der(&data, password).map_err(|e| match e {
            TlsConfigError::Decode(msg) => TlsConfigError::Decode(format!("{}: {}", label, msg)),
            other => other,
        })?;

        // Certificates without a key are only kept when they carry the
        // trusted key usage bag attribute.
        if store.is_empty() {
            warn!(
                store = label,
                bytes = data.len(),
                "decoded store has no entries; certificate-only stores need the trusted key usage attribute (openssl pkcs12 -jdktrust anyExtendedKeyUsage, or keytool)"
            );
        }

        Ok(store)
    }

    /// Decode PKCS#12 bytes held in memory.
    pub fn from_der(data: &[u8], password: &str) -> Result<Self> {
        let inner = KeyStore::from_pkcs12(data, password).map_err(|e| {
            TlsConfigError::Decode(format!(
                "Failed to decode PKCS#12 data (malformed or wrong password): {}",
                e
            ))
        })?;

        Ok(Self {
            inner,
            password: Zeroizing::new(password.to_string()),
        })
    }

    pub fn len(&self) -> usize {
        self.inner.entries().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn aliases(&self) -> Vec<String> {
        self.inner.entries().map(|(alias, _)| alias.to_string()).collect()
    }

    /// Certificates usable as trust anchors.
    ///
    /// Every certificate entry is included, plus the leaf certificate of every
    /// private key entry.
    pub fn trusted_certificates(&self) -> Vec<CertificateDer<'static>> {
        let mut certs = Vec::new();

        for (alias, entry) in self.inner.entries() {
            match entry {
                KeyStoreEntry::Certificate(cert) => {
                    certs.push(CertificateDer::from(cert.as_der().to_vec()));
                }
                KeyStoreEntry::PrivateKeyChain(chain) => match chain.chain().first() {
                    Some(leaf) => certs.push(CertificateDer::from(leaf.as_der().to_vec())),
                    None => debug!(alias = %alias, "private key entry has no certificate"),
                },
            }
        }

        certs
    }

    /// The first private key entry in alias order, if any.
    pub fn private_key_entry(&self) -> Option<StoredKey> {
        let mut keys = self.inner.entries().filter_map(|(alias, entry)| match entry {
            KeyStoreEntry::PrivateKeyChain(chain) => Some((alias, chain)),
            _ => None,
        });

        let (alias, chain) = keys.next()?;
        let remaining = keys.count();
        if remaining > 0 {
            warn!(alias = %alias, ignored = remaining, "store holds several private keys, using the first");
        }

        Some(StoredKey {
            alias: alias.to_string(),
            chain: chain
                .chain()
                .iter()
                .map(|cert| CertificateDer::from(cert.as_der().to_vec()))
                .collect(),
            key: PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(chain.key().to_vec())),
        })
    }

    /// Whether `password` can recover the private keys of this store.
    pub fn recovers_with(&self, password: &str) -> bool {
        self.password.as_str() == password
    }
}

impl fmt::Debug for Pkcs12Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pkcs12Store")
            .field("aliases", &self.aliases())
            .finish()
    }
}
