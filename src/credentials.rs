//! Credential Bundle
//!
//! Keystore and truststore streams together with their passwords, validated
//! once at construction and consumed by a single context build.

use crate::error::{Result, TlsConfigError};

use std::fmt;
use std::io::Read;
use zeroize::Zeroizing;

/// An already-opened PKCS#12 byte stream.
pub type StoreStream = Box<dyn Read + Send>;

/// Keystore and truststore inputs for one context build.
///
/// Both streams are owned by the bundle. They are read at most once and are
/// released when the bundle is consumed, whatever the outcome of the build.
pub struct CredentialBundle {
    pub(crate) keystore: StoreStream,
    pub(crate) keystore_password: Zeroizing<String>,
    pub(crate) truststore: StoreStream,
    pub(crate) truststore_password: Zeroizing<String>,
}

impl CredentialBundle {
    /// Create a bundle from two readers and their passwords.
    ///
    /// Fails with a configuration error when either password is blank. No
    /// stream is read here.
    pub fn new<K, T>(
        keystore: K,
        keystore_password: &str,
        truststore: T,
        truststore_password: &str,
    ) -> Result<Self>
    where
        K: Read + Send + 'static,
        T: Read + Send + 'static,
    {
        Self::builder()
            .keystore(keystore)
            .keystore_password(keystore_password)
            .truststore(truststore)
            .truststore_password(truststore_password)
            .build()
    }

    pub fn builder() -> CredentialBundleBuilder {
        CredentialBundleBuilder::default()
    }
}

impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("keystore", &"<stream>")
            .field("keystore_password", &"<redacted>")
            .field("truststore", &"<stream>")
            .field("truststore_password", &"<redacted>")
            .finish()
    }
}

/// Incremental construction of a [`CredentialBundle`].
///
/// Any part may be left unset; `build` reports the first missing or blank
/// credential as a configuration error.
#[derive(Default)]
pub struct CredentialBundleBuilder {
    keystore: Option<StoreStream>,
    keystore_password: Option<Zeroizing<String>>,
    truststore: Option<StoreStream>,
    truststore_password: Option<Zeroizing<String>>,
}

impl CredentialBundleBuilder {
    pub fn keystore<R: Read + Send + 'static>(mut self, stream: R) -> Self {
        self.keystore = Some(Box::new(stream));
        self
    }

    pub fn keystore_password(mut self, password: &str) -> Self {
        self.keystore_password = Some(Zeroizing::new(password.to_string()));
        self
    }

    pub fn truststore<R: Read + Send + 'static>(mut self, stream: R) -> Self {
        self.truststore = Some(Box::new(stream));
        self
    }

    pub fn truststore_password(mut self, password: &str) -> Self {
        self.truststore_password = Some(Zeroizing::new(password.to_string()));
        self
    }

    pub fn build(self) -> Result<CredentialBundle> {
        let keystore = self.keystore.ok_or_else(|| missing("keystore stream"))?;
        let truststore = self.truststore.ok_or_else(|| missing("truststore stream"))?;
        let keystore_password = non_blank(self.keystore_password, "keystore password")?;
        let truststore_password = non_blank(self.truststore_password, "truststore password")?;

        Ok(CredentialBundle {
            keystore,
            keystore_password,
            truststore,
            truststore_password,
        })
    }
}

fn missing(what: &str) -> TlsConfigError {
    TlsConfigError::Configuration(format!(
        "{} is missing; keystore and truststore details are required when TLS is enabled",
        what
    ))
}

fn non_blank(password: Option<Zeroizing<String>>, what: &str) -> Result<Zeroizing<String>> {
    match password {
        Some(password) if !password.trim().is_empty() => Ok(password),
        Some(_) => Err(TlsConfigError::Configuration(format!("{} is empty", what))),
        None => Err(missing(what)),
    }
}
