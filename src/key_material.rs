//! Key Manager
//!
//! Selects the local identity (certificate chain and private key) presented
//! during the handshake when the server asks for a client certificate.

use crate::error::{Result, TlsConfigError};
use crate::keystore::{Pkcs12Store, StoredKey};

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Where the key manager takes its key material from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyMaterialSource {
    /// Reuse the decoded truststore for key material.
    ///
    /// The keystore stream is released unread and the keystore password must
    /// recover the keys held by the truststore.
    #[default]
    SharedWithTruststore,
    /// Decode the keystore stream on its own, with the keystore password.
    Keystore,
}

/// Client identity selected from a store, if the store holds one.
pub struct KeyManager {
    identity: Option<StoredKey>,
}

impl KeyManager {
    /// Derive a key manager from `store`, recovering keys with `password`.
    pub fn from_store(store: &Pkcs12Store, password: &str) -> Result<Self> {
        let identity = match store.private_key_entry() {
            Some(identity) => identity,
            None => {
                debug!("no private key entry, client authentication disabled");
                return Ok(Self { identity: None });
            }
        };

        if !store.recovers_with(password) {
            return Err(TlsConfigError::Decode(format!(
                "Private key '{}' cannot be recovered with the keystore password",
                identity.alias
            )));
        }

        if identity.chain.is_empty() {
            return Err(TlsConfigError::Decode(format!(
                "Private key '{}' has no certificate chain",
                identity.alias
            )));
        }

        debug!(alias = %identity.alias, chain_len = identity.chain.len(), "selected client identity");
        Ok(Self {
            identity: Some(identity),
        })
    }

    pub fn has_identity(&self) -> bool {
        self.identity.is_some()
    }

    pub fn alias(&self) -> Option<&str> {
        self.identity.as_ref().map(|identity| identity.alias.as_str())
    }

    pub(crate) fn into_identity(self) -> Option<StoredKey> {
        self.identity
    }
}

impl fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyManager")
            .field("identity", &self.alias())
            .finish()
    }
}
