//! TLS Context Builder
//!
//! Turns a [`CredentialBundle`] into a TLS 1.2 client context:
//!
//! 1. decode the truststore stream as PKCS#12
//! 2. derive the trust manager from it
//! 3. derive the key manager, by default from the same decoded truststore
//! 4. assemble a rustls client configuration restricted to TLS 1.2
//!
//! Both input streams are released before `build` returns, on success and on
//! every error path.

use crate::context::{ClientContextBuild, TlsContext};
use crate::credentials::{CredentialBundle, StoreStream};
use crate::error::{Result, TlsConfigError};
use crate::key_material::{KeyManager, KeyMaterialSource};
use crate::keystore::Pkcs12Store;
use crate::trust::TrustManager;

use std::io::Read;
use std::sync::Arc;
use rustls::crypto::CryptoProvider;
use rustls::{ClientConfig, ProtocolVersion};
use tracing::{debug, info, trace};

/// Builds client contexts from credential bundles.
///
/// The builder holds no state between builds; every call produces a new,
/// independent context.
#[derive(Debug, Clone)]
pub struct ClientContextBuilder {
    key_material: KeyMaterialSource,
    provider: Arc<CryptoProvider>,
}

impl Default for ClientContextBuilder {
    fn default() -> Self {
        Self {
            key_material: KeyMaterialSource::default(),
            provider: Arc::new(rustls::crypto::ring::default_provider()),
        }
    }
}

impl ClientContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_material(mut self, source: KeyMaterialSource) -> Self {
        self.key_material = source;
        self
    }

    pub fn crypto_provider(mut self, provider: Arc<CryptoProvider>) -> Self {
        self.provider = provider;
        self
    }

    /// Build a context, consuming the bundle and releasing its streams.
    pub fn build(&self, credentials: CredentialBundle) -> Result<ClientContextBuild> {
        let CredentialBundle {
            keystore,
            keystore_password,
            truststore,
            truststore_password,
        } = credentials;

        let mut streams = StoreStreams {
            keystore,
            truststore,
        };

        let result = self.assemble(&mut streams, &keystore_password, &truststore_password);
        streams.release();

        if let Err(e) = &result {
            debug!(error = %e, "failed to build TLS client context");
        }
        result
    }

    fn assemble(
        &self,
        streams: &mut StoreStreams,
        keystore_password: &str,
        truststore_password: &str,
    ) -> Result<ClientContextBuild> {
        let trust_store = Pkcs12Store::decode(&mut streams.truststore, truststore_password, "truststore")?;
        let trust_manager = TrustManager::from_store(&trust_store, self.provider.clone())?;

        let key_manager = match self.key_material {
            KeyMaterialSource::SharedWithTruststore => {
                debug!("deriving key material from the truststore");
                KeyManager::from_store(&trust_store, keystore_password)?
            }
            KeyMaterialSource::Keystore => {
                let key_store = Pkcs12Store::decode(&mut streams.keystore, keystore_password, "keystore")?;
                KeyManager::from_store(&key_store, keystore_password)?
            }
        };

        let builder = ClientConfig::builder_with_provider(self.provider.clone())
            .with_protocol_versions(&[&rustls::version::TLS12])
            .map_err(|e| {
                TlsConfigError::CryptoInit(format!("TLS 1.2 is not available from the crypto provider: {}", e))
            })?
            .with_webpki_verifier(trust_manager.verifier());

        let client_identity = key_manager.alias().map(str::to_string);
        let config = match key_manager.into_identity() {
            Some(identity) => builder
                .with_client_auth_cert(identity.chain, identity.key)
                .map_err(|e| {
                    TlsConfigError::CryptoInit(format!("Failed to configure client certificate: {}", e))
                })?,
            None => builder.with_no_client_auth(),
        };

        let context = TlsContext::new(
            config,
            ProtocolVersion::TLSv1_2,
            client_identity,
            trust_manager.trust_anchor_count(),
        );

        info!(
            protocol = context.protocol_name(),
            trust_anchors = context.trust_anchor_count(),
            client_auth = context.has_client_identity(),
            "built TLS client context"
        );

        Ok(ClientContextBuild {
            context,
            trust_manager,
        })
    }
}

/// Owns both input streams for the duration of a build.
struct StoreStreams {
    keystore: StoreStream,
    truststore: StoreStream,
}

impl StoreStreams {
    fn release(self) {
        let StoreStreams {
            keystore,
            truststore,
        } = self;

        drop(truststore);
        trace!(store = "truststore", "released store stream");
        drop(keystore);
        trace!(store = "keystore", "released store stream");
    }
}

/// Build a TLS client context with the default builder settings.
///
/// Blank passwords fail with a configuration error before either stream is
/// read. Both streams are released before this returns.
pub fn build_client_context<K, T>(
    keystore: K,
    keystore_password: &str,
    truststore: T,
    truststore_password: &str,
) -> Result<ClientContextBuild>
where
    K: Read + Send + 'static,
    T: Read + Send + 'static,
{
    let credentials = CredentialBundle::new(keystore, keystore_password, truststore, truststore_password)?;
    ClientContextBuilder::new().build(credentials)
}
