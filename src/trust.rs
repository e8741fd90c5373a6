//! Trust Manager
//!
//! Builds the server certificate verifier from the certificates of a decoded
//! store. The same verifier instance is installed in the client context and
//! handed back to the caller.

use crate::error::{Result, TlsConfigError};
use crate::keystore::Pkcs12Store;

use std::fmt;
use std::sync::Arc;
use rustls::client::danger::{ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::RootCertStore;
use tracing::debug;

/// Handle on the trust material used by a built context.
#[derive(Clone)]
pub struct TrustManager {
    roots: Arc<RootCertStore>,
    verifier: Arc<WebPkiServerVerifier>,
}

impl TrustManager {
    /// Derive a trust manager from every trusted certificate in `store`.
    pub fn from_store(store: &Pkcs12Store, provider: Arc<CryptoProvider>) -> Result<Self> {
        let mut roots = RootCertStore::empty();

        for cert in store.trusted_certificates() {
            roots.add(cert).map_err(|e| {
                TlsConfigError::Decode(format!("Failed to parse trusted certificate: {}", e))
            })?;
        }

        debug!(anchors = roots.len(), "loaded trust anchors");

        let roots = Arc::new(roots);
        let verifier = WebPkiServerVerifier::builder_with_provider(roots.clone(), provider)
            .build()
            .map_err(|e| {
                TlsConfigError::CryptoInit(format!("Failed to build server certificate verifier: {}", e))
            })?;

        Ok(Self { roots, verifier })
    }

    /// The verifier installed in the client context.
    pub fn verifier(&self) -> Arc<WebPkiServerVerifier> {
        self.verifier.clone()
    }

    pub fn roots(&self) -> &RootCertStore {
        &self.roots
    }

    pub fn trust_anchor_count(&self) -> usize {
        self.roots.len()
    }

    /// Check a server certificate chain against the trust anchors, as the
    /// handshake would at the current time.
    pub fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        self.verifier
            .verify_server_cert(end_entity, intermediates, server_name, &[], UnixTime::now())
    }
}

impl fmt::Debug for TrustManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustManager")
            .field("trust_anchors", &self.roots.len())
            .finish()
    }
}
