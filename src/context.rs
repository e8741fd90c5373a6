//! TLS Client Context
//!
//! The artifact produced by a build: a TLS 1.2 only rustls client
//! configuration plus a summary of the key and trust material inside it.

use crate::trust::TrustManager;

use std::fmt;
use std::sync::Arc;
use rustls::{ClientConfig, ProtocolVersion};

/// A ready-to-use TLS client context.
///
/// Cloning shares the underlying rustls configuration.
#[derive(Clone)]
pub struct TlsContext {
    config: Arc<ClientConfig>,
    protocol: ProtocolVersion,
    client_identity: Option<String>,
    trust_anchors: usize,
}

impl TlsContext {
    pub(crate) fn new(
        config: ClientConfig,
        protocol: ProtocolVersion,
        client_identity: Option<String>,
        trust_anchors: usize,
    ) -> Self {
        Self {
            config: Arc::new(config),
            protocol,
            client_identity,
            trust_anchors,
        }
    }

    /// Configuration to hand to a rustls client connection or connector.
    pub fn client_config(&self) -> Arc<ClientConfig> {
        self.config.clone()
    }

    /// The single protocol version this context will negotiate.
    pub fn protocol(&self) -> ProtocolVersion {
        self.protocol
    }

    pub fn protocol_name(&self) -> &'static str {
        match self.protocol {
            ProtocolVersion::TLSv1_2 => "TLSv1.2",
            ProtocolVersion::TLSv1_3 => "TLSv1.3",
            _ => "unknown",
        }
    }

    pub fn has_client_identity(&self) -> bool {
        self.client_identity.is_some()
    }

    /// Alias of the private key entry presented for client authentication.
    pub fn client_identity(&self) -> Option<&str> {
        self.client_identity.as_deref()
    }

    pub fn trust_anchor_count(&self) -> usize {
        self.trust_anchors
    }
}

impl fmt::Debug for TlsContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsContext")
            .field("protocol", &self.protocol_name())
            .field("client_identity", &self.client_identity)
            .field("trust_anchors", &self.trust_anchors)
            .finish()
    }
}

/// Result of a context build: the context and the trust manager it uses.
#[derive(Debug, Clone)]
pub struct ClientContextBuild {
    pub context: TlsContext,
    pub trust_manager: TrustManager,
}

impl ClientContextBuild {
    pub fn into_parts(self) -> (TlsContext, TrustManager) {
        (self.context, self.trust_manager)
    }
}
