//! TLS 1.2 client contexts from PKCS#12 keystores and truststores.
//!
//! The entry point is [`build_client_context`], or [`ClientContextBuilder`]
//! when the key material source or crypto provider needs to be chosen.

pub mod builder;
pub mod config;
pub mod context;
pub mod credentials;
pub mod error;
pub mod key_material;
pub mod keystore;
pub mod trust;

pub use builder::{build_client_context, ClientContextBuilder};
pub use config::{Config, TlsClientConfig};
pub use context::{ClientContextBuild, TlsContext};
pub use credentials::{CredentialBundle, CredentialBundleBuilder, StoreStream};
pub use error::{ErrorKind, Result, TlsConfigError};
pub use key_material::{KeyManager, KeyMaterialSource};
pub use keystore::Pkcs12Store;
pub use trust::TrustManager;
