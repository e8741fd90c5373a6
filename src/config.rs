use crate::builder::ClientContextBuilder;
use crate::context::ClientContextBuild;
use crate::credentials::CredentialBundle;
use crate::error::{Result, TlsConfigError};
use crate::key_material::KeyMaterialSource;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub tls: TlsClientConfig,
}

/// Locations and passwords of the PKCS#12 stores used for outbound TLS.
#[derive(Clone, Serialize, Deserialize)]
pub struct TlsClientConfig {
    pub keystore_path: PathBuf,
    pub keystore_password: String,
    pub truststore_path: PathBuf,
    pub truststore_password: String,
    #[serde(default)]
    pub key_material: KeyMaterialSource,
}

impl fmt::Debug for TlsClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsClientConfig")
            .field("keystore_path", &self.keystore_path)
            .field("keystore_password", &"<redacted>")
            .field("truststore_path", &self.truststore_path)
            .field("truststore_password", &"<redacted>")
            .field("key_material", &self.key_material)
            .finish()
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TlsConfigError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| TlsConfigError::Configuration(e.to_string()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.tls.validate()
    }

    /// Open the configured stores and build a client context from them.
    pub fn build_context(&self) -> Result<ClientContextBuild> {
        let credentials = self.tls.open_credentials()?;
        self.tls.context_builder().build(credentials)
    }
}

impl TlsClientConfig {
    pub fn validate(&self) -> Result<()> {
        if self.keystore_path.as_os_str().is_empty() {
            return Err(TlsConfigError::Configuration(
                "tls.keystore_path cannot be empty".to_string(),
            ));
        }

        if self.truststore_path.as_os_str().is_empty() {
            return Err(TlsConfigError::Configuration(
                "tls.truststore_path cannot be empty".to_string(),
            ));
        }

        if self.keystore_password.trim().is_empty() {
            return Err(TlsConfigError::Configuration(
                "tls.keystore_password cannot be empty".to_string(),
            ));
        }

        if self.truststore_password.trim().is_empty() {
            return Err(TlsConfigError::Configuration(
                "tls.truststore_password cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate, then open both store files as a credential bundle.
    pub fn open_credentials(&self) -> Result<CredentialBundle> {
        self.validate()?;

        let keystore = open_store(&self.keystore_path, "keystore")?;
        let truststore = open_store(&self.truststore_path, "truststore")?;

        CredentialBundle::new(
            keystore,
            &self.keystore_password,
            truststore,
            &self.truststore_password,
        )
    }

    pub fn context_builder(&self) -> ClientContextBuilder {
        ClientContextBuilder::new().key_material(self.key_material)
    }
}

fn open_store(path: &Path, label: &str) -> Result<BufReader<File>> {
    let file = File::open(path).map_err(|e| {
        TlsConfigError::Configuration(format!("Failed to open {} at {}: {}", label, path.display(), e))
    })?;
    debug!(store = label, path = %path.display(), "opened store file");
    Ok(BufReader::new(file))
}
