//! keystore-tls-check - build a TLS client context from a configuration file
//!
//! Loads the PKCS#12 stores named in the configuration, builds the client
//! context and prints what it contains. Optionally checks a server
//! certificate against the resulting trust manager.

use anyhow::{Context, Result};
use clap::Parser;
use keystore_tls::{Config, KeyMaterialSource};
use rustls::pki_types::{CertificateDer, ServerName};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "keystore-tls-check")]
#[command(about = "Build a TLS 1.2 client context from PKCS#12 stores and report on it")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config/tls.toml")]
    config: PathBuf,

    /// Override the configured key material source
    #[arg(long, value_enum)]
    key_material: Option<KeyMaterialArg>,

    /// DER-encoded server certificate to check against the trust manager
    #[arg(long, requires = "server_name")]
    server_cert: Option<PathBuf>,

    /// Server name the certificate must be valid for
    #[arg(long)]
    server_name: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum KeyMaterialArg {
    Shared,
    Keystore,
}

impl From<KeyMaterialArg> for KeyMaterialSource {
    fn from(arg: KeyMaterialArg) -> Self {
        match arg {
            KeyMaterialArg::Shared => KeyMaterialSource::SharedWithTruststore,
            KeyMaterialArg::Keystore => KeyMaterialSource::Keystore,
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(cli: &Cli) -> Result<()> {
    info!("Loading configuration from: {}", cli.config.display());
    let mut config = Config::from_file(&cli.config)?;
    if let Some(source) = cli.key_material {
        config.tls.key_material = source.into();
    }

    let build = config.build_context()?;
    let context = &build.context;

    println!("protocol:        {}", context.protocol_name());
    println!("trust anchors:   {}", context.trust_anchor_count());
    println!(
        "client identity: {}",
        context.client_identity().unwrap_or("none")
    );

    if let (Some(cert_path), Some(server_name)) = (&cli.server_cert, &cli.server_name) {
        let der = std::fs::read(cert_path)
            .with_context(|| format!("reading server certificate {}", cert_path.display()))?;
        let name = ServerName::try_from(server_name.as_str())
            .with_context(|| format!("invalid server name {}", server_name))?;

        match build
            .trust_manager
            .verify_server_cert(&CertificateDer::from(der), &[], &name)
        {
            Ok(_) => println!("server cert:     trusted for {}", server_name),
            Err(e) => {
                println!("server cert:     rejected ({})", e);
                anyhow::bail!("server certificate is not trusted");
            }
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CONFIG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/config/tls.toml");
    const SERVER_DER: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/server.der");
    const ROGUE_SERVER_DER: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/rogue_server.der");

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::try_parse_from(["keystore-tls-check"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("config/tls.toml"));
        assert!(cli.key_material.is_none());
        assert!(cli.server_cert.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_server_cert_requires_server_name() {
        assert!(Cli::try_parse_from(["keystore-tls-check", "--server-cert", SERVER_DER]).is_err());
    }

    #[test]
    fn test_key_material_override() {
        let cli = Cli::try_parse_from(["keystore-tls-check", "--key-material", "keystore"]).unwrap();
        let source: KeyMaterialSource = cli.key_material.unwrap().into();
        assert_eq!(source, KeyMaterialSource::Keystore);
    }

    #[test]
    fn test_run_with_sample_config() {
        let cli = Cli::try_parse_from(["keystore-tls-check", "--config", SAMPLE_CONFIG]).unwrap();
        run(&cli).unwrap();
    }

    #[test]
    fn test_run_checks_server_certificate() {
        let trusted = Cli::try_parse_from([
            "keystore-tls-check",
            "--config",
            SAMPLE_CONFIG,
            "--server-cert",
            SERVER_DER,
            "--server-name",
            "localhost",
        ])
        .unwrap();
        run(&trusted).unwrap();

        let rogue = Cli::try_parse_from([
            "keystore-tls-check",
            "--config",
            SAMPLE_CONFIG,
            "--server-cert",
            ROGUE_SERVER_DER,
            "--server-name",
            "localhost",
        ])
        .unwrap();
        assert!(run(&rogue).is_err());
    }

    #[test]
    fn test_run_missing_config() {
        let cli = Cli::try_parse_from(["keystore-tls-check", "--config", "does/not/exist.toml"]).unwrap();
        assert!(run(&cli).is_err());
    }
}
