//! In-memory handshake tests
//!
//! Drives a rustls server against contexts built from PKCS#12 fixtures to
//! check the negotiated protocol and client authentication end to end.

use keystore_tls::{build_client_context, ClientContextBuilder, CredentialBundle, KeyMaterialSource};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer, ServerName};
use rustls::server::WebPkiClientVerifier;
use rustls::{ClientConnection, ProtocolVersion, RootCertStore, ServerConfig, ServerConnection};
use std::io::Cursor;
use std::sync::Arc;

const VALID_P12: &[u8] = include_bytes!("fixtures/valid.p12");
const TRUSTSTORE_P12: &[u8] = include_bytes!("fixtures/truststore.p12");
const CLIENT_P12: &[u8] = include_bytes!("fixtures/client.p12");
const CA_DER: &[u8] = include_bytes!("fixtures/ca.der");
const SERVER_DER: &[u8] = include_bytes!("fixtures/server.der");
const SERVER_KEY_DER: &[u8] = include_bytes!("fixtures/server.key.der");
const ROGUE_SERVER_DER: &[u8] = include_bytes!("fixtures/rogue_server.der");
const ROGUE_SERVER_KEY_DER: &[u8] = include_bytes!("fixtures/rogue_server.key.der");

fn provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

fn server_key() -> PrivateKeyDer<'static> {
    PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(SERVER_KEY_DER.to_vec()))
}

fn server_config(require_client_cert: bool) -> Arc<ServerConfig> {
    let builder = ServerConfig::builder_with_provider(provider())
        .with_safe_default_protocol_versions()
        .unwrap();

    let builder = if require_client_cert {
        let mut roots = RootCertStore::empty();
        roots.add(CertificateDer::from(CA_DER.to_vec())).unwrap();
        let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider())
            .build()
            .unwrap();
        builder.with_client_cert_verifier(verifier)
    } else {
        builder.with_no_client_auth()
    };

    Arc::new(
        builder
            .with_single_cert(vec![CertificateDer::from(SERVER_DER.to_vec())], server_key())
            .unwrap(),
    )
}

/// Shuttle TLS records between the two ends until both finish handshaking.
fn handshake(client: &mut ClientConnection, server: &mut ServerConnection) -> Result<(), rustls::Error> {
    for _ in 0..16 {
        let mut to_server = Vec::new();
        while client.wants_write() {
            client.write_tls(&mut to_server).unwrap();
        }
        let mut pending = &to_server[..];
        while !pending.is_empty() {
            server.read_tls(&mut pending).unwrap();
            server.process_new_packets()?;
        }

        let mut to_client = Vec::new();
        while server.wants_write() {
            server.write_tls(&mut to_client).unwrap();
        }
        let mut pending = &to_client[..];
        while !pending.is_empty() {
            client.read_tls(&mut pending).unwrap();
            client.process_new_packets()?;
        }

        if !client.is_handshaking() && !server.is_handshaking() {
            return Ok(());
        }
    }
    panic!("handshake did not complete");
}

fn connect(
    client_config: Arc<rustls::ClientConfig>,
    server_config: Arc<ServerConfig>,
) -> (ClientConnection, ServerConnection, Result<(), rustls::Error>) {
    let name = ServerName::try_from("localhost").unwrap();
    let mut client = ClientConnection::new(client_config, name).unwrap();
    let mut server = ServerConnection::new(server_config).unwrap();
    let result = handshake(&mut client, &mut server);
    (client, server, result)
}

#[test]
fn test_negotiates_tls12_against_tls13_capable_server() {
    let build = build_client_context(
        Cursor::new(VALID_P12),
        "changeit",
        Cursor::new(VALID_P12),
        "changeit",
    )
    .unwrap();

    let (client, server, result) = connect(build.context.client_config(), server_config(false));
    result.unwrap();

    assert_eq!(client.protocol_version(), Some(ProtocolVersion::TLSv1_2));
    assert_eq!(server.protocol_version(), Some(ProtocolVersion::TLSv1_2));
}

#[test]
fn test_presents_client_certificate_from_keystore() {
    let credentials = CredentialBundle::new(
        Cursor::new(CLIENT_P12),
        "clientpass",
        Cursor::new(TRUSTSTORE_P12),
        "changeit",
    )
    .unwrap();
    let build = ClientContextBuilder::new()
        .key_material(KeyMaterialSource::Keystore)
        .build(credentials)
        .unwrap();

    let (_client, server, result) = connect(build.context.client_config(), server_config(true));
    result.unwrap();

    let peer = server.peer_certificates().unwrap();
    assert!(!peer.is_empty());
}

#[test]
fn test_rejects_server_outside_truststore() {
    let build = build_client_context(
        Cursor::new(VALID_P12),
        "changeit",
        Cursor::new(TRUSTSTORE_P12),
        "changeit",
    )
    .unwrap();

    let rogue = ServerConfig::builder_with_provider(provider())
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(
            vec![CertificateDer::from(ROGUE_SERVER_DER.to_vec())],
            PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(ROGUE_SERVER_KEY_DER.to_vec())),
        )
        .unwrap();

    let (_client, _server, result) = connect(build.context.client_config(), Arc::new(rogue));
    assert!(matches!(result, Err(rustls::Error::InvalidCertificate(_))));
}
