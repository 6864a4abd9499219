//! TLS-Transport zwischen Client und Relay
//!
//! ## Architektur
//! - Relay: `TlsAcceptor` aus PEM-Zertifikatskette und privatem Schluessel
//! - Client: `TlsConnector` mit WebPKI-Roots, optional zusaetzlicher CA
//!   oder ganz ohne Pruefung (`--insecure`)
//!
//! Beide Seiten sprechen ausschliesslich TLS 1.3 mit dem ring-Provider.

use std::path::Path;
use std::sync::Arc;

use rcgen::{CertificateParams, DistinguishedName, KeyPair as RcgenKeyPair};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use rustls::{ClientConfig, RootCertStore, ServerConfig};
use rustls_pemfile::{certs, private_key};
use tokio_rustls::{TlsAcceptor, TlsConnector};

use crate::error::{CryptoError, CryptoResult};

fn provider() -> Arc<rustls::crypto::CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Erstellt einen Acceptor aus PEM-Daten
pub fn acceptor_aus_pem(zertifikat_pem: &[u8], schluessel_pem: &[u8]) -> CryptoResult<TlsAcceptor> {
    let cert_chain = parse_certificates(zertifikat_pem)?;
    if cert_chain.is_empty() {
        return Err(CryptoError::Tls("Kein Zertifikat gefunden".to_string()));
    }
    let private_key = parse_private_key(schluessel_pem)?;

    let tls_config = ServerConfig::builder_with_provider(provider())
        .with_protocol_versions(&[&rustls::version::TLS13])
        .map_err(|e| CryptoError::Tls(e.to_string()))?
        .with_no_client_auth()
        .with_single_cert(cert_chain, private_key)
        .map_err(|e| CryptoError::Tls(e.to_string()))?;

    Ok(TlsAcceptor::from(Arc::new(tls_config)))
}

/// Erstellt einen Acceptor aus PEM-Dateien
pub fn acceptor_aus_dateien(zertifikat: &Path, schluessel: &Path) -> CryptoResult<TlsAcceptor> {
    let zertifikat_pem = std::fs::read(zertifikat)?;
    let schluessel_pem = std::fs::read(schluessel)?;
    acceptor_aus_pem(&zertifikat_pem, &schluessel_pem)
}

fn parse_certificates(pem: &[u8]) -> CryptoResult<Vec<CertificateDer<'static>>> {
    let mut cursor = std::io::Cursor::new(pem);
    certs(&mut cursor)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CryptoError::Tls(format!("Zertifikat-Parsing fehlgeschlagen: {}", e)))
}

fn parse_private_key(pem: &[u8]) -> CryptoResult<PrivateKeyDer<'static>> {
    let mut cursor = std::io::Cursor::new(pem);
    private_key(&mut cursor)
        .map_err(|e| CryptoError::Tls(format!("Schluessel-Parsing fehlgeschlagen: {}", e)))?
        .ok_or_else(|| CryptoError::Tls("Kein privater Schluessel gefunden".to_string()))
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Wie der Client das Server-Zertifikat prueft
#[derive(Debug, Clone, Default)]
pub enum ServerPruefung {
    /// Nur die WebPKI-Roots
    #[default]
    WebPki,
    /// WebPKI-Roots plus die Zertifikate aus dieser PEM-Datei
    ZusaetzlicheCa(Vec<u8>),
    /// Keine Pruefung (selbstsignierte Relays ohne verteiltes Zertifikat)
    Keine,
}

/// Erstellt einen Connector fuer den Relay
pub fn connector(pruefung: &ServerPruefung) -> CryptoResult<TlsConnector> {
    let builder = ClientConfig::builder_with_provider(provider())
        .with_protocol_versions(&[&rustls::version::TLS13])
        .map_err(|e| CryptoError::Tls(e.to_string()))?;

    let tls_config = match pruefung {
        ServerPruefung::WebPki => builder
            .with_root_certificates(webpki_roots_laden())
            .with_no_client_auth(),
        ServerPruefung::ZusaetzlicheCa(pem) => {
            let mut roots = webpki_roots_laden();
            for cert in parse_certificates(pem)? {
                roots
                    .add(cert)
                    .map_err(|e| CryptoError::Tls(format!("CA-Zertifikat ungueltig: {}", e)))?;
            }
            builder.with_root_certificates(roots).with_no_client_auth()
        }
        ServerPruefung::Keine => {
            tracing::warn!("TLS-Zertifikatspruefung deaktiviert");
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(InsecureCertVerifier))
                .with_no_client_auth()
        }
    };

    Ok(TlsConnector::from(Arc::new(tls_config)))
}

/// Wandelt den Host-Teil einer Adresse in einen TLS-Servernamen um
pub fn server_name(host: &str) -> CryptoResult<ServerName<'static>> {
    ServerName::try_from(host.to_string())
        .map_err(|e| CryptoError::UngueltigerServerName(format!("{host}: {e}")))
}

fn webpki_roots_laden() -> RootCertStore {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    roots
}

/// Akzeptiert jedes Server-Zertifikat
#[derive(Debug)]
struct InsecureCertVerifier;

impl rustls::client::danger::ServerCertVerifier for InsecureCertVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::ED25519,
        ]
    }
}

// ---------------------------------------------------------------------------
// Selbstsignierte Zertifikate
// ---------------------------------------------------------------------------

/// PEM-Paar eines selbstsignierten Zertifikats
#[derive(Debug, Clone)]
pub struct SelbstsigniertesZertifikat {
    pub zertifikat_pem: String,
    pub schluessel_pem: String,
}

/// Generiert ein selbstsigniertes Zertifikat fuer Development/Testing
pub fn selbstsigniertes_zertifikat(hostnamen: &[&str]) -> CryptoResult<SelbstsigniertesZertifikat> {
    let namen: Vec<String> = hostnamen.iter().map(|h| h.to_string()).collect();
    let mut params = CertificateParams::new(namen)
        .map_err(|e| CryptoError::ZertifikatGenerierung(e.to_string()))?;

    let mut distinguished_name = DistinguishedName::new();
    if let Some(erster) = hostnamen.first() {
        distinguished_name.push(rcgen::DnType::CommonName, *erster);
    }
    params.distinguished_name = distinguished_name;

    let key_pair =
        RcgenKeyPair::generate().map_err(|e| CryptoError::ZertifikatGenerierung(e.to_string()))?;
    let cert = params
        .self_signed(&key_pair)
        .map_err(|e| CryptoError::ZertifikatGenerierung(e.to_string()))?;

    Ok(SelbstsigniertesZertifikat {
        zertifikat_pem: cert.pem(),
        schluessel_pem: key_pair.serialize_pem(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
