// Shared connection primitives: dial-address formatting, deadline-bounded TCP
// connect and optional TLS negotiation.

use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{timeout_at, Instant};
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::crypto::{self, CryptoProvider};
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_rustls::rustls::{
    self, ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme,
};
use tokio_rustls::TlsConnector;
use tracing::debug;

use crate::probes::error::{ProbeError, Stage};

/// Certificate validation policy for TLS-wrapped probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsMode {
    #[default]
    Strict,
    Insecure,
}

impl TlsMode {
    pub fn from_option(value: &str) -> Result<Self, ProbeError> {
        match value.to_lowercase().as_str() {
            "strict" => Ok(TlsMode::Strict),
            "insecure" => Ok(TlsMode::Insecure),
            _ => Err(ProbeError::config("tls", value, "expected 'strict' or 'insecure'")),
        }
    }
}

/// Format a host and port as a dial target.
///
/// Any host containing a ':' is taken to be an IPv6 literal and bracketed.
pub fn dial_address(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

pub async fn connect(
    address: &str,
    deadline: Instant,
    after: Duration,
) -> Result<TcpStream, ProbeError> {
    debug!("connecting to {}", address);

    match timeout_at(deadline, TcpStream::connect(address)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(source)) => {
            debug!("connection to {} failed: {}", address, source);
            Err(ProbeError::Connect {
                address: address.to_string(),
                source,
            })
        }
        Err(_) => Err(ProbeError::Timeout {
            stage: Stage::Connect,
            address: address.to_string(),
            after,
        }),
    }
}

/// Run a TLS handshake over an established stream, verifying `host` unless
/// the mode is insecure.
pub async fn negotiate_tls(
    stream: TcpStream,
    host: &str,
    address: &str,
    mode: TlsMode,
    deadline: Instant,
    after: Duration,
) -> Result<TlsStream<TcpStream>, ProbeError> {
    let tls_error = |reason: String| ProbeError::Tls {
        address: address.to_string(),
        reason,
    };

    let config = client_config(mode).map_err(|e| tls_error(e.to_string()))?;
    let server_name = ServerName::try_from(host.to_string())
        .map_err(|e| tls_error(format!("invalid server name {:?}: {}", host, e)))?;
    let connector = TlsConnector::from(Arc::new(config));

    debug!("negotiating tls ({:?}) with {}", mode, address);
    match timeout_at(deadline, connector.connect(server_name, stream)).await {
        Ok(Ok(tls)) => Ok(tls),
        Ok(Err(e)) => Err(tls_error(e.to_string())),
        Err(_) => Err(ProbeError::Timeout {
            stage: Stage::TlsHandshake,
            address: address.to_string(),
            after,
        }),
    }
}

fn client_config(mode: TlsMode) -> Result<ClientConfig, rustls::Error> {
    let provider = Arc::new(crypto::ring::default_provider());
    let builder = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()?;

    let config = match mode {
        TlsMode::Strict => {
            let mut roots = RootCertStore::empty();
            roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            builder.with_root_certificates(roots).with_no_client_auth()
        }
        TlsMode::Insecure => builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(SkipServerVerification(provider)))
            .with_no_client_auth(),
    };
    Ok(config)
}

/// Accepts any certificate chain, but still checks handshake signatures.
#[derive(Debug)]
struct SkipServerVerification(Arc<CryptoProvider>);

impl ServerCertVerifier for SkipServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        let algorithms = &self.0.signature_verification_algorithms;
        crypto::verify_tls12_signature(message, cert, dss, algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        let algorithms = &self.0.signature_verification_algorithms;
        crypto::verify_tls13_signature(message, cert, dss, algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
