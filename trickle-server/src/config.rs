use crate::error::NegotiationError;
use crate::transport::TransportConfig;
use rustls::RootCertStore;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_SEND_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl FromStr for Scheme {
    type Err = NegotiationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            other => Err(NegotiationError::ConfigurationFailure(format!(
                "unsupported scheme {other:?}"
            ))),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => f.write_str("http"),
            Self::Https => f.write_str("https"),
        }
    }
}

/// PEM files for HTTPS signaling.
///
/// `ca_cert` is trusted by the outbound client and, with `require_client_cert`,
/// verifies the certificates of inbound clients. Each cert/key pair must be
/// given together; the listener speaks TLS once `server_cert` and `server_key` are set.
#[derive(Debug, Clone, Default)]
pub struct TlsMaterial {
    pub ca_cert: Option<PathBuf>,
    pub client_cert: Option<PathBuf>,
    pub client_key: Option<PathBuf>,
    pub server_cert: Option<PathBuf>,
    pub server_key: Option<PathBuf>,
    pub require_client_cert: bool,
}

impl TlsMaterial {
    fn apply(
        &self,
        mut builder: reqwest::ClientBuilder,
    ) -> Result<reqwest::ClientBuilder, NegotiationError> {
        if let Some(ca_path) = &self.ca_cert {
            let pem = read_pem(ca_path)?;
            let ca = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                NegotiationError::ConfigurationFailure(format!(
                    "invalid CA certificate {}: {e}",
                    ca_path.display()
                ))
            })?;
            builder = builder.add_root_certificate(ca);
        }

        if let Some((cert_path, key_path)) = pair("client", &self.client_cert, &self.client_key)? {
            let mut pem = read_pem(cert_path)?;
            pem.push(b'\n');
            pem.extend(read_pem(key_path)?);
            let identity = reqwest::Identity::from_pem(&pem).map_err(|e| {
                NegotiationError::ConfigurationFailure(format!("invalid client identity: {e}"))
            })?;
            builder = builder.identity(identity);
        }

        Ok(builder)
    }

    /// rustls settings for the inbound listener, or `None` when it serves plain HTTP.
    pub fn server_config(&self) -> Result<Option<Arc<rustls::ServerConfig>>, NegotiationError> {
        let Some((cert_path, key_path)) = pair("server", &self.server_cert, &self.server_key)?
        else {
            if self.require_client_cert {
                return Err(NegotiationError::ConfigurationFailure(
                    "client certificates can only be required on a TLS listener".to_owned(),
                ));
            }
            return Ok(None);
        };

        let chain = CertificateDer::pem_file_iter(cert_path)
            .and_then(|certs| certs.collect::<Result<Vec<_>, _>>())
            .map_err(|e| pem_error(cert_path, e))?;
        if chain.is_empty() {
            return Err(NegotiationError::ConfigurationFailure(format!(
                "no certificate found in {}",
                cert_path.display()
            )));
        }
        let key = PrivateKeyDer::from_pem_file(key_path).map_err(|e| pem_error(key_path, e))?;

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let builder = rustls::ServerConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()
            .map_err(tls_error)?;

        let builder = if self.require_client_cert {
            let Some(ca_path) = &self.ca_cert else {
                return Err(NegotiationError::ConfigurationFailure(
                    "requiring client certificates needs a CA certificate".to_owned(),
                ));
            };
            let mut roots = RootCertStore::empty();
            for cert in CertificateDer::pem_file_iter(ca_path).map_err(|e| pem_error(ca_path, e))? {
                roots
                    .add(cert.map_err(|e| pem_error(ca_path, e))?)
                    .map_err(tls_error)?;
            }
            let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider)
                .build()
                .map_err(tls_error)?;
            builder.with_client_cert_verifier(verifier)
        } else {
            builder.with_no_client_auth()
        };

        let mut config = builder.with_single_cert(chain, key).map_err(tls_error)?;
        config.alpn_protocols = vec![b"http/1.1".to_vec()];
        Ok(Some(Arc::new(config)))
    }
}

fn pair<'a>(
    what: &str,
    cert: &'a Option<PathBuf>,
    key: &'a Option<PathBuf>,
) -> Result<Option<(&'a PathBuf, &'a PathBuf)>, NegotiationError> {
    match (cert, key) {
        (Some(cert), Some(key)) => Ok(Some((cert, key))),
        (None, None) => Ok(None),
        _ => Err(NegotiationError::ConfigurationFailure(format!(
            "{what} certificate and key must be provided together"
        ))),
    }
}

fn pem_error(path: &Path, e: impl fmt::Display) -> NegotiationError {
    NegotiationError::ConfigurationFailure(format!("cannot load {}: {e}", path.display()))
}

fn tls_error(e: impl fmt::Display) -> NegotiationError {
    NegotiationError::ConfigurationFailure(format!("invalid TLS settings: {e}"))
}

fn read_pem(path: &PathBuf) -> Result<Vec<u8>, NegotiationError> {
    std::fs::read(path).map_err(|e| {
        NegotiationError::ConfigurationFailure(format!("cannot read {}: {e}", path.display()))
    })
}

/// Settings shared by every connection of one process.
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    pub listen_addr: SocketAddr,
    pub scheme: Scheme,
    pub send_interval: Duration,
    pub request_timeout: Duration,
    pub tls: Option<TlsMaterial>,
    pub transport: TransportConfig,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            scheme: Scheme::default(),
            send_interval: DEFAULT_SEND_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            tls: None,
            transport: TransportConfig::default(),
        }
    }
}

impl SignalingConfig {
    /// Base URL of a remote signaling listener. Addresses that already carry a scheme are kept.
    pub fn base_url(&self, remote_addr: &str) -> String {
        let remote_addr = remote_addr.trim_end_matches('/');
        if remote_addr.starts_with("http://") || remote_addr.starts_with("https://") {
            remote_addr.to_owned()
        } else {
            format!("{}://{}", self.scheme, remote_addr)
        }
    }

    /// rustls settings for the inbound listener, or `None` for plain HTTP.
    pub fn listener_tls(&self) -> Result<Option<Arc<rustls::ServerConfig>>, NegotiationError> {
        match &self.tls {
            Some(tls) => tls.server_config(),
            None => Ok(None),
        }
    }

    pub fn http_client(&self) -> Result<reqwest::Client, NegotiationError> {
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(self.request_timeout);
        if let Some(tls) = &self.tls {
            builder = tls.apply(builder)?;
        }
        builder.build().map_err(|e| {
            NegotiationError::ConfigurationFailure(format!("cannot build HTTP client: {e}"))
        })
    }
}

pub fn parse_socket_addr(addr: &str) -> Result<SocketAddr, NegotiationError> {
    addr.parse().map_err(|e| {
        NegotiationError::ConfigurationFailure(format!("invalid socket address {addr:?}: {e}"))
    })
}
