use anyhow::Result;
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DistinguishedName, DnType,
    ExtendedKeyUsagePurpose, IsCa, KeyPair,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use trickle_server::TlsMaterial;

/// A throwaway CA plus server and client certificates for `localhost` and `127.0.0.1`,
/// written as PEM files that live as long as the value.
pub struct TestPki {
    _dir: TempDir,
    pub ca_cert: PathBuf,
    pub server_cert: PathBuf,
    pub server_key: PathBuf,
    pub client_cert: PathBuf,
    pub client_key: PathBuf,
}

impl TestPki {
    pub fn generate() -> Result<Self> {
        let dir = tempfile::tempdir()?;

        let ca_key = KeyPair::generate()?;
        let mut ca_params = CertificateParams::new(Vec::<String>::new())?;
        ca_params.distinguished_name = common_name("trickle test CA");
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        let ca = ca_params.self_signed(&ca_key)?;

        let ca_cert = dir.path().join("ca.pem");
        std::fs::write(&ca_cert, ca.pem())?;

        let (server_cert, server_key) = issue(dir.path(), "server", &ca, &ca_key)?;
        let (client_cert, client_key) = issue(dir.path(), "client", &ca, &ca_key)?;

        Ok(Self {
            _dir: dir,
            ca_cert,
            server_cert,
            server_key,
            client_cert,
            client_key,
        })
    }

    /// Material for a process that serves and sends over mutual TLS.
    pub fn mutual_tls(&self) -> TlsMaterial {
        TlsMaterial {
            ca_cert: Some(self.ca_cert.clone()),
            client_cert: Some(self.client_cert.clone()),
            client_key: Some(self.client_key.clone()),
            server_cert: Some(self.server_cert.clone()),
            server_key: Some(self.server_key.clone()),
            require_client_cert: true,
        }
    }
}

fn common_name(name: &str) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, name);
    dn
}

fn issue(dir: &Path, name: &str, ca: &Certificate, ca_key: &KeyPair) -> Result<(PathBuf, PathBuf)> {
    let key = KeyPair::generate()?;
    let mut params = CertificateParams::new(vec!["localhost".to_owned(), "127.0.0.1".to_owned()])?;
    params.distinguished_name = common_name(&format!("trickle test {name}"));
    params.extended_key_usages = vec![
        ExtendedKeyUsagePurpose::ServerAuth,
        ExtendedKeyUsagePurpose::ClientAuth,
    ];
    let cert = params.signed_by(&key, ca, ca_key)?;

    let cert_path = dir.join(format!("{name}.pem"));
    let key_path = dir.join(format!("{name}.key"));
    std::fs::write(&cert_path, cert.pem())?;
    std::fs::write(&key_path, key.serialize_pem())?;
    Ok((cert_path, key_path))
}
