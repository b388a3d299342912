//! TLS configuration and certificate loading.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::{VerifierBuilderError, WebPkiClientVerifier};
use rustls::{RootCertStore, ServerConfig};

use crate::config::TlsConfig;

/// Error type for TLS material loading.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no certificates found in {}", .0.display())]
    NoCertificates(PathBuf),

    #[error("no private key found in {}", .0.display())]
    NoPrivateKey(PathBuf),

    #[error("client verification requested but no CA bundle configured")]
    MissingCa,

    #[error("invalid TLS material: {0}")]
    Rustls(#[from] rustls::Error),

    #[error("invalid client CA bundle: {0}")]
    Verifier(#[from] VerifierBuilderError),
}

fn open(path: &Path) -> Result<BufReader<File>, TlsError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| TlsError::Read {
            path: path.to_path_buf(),
            source,
        })
}

/// Load every certificate from a PEM file.
pub fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let certs = rustls_pemfile::certs(&mut open(path)?)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TlsError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    if certs.is_empty() {
        return Err(TlsError::NoCertificates(path.to_path_buf()));
    }
    Ok(certs)
}

/// Load the first private key (PKCS#1, PKCS#8 or SEC1) from a PEM file.
pub fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, TlsError> {
    rustls_pemfile::private_key(&mut open(path)?)
        .map_err(|source| TlsError::Read {
            path: path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| TlsError::NoPrivateKey(path.to_path_buf()))
}

/// Build the listener's rustls configuration.
///
/// With a CA bundle, clients are verified against it; `verify_peer` decides
/// whether a client certificate is mandatory. Only HTTP/1.1 is offered.
pub fn load_server_config(config: &TlsConfig) -> Result<Arc<ServerConfig>, TlsError> {
    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());

    let certs = load_certs(&config.cert_path)?;
    let key = load_private_key(&config.key_path)?;

    let builder = ServerConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()?;

    let builder = match &config.ca_path {
        Some(ca_path) => {
            let mut roots = RootCertStore::empty();
            for cert in load_certs(ca_path)? {
                roots.add(cert)?;
            }

            let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider);
            let verifier = if config.verify_peer {
                verifier.build()?
            } else {
                verifier.allow_unauthenticated().build()?
            };
            builder.with_client_cert_verifier(verifier)
        }
        None if config.verify_peer => return Err(TlsError::MissingCa),
        None => {
            tracing::warn!("No client CA configured, client certificates are not verified");
            builder.with_no_client_auth()
        }
    };

    let mut server_config = builder.with_single_cert(certs, key)?;
    server_config.alpn_protocols = vec![b"http/1.1".to_vec()];

    tracing::info!(
        cert = %config.cert_path.display(),
        client_auth = config.ca_path.is_some(),
        verify_peer = config.verify_peer,
        "TLS configuration loaded"
    );

    Ok(Arc::new(server_config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct Material {
        _dir: tempfile::TempDir,
        cert: PathBuf,
        key: PathBuf,
    }

    fn self_signed() -> Material {
        let dir = tempfile::tempdir().unwrap();
        let generated = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let cert = dir.path().join("cert.pem");
        let key = dir.path().join("key.pem");
        fs::write(&cert, generated.cert.pem()).unwrap();
        fs::write(&key, generated.key_pair.serialize_pem()).unwrap();
        Material { _dir: dir, cert, key }
    }

    fn tls_config(material: &Material, ca: Option<&Path>, verify_peer: bool) -> TlsConfig {
        TlsConfig {
            cert_path: material.cert.clone(),
            key_path: material.key.clone(),
            ca_path: ca.map(Path::to_path_buf),
            verify_peer,
        }
    }

    #[test]
    fn loads_with_client_verification() {
        let material = self_signed();
        let config = tls_config(&material, Some(&material.cert), true);
        let server = load_server_config(&config).unwrap();
        assert_eq!(server.alpn_protocols, vec![b"http/1.1".to_vec()]);
    }

    #[test]
    fn loads_without_client_auth() {
        let material = self_signed();
        assert!(load_server_config(&tls_config(&material, None, false)).is_ok());
    }

    #[test]
    fn verify_peer_needs_ca() {
        let material = self_signed();
        assert!(matches!(
            load_server_config(&tls_config(&material, None, true)),
            Err(TlsError::MissingCa)
        ));
    }

    #[test]
    fn missing_cert_file() {
        let material = self_signed();
        let mut config = tls_config(&material, None, false);
        config.cert_path = PathBuf::from("/nonexistent/cert.pem");
        let err = load_server_config(&config).unwrap_err();
        assert!(matches!(err, TlsError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/cert.pem"));
    }

    #[test]
    fn key_file_without_key() {
        let material = self_signed();
        let mut config = tls_config(&material, None, false);
        // A certificate is not a key.
        config.key_path = material.cert.clone();
        assert!(matches!(
            load_server_config(&config),
            Err(TlsError::NoPrivateKey(_))
        ));
    }

    #[test]
    fn empty_cert_file() {
        let material = self_signed();
        let empty = material._dir.path().join("empty.pem");
        fs::write(&empty, "").unwrap();
        assert!(matches!(load_certs(&empty), Err(TlsError::NoCertificates(_))));
    }
}
