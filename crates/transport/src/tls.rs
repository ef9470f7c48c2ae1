//! TLS setup
//!
//! rustls is used as an opaque stream wrapper: clients trust the webpki roots
//! plus an optional extra CA file, servers load a PEM certificate chain and
//! private key.

use std::path::Path;
use std::sync::Arc;

use syslane_config::{TlsClientConfig, TlsServerConfig};
use tokio_rustls::rustls::crypto::{CryptoProvider, aws_lc_rs};
use tokio_rustls::rustls::pki_types::pem::PemObject;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use tokio_rustls::rustls::{ClientConfig, RootCertStore, ServerConfig};
use tokio_rustls::{TlsAcceptor, TlsConnector};

use crate::{Result, TransportError};

fn provider() -> Arc<CryptoProvider> {
    Arc::new(aws_lc_rs::default_provider())
}

/// Build a client connector
pub fn client_connector(config: &TlsClientConfig) -> Result<TlsConnector> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    if let Some(path) = &config.ca_file {
        for cert in load_certs(path)? {
            roots.add(cert).map_err(|e| {
                TransportError::tls(format!("bad CA certificate in {}: {e}", path.display()))
            })?;
        }
    }

    let client = ClientConfig::builder_with_provider(provider())
        .with_safe_default_protocol_versions()
        .map_err(TransportError::tls)?
        .with_root_certificates(roots)
        .with_no_client_auth();

    Ok(TlsConnector::from(Arc::new(client)))
}

/// Build a server acceptor from PEM files
pub fn server_acceptor(config: &TlsServerConfig) -> Result<TlsAcceptor> {
    let certs = load_certs(&config.cert_file)?;
    if certs.is_empty() {
        return Err(TransportError::tls(format!(
            "no certificates in {}",
            config.cert_file.display()
        )));
    }

    let key = PrivateKeyDer::from_pem_file(&config.key_file).map_err(|e| {
        TransportError::tls(format!(
            "failed to load private key {}: {e}",
            config.key_file.display()
        ))
    })?;

    let server = ServerConfig::builder_with_provider(provider())
        .with_safe_default_protocol_versions()
        .map_err(TransportError::tls)?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(TransportError::tls)?;

    Ok(TlsAcceptor::from(Arc::new(server)))
}

/// Name to verify the server certificate against
pub fn server_name(host: &str, config: &TlsClientConfig) -> Result<ServerName<'static>> {
    let name = config.server_name.as_deref().unwrap_or(host);
    ServerName::try_from(name.to_string())
        .map_err(|e| TransportError::tls(format!("invalid server name {name:?}: {e}")))
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    CertificateDer::pem_file_iter(path)
        .and_then(|certs| certs.collect::<std::result::Result<Vec<_>, _>>())
        .map_err(|e| {
            TransportError::tls(format!(
                "failed to load certificates {}: {e}",
                path.display()
            ))
        })
}
