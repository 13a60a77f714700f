//! TLS listener setup using rustls.
//!
//! The certificate chain and private key are read from the PEM files named by
//! `TLS_CERT_PATH` and `TLS_KEY_PATH`. Each accepted connection is handshaken
//! on its own task and then served by hyper's HTTP/1 connection driver.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use hyper::{body::Incoming, server::conn::http1, service::service_fn, Request};
use hyper_util::rt::TokioIo;
use rustls::ServerConfig;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tower::ServiceExt;
use tracing::{debug, info, warn};

/// Build a [`rustls::ServerConfig`] from PEM-encoded certificate and private key bytes.
///
/// # Errors
///
/// Returns an error if the certificate or key cannot be parsed, or if rustls
/// rejects the configuration.
pub fn build_server_config(cert_pem: &[u8], key_pem: &[u8]) -> Result<Arc<ServerConfig>> {
    let certs = rustls_pemfile::certs(&mut std::io::BufReader::new(cert_pem))
        .collect::<Result<Vec<_>, _>>()
        .context("failed to parse TLS certificate chain")?;
    if certs.is_empty() {
        anyhow::bail!("no certificates found in PEM data");
    }

    let key = rustls_pemfile::private_key(&mut std::io::BufReader::new(key_pem))
        .context("failed to read TLS private key")?
        .context("no private key found in PEM data")?;

    let mut config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("failed to build rustls ServerConfig")?;
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(Arc::new(config))
}

/// Load the PEM files at `cert_path` and `key_path` into a [`TlsAcceptor`].
///
/// # Errors
///
/// Returns an error if either file cannot be read or parsed.
pub async fn load_acceptor(cert_path: &str, key_path: &str) -> Result<TlsAcceptor> {
    let cert_pem = tokio::fs::read(cert_path)
        .await
        .with_context(|| format!("failed to read TLS certificate {cert_path}"))?;
    let key_pem = tokio::fs::read(key_path)
        .await
        .with_context(|| format!("failed to read TLS private key {key_path}"))?;
    let config = build_server_config(&cert_pem, &key_pem)?;
    Ok(TlsAcceptor::from(config))
}

/// Accept TLS connections on `listener` and serve `router` until `shutdown`
/// resolves.
///
/// Handshake and connection failures are logged and only affect the
/// connection they occurred on.
pub async fn serve_tls<F>(
    listener: TcpListener,
    acceptor: TlsAcceptor,
    router: Router,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    loop {
        let (stream, peer) = tokio::select! {
            _ = &mut shutdown => {
                info!("shutdown signal received; no longer accepting connections");
                return Ok(());
            }
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(error = %e, "failed to accept TCP connection");
                    continue;
                }
            },
        };

        let acceptor = acceptor.clone();
        let router = router.clone();
        tokio::spawn(async move {
            let tls = match acceptor.accept(stream).await {
                Ok(tls) => tls,
                Err(e) => {
                    debug!(peer = %peer, error = %e, "TLS handshake failed");
                    return;
                }
            };

            let service =
                service_fn(move |req: Request<Incoming>| router.clone().oneshot(req));
            if let Err(e) = http1::Builder::new()
                .serve_connection(TokioIo::new(tls), service)
                .await
            {
                debug!(peer = %peer, error = %e, "connection closed with error");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_cert_pem() {
        let result = build_server_config(b"", b"");
        assert!(result.is_err());
    }

    #[test]
    fn rejects_garbage_pem() {
        let result = build_server_config(b"not a pem", b"also not a pem");
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn missing_files_are_reported() {
        let err = match load_acceptor("/nonexistent/tls.crt", "/nonexistent/tls.key").await {
            Ok(_) => panic!("missing certificate files must fail"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("/nonexistent/tls.crt"));
    }
}
