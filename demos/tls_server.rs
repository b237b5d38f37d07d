//! TLS server greeting every client, to test `tls-client` against.
//!
//! ```text
//! cargo run --example tls-server -- --cert cert1/cert1.crt.pem --key cert1/cert1.key.pem
//! ```

use std::io::{BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::Context;
use clap::Parser;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "tls-server")]
#[command(about = "TLS server writing a greeting to every client")]
struct Args {
    /// TLS server certificate chain (PEM)
    #[arg(long, default_value = "cert1/cert1.crt.pem")]
    cert: PathBuf,

    /// TLS server private key (PEM)
    #[arg(long, default_value = "cert1/cert1.key.pem")]
    key: PathBuf,

    /// Listening address
    #[arg(long, default_value = "127.0.0.1:12345")]
    listen: String,
}

fn load_certs(path: &PathBuf) -> anyhow::Result<Vec<CertificateDer<'static>>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("cannot read TLS certificate {}", path.display()))?;
    Ok(rustls_pemfile::certs(&mut BufReader::new(file)).collect::<Result<_, _>>()?)
}

fn load_key(path: &PathBuf) -> anyhow::Result<PrivateKeyDer<'static>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("cannot read TLS key {}", path.display()))?;
    rustls_pemfile::private_key(&mut BufReader::new(file))?
        .with_context(|| format!("no private key in {}", path.display()))
}

fn handle_connection(config: Arc<rustls::ServerConfig>, stream: TcpStream) -> anyhow::Result<()> {
    let conn = rustls::ServerConnection::new(config)?;
    let mut tls = rustls::StreamOwned::new(conn, stream);
    tls.write_all(b"Hello!")?;
    tls.conn.send_close_notify();
    tls.flush()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = rustls::ServerConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()?
    .with_no_client_auth()
    .with_single_cert(load_certs(&args.cert)?, load_key(&args.key)?)?;
    let config = Arc::new(config);

    let listener = TcpListener::bind(&args.listen)
        .with_context(|| format!("cannot listen on {}", args.listen))?;

    loop {
        info!("accepting connection");
        let (stream, peer) = match listener.accept() {
            Ok(accepted) => accepted,
            Err(err) => {
                warn!(%err, "error accepting connection");
                continue;
            }
        };
        info!(%peer, "new connection");

        let config = config.clone();
        thread::spawn(move || {
            if let Err(err) = handle_connection(config, stream) {
                warn!(%peer, %err, "connection failed");
            }
        });
    }
}
