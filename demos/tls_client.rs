//! TLS client rejecting revoked server certificates.
//!
//! ```text
//! cargo run --example tls-client -- --ca-cert ca/ca.crt.pem --use-ocsp
//! cargo run --example tls-client -- --ca-cert ca/ca.crt.pem --crl-file ca/ca.crl
//! ```

use std::io::Read;
use std::net::TcpStream;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use rustls::pki_types::ServerName;
use tracing::{error, info, warn};
use x509_revocation::{
    CertificateRef, ResponderSelection, RevocationCheckingVerifier, RevocationConfig,
    RevocationVerifier,
};

#[derive(Parser, Debug)]
#[command(name = "tls-client")]
#[command(about = "Connect to a TLS server and check its certificate for revocation")]
struct Args {
    /// Root CA certificate (PEM)
    #[arg(long, default_value = "ca/ca.crt.pem")]
    ca_cert: PathBuf,

    /// Use OCSP to validate the server certificate
    #[arg(long)]
    use_ocsp: bool,

    /// Use the CRL stored in this file to validate the server certificate
    #[arg(long)]
    crl_file: Option<PathBuf>,

    /// Seconds allowed for an OCSP round trip
    #[arg(long, default_value = "10")]
    ocsp_timeout: u64,

    /// Try every advertised OCSP responder in turn instead of only the first
    #[arg(long)]
    ocsp_fallback: bool,

    /// Server address
    #[arg(long, default_value = "localhost:12345")]
    connect: String,

    /// Name expected in the server certificate
    #[arg(long, default_value = "localhost")]
    server_name: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let pem = std::fs::read(&args.ca_cert)
        .with_context(|| format!("cannot read root CA certificate {}", args.ca_cert.display()))?;
    let roots = CertificateRef::load_pem_chain(pem)?;

    let mut config = RevocationConfig::builder()
        .use_ocsp(args.use_ocsp)
        .ocsp_timeout(Duration::from_secs(args.ocsp_timeout));
    if let Some(crl_file) = &args.crl_file {
        config = config.crl_path(crl_file);
    }
    if args.ocsp_fallback {
        config = config.responder_selection(ResponderSelection::OrderedFallback);
    }
    let revocation = RevocationVerifier::new(config.build())?;
    let verifier = RevocationCheckingVerifier::new(roots, revocation)?;
    if !verifier.revocation().config().is_enabled() {
        warn!("neither --use-ocsp nor --crl-file given, revocation is not checked");
    }

    let config = rustls::ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()?
    .dangerous()
    .with_custom_certificate_verifier(Arc::new(verifier))
    .with_no_client_auth();

    let server_name = ServerName::try_from(args.server_name.clone())?;
    let mut conn = rustls::ClientConnection::new(Arc::new(config), server_name)?;
    let mut sock = TcpStream::connect(&args.connect)
        .with_context(|| format!("cannot connect to {}", args.connect))?;
    let mut tls = rustls::Stream::new(&mut conn, &mut sock);

    let mut buf = Vec::new();
    match tls.read_to_end(&mut buf) {
        Ok(_) => {
            info!("successfully connected to server");
            println!("{}", String::from_utf8_lossy(&buf));
            Ok(())
        }
        Err(err) => {
            error!(%err, "connection failed");
            Err(err.into())
        }
    }
}
