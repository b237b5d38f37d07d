//! `rustls` integration: a [`ServerCertVerifier`] that runs standard WebPKI
//! path validation and then the revocation policy of a
//! [`RevocationVerifier`].

use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{CertificateError, DigitallySignedStruct, OtherError, RootCertStore, SignatureScheme};
use tracing::{debug, warn};

use crate::certificate::{CertificateRef, VerifiedChain};
use crate::errors::{Error, Result};
use crate::verifier::RevocationVerifier;

/// Server certificate verifier that rejects revoked peers.
///
/// The chain handed to the revocation checks is the leaf followed by its
/// issuer, found among the presented intermediates and then the trust
/// anchors as described in [`VerifiedChain::assemble`].
#[derive(Debug)]
pub struct RevocationCheckingVerifier {
    webpki: Arc<WebPkiServerVerifier>,
    roots: Vec<CertificateRef>,
    revocation: RevocationVerifier,
}

impl RevocationCheckingVerifier {
    /// Trust `roots` and apply `revocation` using the `ring` crypto provider.
    pub fn new(roots: Vec<CertificateRef>, revocation: RevocationVerifier) -> Result<Self> {
        Self::with_provider(
            roots,
            revocation,
            Arc::new(rustls::crypto::ring::default_provider()),
        )
    }

    /// Like [`RevocationCheckingVerifier::new`] with an explicit provider for
    /// signature verification.
    pub fn with_provider(
        roots: Vec<CertificateRef>,
        revocation: RevocationVerifier,
        provider: Arc<CryptoProvider>,
    ) -> Result<Self> {
        let mut store = RootCertStore::empty();
        for root in &roots {
            store
                .add(CertificateDer::from(root.der().to_vec()))
                .map_err(|err| Error::Tls {
                    reason: format!("unusable trust anchor {}: {err}", root.subject()),
                })?;
        }

        let webpki = WebPkiServerVerifier::builder_with_provider(Arc::new(store), provider)
            .build()
            .map_err(|err| Error::Tls {
                reason: err.to_string(),
            })?;

        Ok(Self {
            webpki,
            roots,
            revocation,
        })
    }

    /// The revocation policy applied after path validation.
    pub fn revocation(&self) -> &RevocationVerifier {
        &self.revocation
    }

    /// Pair `leaf` with the certificate that issued it.
    ///
    /// A chain without an issuer is still returned so that the revocation
    /// policy decides how to treat it.
    fn build_chain(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
    ) -> Result<VerifiedChain> {
        let leaf = CertificateRef::from_der(end_entity.as_ref())?;

        let presented = intermediates
            .iter()
            .filter_map(|der| CertificateRef::from_der(der.as_ref()).ok());
        let chain = VerifiedChain::assemble(leaf, presented.chain(self.roots.iter().cloned()));
        if chain.issuer().is_none() {
            warn!("no issuer certificate found for the peer certificate");
        }
        Ok(chain)
    }
}

impl ServerCertVerifier for RevocationCheckingVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        self.webpki
            .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)?;
        debug!(?server_name, "path validation succeeded");

        let now = UNIX_EPOCH + Duration::from_secs(now.as_secs());
        self.build_chain(end_entity, intermediates)
            .and_then(|chain| self.revocation.verify_at(&chain, now))
            .map_err(to_rustls_error)?;

        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        self.webpki.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        self.webpki.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.webpki.supported_verify_schemes()
    }
}

/// Map a revocation failure onto the certificate error rustls reports to
/// the peer.
pub fn to_rustls_error(err: Error) -> rustls::Error {
    warn!(%err, "rejecting peer certificate");
    let err = match err {
        Error::Revoked { .. } => CertificateError::Revoked,
        Error::UnknownStatus { .. } => CertificateError::UnknownRevocationStatus,
        err => CertificateError::Other(OtherError(Arc::new(err))),
    };
    rustls::Error::InvalidCertificate(err)
}
