//! Per-handshake revocation policy.

use std::fmt;
use std::time::SystemTime;

use tracing::{info, warn};

use crate::certificate::{CertificateRef, VerifiedChain};
use crate::config::{ResponderSelection, RevocationConfig};
use crate::crl::RevocationList;
use crate::errors::{Error, Result};
use crate::ocsp::{HttpTransport, OcspClient, OcspTransport};
use crate::Verdict;

/// Decides whether a verified chain's leaf may be trusted, consulting the
/// authorities named by a [`RevocationConfig`].
///
/// Every configured check must answer [`Verdict::Good`]; anything else,
/// including a failure to reach an authority, rejects the chain. The
/// verifier holds no mutable state and can be shared between connections.
pub struct RevocationVerifier {
    config: RevocationConfig,
    ocsp: OcspClient<Box<dyn OcspTransport>>,
}

impl RevocationVerifier {
    /// A verifier querying OCSP responders over HTTP.
    pub fn new(config: RevocationConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.ocsp_timeout(), config.max_ocsp_response_size())?;
        Ok(Self::with_transport(config, transport))
    }

    /// A verifier sending OCSP requests through `transport`.
    pub fn with_transport(config: RevocationConfig, transport: impl OcspTransport + 'static) -> Self {
        let transport: Box<dyn OcspTransport> = Box::new(transport);
        Self {
            config,
            ocsp: OcspClient::with_transport(transport),
        }
    }

    /// The policy in force.
    pub fn config(&self) -> &RevocationConfig {
        &self.config
    }

    /// Check the leaf of `chain` at the current time.
    pub fn verify(&self, chain: &VerifiedChain) -> Result<()> {
        self.verify_at(chain, SystemTime::now())
    }

    /// Check the leaf of `chain` as of `now`.
    ///
    /// OCSP runs first; a revoked or unknown answer rejects without
    /// consulting the CRL.
    pub fn verify_at(&self, chain: &VerifiedChain, now: SystemTime) -> Result<()> {
        let leaf = chain.leaf();
        let issuer = chain.issuer().ok_or(Error::MissingIssuer)?;

        let subject = leaf.common_name().unwrap_or_default();
        let issuer_name = issuer.common_name().unwrap_or_default();
        info!(%subject, issuer = %issuer_name, "verifying peer certificate");

        if !self.config.is_enabled() {
            warn!("revocation checking is disabled, accepting certificate");
            return Ok(());
        }

        let serial = leaf.serial();

        if self.config.use_ocsp() {
            info!(%serial, "validating peer certificate with OCSP");
            match self.query_ocsp(leaf, issuer, now)? {
                Verdict::Good => info!("certificate status is good"),
                Verdict::Revoked(info) => {
                    warn!(%serial, "certificate status is revoked");
                    return Err(Error::Revoked {
                        serial: serial.to_string(),
                        info,
                    });
                }
                Verdict::Unknown => {
                    warn!(%serial, "certificate status is unknown");
                    return Err(Error::UnknownStatus {
                        serial: serial.to_string(),
                    });
                }
            }
        }

        if let Some(path) = self.config.crl_path() {
            info!(%serial, path = %path.display(), "validating peer certificate with CRL");
            let crl = RevocationList::load(path, self.config.max_crl_size())?;
            match crl.check(leaf, issuer, now)? {
                Verdict::Good => {}
                Verdict::Revoked(info) => {
                    return Err(Error::Revoked {
                        serial: serial.to_string(),
                        info,
                    })
                }
                Verdict::Unknown => {
                    return Err(Error::UnknownStatus {
                        serial: serial.to_string(),
                    })
                }
            }
        }

        info!(%serial, "peer certificate was allowed");
        Ok(())
    }

    fn query_ocsp(
        &self,
        leaf: &CertificateRef,
        issuer: &CertificateRef,
        now: SystemTime,
    ) -> Result<Verdict> {
        let urls = leaf.ocsp_responders()?;

        match self.config.responder_selection() {
            ResponderSelection::FirstAdvertised => {
                let url = urls.first().ok_or(Error::NoResponderUrl)?;
                Ok(self.ocsp.query_status_at(leaf, issuer, url, now)?.verdict)
            }
            ResponderSelection::OrderedFallback => {
                let mut last_err = Error::NoResponderUrl;
                for url in &urls {
                    match self.ocsp.query_status_at(leaf, issuer, url, now) {
                        Ok(status) => return Ok(status.verdict),
                        Err(err) => {
                            warn!(url, %err, "OCSP query failed");
                            last_err = err;
                        }
                    }
                }
                Err(last_err)
            }
        }
    }
}

impl fmt::Debug for RevocationVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevocationVerifier")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
