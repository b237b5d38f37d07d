//! Online Certificate Status Protocol client as described in [RFC 6960].
//!
//! A query is built for a (leaf, issuer) pair, posted to a responder over
//! HTTP and the answer is only believed once it is signed by the issuer (or a
//! responder the issuer delegated to), names the exact certificate asked
//! about and is current.
//!
//! ```no_run
//! use x509_revocation::{ocsp::OcspClient, CertificateRef, Verdict};
//! # fn main() -> x509_revocation::Result<()> {
//! # let (leaf_pem, issuer_pem) = (String::new(), String::new());
//! let leaf = CertificateRef::from_pem(&leaf_pem)?;
//! let issuer = CertificateRef::from_pem(&issuer_pem)?;
//!
//! let client = OcspClient::new(std::time::Duration::from_secs(10), 64 * 1024)?;
//! let url = leaf.ocsp_responders()?.into_iter().next().unwrap_or_default();
//! match client.query_status(&leaf, &issuer, &url)? {
//!     Verdict::Good => println!("good"),
//!     Verdict::Revoked(info) => println!("revoked at {:?}", info.revocation_time),
//!     Verdict::Unknown => println!("unknown"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [RFC 6960]: https://datatracker.ietf.org/doc/html/rfc6960

mod request;
mod response;
mod transport;

pub use x509_ocsp::OcspResponseStatus;

pub use self::{
    request::CertIdentity,
    response::{parse_response, OcspStatus, MAX_CLOCK_SKEW},
    transport::{HttpTransport, OcspTransport, OCSP_REQUEST_CONTENT_TYPE, OCSP_RESPONSE_CONTENT_TYPE},
};

use std::time::{Duration, SystemTime};

use tracing::{debug, info};

use crate::certificate::CertificateRef;
use crate::errors::Result;
use crate::hash::HashAlgorithm;
use crate::Verdict;

/// Queries OCSP responders through an [`OcspTransport`].
#[derive(Clone, Debug)]
pub struct OcspClient<T = HttpTransport> {
    transport: T,
}

impl OcspClient<HttpTransport> {
    /// A client posting over HTTP with the given timeout and response size
    /// limit.
    pub fn new(timeout: Duration, max_response_size: usize) -> Result<Self> {
        Ok(Self::with_transport(HttpTransport::new(
            timeout,
            max_response_size,
        )?))
    }
}

impl<T: OcspTransport> OcspClient<T> {
    /// A client sending requests through `transport`.
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Ask the responder at `url` about `leaf`, issued by `issuer`.
    ///
    /// Transport, decoding and authentication failures are errors, never a
    /// [`Verdict`].
    pub fn query_status(
        &self,
        leaf: &CertificateRef,
        issuer: &CertificateRef,
        url: &str,
    ) -> Result<Verdict> {
        Ok(self
            .query_status_at(leaf, issuer, url, SystemTime::now())?
            .verdict)
    }

    /// Like [`OcspClient::query_status`], checking response freshness
    /// against `now`.
    pub fn query_status_at(
        &self,
        leaf: &CertificateRef,
        issuer: &CertificateRef,
        url: &str,
        now: SystemTime,
    ) -> Result<OcspStatus> {
        transport::parse_responder_url(url)?;

        info!(serial = %leaf.serial(), url, "crafting an OCSP request");
        let identity = CertIdentity::new(HashAlgorithm::Sha256, leaf, issuer)?;
        let request = identity.to_request_der()?;

        let body = self.transport.post(url, &request)?;
        let status = parse_response(&body, &identity, issuer, now)?;

        debug!(
            serial = %leaf.serial(),
            verdict = ?status.verdict,
            this_update = ?status.this_update,
            next_update = ?status.next_update,
            "OCSP response verified"
        );
        Ok(status)
    }
}
