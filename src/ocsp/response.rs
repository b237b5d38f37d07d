//! `OCSPResponse` authentication and interpretation ([RFC 6960 § 3.2],
//! [RFC 6960 § 4.2]).
//!
//! [RFC 6960 § 3.2]: https://datatracker.ietf.org/doc/html/rfc6960#section-3.2
//! [RFC 6960 § 4.2]: https://datatracker.ietf.org/doc/html/rfc6960#section-4.2

use std::borrow::Cow;
use std::time::{Duration, SystemTime};

use const_oid::db::rfc5912::ID_KP_OCSP_SIGNING;
use const_oid::db::rfc6960::ID_PKIX_OCSP_BASIC;
use der::{Decode, Encode};
use tracing::{debug, warn};
use x509_cert::Certificate;
use x509_ocsp::{BasicOcspResponse, CertStatus, OcspResponse, OcspResponseStatus, ResponderId};

use super::request::CertIdentity;
use crate::certificate::{names_match, CertificateRef};
use crate::errors::{Error, Result};
use crate::hash::HashAlgorithm;
use crate::verify::SignedData;
use crate::{RevocationInfo, Verdict};

/// How far in the future a `thisUpdate` may lie before the response is
/// rejected, to absorb clock skew between responder and client.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(5 * 60);

/// Authenticated status of one certificate.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OcspStatus {
    /// Good, revoked or unknown.
    pub verdict: Verdict,
    /// When the responder produced the signed response.
    pub produced_at: SystemTime,
    /// When the status was known to be correct.
    pub this_update: SystemTime,
    /// When newer status information will be available, if announced.
    pub next_update: Option<SystemTime>,
}

/// Parse `der` as the response to the query for `identity`, authenticate it
/// against `issuer` and check that it is current at `now`.
///
/// The signature must come from `issuer` itself or from a responder
/// certificate embedded in the response that `issuer` signed for
/// `id-kp-OCSPSigning` and that is valid at `now`. The `ResponderID` must
/// name whichever of the two signed. A response only about other
/// certificates is rejected with [`Error::ResponseMismatch`].
pub fn parse_response(
    der: &[u8],
    identity: &CertIdentity,
    issuer: &CertificateRef,
    now: SystemTime,
) -> Result<OcspStatus> {
    let response = OcspResponse::from_der(der)?;
    if response.response_status != OcspResponseStatus::Successful {
        return Err(Error::OcspResponseStatus(response.response_status));
    }

    let bytes = response.response_bytes.ok_or(Error::EmptyResponse)?;
    if bytes.response_type != ID_PKIX_OCSP_BASIC {
        return Err(Error::UnsupportedResponseType(bytes.response_type));
    }

    let signed = SignedData::parse(bytes.response.as_bytes())?;
    let basic = BasicOcspResponse::from_der(bytes.response.as_bytes())?;
    let data = &basic.tbs_response_data;

    debug!("checking OCSP response signature");
    let signer = find_signer(basic.certs.as_deref(), &data.responder_id, issuer, now)?;
    signed.verify_with(signer.subject_public_key_info())?;

    let single = data
        .responses
        .iter()
        .find_map(|single| match identity.matches(&single.cert_id, issuer) {
            Ok(true) => Some(Ok(single)),
            Ok(false) => None,
            Err(err) => Some(Err(err)),
        })
        .transpose()?
        .ok_or(Error::ResponseMismatch)?;

    let this_update = single.this_update.0.to_system_time();
    let next_update = single.next_update.map(|t| t.0.to_system_time());
    if this_update > now + MAX_CLOCK_SKEW {
        return Err(Error::ResponseNotYetValid);
    }
    if next_update.is_some_and(|next| next < now) {
        return Err(Error::StaleResponse);
    }

    let verdict = match &single.cert_status {
        CertStatus::Good(_) => Verdict::Good,
        CertStatus::Revoked(info) => Verdict::Revoked(RevocationInfo {
            revocation_time: info.revocation_time.0.to_system_time(),
            reason: info.revocation_reason,
        }),
        CertStatus::Unknown(_) => Verdict::Unknown,
    };

    Ok(OcspStatus {
        verdict,
        produced_at: data.produced_at.0.to_system_time(),
        this_update,
        next_update,
    })
}

/// Select the certificate whose key must have signed the response.
fn find_signer<'c>(
    certs: Option<&[Certificate]>,
    responder_id: &ResponderId,
    issuer: &'c CertificateRef,
    now: SystemTime,
) -> Result<Cow<'c, CertificateRef>> {
    if names(responder_id, issuer) {
        return Ok(Cow::Borrowed(issuer));
    }

    for cert in certs.unwrap_or_default() {
        let candidate = CertificateRef::from_der(cert.to_der()?)?;
        if !names(responder_id, &candidate) {
            continue;
        }

        if let Err(err) = candidate.verify_issued_by(issuer) {
            warn!(%err, "OCSP responder certificate was not issued by the issuer");
            return Err(Error::UnauthorizedResponder);
        }
        if !candidate
            .extended_key_usage()?
            .contains(&ID_KP_OCSP_SIGNING)
        {
            warn!("OCSP responder certificate lacks the OCSPSigning key purpose");
            return Err(Error::UnauthorizedResponder);
        }
        if !candidate.is_valid_at(now) {
            warn!("OCSP responder certificate is outside its validity period");
            return Err(Error::UnauthorizedResponder);
        }
        return Ok(Cow::Owned(candidate));
    }

    Err(Error::ResponderMismatch)
}

/// Whether `responder_id` identifies `cert`.
fn names(responder_id: &ResponderId, cert: &CertificateRef) -> bool {
    match responder_id {
        ResponderId::ByName(name) => names_match(name, cert.subject()),
        ResponderId::ByKey(hash) => {
            let key = cert
                .subject_public_key_info()
                .subject_public_key
                .raw_bytes();
            hash.as_bytes() == HashAlgorithm::Sha1.digest(key).as_slice()
        }
    }
}
