//! Error types.

use std::path::PathBuf;
use std::time::SystemTime;

use const_oid::ObjectIdentifier;
use crate::ocsp::OcspResponseStatus;
use crate::RevocationInfo;

/// Alias for [`core::result::Result`] with the `x509-revocation` crate's [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;

/// Broad classes of failure. Every class rejects the peer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorCategory {
    /// Missing or unusable inputs: no issuer, no responder URL, bad CA material.
    Input,
    /// HTTP or filesystem failure.
    Transport,
    /// Malformed, unauthenticated or mis-bound revocation data.
    Authentication,
    /// Definitive negative answers: revoked, unknown, stale.
    Policy,
}

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The chain carries no certificate for the leaf's issuer.
    #[error("verified chain has no issuer certificate")]
    MissingIssuer,
    /// OCSP checking is on but the leaf names no responder.
    #[error("certificate does not advertise an OCSP responder")]
    NoResponderUrl,
    /// Responder URL that is not an absolute `http` or `https` URL.
    #[error("invalid OCSP responder URL {url:?}")]
    InvalidResponderUrl {
        /// The advertised URL.
        url: String,
    },
    /// Certificate that cannot be used for revocation checking.
    #[error("unusable certificate: {reason}")]
    Certificate {
        /// What is wrong with it.
        reason: String,
    },
    /// Building the TLS verifier failed.
    #[error("TLS verifier: {reason}")]
    Tls {
        /// Reason reported by rustls.
        reason: String,
    },

    /// The HTTP client could not be constructed.
    #[error("cannot build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// Sending an OCSP request failed.
    #[error("OCSP request to {url} failed: {source}")]
    Http {
        /// Responder URL.
        url: String,
        /// Underlying HTTP error.
        #[source]
        source: reqwest::Error,
    },
    /// Reading an OCSP response body failed.
    #[error("reading OCSP response from {url} failed: {source}")]
    HttpBody {
        /// Responder URL.
        url: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The responder answered with a non-success HTTP status.
    #[error("OCSP responder {url} answered HTTP {status}")]
    HttpStatus {
        /// Responder URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },
    /// OCSP response body over the configured limit.
    #[error("OCSP response exceeds {limit} bytes")]
    ResponseTooLarge {
        /// Size limit in bytes.
        limit: usize,
    },
    /// Reading a file failed.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// The file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// CRL file over the configured limit.
    #[error("CRL {} exceeds {limit} bytes", path.display())]
    CrlTooLarge {
        /// The file.
        path: PathBuf,
        /// Size limit in bytes.
        limit: u64,
    },

    /// Malformed DER.
    #[error("ASN.1 error: {0}")]
    Asn1(#[from] der::Error),
    /// Malformed PEM armor.
    #[error("PEM error: {0}")]
    Pem(der::pem::Error),
    /// PEM document of the wrong type.
    #[error("unexpected PEM label {label:?}")]
    PemLabel {
        /// Label found in the document.
        label: String,
    },
    /// Signature algorithm this crate cannot verify.
    #[error("unsupported signature algorithm {0}")]
    UnsupportedSignatureAlgorithm(ObjectIdentifier),
    /// Public key that does not fit the signature algorithm.
    #[error("unsupported or malformed public key")]
    UnsupportedKey,
    /// Signature does not verify.
    #[error("signature verification failed")]
    SignatureMismatch,
    /// OCSP response signed by a certificate without authority to do so.
    #[error("OCSP response is not signed by the issuer or an authorized responder")]
    UnauthorizedResponder,
    /// No candidate signer matches the `ResponderID`.
    #[error("OCSP responder ID does not identify the signing certificate")]
    ResponderMismatch,
    /// No `SingleResponse` is about the queried certificate.
    #[error("OCSP response does not cover the requested certificate")]
    ResponseMismatch,
    /// The responder did not answer `successful`.
    #[error("OCSP responder returned status {0:?}")]
    OcspResponseStatus(OcspResponseStatus),
    /// Successful OCSP response without `responseBytes`.
    #[error("OCSP response carries no response bytes")]
    EmptyResponse,
    /// OCSP response type other than `id-pkix-ocsp-basic`.
    #[error("unsupported OCSP response type {0}")]
    UnsupportedResponseType(ObjectIdentifier),
    /// CRL issued under another name than the issuer certificate's.
    #[error("CRL issuer does not match the issuer certificate")]
    CrlIssuerMismatch,

    /// The certificate was revoked.
    #[error("certificate serial {serial} was revoked")]
    Revoked {
        /// Decimal serial number.
        serial: String,
        /// When and why.
        info: RevocationInfo,
    },
    /// The responder does not know the certificate.
    #[error("revocation status of certificate serial {serial} is unknown to the OCSP responder")]
    UnknownStatus {
        /// Decimal serial number.
        serial: String,
    },
    /// CRL past its `nextUpdate`, or without one.
    #[error("CRL is outdated")]
    StaleCrl {
        /// The CRL's `nextUpdate`.
        next_update: Option<SystemTime>,
    },
    /// OCSP response past its `nextUpdate`.
    #[error("OCSP response is outdated")]
    StaleResponse,
    /// OCSP `thisUpdate` too far in the future.
    #[error("OCSP response is not yet valid")]
    ResponseNotYetValid,
}

impl Error {
    /// Which class of failure this is.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::MissingIssuer
            | Error::NoResponderUrl
            | Error::InvalidResponderUrl { .. }
            | Error::Certificate { .. }
            | Error::Tls { .. }
            | Error::HttpClient(_) => ErrorCategory::Input,
            Error::Http { .. }
            | Error::HttpBody { .. }
            | Error::HttpStatus { .. }
            | Error::ResponseTooLarge { .. }
            | Error::Io { .. }
            | Error::CrlTooLarge { .. } => ErrorCategory::Transport,
            Error::Revoked { .. }
            | Error::UnknownStatus { .. }
            | Error::StaleCrl { .. }
            | Error::StaleResponse
            | Error::ResponseNotYetValid => ErrorCategory::Policy,
            _ => ErrorCategory::Authentication,
        }
    }

    pub(crate) fn certificate(reason: impl Into<String>) -> Self {
        Error::Certificate {
            reason: reason.into(),
        }
    }
}

impl From<signature::Error> for Error {
    fn from(_err: signature::Error) -> Error {
        Error::SignatureMismatch
    }
}

impl From<der::pem::Error> for Error {
    fn from(err: der::pem::Error) -> Error {
        Error::Pem(err)
    }
}

impl From<spki::Error> for Error {
    fn from(err: spki::Error) -> Error {
        match err {
            spki::Error::Asn1(e) => Error::Asn1(e),
            _ => Error::UnsupportedKey,
        }
    }
}
