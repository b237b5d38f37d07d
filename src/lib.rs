#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![doc = include_str!("../README.md")]
#![doc(html_logo_url = "https://raw.githubusercontent.com/RustCrypto/meta/master/logo_small.png")]
#![warn(missing_docs)]

//! # Usage
//!
//! ## Checking a chain
//!
//! A [`RevocationVerifier`] is built once from a [`RevocationConfig`] and then
//! asked about every verified chain. Anything short of a positive answer from
//! every configured authority is an [`Error`].
//!
//! ```no_run
//! use x509_revocation::{CertificateRef, RevocationConfig, RevocationVerifier, VerifiedChain};
//!
//! # fn main() -> x509_revocation::Result<()> {
//! let config = RevocationConfig::builder()
//!     .use_ocsp(true)
//!     .crl_path("/etc/ssl/revoked.crl")
//!     .build();
//! let verifier = RevocationVerifier::new(config)?;
//!
//! let chain = CertificateRef::load_pem_chain(std::fs::read("chain.pem").unwrap_or_default())?;
//! verifier.verify(&VerifiedChain::new(chain)?)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## TLS
//!
//! [`RevocationCheckingVerifier`] plugs the same policy into a `rustls`
//! client after standard path validation:
//!
//! ```no_run
//! use std::sync::Arc;
//! use x509_revocation::{
//!     CertificateRef, RevocationCheckingVerifier, RevocationConfig, RevocationVerifier,
//! };
//!
//! # fn main() -> x509_revocation::Result<()> {
//! let roots = CertificateRef::load_pem_chain(std::fs::read("ca.pem").unwrap_or_default())?;
//! let revocation = RevocationVerifier::new(RevocationConfig::builder().use_ocsp(true).build())?;
//! let verifier = RevocationCheckingVerifier::new(roots, revocation)?;
//!
//! let config = rustls::ClientConfig::builder_with_provider(Arc::new(
//!     rustls::crypto::ring::default_provider(),
//! ))
//! .with_safe_default_protocol_versions()
//! .expect("protocol versions")
//! .dangerous()
//! .with_custom_certificate_verifier(Arc::new(verifier))
//! .with_no_client_auth();
//! # drop(config);
//! # Ok(())
//! # }
//! ```

#[cfg(doctest)]
pub struct ReadmeDoctests;

use std::time::SystemTime;

pub use const_oid;
pub use der;
pub use num_bigint::BigInt;
pub use rustls;
pub use x509_cert;
pub use x509_ocsp;
pub use x509_cert::ext::pkix::CrlReason;

pub mod certificate;
pub mod config;
pub mod crl;
pub mod errors;
pub mod hash;
pub mod ocsp;
pub mod tls;
pub mod verifier;

mod verify;

pub use crate::{
    certificate::{CertificateRef, VerifiedChain},
    config::{ResponderSelection, RevocationConfig, RevocationConfigBuilder},
    crl::{check_against_crl, check_against_crl_at, RevocationList},
    errors::{Error, ErrorCategory, Result},
    hash::HashAlgorithm,
    ocsp::OcspClient,
    tls::RevocationCheckingVerifier,
    verifier::RevocationVerifier,
    verify::verify_signature,
};

/// Answer of a single revocation authority about one certificate.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Verdict {
    /// The authority vouches for the certificate.
    Good,
    /// The certificate was revoked.
    Revoked(RevocationInfo),
    /// The authority does not know the certificate.
    Unknown,
}

/// When and why a certificate was revoked.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RevocationInfo {
    /// Time of revocation as stated by the authority.
    pub revocation_time: SystemTime,
    /// Reason code, when the authority gave one.
    pub reason: Option<CrlReason>,
}
