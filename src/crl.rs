//! Certificate Revocation List validation as described in [RFC 5280 § 5].
//!
//! A CRL is read fresh from disk for every check. It vouches for nothing
//! until its issuer name matches and its signature verifies with the issuer
//! certificate's key, and a CRL past its `nextUpdate` (or without one) is
//! rejected even when it lists the certificate.
//!
//! [RFC 5280 § 5]: https://datatracker.ietf.org/doc/html/rfc5280#section-5

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::SystemTime;

use const_oid::AssociatedOid;
use der::Decode;
use num_bigint::BigInt;
use tracing::{debug, info, warn};
use x509_cert::crl::{CertificateList, RevokedCert};
use x509_cert::ext::pkix::CrlReason;
use x509_cert::name::Name;

use crate::certificate::{names_match, serial_to_int, CertificateRef};
use crate::errors::{Error, Result};
use crate::verify::SignedData;
use crate::{RevocationInfo, Verdict};

/// Largest CRL file read by [`check_against_crl`], in bytes.
pub const DEFAULT_MAX_CRL_SIZE: u64 = 16 * 1024 * 1024;

const PEM_LABEL: &str = "X509 CRL";

/// A parsed, not yet authenticated, CRL.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RevocationList {
    der: Vec<u8>,
    crl: CertificateList,
}

impl RevocationList {
    /// Parse a DER encoded `CertificateList`.
    pub fn from_der(der: impl Into<Vec<u8>>) -> Result<Self> {
        let der = der.into();
        let crl = CertificateList::from_der(&der)?;
        Ok(Self { der, crl })
    }

    /// Parse a PEM `X509 CRL` block.
    pub fn from_pem(pem: impl AsRef<[u8]>) -> Result<Self> {
        let (label, der) = der::pem::decode_vec(pem.as_ref())?;
        if label != PEM_LABEL {
            return Err(Error::PemLabel {
                label: label.to_string(),
            });
        }
        Self::from_der(der)
    }

    /// Parse either encoding, PEM being recognised by its armor.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.trim_ascii_start().starts_with(b"-----BEGIN") {
            Self::from_pem(bytes)
        } else {
            Self::from_der(bytes)
        }
    }

    /// Read and parse the CRL at `path`, refusing files larger than
    /// `max_size` bytes.
    pub fn load(path: impl AsRef<Path>, max_size: u64) -> Result<Self> {
        let path = path.as_ref();
        let io_err = |source: std::io::Error| Error::Io {
            path: path.to_path_buf(),
            source,
        };
        let too_large = || Error::CrlTooLarge {
            path: path.to_path_buf(),
            limit: max_size,
        };

        let file = File::open(path).map_err(io_err)?;
        if file.metadata().map_err(io_err)?.len() > max_size {
            return Err(too_large());
        }

        let mut bytes = Vec::new();
        file.take(max_size.saturating_add(1))
            .read_to_end(&mut bytes)
            .map_err(io_err)?;
        if bytes.len() as u64 > max_size {
            return Err(too_large());
        }

        debug!(path = %path.display(), len = bytes.len(), "read CRL");
        Self::parse(&bytes)
    }

    /// The DER encoding.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Name of the CA that issued the list.
    pub fn issuer(&self) -> &Name {
        &self.crl.tbs_cert_list.issuer
    }

    /// Issue date of this list.
    pub fn this_update(&self) -> SystemTime {
        self.crl.tbs_cert_list.this_update.to_system_time()
    }

    /// Date by which the next list will be issued.
    pub fn next_update(&self) -> Option<SystemTime> {
        self.crl
            .tbs_cert_list
            .next_update
            .map(|time| time.to_system_time())
    }

    /// Revoked entries, in list order.
    pub fn revoked_certificates(&self) -> &[RevokedCert] {
        self.crl
            .tbs_cert_list
            .revoked_certificates
            .as_deref()
            .unwrap_or(&[])
    }

    /// Check that `issuer` issued this list: its subject must match the CRL
    /// issuer and its key must verify the signature over the raw
    /// `tbsCertList`.
    pub fn verify_signature(&self, issuer: &CertificateRef) -> Result<()> {
        if !names_match(self.issuer(), issuer.subject()) {
            return Err(Error::CrlIssuerMismatch);
        }
        if self.crl.tbs_cert_list.signature != self.crl.signature_algorithm {
            return Err(Error::SignatureMismatch);
        }
        SignedData::parse(&self.der)?.verify_with(issuer.subject_public_key_info())
    }

    /// Reject a list without `nextUpdate` or whose `nextUpdate` has passed.
    pub fn check_freshness(&self, now: SystemTime) -> Result<()> {
        match self.next_update() {
            Some(next_update) if next_update >= now => Ok(()),
            next_update => Err(Error::StaleCrl { next_update }),
        }
    }

    /// Linear search for `serial` among the revoked entries.
    pub fn find(&self, serial: &BigInt) -> Result<Option<RevocationInfo>> {
        for entry in self.revoked_certificates() {
            if serial_to_int(&entry.serial_number) == *serial {
                return Ok(Some(RevocationInfo {
                    revocation_time: entry.revocation_date.to_system_time(),
                    reason: reason_code(entry)?,
                }));
            }
        }
        Ok(None)
    }

    /// Authenticate the list against `issuer`, check that it is current at
    /// `now`, then look `leaf` up in it.
    pub fn check(
        &self,
        leaf: &CertificateRef,
        issuer: &CertificateRef,
        now: SystemTime,
    ) -> Result<Verdict> {
        info!(issuer = %self.issuer(), "checking CRL signature");
        self.verify_signature(issuer)?;

        if let Err(err) = self.check_freshness(now) {
            warn!(
                this_update = ?self.this_update(),
                next_update = ?self.next_update(),
                "CRL is outdated"
            );
            return Err(err);
        }

        let serial = leaf.serial();
        match self.find(&serial)? {
            Some(info) => {
                info!(%serial, reason = ?info.reason, "certificate is listed in the CRL");
                Ok(Verdict::Revoked(info))
            }
            None => {
                debug!(
                    %serial,
                    entries = self.revoked_certificates().len(),
                    "certificate is not listed in the CRL"
                );
                Ok(Verdict::Good)
            }
        }
    }
}

/// The `reasonCode` entry extension, if present.
fn reason_code(entry: &RevokedCert) -> Result<Option<CrlReason>> {
    let extensions = entry.crl_entry_extensions.as_deref().unwrap_or(&[]);
    match extensions.iter().find(|ext| ext.extn_id == CrlReason::OID) {
        Some(ext) => Ok(Some(CrlReason::from_der(ext.extn_value.as_bytes())?)),
        None => Ok(None),
    }
}

/// Check `leaf` against the CRL stored at `path`, which `issuer` must have
/// signed, using the current time.
pub fn check_against_crl(
    path: impl AsRef<Path>,
    leaf: &CertificateRef,
    issuer: &CertificateRef,
) -> Result<Verdict> {
    check_against_crl_at(path, leaf, issuer, SystemTime::now())
}

/// Like [`check_against_crl`] at an explicit point in time.
pub fn check_against_crl_at(
    path: impl AsRef<Path>,
    leaf: &CertificateRef,
    issuer: &CertificateRef,
    now: SystemTime,
) -> Result<Verdict> {
    RevocationList::load(path, DEFAULT_MAX_CRL_SIZE)?.check(leaf, issuer, now)
}

impl TryFrom<&[u8]> for RevocationList {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        Self::parse(bytes)
    }
}
