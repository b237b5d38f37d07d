//! Parsed X.509 certificates and the verified chain handed over by the TLS
//! layer.

use std::time::SystemTime;

use const_oid::db::rfc4519::COMMON_NAME;
use const_oid::db::rfc5912::ID_AD_OCSP;
use const_oid::ObjectIdentifier;
use der::asn1::Any;
use der::{Decode, Encode};
use num_bigint::BigInt;
use spki::SubjectPublicKeyInfoOwned;
use tracing::debug;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::ext::pkix::name::{DirectoryString, GeneralName};
use x509_cert::ext::pkix::{AuthorityInfoAccessSyntax, ExtendedKeyUsage};
use x509_cert::name::{Name, RelativeDistinguishedName};
use x509_cert::serial_number::SerialNumber;
use x509_cert::Certificate;

use crate::errors::{Error, Result};
use crate::verify::SignedData;

/// An immutable, parsed X.509 certificate together with the DER it was
/// parsed from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CertificateRef {
    der: Vec<u8>,
    cert: Certificate,
}

impl CertificateRef {
    /// Parse a DER encoded certificate.
    pub fn from_der(der: impl Into<Vec<u8>>) -> Result<Self> {
        let der = der.into();
        let cert = Certificate::from_der(&der)?;
        Ok(Self { der, cert })
    }

    /// Parse a single PEM `CERTIFICATE` block.
    pub fn from_pem(pem: impl AsRef<[u8]>) -> Result<Self> {
        let (label, der) = der::pem::decode_vec(pem.as_ref())?;
        if label != "CERTIFICATE" {
            return Err(Error::PemLabel {
                label: label.to_string(),
            });
        }
        Self::from_der(der)
    }

    /// Parse every `CERTIFICATE` block of a PEM bundle, in file order.
    pub fn load_pem_chain(pem: impl AsRef<[u8]>) -> Result<Vec<Self>> {
        Certificate::load_pem_chain(pem.as_ref())?
            .into_iter()
            .map(|cert| {
                let der = cert.to_der()?;
                Ok(Self { der, cert })
            })
            .collect()
    }

    /// The DER encoding.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// The decoded certificate.
    pub fn certificate(&self) -> &Certificate {
        &self.cert
    }

    /// The serial number as encoded in the certificate.
    pub fn serial_number(&self) -> &SerialNumber {
        &self.cert.tbs_certificate.serial_number
    }

    /// The serial number as an integer.
    ///
    /// Serials are compared with this value, never with their encoding: two
    /// encodings that differ only by a leading zero octet name the same
    /// certificate.
    pub fn serial(&self) -> BigInt {
        serial_to_int(self.serial_number())
    }

    /// Subject distinguished name.
    pub fn subject(&self) -> &Name {
        &self.cert.tbs_certificate.subject
    }

    /// Issuer distinguished name.
    pub fn issuer(&self) -> &Name {
        &self.cert.tbs_certificate.issuer
    }

    /// The first `commonName` of the subject, if it is a directory string.
    pub fn common_name(&self) -> Option<String> {
        self.subject()
            .0
            .iter()
            .flat_map(|rdn| rdn.0.iter())
            .filter(|atv| atv.oid == COMMON_NAME)
            .find_map(|atv| directory_string(&atv.value))
    }

    /// The subject public key.
    pub fn subject_public_key_info(&self) -> &SubjectPublicKeyInfoOwned {
        &self.cert.tbs_certificate.subject_public_key_info
    }

    /// URIs of the `id-ad-ocsp` access descriptions in the Authority
    /// Information Access extension, in certificate order.
    ///
    /// Access locations that are not URIs are skipped.
    pub fn ocsp_responders(&self) -> Result<Vec<String>> {
        let aia = match self
            .cert
            .tbs_certificate
            .get::<AuthorityInfoAccessSyntax>()?
        {
            Some((_, aia)) => aia,
            None => return Ok(Vec::new()),
        };

        Ok(aia
            .0
            .into_iter()
            .filter(|ad| ad.access_method == ID_AD_OCSP)
            .filter_map(|ad| match ad.access_location {
                GeneralName::UniformResourceIdentifier(uri) => Some(uri.to_string()),
                _ => None,
            })
            .collect())
    }

    /// Key purposes of the Extended Key Usage extension. Empty when the
    /// extension is absent.
    pub fn extended_key_usage(&self) -> Result<Vec<ObjectIdentifier>> {
        Ok(self
            .cert
            .tbs_certificate
            .get::<ExtendedKeyUsage>()?
            .map(|(_, eku)| eku.0)
            .unwrap_or_default())
    }

    /// Whether `now` lies inside `notBefore..=notAfter`.
    pub fn is_valid_at(&self, now: SystemTime) -> bool {
        let validity = &self.cert.tbs_certificate.validity;
        validity.not_before.to_system_time() <= now && now <= validity.not_after.to_system_time()
    }

    /// Check that `issuer` names this certificate's issuer and that its key
    /// produced this certificate's signature.
    pub fn verify_issued_by(&self, issuer: &CertificateRef) -> Result<()> {
        if !names_match(self.issuer(), issuer.subject()) {
            return Err(Error::certificate(format!(
                "{} is not the issuer of {}",
                issuer.subject(),
                self.subject()
            )));
        }
        SignedData::parse(&self.der)?.verify_with(issuer.subject_public_key_info())
    }

}

impl TryFrom<&[u8]> for CertificateRef {
    type Error = Error;

    fn try_from(der: &[u8]) -> Result<Self> {
        Self::from_der(der)
    }
}

/// Compare distinguished names as [RFC 5280 § 7.1] asks: attribute types
/// must be equal and directory string values match after case folding and
/// whitespace compression, whichever string type encodes them. Any other
/// value must be bytewise identical.
///
/// [RFC 5280 § 7.1]: https://datatracker.ietf.org/doc/html/rfc5280#section-7.1
pub fn names_match(a: &Name, b: &Name) -> bool {
    a.0.len() == b.0.len()
        && a.0
            .iter()
            .zip(b.0.iter())
            .all(|(x, y)| rdns_match(x, y))
}

fn rdns_match(a: &RelativeDistinguishedName, b: &RelativeDistinguishedName) -> bool {
    a.0.len() == b.0.len()
        && a.0
            .iter()
            .all(|x| b.0.iter().any(|y| attributes_match(x, y)))
        && b.0
            .iter()
            .all(|y| a.0.iter().any(|x| attributes_match(x, y)))
}

fn attributes_match(a: &AttributeTypeAndValue, b: &AttributeTypeAndValue) -> bool {
    if a.oid != b.oid {
        return false;
    }
    match (directory_string(&a.value), directory_string(&b.value)) {
        (Some(x), Some(y)) => fold(&x) == fold(&y),
        _ => a.value == b.value,
    }
}

fn directory_string(value: &Any) -> Option<String> {
    let value = value.to_der().ok()?;
    match DirectoryString::from_der(&value).ok()? {
        DirectoryString::PrintableString(s) => Some(s.to_string()),
        DirectoryString::TeletexString(s) => Some(s.to_string()),
        DirectoryString::Utf8String(s) => Some(s),
    }
}

fn fold(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub(crate) fn serial_to_int(serial: &SerialNumber) -> BigInt {
    BigInt::from_signed_bytes_be(serial.as_bytes())
}

/// Certificates in verification order: index 0 is the leaf, index 1 its
/// immediate issuer.
///
/// The chain is assumed to be already validated up to a trust anchor; only
/// revocation of the leaf is checked against it.
#[derive(Clone, Debug)]
pub struct VerifiedChain {
    certs: Vec<CertificateRef>,
}

impl VerifiedChain {
    /// Wrap a non-empty, ordered list of certificates.
    pub fn new(certs: Vec<CertificateRef>) -> Result<Self> {
        if certs.is_empty() {
            return Err(Error::certificate("empty certificate chain"));
        }
        Ok(Self { certs })
    }

    /// Pair `leaf` with its issuer, picked from `candidates` in order.
    ///
    /// Only candidates whose subject matches the leaf's issuer name qualify.
    /// The first whose key verifies the leaf signature wins. When none does,
    /// the first whose key or signature algorithm is not supported by
    /// [`verify_signature`](crate::verify_signature) is taken instead. A
    /// candidate whose key rejects the signature is never used. Without any
    /// qualifying candidate the chain holds the leaf alone.
    pub fn assemble(
        leaf: CertificateRef,
        candidates: impl IntoIterator<Item = CertificateRef>,
    ) -> Self {
        let mut unverifiable = None;
        let mut issuer = None;

        for candidate in candidates {
            if !names_match(candidate.subject(), leaf.issuer()) {
                continue;
            }
            match leaf.verify_issued_by(&candidate) {
                Ok(()) => {
                    issuer = Some(candidate);
                    break;
                }
                Err(Error::UnsupportedSignatureAlgorithm(_) | Error::UnsupportedKey) => {
                    if unverifiable.is_none() {
                        debug!(
                            subject = %candidate.subject(),
                            "issuer signature cannot be checked"
                        );
                        unverifiable = Some(candidate);
                    }
                }
                Err(err) => {
                    debug!(%err, subject = %candidate.subject(), "skipping issuer candidate")
                }
            }
        }

        let mut certs = vec![leaf];
        certs.extend(issuer.or(unverifiable));
        Self { certs }
    }

    /// The end-entity certificate.
    pub fn leaf(&self) -> &CertificateRef {
        &self.certs[0]
    }

    /// The certificate that signed the leaf, if the chain has one.
    pub fn issuer(&self) -> Option<&CertificateRef> {
        self.certs.get(1)
    }

    /// All certificates, leaf first.
    pub fn certificates(&self) -> &[CertificateRef] {
        &self.certs
    }
}
