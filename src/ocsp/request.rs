//! `OCSPRequest` construction ([RFC 6960 § 4.1.1]).
//!
//! [RFC 6960 § 4.1.1]: https://datatracker.ietf.org/doc/html/rfc6960#section-4.1.1

use der::asn1::{Any, OctetString};
use der::Encode;
use spki::AlgorithmIdentifierOwned;
use x509_cert::serial_number::SerialNumber;
use x509_ocsp::{CertId, OcspRequest, Request, TbsRequest, Version};

use crate::certificate::{serial_to_int, CertificateRef};
use crate::errors::Result;
use crate::hash::HashAlgorithm;

/// The (issuer, serial) pair a query is about, as carried in a `CertID`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CertIdentity {
    algorithm: HashAlgorithm,
    issuer_name_hash: Vec<u8>,
    issuer_key_hash: Vec<u8>,
    serial_number: SerialNumber,
}

impl CertIdentity {
    /// Bind `leaf`'s serial number to `issuer`, hashing the issuer's
    /// distinguished name and public key with `algorithm`.
    pub fn new(
        algorithm: HashAlgorithm,
        leaf: &CertificateRef,
        issuer: &CertificateRef,
    ) -> Result<Self> {
        let (issuer_name_hash, issuer_key_hash) = issuer_hashes(algorithm, issuer)?;
        Ok(Self {
            algorithm,
            issuer_name_hash,
            issuer_key_hash,
            serial_number: leaf.serial_number().clone(),
        })
    }

    /// Hash function of the issuer hashes.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Hash of the issuer's DER encoded subject name.
    pub fn issuer_name_hash(&self) -> &[u8] {
        &self.issuer_name_hash
    }

    /// Hash of the issuer's `subjectPublicKey` bits.
    pub fn issuer_key_hash(&self) -> &[u8] {
        &self.issuer_key_hash
    }

    /// Serial number of the certificate being queried.
    pub fn serial_number(&self) -> &SerialNumber {
        &self.serial_number
    }

    /// The `CertID` structure for this identity.
    pub fn to_cert_id(&self) -> Result<CertId> {
        Ok(CertId {
            hash_algorithm: AlgorithmIdentifierOwned {
                oid: self.algorithm.oid(),
                parameters: Some(Any::null()),
            },
            issuer_name_hash: OctetString::new(self.issuer_name_hash.clone())?,
            issuer_key_hash: OctetString::new(self.issuer_key_hash.clone())?,
            serial_number: self.serial_number.clone(),
        })
    }

    /// DER encoding of an unsigned `OCSPRequest` asking about this identity
    /// alone, without extensions.
    pub fn to_request_der(&self) -> Result<Vec<u8>> {
        let request = OcspRequest {
            tbs_request: TbsRequest {
                version: Version::V1,
                requestor_name: None,
                request_list: vec![Request {
                    req_cert: self.to_cert_id()?,
                    single_request_extensions: None,
                }],
                request_extensions: None,
            },
            optional_signature: None,
        };
        Ok(request.to_der()?)
    }

    /// Whether `cert_id` names this identity.
    ///
    /// The responder may answer with a different hash algorithm than the one
    /// requested, so the issuer hashes are recomputed with whatever supported
    /// algorithm `cert_id` uses. Unsupported algorithms never match.
    pub fn matches(&self, cert_id: &CertId, issuer: &CertificateRef) -> Result<bool> {
        if serial_to_int(&cert_id.serial_number) != serial_to_int(&self.serial_number) {
            return Ok(false);
        }

        let algorithm = match HashAlgorithm::from_oid(&cert_id.hash_algorithm.oid) {
            Some(algorithm) => algorithm,
            None => return Ok(false),
        };

        let (name_hash, key_hash) = if algorithm == self.algorithm {
            (self.issuer_name_hash.clone(), self.issuer_key_hash.clone())
        } else {
            issuer_hashes(algorithm, issuer)?
        };

        Ok(cert_id.issuer_name_hash.as_bytes() == name_hash.as_slice()
            && cert_id.issuer_key_hash.as_bytes() == key_hash.as_slice())
    }
}

fn issuer_hashes(algorithm: HashAlgorithm, issuer: &CertificateRef) -> Result<(Vec<u8>, Vec<u8>)> {
    let name = issuer.subject().to_der()?;
    let key = issuer
        .subject_public_key_info()
        .subject_public_key
        .raw_bytes();
    Ok((algorithm.digest(&name), algorithm.digest(key)))
}
