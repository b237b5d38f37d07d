//! Revocation policy, fixed when the verifier is built.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::crl::DEFAULT_MAX_CRL_SIZE;

/// Default bound on an OCSP round trip.
pub const DEFAULT_OCSP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound on an OCSP response body, in bytes.
pub const DEFAULT_MAX_OCSP_RESPONSE_SIZE: usize = 64 * 1024;

/// Which of the responders advertised by a certificate are queried.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ResponderSelection {
    /// Only the first advertised responder.
    #[default]
    FirstAdvertised,
    /// Each responder in turn until one answers. Only query errors move on
    /// to the next responder; the first verdict is final.
    OrderedFallback,
}

/// Which revocation authorities are consulted and how.
///
/// With neither OCSP nor a CRL configured every chain is accepted.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RevocationConfig {
    use_ocsp: bool,
    crl_path: Option<PathBuf>,
    ocsp_timeout: Duration,
    responder_selection: ResponderSelection,
    max_ocsp_response_size: usize,
    max_crl_size: u64,
}

impl Default for RevocationConfig {
    fn default() -> Self {
        Self {
            use_ocsp: false,
            crl_path: None,
            ocsp_timeout: DEFAULT_OCSP_TIMEOUT,
            responder_selection: ResponderSelection::default(),
            max_ocsp_response_size: DEFAULT_MAX_OCSP_RESPONSE_SIZE,
            max_crl_size: DEFAULT_MAX_CRL_SIZE,
        }
    }
}

impl RevocationConfig {
    /// Start from the defaults: no OCSP, no CRL.
    pub fn builder() -> RevocationConfigBuilder {
        RevocationConfigBuilder::default()
    }

    /// Whether the leaf's OCSP responder is queried.
    pub fn use_ocsp(&self) -> bool {
        self.use_ocsp
    }

    /// CRL file checked for every leaf.
    pub fn crl_path(&self) -> Option<&Path> {
        self.crl_path.as_deref()
    }

    /// Bound on a single OCSP round trip.
    pub fn ocsp_timeout(&self) -> Duration {
        self.ocsp_timeout
    }

    /// Responder selection policy.
    pub fn responder_selection(&self) -> ResponderSelection {
        self.responder_selection
    }

    /// Largest accepted OCSP response body.
    pub fn max_ocsp_response_size(&self) -> usize {
        self.max_ocsp_response_size
    }

    /// Largest accepted CRL file.
    pub fn max_crl_size(&self) -> u64 {
        self.max_crl_size
    }

    /// Whether any revocation authority is configured.
    pub fn is_enabled(&self) -> bool {
        self.use_ocsp || self.crl_path.is_some()
    }
}

/// Builder for [`RevocationConfig`].
#[derive(Clone, Debug, Default)]
pub struct RevocationConfigBuilder {
    config: RevocationConfig,
}

impl RevocationConfigBuilder {
    /// Query the leaf's OCSP responder.
    pub fn use_ocsp(mut self, enable: bool) -> Self {
        self.config.use_ocsp = enable;
        self
    }

    /// Check the leaf against the CRL at `path`. An empty path disables the
    /// CRL check.
    pub fn crl_path(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.config.crl_path = if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        };
        self
    }

    /// Bound each OCSP round trip.
    pub fn ocsp_timeout(mut self, timeout: Duration) -> Self {
        self.config.ocsp_timeout = timeout;
        self
    }

    /// Set the responder selection policy.
    pub fn responder_selection(mut self, selection: ResponderSelection) -> Self {
        self.config.responder_selection = selection;
        self
    }

    /// Limit OCSP response bodies to `size` bytes.
    pub fn max_ocsp_response_size(mut self, size: usize) -> Self {
        self.config.max_ocsp_response_size = size;
        self
    }

    /// Limit CRL files to `size` bytes.
    pub fn max_crl_size(mut self, size: u64) -> Self {
        self.config.max_crl_size = size;
        self
    }

    /// Finish the configuration.
    pub fn build(self) -> RevocationConfig {
        self.config
    }
}
