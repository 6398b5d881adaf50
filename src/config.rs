//! Explicit per-probe configuration.

use std::time::Duration;

use crate::error::ProbeError;

/// Certificate validation policy for TLS probes.
///
/// `Disabled` is the default: probing is expected to reach hosts with
/// self-signed, expired or mismatched certificates, and the handshake time
/// is what is being measured, not the trust chain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TlsVerify {
    #[default]
    Disabled,
    Enabled,
}

/// Settings consumed by every probe entry point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Read buffer size for download probes.
    pub chunk_size: usize,
    /// Bytes after which a TTFB probe stops reading.
    pub threshold_bytes: usize,
    /// Bound on TCP connect plus TLS handshake.
    pub connect_timeout: Duration,
    /// Deadline applied to each socket read. `None` waits forever.
    pub read_timeout: Option<Duration>,
    /// Deadline for the whole response read loop, so a peer that never
    /// stops sending cannot keep a probe alive. `None` means unbounded.
    pub max_duration: Option<Duration>,
    pub tls_verify: TlsVerify,
    /// Port for `http://` and scheme-less HTTP probes.
    pub http_port: u16,
    /// Port for `https://` HTTP probes.
    pub https_port: u16,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            threshold_bytes: 1024,
            connect_timeout: Duration::from_secs(5),
            read_timeout: Some(Duration::from_secs(30)),
            max_duration: None,
            tls_verify: TlsVerify::Disabled,
            http_port: 80,
            https_port: 443,
        }
    }
}

impl ProbeConfig {
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_threshold_bytes(mut self, threshold_bytes: usize) -> Self {
        self.threshold_bytes = threshold_bytes;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_max_duration(mut self, limit: Option<Duration>) -> Self {
        self.max_duration = limit;
        self
    }

    pub fn with_tls_verify(mut self, verify: TlsVerify) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Reject settings that would make a read loop spin or never start.
    pub fn validate(&self) -> Result<(), ProbeError> {
        if self.chunk_size == 0 {
            return Err(ProbeError::InvalidConfig("chunk size must be > 0".into()));
        }
        if self.threshold_bytes == 0 {
            return Err(ProbeError::InvalidConfig(
                "threshold bytes must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_legacy_tool() {
        let cfg = ProbeConfig::default();
        assert_eq!(cfg.chunk_size, 1024);
        assert_eq!(cfg.threshold_bytes, 1024);
        assert_eq!(cfg.http_port, 80);
        assert_eq!(cfg.https_port, 443);
        assert_eq!(cfg.tls_verify, TlsVerify::Disabled);
        assert_eq!(cfg.max_duration, None);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_sizes_are_rejected() {
        let err = ProbeConfig::default().with_chunk_size(0).validate();
        assert!(matches!(err, Err(ProbeError::InvalidConfig(_))));
        let err = ProbeConfig::default().with_threshold_bytes(0).validate();
        assert!(matches!(err, Err(ProbeError::InvalidConfig(_))));
    }
}
