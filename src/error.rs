use thiserror::Error;

/// Top-level error type for wiretime probes.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The target string could not be turned into a host and port.
    #[error("invalid target: {0}")]
    InvalidTarget(String),
    /// Probe configuration rejected before any I/O.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    /// DNS failure, refused or unreachable peer, connect timeout.
    #[error("connect: {0}")]
    Connect(String),
    /// TLS connector setup or handshake failure.
    #[error("tls: {0}")]
    Tls(String),
    /// Socket read failure after a successful connect.
    #[error("read: {0}")]
    Read(String),
    /// Failure while sending the request.
    #[error("write: {0}")]
    Write(String),
    /// Result encoding or decoding failure.
    #[error("encode: {0}")]
    Encode(String),
    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ProbeError {
    /// Process exit code used by the CLI for this error kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            ProbeError::InvalidTarget(_) | ProbeError::InvalidConfig(_) => 2,
            ProbeError::Connect(_) => 3,
            ProbeError::Tls(_) => 4,
            ProbeError::Read(_) | ProbeError::Write(_) => 5,
            _ => 1,
        }
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for ProbeError {
    fn from(err: serde_json::Error) -> Self {
        ProbeError::Encode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_kind() {
        assert_eq!(ProbeError::InvalidTarget("x".into()).exit_code(), 2);
        assert_eq!(ProbeError::Connect("refused".into()).exit_code(), 3);
        assert_eq!(ProbeError::Tls("bad cert".into()).exit_code(), 4);
        assert_eq!(ProbeError::Read("reset".into()).exit_code(), 5);
        assert_eq!(ProbeError::Encode("eof".into()).exit_code(), 1);
    }

    #[test]
    fn display_carries_kind_prefix() {
        let err = ProbeError::Connect("connection refused".into());
        assert_eq!(err.to_string(), "connect: connection refused");
    }
}
