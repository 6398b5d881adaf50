use std::str::FromStr;

use crate::config::ProbeConfig;
use crate::domain::target::Target;
use crate::error::ProbeError;

/// How the port of a target is chosen when the input carries none.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortPolicy {
    /// The input must spell out `host:port`.
    Required,
    /// Fall back to the port conventional for the scheme.
    Scheme { http: u16, https: u16 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Scheme {
    Http,
    Https,
}

/// Strict port parsing with range check (1..=65535).
fn parse_port_strict(s: &str) -> Result<u16, ProbeError> {
    let raw = u32::from_str(s)
        .map_err(|_| ProbeError::InvalidTarget(format!("invalid port: '{s}'")))?;
    if raw == 0 || raw > u16::MAX as u32 {
        return Err(ProbeError::InvalidTarget(format!(
            "port out of range [1..65535]: {raw}"
        )));
    }
    Ok(raw as u16)
}

/// Count occurrences of ':' (helps distinguish host:port vs bare IPv6).
#[inline]
fn colon_count(s: &str) -> usize {
    s.as_bytes().iter().filter(|&&b| b == b':').count()
}

fn strip_scheme(s: &str) -> Result<(Option<Scheme>, &str), ProbeError> {
    let Some(pos) = s.find("://") else {
        return Ok((None, s));
    };
    let scheme = match s[..pos].to_ascii_lowercase().as_str() {
        "http" => Scheme::Http,
        "https" => Scheme::Https,
        other => {
            return Err(ProbeError::InvalidTarget(format!(
                "unsupported scheme '{other}'"
            )));
        }
    };
    Ok((Some(scheme), &s[pos + 3..]))
}

/// Split `host[:port]` into the host and an optional explicit port.
fn split_authority(authority: &str) -> Result<(&str, Option<u16>), ProbeError> {
    // Bracketed IPv6: "[v6]" or "[v6]:port"
    if let Some(rest) = authority.strip_prefix('[') {
        let Some(bracket_pos) = rest.find(']') else {
            return Err(ProbeError::InvalidTarget(format!(
                "missing closing ']' in '{authority}'"
            )));
        };
        let host = &rest[..bracket_pos];
        let tail = &rest[bracket_pos + 1..];
        let port = if let Some(p) = tail.strip_prefix(':') {
            Some(parse_port_strict(p)?)
        } else if tail.is_empty() {
            None
        } else {
            return Err(ProbeError::InvalidTarget(format!(
                "unexpected trailing characters in '{authority}'"
            )));
        };
        return Ok((host, port));
    }

    match colon_count(authority) {
        0 => Ok((authority, None)),
        1 => {
            let (host, port_str) = authority.split_once(':').unwrap_or((authority, ""));
            Ok((host, Some(parse_port_strict(port_str)?)))
        }
        // bare IPv6 literal, no port allowed
        _ => Ok((authority, None)),
    }
}

/// Parse a user supplied target without regexes.
///
/// Accepted shapes:
/// - `host`, `host/path`
/// - `host:port`, `host:port/path`
/// - `[2001:db8::1]:port/path`, `2001:db8::1` (bare IPv6, no port)
///
/// each optionally prefixed by `http://` or `https://`. When
/// `scheme_implies_tls` is set, `https://` turns TLS on; without a scheme,
/// an explicit port equal to the policy's https port does too. An explicit
/// `http://` always means plain TCP.
pub fn parse_target(
    raw: &str,
    ports: PortPolicy,
    scheme_implies_tls: bool,
) -> Result<Target, ProbeError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(ProbeError::InvalidTarget("empty target".into()));
    }

    let (scheme, rest) = strip_scheme(s)?;
    let (authority, path) = match rest.split_once('/') {
        Some((authority, tail)) => (authority, format!("/{tail}")),
        None => (rest, "/".to_string()),
    };

    let (host, explicit_port) = split_authority(authority)?;
    if host.is_empty() {
        return Err(ProbeError::InvalidTarget(format!("missing host in '{s}'")));
    }

    let port = match (explicit_port, ports) {
        (Some(port), _) => port,
        (None, PortPolicy::Scheme { https, .. }) if scheme == Some(Scheme::Https) => https,
        (None, PortPolicy::Scheme { http, .. }) => http,
        (None, PortPolicy::Required) => {
            return Err(ProbeError::InvalidTarget(format!(
                "missing port in '{s}', expected host:port"
            )));
        }
    };

    let use_tls = scheme_implies_tls
        && match (scheme, ports) {
            (Some(Scheme::Https), _) => true,
            (Some(Scheme::Http), _) => false,
            (None, PortPolicy::Scheme { https, .. }) => port == https,
            (None, PortPolicy::Required) => false,
        };

    Ok(Target {
        host: host.to_string(),
        path,
        port,
        use_tls,
    })
}

/// Parse a handshake target, which must carry an explicit port.
pub fn parse_endpoint(raw: &str) -> Result<Target, ProbeError> {
    parse_target(raw, PortPolicy::Required, true)
}

/// Parse an HTTP probe target; the port follows the scheme unless given.
pub fn parse_url(raw: &str, cfg: &ProbeConfig) -> Result<Target, ProbeError> {
    let ports = PortPolicy::Scheme {
        http: cfg.http_port,
        https: cfg.https_port,
    };
    parse_target(raw, ports, true)
}
