//! Parses the X-Ray daemon address, single-form (`host:port` shared by TCP
//! and UDP) or double-form (`tcp:host:port udp:host:port`, order-insensitive).

use std::net::{SocketAddr, ToSocketAddrs};

use crate::error::{SamplingError, SamplingResult};

const DEFAULT_ADDRESS: &str = "127.0.0.1:2000";

/// The TCP (control-plane RPC) and UDP (segment emission) endpoints of the
/// local X-Ray daemon. Only `tcp` is consulted by this engine; `udp` is
/// carried through for the surrounding SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaemonEndpoints {
    pub tcp: SocketAddr,
    pub udp: SocketAddr,
}

impl Default for DaemonEndpoints {
    fn default() -> Self {
        // Infallible: the compiled-in default always parses.
        parse("").expect("default daemon address must parse")
    }
}

/// Resolves the effective daemon address: `AWS_XRAY_DAEMON_ADDRESS`, when
/// set, overrides whatever the caller supplied programmatically.
pub fn resolve(programmatic: Option<&str>) -> SamplingResult<DaemonEndpoints> {
    if let Ok(env_value) = std::env::var("AWS_XRAY_DAEMON_ADDRESS") {
        return parse(&env_value);
    }
    parse(programmatic.unwrap_or(""))
}

/// Parses a daemon address string in either single or double form.
pub fn parse(address: &str) -> SamplingResult<DaemonEndpoints> {
    let address = address.trim();
    if address.is_empty() {
        let addr = resolve_host_port(DEFAULT_ADDRESS)?;
        return Ok(DaemonEndpoints {
            tcp: addr,
            udp: addr,
        });
    }

    let parts: Vec<&str> = address.split_whitespace().collect();
    match parts.len() {
        1 => {
            let addr = resolve_host_port(parts[0])?;
            Ok(DaemonEndpoints {
                tcp: addr,
                udp: addr,
            })
        }
        2 => parse_double_form(parts[0], parts[1]),
        _ => Err(SamplingError::configuration(format!(
            "invalid daemon address: {address:?}"
        ))),
    }
}

fn parse_double_form(first: &str, second: &str) -> SamplingResult<DaemonEndpoints> {
    let (tcp_raw, udp_raw) = match (strip_scheme(first), strip_scheme(second)) {
        (Some(("tcp", tcp)), Some(("udp", udp))) => (tcp, udp),
        (Some(("udp", udp)), Some(("tcp", tcp))) => (tcp, udp),
        _ => {
            return Err(SamplingError::configuration(format!(
                "invalid daemon address: {first:?} {second:?}"
            )))
        }
    };

    Ok(DaemonEndpoints {
        tcp: resolve_host_port(tcp_raw)?,
        udp: resolve_host_port(udp_raw)?,
    })
}

/// Splits a `scheme:host:port` token into `(scheme, "host:port")`.
fn strip_scheme(token: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = token.split_once(':')?;
    match scheme {
        "tcp" | "udp" => Some((scheme, rest)),
        _ => None,
    }
}

fn resolve_host_port(host_port: &str) -> SamplingResult<SocketAddr> {
    let (host, port) = host_port.rsplit_once(':').ok_or_else(|| {
        SamplingError::configuration(format!("invalid daemon address: {host_port:?}"))
    })?;

    let port: u16 = port.parse().map_err(|_| {
        SamplingError::configuration(format!("invalid daemon address port: {port:?}"))
    })?;

    (host, port)
        .to_socket_addrs()
        .map_err(|e| SamplingError::configuration(format!("invalid daemon address: {e}")))?
        .next()
        .ok_or_else(|| SamplingError::configuration(format!("invalid daemon address: {host_port:?}")))
}
