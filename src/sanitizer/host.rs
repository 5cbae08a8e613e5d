use std::fmt;
use std::net::IpAddr;
use std::sync::LazyLock;

use regex::Regex;

use super::{SanitizationError, SanitizationErrorKind, Sanitizer, ValidationResult};
use crate::{Tainted, Verified};

const MAX_HOSTNAME_LEN: usize = 253;

static LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?$").expect("static pattern compiles")
});

/// A hostname or IP literal that passed [`HostSanitizer`].
///
/// Cannot start with `-`, so it is never mistaken for a command-line flag
/// when passed as a discrete argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Host {
    /// IPv4 or IPv6 literal.
    Ip(IpAddr),
    /// DNS hostname, single-label names such as `localhost` included.
    Name(String),
}

impl Host {
    /// Returns the host in the form passed to external programs.
    pub fn as_str(&self) -> String {
        match self {
            Host::Ip(ip) => ip.to_string(),
            Host::Name(name) => name.clone(),
        }
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Host::Ip(ip) => write!(f, "{ip}"),
            Host::Name(name) => f.write_str(name),
        }
    }
}

/// Accepts IP literals and syntactically valid hostnames.
///
/// Hostname rules: at most 253 bytes, dot-separated labels of 1-63
/// alphanumerics or hyphens, no label starting or ending with a hyphen, an
/// optional single trailing dot, and a final label that is not all digits
/// (so `999.1.1.1` is neither an address nor a name).
///
/// Shell metacharacters, whitespace, and anything else fall outside the
/// allow-list, so `localhost; rm -rf /` and `$(whoami)` are rejected before
/// any process exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostSanitizer;

impl HostSanitizer {
    fn is_hostname(candidate: &str) -> bool {
        let name = candidate.strip_suffix('.').unwrap_or(candidate);
        if name.is_empty() || name.len() > MAX_HOSTNAME_LEN {
            return false;
        }

        let labels: Vec<&str> = name.split('.').collect();
        if !labels.iter().all(|label| LABEL.is_match(label)) {
            return false;
        }

        labels
            .last()
            .is_some_and(|tld| !tld.bytes().all(|b| b.is_ascii_digit()))
    }
}

impl Sanitizer<String> for HostSanitizer {
    type Output = Host;

    fn sanitize(&self, input: Tainted<String>) -> ValidationResult<Host> {
        let raw = input.into_inner();

        if let Ok(ip) = raw.parse::<IpAddr>() {
            return Ok(Verified::new_unchecked(Host::Ip(ip)));
        }

        if Self::is_hostname(&raw) {
            return Ok(Verified::new_unchecked(Host::Name(raw)));
        }

        Err(SanitizationError::new(
            SanitizationErrorKind::InvalidHost,
            "host must be a hostname or IP address",
        ))
    }
}
