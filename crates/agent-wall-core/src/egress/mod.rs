//! Egress control: URL destination checks.
//!
//! Checks arguments for outbound URLs and blocks calls that point at a
//! private/reserved range, a cloud metadata endpoint, or an explicitly
//! blocked domain, using `std::net`'s built-in `Ipv4Addr`/`Ipv6Addr` range
//! predicates directly since every check here is against a fixed,
//! well-known set of ranges rather than operator-configured CIDR blocks.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use url::Url;

use crate::config::EgressControlConfig;

/// The outcome of evaluating one tool call's arguments for egress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EgressDecision {
    /// No blocked destination found.
    Allow,
    /// At least one URL was blocked.
    Deny {
        /// The URL that triggered the denial.
        url: String,
        /// Human-readable reason.
        reason: String,
    },
}

fn url_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://[^\s'\x22<>]+").unwrap())
}

/// Well-known cloud metadata hosts.
const METADATA_HOSTS: &[&str] = &[
    "169.254.169.254",
    "metadata.google.internal",
    "metadata.goog",
    "100.100.100.200",
    "169.254.170.2",
];

/// URL path substrings that identify a cloud metadata endpoint even when
/// reached through a host not in [`METADATA_HOSTS`] (e.g. a proxy or
/// load balancer in front of it).
const METADATA_PATH_MARKERS: &[&str] = &["/latest/meta-data", "/metadata/instance"];

/// Evaluates tool-call arguments for disallowed network destinations.
pub struct EgressControl {
    enabled: bool,
    allowed_domains: Vec<String>,
    blocked_domains: Vec<String>,
    block_private_ips: bool,
    block_metadata_endpoints: bool,
    exclude_tools: Vec<String>,
}

impl EgressControl {
    /// Build from configuration.
    pub fn new(config: &EgressControlConfig) -> Self {
        Self {
            enabled: config.enabled,
            allowed_domains: config.allowed_domains.iter().map(|d| d.to_lowercase()).collect(),
            blocked_domains: config.blocked_domains.iter().map(|d| d.to_lowercase()).collect(),
            block_private_ips: config.block_private_ips,
            block_metadata_endpoints: config.block_metadata_endpoints,
            exclude_tools: config.exclude_tools.clone(),
        }
    }

    /// Evaluate one tool call. URLs are extracted from every string leaf
    /// of `arguments`; the first blocked URL found short-circuits the
    /// evaluation.
    pub fn evaluate(&self, tool_name: &str, arguments: &Value) -> EgressDecision {
        if !self.enabled || self.exclude_tools.iter().any(|t| t.eq_ignore_ascii_case(tool_name)) {
            return EgressDecision::Allow;
        }

        for url_str in extract_urls(arguments) {
            if let Some(reason) = self.check_url(&url_str) {
                return EgressDecision::Deny { url: url_str, reason };
            }
        }
        EgressDecision::Allow
    }

    /// Evaluate a single URL string, returning the denial reason if any.
    fn check_url(&self, url_str: &str) -> Option<String> {
        let parsed = Url::parse(url_str).ok()?;
        let host = parsed.host_str()?.to_lowercase();

        if !self.allowed_domains.is_empty() && !domain_list_matches(&self.allowed_domains, &host) {
            return Some(format!("{host:?} is not in the allowed-domains list"));
        }

        if domain_list_matches(&self.blocked_domains, &host) {
            return Some(format!("{host:?} is in the blocked-domains list"));
        }

        if is_obfuscated_ip_literal(&host) {
            return Some(format!("{host:?} is an obfuscated IP literal"));
        }

        if self.block_metadata_endpoints
            && (METADATA_HOSTS.contains(&host.as_str())
                || METADATA_PATH_MARKERS.iter().any(|m| parsed.path().contains(m)))
        {
            return Some(format!("{host:?} is a cloud metadata endpoint"));
        }

        if self.block_private_ips {
            if host == "localhost" || host == "ip6-localhost" {
                return Some(format!("{host:?} is a loopback hostname"));
            }
            if let Ok(ip) = host.parse::<IpAddr>() {
                if is_private_or_reserved(ip) {
                    return Some(format!("{host:?} is a private/reserved IP address"));
                }
            }
        }

        None
    }
}

/// True if `host` exactly matches, or is a subdomain of, any domain in
/// `domains`.
fn domain_list_matches(domains: &[String], host: &str) -> bool {
    domains.iter().any(|d| host == d || host.ends_with(&format!(".{d}")))
}

/// Detect decimal/hex single-integer IP obfuscation (`http://3232235521/`
/// for `192.168.0.1`), a classic SSRF filter bypass. The decimal form
/// requires 8+ digits (`^\d{8,}$`) since a dotted-quad's largest integer
/// form, 4294967295, is 10 digits — shorter all-digit hosts are ordinary
/// hostnames, not obfuscated IPs.
fn is_obfuscated_ip_literal(host: &str) -> bool {
    if host.is_empty() {
        return false;
    }
    let digits_only = host.chars().all(|c| c.is_ascii_digit());
    if digits_only && host.len() >= 8 && !host.contains('.') {
        return host.parse::<u64>().map(|n| n <= u32::MAX as u64).unwrap_or(false);
    }
    if let Some(hex) = host.strip_prefix("0x").or_else(|| host.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16).is_ok();
    }
    false
}

fn is_private_or_reserved(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                || is_cgnat(v4)
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                || (v6.segments()[0] & 0xfe00) == 0xfc00 // fc00::/7
                || (v6.segments()[0] & 0xffc0) == 0xfe80 // fe80::/10
        }
    }
}

/// 100.64.0.0/10, the shared carrier-grade-NAT range (RFC 6598).
fn is_cgnat(v4: Ipv4Addr) -> bool {
    let o = v4.octets();
    o[0] == 100 && (o[1] & 0b1100_0000) == 0b0100_0000
}

fn extract_urls(v: &Value) -> Vec<String> {
    let mut out = Vec::new();
    collect_urls(v, &mut out);
    out
}

fn collect_urls(v: &Value, out: &mut Vec<String>) {
    match v {
        Value::String(s) => out.extend(url_pattern().find_iter(s).map(|m| m.as_str().to_string())),
        Value::Array(items) => items.iter().for_each(|i| collect_urls(i, out)),
        Value::Object(map) => map.values().for_each(|i| collect_urls(i, out)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn control(cfg: EgressControlConfig) -> EgressControl {
        EgressControl::new(&cfg)
    }

    #[test]
    fn allows_when_disabled() {
        let c = control(EgressControlConfig { enabled: false, ..Default::default() });
        let d = c.evaluate("fetch", &json!({"url": "http://169.254.169.254/latest/meta-data"}));
        assert_eq!(d, EgressDecision::Allow);
    }

    #[test]
    fn blocks_metadata_endpoint() {
        let c = control(EgressControlConfig { enabled: true, ..Default::default() });
        let d = c.evaluate("fetch", &json!({"url": "http://169.254.169.254/latest/meta-data"}));
        assert!(matches!(d, EgressDecision::Deny { .. }));
    }

    #[test]
    fn blocks_private_ip_when_configured() {
        let c = control(EgressControlConfig { enabled: true, block_private_ips: true, ..Default::default() });
        let d = c.evaluate("fetch", &json!({"url": "http://192.168.1.5/admin"}));
        assert!(matches!(d, EgressDecision::Deny { .. }));
    }

    #[test]
    fn allows_public_ip_when_private_blocking_on() {
        let c = control(EgressControlConfig { enabled: true, block_private_ips: true, ..Default::default() });
        let d = c.evaluate("fetch", &json!({"url": "http://93.184.216.34/"}));
        assert_eq!(d, EgressDecision::Allow);
    }

    #[test]
    fn blocked_domains_list_catches_subdomains() {
        let c = control(EgressControlConfig {
            enabled: true,
            blocked_domains: vec!["evil.example".to_string()],
            ..Default::default()
        });
        let d = c.evaluate("fetch", &json!({"url": "https://api.evil.example/exfil"}));
        assert!(matches!(d, EgressDecision::Deny { .. }));
    }

    #[test]
    fn allowed_domains_list_rejects_anything_else() {
        let c = control(EgressControlConfig {
            enabled: true,
            allowed_domains: vec!["good.example".to_string()],
            ..Default::default()
        });
        assert!(matches!(
            c.evaluate("fetch", &json!({"url": "https://other.example/"})),
            EgressDecision::Deny { .. }
        ));
        assert_eq!(
            c.evaluate("fetch", &json!({"url": "https://good.example/path"})),
            EgressDecision::Allow
        );
    }

    #[test]
    fn catches_decimal_obfuscated_ip() {
        let c = control(EgressControlConfig { enabled: true, block_private_ips: true, ..Default::default() });
        // 3232235521 == 192.168.0.1
        let d = c.evaluate("fetch", &json!({"url": "http://3232235521/"}));
        assert!(matches!(d, EgressDecision::Deny { .. }));
    }

    #[test]
    fn short_all_digit_host_is_not_treated_as_obfuscated_ip() {
        let c = control(EgressControlConfig { enabled: true, block_private_ips: true, ..Default::default() });
        // 7 digits, below the 8-digit floor: an ordinary (if unusual) hostname.
        let d = c.evaluate("fetch", &json!({"url": "http://1234567/"}));
        assert_eq!(d, EgressDecision::Allow);
    }

    #[test]
    fn excluded_tool_bypasses_all_checks() {
        let c = control(EgressControlConfig {
            enabled: true,
            block_private_ips: true,
            exclude_tools: vec!["internal_ping".to_string()],
            ..Default::default()
        });
        let d = c.evaluate("internal_ping", &json!({"url": "http://169.254.169.254/"}));
        assert_eq!(d, EgressDecision::Allow);
    }
}
