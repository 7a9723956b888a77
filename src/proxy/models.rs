//! Proxy data models

use serde::Serialize;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Country code used when a source does not say where a proxy lives
pub const UNKNOWN_COUNTRY: &str = "unknown";

/// Transport a proxy declares it speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProxyType {
    #[default]
    Http,
    Socks5,
}

impl ProxyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyType::Http => "http",
            ProxyType::Socks5 => "socks5",
        }
    }
}

impl fmt::Display for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProxyType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(ProxyType::Http),
            "socks5" => Ok(ProxyType::Socks5),
            other => Err(anyhow::anyhow!(
                "Invalid proxy type: {}. Use: http, socks5",
                other
            )),
        }
    }
}

/// Anonymity level claimed by the source that listed the proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum Anonymity {
    Elite,
    Anonymous,
    #[default]
    Unspecified,
}

impl Anonymity {
    /// Parse a label as printed in full-form output lines
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "elite" => Some(Anonymity::Elite),
            "anonymous" => Some(Anonymity::Anonymous),
            "unspecified" | "" => Some(Anonymity::Unspecified),
            _ => None,
        }
    }
}

/// Normalized identity of a proxy endpoint
///
/// IP literals are canonicalized through [`IpAddr`], other hosts are
/// trimmed and lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CandidateKey {
    pub host: String,
    pub port: u16,
}

impl CandidateKey {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: normalize_host(host),
            port,
        }
    }
}

impl fmt::Display for CandidateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

fn normalize_host(host: &str) -> String {
    let trimmed = host.trim().trim_start_matches('[').trim_end_matches(']');
    match trimmed.parse::<IpAddr>() {
        Ok(ip) => ip.to_string(),
        Err(_) => trimmed.to_lowercase(),
    }
}

/// A harvested, not yet verified proxy endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub host: String,
    pub port: u16,
    pub proxy_type: ProxyType,
    /// ISO 3166 alpha-2 code, or [`UNKNOWN_COUNTRY`]
    pub country: String,
    pub anonymity: Anonymity,
}

impl Candidate {
    pub fn new(host: &str, port: u16, proxy_type: ProxyType) -> Self {
        Self {
            host: normalize_host(host),
            port,
            proxy_type,
            country: UNKNOWN_COUNTRY.to_string(),
            anonymity: Anonymity::Unspecified,
        }
    }

    pub fn with_country(mut self, country: &str) -> Self {
        let country = country.trim();
        self.country = if country.len() == 2 && country.chars().all(|c| c.is_ascii_alphabetic()) {
            country.to_uppercase()
        } else {
            UNKNOWN_COUNTRY.to_string()
        };
        self
    }

    pub fn with_anonymity(mut self, anonymity: Anonymity) -> Self {
        self.anonymity = anonymity;
        self
    }

    pub fn key(&self) -> CandidateKey {
        CandidateKey::new(&self.host, self.port)
    }

    /// Proxy URL understood by reqwest
    pub fn url(&self) -> String {
        format!("{}://{}", self.proxy_type, self.to_simple_string())
    }

    /// `address:port`, with IPv6 addresses in brackets
    pub fn to_simple_string(&self) -> String {
        match self.host.parse::<IpAddr>() {
            Ok(IpAddr::V6(v6)) => format!("[{}]:{}", v6, self.port),
            _ => format!("{}:{}", self.host, self.port),
        }
    }
}

/// Outcome of verifying one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Dead,
    LiveElite,
    LiveAnonymous,
    LiveNotAnonymous,
}

impl Verdict {
    pub fn is_live(&self) -> bool {
        !matches!(self, Verdict::Dead)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Dead => "Dead",
            Verdict::LiveElite => "Elite",
            Verdict::LiveAnonymous => "Anonymous",
            Verdict::LiveNotAnonymous => "NotAnonymous",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A candidate paired with its single verdict
#[derive(Debug, Clone, Serialize)]
pub struct VerifiedProxy {
    pub candidate: Candidate,
    pub verdict: Verdict,
    pub response_time_ms: Option<u64>,
}

impl VerifiedProxy {
    pub fn dead(candidate: Candidate) -> Self {
        Self {
            candidate,
            verdict: Verdict::Dead,
            response_time_ms: None,
        }
    }

    pub fn live(candidate: Candidate, verdict: Verdict, response_time_ms: u64) -> Self {
        Self {
            candidate,
            verdict,
            response_time_ms: Some(response_time_ms),
        }
    }

    pub fn is_live(&self) -> bool {
        self.verdict.is_live()
    }

    pub fn to_simple_string(&self) -> String {
        self.candidate.to_simple_string()
    }

    /// `address:port country type anonymity-label`
    pub fn to_full_string(&self) -> String {
        format!(
            "{} {} {} {}",
            self.candidate.to_simple_string(),
            self.candidate.country,
            self.candidate.proxy_type,
            self.verdict.label()
        )
    }
}

impl fmt::Display for VerifiedProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_full_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_creation() {
        let candidate = Candidate::new("127.0.0.1", 8080, ProxyType::Http);
        assert_eq!(candidate.host, "127.0.0.1");
        assert_eq!(candidate.port, 8080);
        assert_eq!(candidate.proxy_type, ProxyType::Http);
        assert_eq!(candidate.country, UNKNOWN_COUNTRY);
        assert_eq!(candidate.anonymity, Anonymity::Unspecified);
    }

    #[test]
    fn test_country_normalization() {
        let candidate = Candidate::new("1.2.3.4", 80, ProxyType::Http).with_country(" fr ");
        assert_eq!(candidate.country, "FR");

        let candidate = Candidate::new("1.2.3.4", 80, ProxyType::Http).with_country("France");
        assert_eq!(candidate.country, UNKNOWN_COUNTRY);
    }

    #[test]
    fn test_key_normalization() {
        let a = Candidate::new(" Example.COM ", 1080, ProxyType::Socks5);
        let b = Candidate::new("example.com", 1080, ProxyType::Http);
        assert_eq!(a.key(), b.key());

        let v6 = CandidateKey::new("[0:0:0:0:0:0:0:1]", 3128);
        assert_eq!(v6, CandidateKey::new("::1", 3128));
        assert_ne!(v6, CandidateKey::new("::1", 3129));
    }

    #[test]
    fn test_candidate_url() {
        let candidate = Candidate::new("127.0.0.1", 8080, ProxyType::Http);
        assert_eq!(candidate.url(), "http://127.0.0.1:8080");

        let candidate = Candidate::new("192.168.1.1", 1080, ProxyType::Socks5);
        assert_eq!(candidate.url(), "socks5://192.168.1.1:1080");

        let candidate = Candidate::new("::1", 1080, ProxyType::Socks5);
        assert_eq!(candidate.url(), "socks5://[::1]:1080");
    }

    #[test]
    fn test_ipv6_renders_bracketed() {
        let candidate = Candidate::new("::1", 1080, ProxyType::Socks5).with_country("NL");
        assert_eq!(candidate.to_simple_string(), "[::1]:1080");

        let verified = VerifiedProxy::live(candidate, Verdict::LiveAnonymous, 30);
        assert_eq!(verified.to_full_string(), "[::1]:1080 NL socks5 Anonymous");
    }

    #[test]
    fn test_proxy_type_from_str() {
        assert_eq!("HTTP".parse::<ProxyType>().unwrap(), ProxyType::Http);
        assert_eq!("socks5".parse::<ProxyType>().unwrap(), ProxyType::Socks5);
        assert!("socks4".parse::<ProxyType>().is_err());
    }

    #[test]
    fn test_verified_proxy_strings() {
        let candidate = Candidate::new("10.0.0.1", 3128, ProxyType::Http).with_country("DE");

        let verified = VerifiedProxy::live(candidate.clone(), Verdict::LiveNotAnonymous, 120);
        assert_eq!(verified.to_simple_string(), "10.0.0.1:3128");
        assert_eq!(verified.to_full_string(), "10.0.0.1:3128 DE http NotAnonymous");
        assert!(verified.is_live());

        let verified = VerifiedProxy::dead(candidate);
        assert!(!verified.is_live());
        assert!(verified.response_time_ms.is_none());
    }
}
