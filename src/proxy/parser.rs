//! Candidate line parsing and result file writing

use crate::proxy::models::{Anonymity, Candidate, ProxyType, VerifiedProxy};
use crate::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

static URL_FORMAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(http|socks5)://([^:/\s]+):(\d{1,5})/?$").expect("Invalid proxy URL regex")
});

/// Parser for candidate lists kept in local files
pub struct ProxyParser;

impl ProxyParser {
    /// Parse a single candidate line
    ///
    /// Supports formats:
    /// - HOST:PORT
    /// - scheme://HOST:PORT
    /// - HOST:PORT COUNTRY TYPE [ANONYMITY] (the full output form)
    pub fn parse_line(line: &str, default_type: ProxyType) -> Option<Candidate> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let mut fields = line.split_whitespace();
        let address = fields.next()?;

        let (mut candidate, declared) = match Self::parse_url_format(address) {
            Some(candidate) => (candidate, true),
            None => (Self::parse_colon_format(address, default_type)?, false),
        };

        if let Some(country) = fields.next() {
            candidate = candidate.with_country(country);
        }
        if let Some(proxy_type) = fields.next() {
            let proxy_type: ProxyType = proxy_type.parse().ok()?;
            if !declared {
                candidate.proxy_type = proxy_type;
            }
        }
        if let Some(label) = fields.next() {
            // NotAnonymous/Dead labels carry no hint for a fresh check
            candidate = candidate.with_anonymity(Anonymity::from_label(label).unwrap_or_default());
        }

        Some(candidate)
    }

    /// Parse URL format (e.g. socks5://ip:port)
    fn parse_url_format(address: &str) -> Option<Candidate> {
        let caps = URL_FORMAT.captures(address)?;
        let proxy_type: ProxyType = caps[1].parse().ok()?;
        let port: u16 = caps[3].parse().ok()?;
        if port == 0 {
            return None;
        }
        Some(Candidate::new(&caps[2], port, proxy_type))
    }

    /// Parse host:port format
    fn parse_colon_format(address: &str, default_type: ProxyType) -> Option<Candidate> {
        let (host, port) = address.rsplit_once(':')?;
        if host.is_empty() || (host.contains(':') && !host.starts_with('[')) {
            return None;
        }
        let port: u16 = port.parse().ok()?;
        if port == 0 {
            return None;
        }
        Some(Candidate::new(host, port, default_type))
    }

    /// Parse candidates from a string (multiple lines)
    pub fn parse_string(content: &str, default_type: ProxyType) -> Vec<Candidate> {
        content
            .lines()
            .filter_map(|line| Self::parse_line(line, default_type))
            .collect()
    }

    /// Parse candidates from a file
    pub fn parse_file<P: AsRef<Path>>(path: P, default_type: ProxyType) -> Result<Vec<Candidate>> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse_string(&content, default_type))
    }

    /// Render verified proxies one per line, compact or full
    pub fn render(proxies: &[VerifiedProxy], short: bool) -> String {
        proxies
            .iter()
            .map(|p| {
                if short {
                    p.to_simple_string()
                } else {
                    p.to_full_string()
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Render verified proxies as a JSON array
    pub fn render_json(proxies: &[VerifiedProxy]) -> Result<String> {
        Ok(serde_json::to_string_pretty(proxies)?)
    }

    /// Write already rendered output, newline-terminated unless empty
    pub fn save_rendered<P: AsRef<Path>>(rendered: &str, path: P) -> Result<()> {
        let mut content = rendered.to_string();
        if !content.is_empty() {
            content.push('\n');
        }
        fs::write(path, content)?;
        Ok(())
    }
}
