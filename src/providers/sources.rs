//! Concrete candidate sources

use crate::providers::crawler::{extract_ip_ports, fetch_page};
use crate::providers::Harvester;
use crate::proxy::models::{Anonymity, Candidate, ProxyType};
use crate::proxy::parser::ProxyParser;
use crate::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use std::net::Ipv4Addr;
use std::path::PathBuf;

/// `ip:port#CC` entries as listed by my-proxy.com
static TAGGED_ENTRY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}):(\d{1,5})#([A-Z]{2})\b")
        .expect("Invalid tagged entry regex")
});

/// Provider pages listing `ip:port#CC` entries
#[derive(Debug, Clone)]
pub struct MyProxySource {
    name: String,
    url: String,
    proxy_type: ProxyType,
    anonymity: Anonymity,
}

impl MyProxySource {
    pub fn new(name: &str, url: &str, proxy_type: ProxyType, anonymity: Anonymity) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            proxy_type,
            anonymity,
        }
    }

    /// Free SOCKS5 list, advertised as elite
    pub fn socks5() -> Self {
        Self::new(
            "my-proxy.com/socks5",
            "https://www.my-proxy.com/free-socks-5-proxy.html",
            ProxyType::Socks5,
            Anonymity::Elite,
        )
    }

    /// Free HTTP list filtered to elite proxies
    pub fn elite_http() -> Self {
        Self::new(
            "my-proxy.com/elite",
            "https://www.my-proxy.com/free-elite-proxy.html",
            ProxyType::Http,
            Anonymity::Elite,
        )
    }

    pub fn parse(&self, content: &str) -> Vec<Candidate> {
        TAGGED_ENTRY_REGEX
            .captures_iter(content)
            .filter_map(|cap| {
                let host: Ipv4Addr = cap[1].parse().ok()?;
                let port: u16 = cap[2].parse().ok()?;
                if port == 0 {
                    return None;
                }
                Some(
                    Candidate::new(&host.to_string(), port, self.proxy_type)
                        .with_country(&cap[3])
                        .with_anonymity(self.anonymity),
                )
            })
            .collect()
    }
}

#[async_trait]
impl Harvester for MyProxySource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn harvest(&self, client: &Client) -> Result<Vec<Candidate>> {
        let content = fetch_page(client, &self.url).await?;
        Ok(self.parse(&content))
    }
}

/// Table rows on proxylistplus.com list pages
static TABLE_ROW_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<tr[^>]*class="cells"[^>]*>(.*?)</tr>"#).expect("Invalid table row regex")
});

static TABLE_CELL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<td[^>]*>(.*?)</td>").expect("Invalid table cell regex"));

static TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("Invalid tag regex"));

/// SOCKS tables on proxylistplus.com
///
/// Columns are `# | IP | Port | Type | Country | ...`. Rows whose country
/// cannot be resolved to a code, or that only speak SOCKS4, are skipped.
#[derive(Debug, Clone)]
pub struct ProxyListPlusSource {
    name: String,
    url: String,
}

impl ProxyListPlusSource {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }

    /// One page of the verified SOCKS list
    pub fn socks_list(page: u8) -> Self {
        Self::new(
            &format!("proxylistplus.com/socks-{}", page),
            &format!("https://list.proxylistplus.com/Socks-List-{}", page),
        )
    }

    pub fn parse(&self, content: &str) -> Vec<Candidate> {
        TABLE_ROW_REGEX
            .captures_iter(content)
            .filter_map(|row| {
                let cells: Vec<String> = TABLE_CELL_REGEX
                    .captures_iter(&row[1])
                    .map(|cell| TAG_REGEX.replace_all(&cell[1], "").trim().to_string())
                    .collect();
                if cells.len() < 5 {
                    return None;
                }

                let host: Ipv4Addr = cells[1].parse().ok()?;
                // The port cell may carry obfuscation noise around the number
                let port = cells[2]
                    .split_whitespace()
                    .filter_map(|t| t.parse::<u16>().ok())
                    .last()
                    .filter(|p| *p != 0)?;
                if cells[3].eq_ignore_ascii_case("socks4") {
                    return None;
                }

                let country = country_code(&cells[4])?;
                Some(
                    Candidate::new(&host.to_string(), port, ProxyType::Socks5)
                        .with_country(country)
                        .with_anonymity(Anonymity::Anonymous),
                )
            })
            .collect()
    }
}

#[async_trait]
impl Harvester for ProxyListPlusSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn harvest(&self, client: &Client) -> Result<Vec<Candidate>> {
        let content = fetch_page(client, &self.url).await?;
        Ok(self.parse(&content))
    }
}

/// Resolve an alpha-2 code or an English country name
fn country_code(cell: &str) -> Option<&str> {
    let cell = cell.trim();
    if cell.len() == 2 && cell.chars().all(|c| c.is_ascii_alphabetic()) {
        return Some(cell);
    }

    let code = match cell.to_lowercase().as_str() {
        "argentina" => "AR",
        "australia" => "AU",
        "austria" => "AT",
        "bangladesh" => "BD",
        "belgium" => "BE",
        "brazil" => "BR",
        "bulgaria" => "BG",
        "canada" => "CA",
        "chile" => "CL",
        "china" => "CN",
        "colombia" => "CO",
        "czech republic" | "czechia" => "CZ",
        "ecuador" => "EC",
        "egypt" => "EG",
        "finland" => "FI",
        "france" => "FR",
        "germany" => "DE",
        "greece" => "GR",
        "hong kong" => "HK",
        "hungary" => "HU",
        "india" => "IN",
        "indonesia" => "ID",
        "iran" | "iran, islamic republic of" => "IR",
        "italy" => "IT",
        "japan" => "JP",
        "kazakhstan" => "KZ",
        "kenya" => "KE",
        "korea" | "south korea" | "korea, republic of" => "KR",
        "malaysia" => "MY",
        "mexico" => "MX",
        "netherlands" => "NL",
        "nigeria" => "NG",
        "pakistan" => "PK",
        "peru" => "PE",
        "philippines" => "PH",
        "poland" => "PL",
        "romania" => "RO",
        "russia" | "russian federation" => "RU",
        "singapore" => "SG",
        "south africa" => "ZA",
        "spain" => "ES",
        "sweden" => "SE",
        "switzerland" => "CH",
        "taiwan" => "TW",
        "thailand" => "TH",
        "turkey" => "TR",
        "ukraine" => "UA",
        "united kingdom" | "great britain" => "GB",
        "united states" | "usa" => "US",
        "venezuela" => "VE",
        "vietnam" | "viet nam" => "VN",
        _ => return None,
    };
    Some(code)
}

/// Plain-text or HTML page of `ip:port` entries with fixed claimed fields
#[derive(Debug, Clone)]
pub struct TextListSource {
    url: String,
    proxy_type: ProxyType,
    country: Option<String>,
    anonymity: Anonymity,
}

impl TextListSource {
    pub fn new(url: &str, proxy_type: ProxyType) -> Self {
        Self {
            url: url.to_string(),
            proxy_type,
            country: None,
            anonymity: Anonymity::Unspecified,
        }
    }

    pub fn with_country(mut self, country: &str) -> Self {
        self.country = Some(country.to_string());
        self
    }

    pub fn with_anonymity(mut self, anonymity: Anonymity) -> Self {
        self.anonymity = anonymity;
        self
    }

    /// Parse candidates from raw text content
    ///
    /// Line-by-line parsing first, regex extraction when no line parses.
    pub fn parse(&self, content: &str) -> Vec<Candidate> {
        let mut candidates = ProxyParser::parse_string(content, self.proxy_type);
        if candidates.is_empty() {
            candidates = extract_ip_ports(content, self.proxy_type);
        }

        candidates
            .into_iter()
            .map(|c| {
                let c = match &self.country {
                    Some(country) => c.with_country(country),
                    None => c,
                };
                match self.anonymity {
                    Anonymity::Unspecified => c,
                    hint => c.with_anonymity(hint),
                }
            })
            .collect()
    }
}

#[async_trait]
impl Harvester for TextListSource {
    fn name(&self) -> &str {
        &self.url
    }

    async fn harvest(&self, client: &Client) -> Result<Vec<Candidate>> {
        let content = fetch_page(client, &self.url).await?;
        Ok(self.parse(&content))
    }
}

/// Candidates kept in a local file, one per line
#[derive(Debug, Clone)]
pub struct FileSource {
    name: String,
    path: PathBuf,
    default_type: ProxyType,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>, default_type: ProxyType) -> Self {
        let path = path.into();
        Self {
            name: path.display().to_string(),
            path,
            default_type,
        }
    }
}

#[async_trait]
impl Harvester for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn harvest(&self, _client: &Client) -> Result<Vec<Candidate>> {
        let path = self.path.clone();
        let default_type = self.default_type;
        tokio::task::spawn_blocking(move || ProxyParser::parse_file(path, default_type)).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::models::UNKNOWN_COUNTRY;
    use std::io::Write;

    #[test]
    fn test_my_proxy_parse() {
        let source = MyProxySource::socks5();
        let content = r#"
<div class="list">
1.2.3.4:1080#FR<br>5.6.7.8:4145#DE<br>999.1.1.1:1080#US<br>9.9.9.9:1080#unknown
</div>
"#;
        let candidates = source.parse(content);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].to_simple_string(), "1.2.3.4:1080");
        assert_eq!(candidates[0].country, "FR");
        assert_eq!(candidates[0].proxy_type, ProxyType::Socks5);
        assert_eq!(candidates[0].anonymity, Anonymity::Elite);
        assert_eq!(candidates[1].country, "DE");
    }

    #[test]
    fn test_proxylistplus_parse() {
        let source = ProxyListPlusSource::socks_list(1);
        let content = r#"
<h3>Socks Proxy List - Verified</h3>
<table class="bg">
<tr class="cells"><th>#</th><th>IP</th><th>Port</th><th>Type</th><th>Country</th></tr>
<tr class="cells" onmouseover="this.className='cells2'">
  <td>1</td><td>103.21.4.7</td><td>4145</td><td>Socks5</td><td><img src="/flag/th.gif"> Thailand</td><td>no</td>
</tr>
<tr class="cells"><td>2</td><td>45.77.9.10</td><td>
<script>var x=1;</script>
1080</td><td>Socks5</td><td>US</td><td>yes</td></tr>
<tr class="cells"><td>3</td><td>8.8.4.4</td><td>1080</td><td>Socks4</td><td>Germany</td><td>no</td></tr>
<tr class="cells"><td>4</td><td>9.9.9.9</td><td>1080</td><td>Socks5</td><td>Atlantis</td><td>no</td></tr>
</table>
"#;
        let candidates = source.parse(content);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].to_simple_string(), "103.21.4.7:4145");
        assert_eq!(candidates[0].country, "TH");
        assert_eq!(candidates[0].proxy_type, ProxyType::Socks5);
        assert_eq!(candidates[0].anonymity, Anonymity::Anonymous);
        assert_eq!(candidates[1].to_simple_string(), "45.77.9.10:1080");
        assert_eq!(candidates[1].country, "US");
    }

    #[test]
    fn test_text_list_parse_lines() {
        let source = TextListSource::new("https://example.com/list.txt", ProxyType::Http)
            .with_country("de");
        let candidates = source.parse("# http proxies\n1.1.1.1:8080\n2.2.2.2:3128\n");
        assert_eq!(candidates.len(), 2);
        assert!(candidates.iter().all(|c| c.country == "DE"));
        assert!(candidates.iter().all(|c| c.proxy_type == ProxyType::Http));
    }

    #[test]
    fn test_text_list_parse_html_fallback() {
        let source = TextListSource::new("https://example.com/", ProxyType::Socks5);
        let content = "<html><body>Some text with 10.0.0.1:3128 embedded</body></html>";
        let candidates = source.parse(content);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].country, UNKNOWN_COUNTRY);
        assert_eq!(candidates[0].proxy_type, ProxyType::Socks5);
    }

    #[tokio::test]
    async fn test_file_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1.1.1.1:1080 FR socks5 Elite").unwrap();
        writeln!(file, "2.2.2.2:8080").unwrap();

        let source = FileSource::new(file.path(), ProxyType::Http);
        let client = Client::new();
        let candidates = source.harvest(&client).await.unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].proxy_type, ProxyType::Socks5);
        assert_eq!(candidates[1].proxy_type, ProxyType::Http);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let source = FileSource::new("/nonexistent/proxies.txt", ProxyType::Http);
        assert!(source.harvest(&Client::new()).await.is_err());
    }
}
