use anyhow::Result;
use clap::Parser;
use proxy_sieve::{
    logging, pipeline,
    providers::{read_crawl_proxies, FileSource, HarvesterConfig, ProviderRegistry, TextListSource},
    proxy::{CheckerConfig, FilterCriteria, ProxyChecker, ProxyParser, ProxyType},
};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Fast collector of free proxies: harvests, verifies and filters them
#[derive(Parser)]
#[command(name = "proxy-sieve")]
#[command(about = "Harvests free proxies, verifies liveness and anonymity, and returns a filtered set")]
struct Cli {
    /// Country of the proxies (ISO 3166 alpha-2, e.g. DE)
    #[arg(short, long, env = "PROXY_SIEVE_COUNTRY")]
    country: String,

    /// Proxy type (http, socks5)
    #[arg(short = 't', long = "type", env = "PROXY_SIEVE_TYPE")]
    proxy_type: ProxyType,

    /// Number of proxies to return
    #[arg(short = 'n', long, env = "PROXY_SIEVE_NUMBER")]
    number: usize,

    /// Keep proxies that do not hide our address
    #[arg(short, long)]
    anon: bool,

    /// Print address and port only
    #[arg(short, long)]
    short: bool,

    /// Print the result as a JSON array
    #[arg(long, conflicts_with = "short")]
    json: bool,

    /// Also write the result to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Extra candidates from a local file (one per line)
    #[arg(short = 'f', long)]
    proxy_file: Option<PathBuf>,

    /// Extra plain-text proxy list URLs, declared as --type and --country
    #[arg(short, long)]
    url: Vec<String>,

    /// Proxies to crawl providers through (e.g. socks5://127.0.0.1:9050)
    #[arg(short = 'p', long = "crawl-proxy")]
    crawl_proxies: Vec<String>,

    /// File of crawl proxies, one URL per line
    #[arg(short = 'P', long)]
    crawl_proxy_file: Option<PathBuf>,

    /// Skip the built-in provider pages
    #[arg(long)]
    no_default_sources: bool,

    /// Only probe candidates whose claimed country and type match
    #[arg(long)]
    prefilter: bool,

    /// Maximum number of probes in flight
    #[arg(long, default_value = "64", env = "PROXY_SIEVE_CONCURRENCY")]
    concurrency: usize,

    /// Probes started per second (0 disables pacing)
    #[arg(long, default_value = "100", env = "PROXY_SIEVE_RATE")]
    rate: u32,

    /// Per-probe timeout in seconds
    #[arg(long, default_value = "15")]
    timeout: u64,

    /// Deadline for the whole verification in seconds
    #[arg(long)]
    run_timeout: Option<u64>,

    /// Address-echo endpoint
    #[arg(long, default_value = "http://ident.me", env = "PROXY_SIEVE_ORACLE_URL")]
    oracle_url: String,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "info", env = "PROXY_SIEVE_LOG")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let registry = build_registry(&cli)?;
    info!(sources = registry.len(), "Harvesting candidates");

    let mut checker_config = CheckerConfig::new()
        .with_concurrency(cli.concurrency)
        .with_probes_per_second(cli.rate)
        .with_timeout(Duration::from_secs(cli.timeout))
        .with_oracle_url(cli.oracle_url.clone());
    if let Some(secs) = cli.run_timeout {
        checker_config = checker_config.with_run_timeout(Duration::from_secs(secs));
    }
    let checker = ProxyChecker::with_config(checker_config);

    let criteria = FilterCriteria::new(&cli.country, cli.proxy_type, cli.number)
        .with_allow_not_anonymous(cli.anon);

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling the run");
            interrupt.cancel();
        }
    });

    let outcome = pipeline::run(&registry, &checker, &criteria, cli.prefilter, &cancel).await?;

    info!(
        harvested = outcome.harvested,
        unique = outcome.unique,
        checked = outcome.checked,
        selected = outcome.selected.len(),
        "Done"
    );

    let rendered = if cli.json {
        ProxyParser::render_json(&outcome.selected)?
    } else {
        ProxyParser::render(&outcome.selected, cli.short)
    };
    if !rendered.is_empty() {
        println!("{}", rendered);
    }

    if let Some(path) = &cli.output {
        ProxyParser::save_rendered(&rendered, path)?;
        info!(path = ?path, count = outcome.selected.len(), "Saved proxies");
    }

    Ok(())
}

fn build_registry(cli: &Cli) -> Result<ProviderRegistry> {
    let mut crawl_proxies = cli.crawl_proxies.clone();
    if let Some(path) = &cli.crawl_proxy_file {
        crawl_proxies.extend(read_crawl_proxies(path)?);
    }
    let config = HarvesterConfig::new().with_crawl_proxies(crawl_proxies);

    let mut registry = if cli.no_default_sources {
        ProviderRegistry::new(config)
    } else {
        ProviderRegistry::with_defaults(config)
    };

    for url in &cli.url {
        registry.register(TextListSource::new(url, cli.proxy_type).with_country(&cli.country));
    }

    if let Some(path) = &cli.proxy_file {
        registry.register(FileSource::new(path.clone(), cli.proxy_type));
    }

    Ok(registry)
}
