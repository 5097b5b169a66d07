use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use crypto_ticker::Scheduler;
use std::path::PathBuf;
use ticker_common::config::TickerConfig;
use ticker_common::{InstrumentSpec, Locale, SourceKind};
use tracing::{error, info, Level};

/// Terminal ticker for crypto spot prices
#[derive(Parser, Debug)]
#[command(name = "crypto-ticker", version, about)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Upstream API: coindesk (batch-quote) or coingecko (simple-price)
    #[arg(long)]
    source: Option<SourceKind>,

    /// Quote currency, e.g. EUR or USD
    #[arg(long)]
    currency: Option<String>,

    /// Display locale, e.g. fr-FR or en-US
    #[arg(long)]
    locale: Option<Locale>,

    /// Comma-separated instruments as id[:SYMBOL[:precision]]
    #[arg(long, value_delimiter = ',')]
    instruments: Option<Vec<InstrumentSpec>>,

    /// Refresh interval in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Run a single cycle and exit (status 1 if it failed)
    #[arg(long)]
    once: bool,

    /// Log more to stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = load_config(&args)?;
    let mut scheduler =
        Scheduler::from_config(&config, std::io::stdout()).context("Failed to start ticker")?;

    if args.once {
        let outcome = scheduler.tick().await;
        if !outcome.is_rendered() {
            std::process::exit(1);
        }
        return Ok(());
    }

    scheduler.run_until(shutdown_signal()).await;
    info!("Ticker stopped");
    Ok(())
}

/// Defaults, then the config file, then `TICKER_*` variables, then flags.
fn load_config(args: &Args) -> Result<TickerConfig> {
    let mut config = match &args.config {
        Some(path) => TickerConfig::load_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TickerConfig::default(),
    };
    config
        .apply_env()
        .context("Invalid TICKER_* environment variable")?;

    if let Some(source) = args.source {
        config.source = source;
    }
    if let Some(currency) = &args.currency {
        config.quote_currency = currency.to_uppercase();
    }
    if let Some(locale) = args.locale {
        config.locale = locale;
    }
    if let Some(instruments) = &args.instruments {
        config.instruments = instruments.clone();
    }
    if let Some(ms) = args.interval_ms {
        config.refresh_interval_ms = ms;
    }
    if let Some(ms) = args.timeout_ms {
        config.request_timeout_ms = ms;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    // 표가 stdout 을 쓰므로 로그는 stderr 로
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
