//! Ticker configuration.
//!
//! Values are layered once at startup: built-in defaults, an optional TOML
//! file, then `TICKER_*` environment variables. Nothing is reloaded later.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::error::{Result, TickerError};
use crate::types::{ChangeUnit, InstrumentSpec, Locale, SourceKind};

/// 기본 갱신 주기 (30초)
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 30_000;
/// 기본 요청 타임아웃 (5초)
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_QUOTE_CURRENCY: &str = "EUR";

/// CoinDesk 최신 시세 API
pub const COINDESK_API_URL: &str = "https://data-api.coindesk.com/spot/v1/latest/tick";
pub const COINDESK_MARKET: &str = "coinbase";
/// CoinGecko 단순 가격 API
pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3/simple/price";

/// Environment variable prefix.
const ENV_PREFIX: &str = "TICKER_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickerConfig {
    pub source: SourceKind,
    pub quote_currency: String,
    pub locale: Locale,
    pub refresh_interval_ms: u64,
    pub request_timeout_ms: u64,
    /// Empty means the selected source's default list.
    pub instruments: Vec<InstrumentSpec>,
    pub coindesk: CoinDeskConfig,
    pub coingecko: CoinGeckoConfig,
    pub layout: LayoutConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinDeskConfig {
    pub url: String,
    pub market: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinGeckoConfig {
    pub url: String,
    /// How `<ccy>_24h_change` is expressed upstream.
    pub change_unit: ChangeUnit,
}

/// Fixed column widths and header labels of the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub asset_width: usize,
    pub price_width: usize,
    pub change_width: usize,
    pub asset_label: String,
    pub price_label: String,
    /// 변동률 열 제목. 키는 구간 (`24h`, `7d`), 없으면 구간 이름 그대로
    pub window_labels: BTreeMap<String, String>,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::BatchQuote,
            quote_currency: DEFAULT_QUOTE_CURRENCY.to_string(),
            locale: Locale::default(),
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            instruments: Vec::new(),
            coindesk: CoinDeskConfig::default(),
            coingecko: CoinGeckoConfig::default(),
            layout: LayoutConfig::default(),
        }
    }
}

impl Default for CoinDeskConfig {
    fn default() -> Self {
        Self {
            url: COINDESK_API_URL.to_string(),
            market: COINDESK_MARKET.to_string(),
        }
    }
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            url: COINGECKO_API_URL.to_string(),
            change_unit: ChangeUnit::Percent,
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            asset_width: 6,
            price_width: 15,
            change_width: 10,
            asset_label: "Asset".to_string(),
            price_label: "Price".to_string(),
            window_labels: BTreeMap::new(),
        }
    }
}

impl LayoutConfig {
    /// Header text for the change column of `window`.
    pub fn window_label<'a>(&'a self, window: &'a str) -> &'a str {
        self.window_labels
            .get(window)
            .map(String::as_str)
            .unwrap_or(window)
    }
}

/// 기본 CoinDesk 종목의 기초 자산. 호가 통화는 설정에서 붙임
pub const COINDESK_DEFAULT_BASES: [&str; 4] = ["BTC", "ETH", "LTC", "SOL"];

/// 설정된 종목이 없을 때 사용하는 소스별 기본 목록
pub fn default_instruments(source: SourceKind, quote_currency: &str) -> Vec<InstrumentSpec> {
    match source {
        SourceKind::BatchQuote => COINDESK_DEFAULT_BASES
            .iter()
            .map(|base| {
                let id = format!("{}-{}", base, quote_currency.trim().to_uppercase());
                InstrumentSpec::new(&id, base, 2)
            })
            .collect(),
        SourceKind::SimplePrice => vec![
            InstrumentSpec::new("bitcoin", "BTC", 0),
            InstrumentSpec::new("ethereum", "ETH", 2),
            InstrumentSpec::new("litecoin", "LTC", 2),
            // XRP 는 가격이 낮아서 소수점 4자리까지 표시
            InstrumentSpec::new("ripple", "XRP", 4),
        ],
    }
}

impl TickerConfig {
    /// TOML 문자열 파싱. 없는 키는 기본값 사용
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| TickerError::Config(format!("invalid TOML: {}", e)))
    }

    /// 설정 파일 읽기
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TickerError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        debug!("Loaded config file {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Overlays `TICKER_*` variables from the process environment (and `.env`).
    pub fn apply_env(&mut self) -> Result<()> {
        dotenvy::dotenv().ok();
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Overlays variables resolved through `lookup`, keyed without the prefix.
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, name))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(source) = var("SOURCE") {
            self.source = source.parse()?;
        }
        if let Some(currency) = var("CURRENCY") {
            self.quote_currency = currency.to_uppercase();
        }
        if let Some(locale) = var("LOCALE") {
            self.locale = locale.parse()?;
        }
        if let Some(ms) = var("INTERVAL_MS") {
            self.refresh_interval_ms = parse_millis("TICKER_INTERVAL_MS", &ms)?;
        }
        if let Some(ms) = var("TIMEOUT_MS") {
            self.request_timeout_ms = parse_millis("TICKER_TIMEOUT_MS", &ms)?;
        }
        if let Some(market) = var("MARKET") {
            self.coindesk.market = market;
        }
        if let Some(list) = var("INSTRUMENTS") {
            self.instruments = parse_instrument_list(&list)?;
        }
        Ok(())
    }

    /// Configured instruments, or the source's defaults when none are set.
    pub fn effective_instruments(&self) -> Vec<InstrumentSpec> {
        if self.instruments.is_empty() {
            default_instruments(self.source, &self.quote_currency)
        } else {
            self.instruments.clone()
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// 주기, 타임아웃, 열 폭, 종목 목록 검증
    pub fn validate(&self) -> Result<()> {
        if self.refresh_interval_ms == 0 {
            return Err(TickerError::Config("refresh interval must be > 0".into()));
        }
        if self.request_timeout_ms == 0 {
            return Err(TickerError::Config("request timeout must be > 0".into()));
        }
        if self.quote_currency.trim().is_empty() {
            return Err(TickerError::Config("quote currency is empty".into()));
        }

        let layout = &self.layout;
        if layout.asset_width == 0 || layout.price_width == 0 || layout.change_width == 0 {
            return Err(TickerError::Config("column widths must be > 0".into()));
        }

        let instruments = self.effective_instruments();
        if instruments.is_empty() {
            return Err(TickerError::Config("no instruments configured".into()));
        }

        let mut seen = HashSet::new();
        for spec in &instruments {
            if !seen.insert(spec.upstream_id.as_str()) {
                return Err(TickerError::Config(format!(
                    "duplicate instrument '{}'",
                    spec.upstream_id
                )));
            }
        }
        Ok(())
    }
}

/// Parses a comma-separated list of `id[:SYMBOL[:precision]]` entries.
pub fn parse_instrument_list(list: &str) -> Result<Vec<InstrumentSpec>> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::parse)
        .collect()
}

fn parse_millis(name: &str, value: &str) -> Result<u64> {
    value
        .parse::<u64>()
        .map_err(|e| TickerError::Config(format!("{} must be milliseconds: {}", name, e)))
}
