use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TickerError;

/// Default price precision when an instrument does not specify one.
pub const DEFAULT_PRICE_PRECISION: u32 = 2;

/// One tracked asset, configured at startup.
///
/// The order of the configured list is the display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentSpec {
    /// Identifier in the upstream namespace (e.g. `BTC-EUR` or `bitcoin`).
    #[serde(rename = "id")]
    pub upstream_id: String,
    /// Symbol shown in the asset column.
    #[serde(rename = "symbol")]
    pub display_symbol: String,
    /// Number of decimals used when rendering the price.
    #[serde(rename = "precision", default = "default_precision")]
    pub price_precision: u32,
}

fn default_precision() -> u32 {
    DEFAULT_PRICE_PRECISION
}

impl InstrumentSpec {
    pub fn new(upstream_id: &str, display_symbol: &str, price_precision: u32) -> Self {
        Self {
            upstream_id: upstream_id.to_string(),
            display_symbol: display_symbol.to_string(),
            price_precision,
        }
    }

    /// Symbol derived from an identifier such as `BTC-EUR` (the base asset).
    pub fn derive_symbol(upstream_id: &str) -> String {
        upstream_id
            .split('-')
            .next()
            .unwrap_or(upstream_id)
            .to_uppercase()
    }
}

/// Parses `id`, `id:SYMBOL` or `id:SYMBOL:precision`.
impl FromStr for InstrumentSpec {
    type Err = TickerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split(':').map(str::trim);

        let upstream_id = match parts.next() {
            Some(id) if !id.is_empty() => id,
            _ => return Err(TickerError::Config(format!("empty instrument in '{}'", s))),
        };

        let display_symbol = match parts.next() {
            Some(symbol) if !symbol.is_empty() => symbol.to_string(),
            _ => Self::derive_symbol(upstream_id),
        };

        let price_precision = match parts.next() {
            Some(p) => p.parse::<u32>().map_err(|e| {
                TickerError::Config(format!("invalid precision '{}' for {}: {}", p, upstream_id, e))
            })?,
            None => DEFAULT_PRICE_PRECISION,
        };

        if parts.next().is_some() {
            return Err(TickerError::Config(format!(
                "too many fields in instrument '{}'",
                s
            )));
        }

        Ok(Self {
            upstream_id: upstream_id.to_string(),
            display_symbol,
            price_precision,
        })
    }
}

/// Which upstream API shape a source speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// All instruments in one call, shared last-update timestamp (CoinDesk).
    #[serde(alias = "coindesk")]
    BatchQuote,
    /// Price plus 24h change per id, no timestamp (CoinGecko).
    #[serde(alias = "coingecko")]
    SimplePrice,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::BatchQuote => write!(f, "coindesk"),
            SourceKind::SimplePrice => write!(f, "coingecko"),
        }
    }
}

impl FromStr for SourceKind {
    type Err = TickerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "coindesk" | "batch-quote" => Ok(SourceKind::BatchQuote),
            "coingecko" | "simple-price" => Ok(SourceKind::SimplePrice),
            other => Err(TickerError::Config(format!("unknown source '{}'", other))),
        }
    }
}

/// Unit in which an upstream reports a change value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeUnit {
    /// Already a percentage (`1.23` means 1.23 %).
    #[default]
    Percent,
    /// A fraction of one (`0.0123` means 1.23 %).
    Fraction,
}

impl ChangeUnit {
    /// 백분율 값으로 변환 (`0.0456` → `4.56`)
    pub fn to_percent(self, value: Decimal) -> Decimal {
        match self {
            ChangeUnit::Percent => value,
            ChangeUnit::Fraction => value * Decimal::ONE_HUNDRED,
        }
    }
}

impl FromStr for ChangeUnit {
    type Err = TickerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "percent" => Ok(ChangeUnit::Percent),
            "fraction" => Ok(ChangeUnit::Fraction),
            other => Err(TickerError::Config(format!("unknown change unit '{}'", other))),
        }
    }
}

/// Locale used for number, currency and timestamp formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "fr-FR")]
    FrFr,
    #[serde(rename = "en-US")]
    EnUs,
    #[serde(rename = "en-GB")]
    EnGb,
    #[serde(rename = "de-DE")]
    DeDe,
}

impl Locale {
    /// BCP 47 태그
    pub fn tag(self) -> &'static str {
        match self {
            Locale::FrFr => "fr-FR",
            Locale::EnUs => "en-US",
            Locale::EnGb => "en-GB",
            Locale::DeDe => "de-DE",
        }
    }

    /// 배너 문구 (갱신 시각, 오류, HTTP 상태)
    pub fn messages(self) -> &'static Messages {
        match self {
            Locale::FrFr => &FR_MESSAGES,
            Locale::EnUs | Locale::EnGb => &EN_MESSAGES,
            Locale::DeDe => &DE_MESSAGES,
        }
    }
}

/// Fixed banner wording for one locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Messages {
    pub last_update: &'static str,
    pub fetch_error: &'static str,
    pub http_status: &'static str,
    /// 프랑스어는 콜론 앞에 공백
    pub colon: &'static str,
}

const FR_MESSAGES: Messages = Messages {
    last_update: "Dernière mise à jour",
    fetch_error: "Erreur lors de la récupération des données",
    http_status: "statut HTTP",
    colon: " : ",
};

const EN_MESSAGES: Messages = Messages {
    last_update: "Last update",
    fetch_error: "Error while fetching data",
    http_status: "HTTP status",
    colon: ": ",
};

const DE_MESSAGES: Messages = Messages {
    last_update: "Letzte Aktualisierung",
    fetch_error: "Fehler beim Abrufen der Daten",
    http_status: "HTTP-Status",
    colon: ": ",
};

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Locale {
    type Err = TickerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().replace('_', "-").to_ascii_lowercase().as_str() {
            "fr-fr" | "fr" => Ok(Locale::FrFr),
            "en-us" | "en" => Ok(Locale::EnUs),
            "en-gb" => Ok(Locale::EnGb),
            "de-de" | "de" => Ok(Locale::DeDe),
            other => Err(TickerError::Config(format!("unsupported locale '{}'", other))),
        }
    }
}

/// Price movement over one rolling window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceChange {
    pub window_label: String,
    /// Signed percentage (`-0.75` means down 0.75 %).
    pub percent: Decimal,
}

impl PriceChange {
    pub fn new(window_label: &str, percent: Decimal) -> Self {
        Self {
            window_label: window_label.to_string(),
            percent,
        }
    }

    /// 변동 방향. 0 은 상승
    pub fn direction(&self) -> Direction {
        Direction::of(self.percent)
    }
}

/// Normalized quote for one instrument. Built fresh every cycle, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub symbol: String,
    /// Absent when upstream did not report one; never defaulted to zero here.
    pub price: Option<Decimal>,
    /// Decimals used when the price is displayed.
    pub precision: u32,
    /// One entry per window the source reported, in the source's window order.
    pub changes: Vec<PriceChange>,
    pub as_of: Option<DateTime<Utc>>,
}

impl PriceRecord {
    /// 구간 이름으로 변동률 조회
    pub fn change(&self, window_label: &str) -> Option<&PriceChange> {
        self.changes.iter().find(|c| c.window_label == window_label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// Zero counts as up.
    pub fn of(percent: Decimal) -> Self {
        if percent.is_sign_negative() && !percent.is_zero() {
            Direction::Down
        } else {
            Direction::Up
        }
    }

    pub fn glyph(self) -> char {
        match self {
            Direction::Up => '▲',
            Direction::Down => '▼',
        }
    }
}
