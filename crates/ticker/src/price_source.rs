use async_trait::async_trait;
use std::collections::HashMap;
use ticker_common::config::TickerConfig;
use ticker_common::{ChangeUnit, InstrumentSpec, Result, SourceKind};

use crate::coindesk::{CoinDeskClient, CoinDeskQuote};
use crate::coingecko::{CoinGeckoClient, CoinGeckoQuote};

/// What a source guarantees about instruments missing from its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completeness {
    /// Any requested instrument absent from the response fails the cycle.
    FailOnMissing,
    /// Absent instruments are dropped from this cycle's table.
    SkipMissing,
}

/// Raw payload of one fetch, keyed by upstream instrument id.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResponse {
    BatchQuote(HashMap<String, CoinDeskQuote>),
    SimplePrice {
        quotes: HashMap<String, CoinGeckoQuote>,
        change_unit: ChangeUnit,
    },
}

impl RawResponse {
    /// 응답에 해당 종목이 있는지
    pub fn contains(&self, upstream_id: &str) -> bool {
        match self {
            RawResponse::BatchQuote(quotes) => quotes.contains_key(upstream_id),
            RawResponse::SimplePrice { quotes, .. } => quotes.contains_key(upstream_id),
        }
    }
}

/// Upstream market-data API interface.
///
/// A single `fetch` never retries; the scheduler's next tick is the retry.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch quotes for all `instruments` in one request.
    async fn fetch(&self, instruments: &[InstrumentSpec]) -> Result<RawResponse>;

    /// Get the name of the upstream
    fn name(&self) -> &str;

    fn completeness(&self) -> Completeness;

    /// Rolling windows this source reports, in column order.
    fn windows(&self) -> Vec<&'static str>;
}

/// Builds the source selected by `config.source`.
pub fn build_source(config: &TickerConfig) -> Result<Box<dyn PriceSource>> {
    let timeout = config.request_timeout();
    let source: Box<dyn PriceSource> = match config.source {
        SourceKind::BatchQuote => Box::new(CoinDeskClient::new(&config.coindesk, timeout)?),
        SourceKind::SimplePrice => Box::new(CoinGeckoClient::new(
            &config.coingecko,
            &config.quote_currency,
            timeout,
        )?),
    };
    Ok(source)
}
