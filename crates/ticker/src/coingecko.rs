use crate::http;
use crate::price_source::{Completeness, PriceSource, RawResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use ticker_common::config::CoinGeckoConfig;
use ticker_common::{ChangeUnit, InstrumentSpec, Result};
use tracing::info;

/// CoinGecko 가 제공하는 유일한 변동률 구간
pub const WINDOW_24H: &str = "24h";

/// `{ "bitcoin": { "eur": 50000, "eur_24h_change": 1.2 } }`
type CoinGeckoResponse = HashMap<String, HashMap<String, Option<f64>>>;

/// Price and 24h change of one id, in the configured quote currency.
#[derive(Debug, Clone, PartialEq)]
pub struct CoinGeckoQuote {
    pub price: Option<f64>,
    pub change_24h: Option<f64>,
}

/// Simple-price source. No upstream timestamp; missing ids are skipped.
pub struct CoinGeckoClient {
    client: Client,
    url: String,
    vs_currency: String,
    change_unit: ChangeUnit,
    timeout: Duration,
}

impl CoinGeckoClient {
    /// 호가 통화는 소문자로 바꿔서 `vs_currencies` 에 사용
    pub fn new(config: &CoinGeckoConfig, quote_currency: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http::build_client(timeout)?,
            url: config.url.clone(),
            vs_currency: quote_currency.to_lowercase(),
            change_unit: config.change_unit,
            timeout,
        })
    }

    /// `ids`, `vs_currencies`, `include_24hr_change` 쿼리 파라미터
    pub fn query(&self, instruments: &[InstrumentSpec]) -> Vec<(&'static str, String)> {
        let ids: Vec<&str> = instruments.iter().map(|s| s.upstream_id.as_str()).collect();
        vec![
            ("ids", ids.join(",")),
            ("vs_currencies", self.vs_currency.clone()),
            ("include_24hr_change", "true".to_string()),
        ]
    }

    /// Picks `<ccy>` and `<ccy>_24h_change` out of each id's object.
    pub fn extract_quotes(
        response: CoinGeckoResponse,
        vs_currency: &str,
    ) -> HashMap<String, CoinGeckoQuote> {
        let change_key = format!("{}_24h_change", vs_currency);
        response
            .into_iter()
            .map(|(id, fields)| {
                let quote = CoinGeckoQuote {
                    price: fields.get(vs_currency).copied().flatten(),
                    change_24h: fields.get(&change_key).copied().flatten(),
                };
                (id, quote)
            })
            .collect()
    }

    /// 응답 본문에서 `<ccy>` 와 `<ccy>_24h_change` 값을 추출
    pub fn parse_response(body: &str, vs_currency: &str) -> Result<HashMap<String, CoinGeckoQuote>> {
        let response: CoinGeckoResponse = serde_json::from_str(body)?;
        Ok(Self::extract_quotes(response, &vs_currency.to_lowercase()))
    }
}

#[async_trait]
impl PriceSource for CoinGeckoClient {
    async fn fetch(&self, instruments: &[InstrumentSpec]) -> Result<RawResponse> {
        info!(
            "Fetching {} ids from CoinGecko in {}",
            instruments.len(),
            self.vs_currency
        );

        let response: CoinGeckoResponse =
            http::get_json(&self.client, &self.url, &self.query(instruments), self.timeout).await?;
        let quotes = Self::extract_quotes(response, &self.vs_currency);

        info!("Received {} quotes from CoinGecko", quotes.len());
        Ok(RawResponse::SimplePrice {
            quotes,
            change_unit: self.change_unit,
        })
    }

    fn name(&self) -> &str {
        "coingecko"
    }

    fn completeness(&self) -> Completeness {
        Completeness::SkipMissing
    }

    fn windows(&self) -> Vec<&'static str> {
        vec![WINDOW_24H]
    }
}
