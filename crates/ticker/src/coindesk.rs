use crate::http;
use crate::price_source::{Completeness, PriceSource, RawResponse};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use ticker_common::config::CoinDeskConfig;
use ticker_common::{InstrumentSpec, Result, TickerError};
use tracing::{info, warn};

/// 24시간 변동률 구간
pub const WINDOW_24H: &str = "24h";
/// 7일 변동률 구간
pub const WINDOW_7D: &str = "7d";

/// CoinDesk 에서 받아오는 종목별 시세
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CoinDeskQuote {
    #[serde(rename = "PRICE", default)]
    pub price: Option<f64>,
    #[serde(rename = "MOVING_24_HOUR_CHANGE_PERCENTAGE", default)]
    pub change_24h: Option<f64>,
    #[serde(rename = "MOVING_7_DAY_CHANGE_PERCENTAGE", default)]
    pub change_7d: Option<f64>,
    /// Epoch seconds, shared by every instrument of one response.
    #[serde(rename = "PRICE_LAST_UPDATE_TS", default)]
    pub last_update_ts: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct CoinDeskEnvelope {
    #[serde(rename = "Data", default)]
    data: HashMap<String, CoinDeskQuote>,
    #[serde(rename = "Err", default)]
    err: Option<CoinDeskErr>,
}

#[derive(Debug, Deserialize)]
struct CoinDeskErr {
    #[serde(default)]
    message: Option<String>,
}

/// Batch-quote source: every instrument in a single `latest/tick` call.
pub struct CoinDeskClient {
    client: Client,
    url: String,
    market: String,
    timeout: Duration,
}

impl CoinDeskClient {
    /// 설정의 URL 과 마켓, 요청 타임아웃으로 클라이언트 생성
    pub fn new(config: &CoinDeskConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http::build_client(timeout)?,
            url: config.url.clone(),
            market: config.market.clone(),
            timeout,
        })
    }

    /// 배치 요청 한 번의 쿼리 파라미터. 종목은 설정 순서대로 쉼표로 연결
    pub fn query(&self, instruments: &[InstrumentSpec]) -> Vec<(&'static str, String)> {
        let ids: Vec<&str> = instruments.iter().map(|s| s.upstream_id.as_str()).collect();
        vec![
            ("market", self.market.clone()),
            ("instruments", ids.join(",")),
            ("apply_mapping", "true".to_string()),
        ]
    }

    /// `{"Data": {...}, "Err": {...}}` 본문에서 종목별 시세 추출
    pub fn parse_response(
        body: &str,
        instruments: &[InstrumentSpec],
    ) -> Result<HashMap<String, CoinDeskQuote>> {
        let envelope: CoinDeskEnvelope = serde_json::from_str(body)?;
        Self::unwrap_envelope(envelope, instruments)
    }

    /// Fails with the upstream `Err.message` when it explains a missing instrument.
    fn unwrap_envelope(
        envelope: CoinDeskEnvelope,
        instruments: &[InstrumentSpec],
    ) -> Result<HashMap<String, CoinDeskQuote>> {
        let CoinDeskEnvelope { data, err } = envelope;
        if let Some(message) = err.and_then(|e| e.message) {
            if let Some(missing) = instruments
                .iter()
                .find(|s| !data.contains_key(&s.upstream_id))
            {
                return Err(TickerError::MissingData(format!(
                    "no data for {}: {}",
                    missing.upstream_id, message
                )));
            }
            warn!("CoinDesk reported an error alongside data: {}", message);
        }
        Ok(data)
    }
}

#[async_trait]
impl PriceSource for CoinDeskClient {
    async fn fetch(&self, instruments: &[InstrumentSpec]) -> Result<RawResponse> {
        info!(
            "Fetching {} instruments from CoinDesk ({})",
            instruments.len(),
            self.market
        );

        let envelope: CoinDeskEnvelope =
            http::get_json(&self.client, &self.url, &self.query(instruments), self.timeout).await?;
        let quotes = Self::unwrap_envelope(envelope, instruments)?;

        info!("Received {} quotes from CoinDesk", quotes.len());
        Ok(RawResponse::BatchQuote(quotes))
    }

    fn name(&self) -> &str {
        "coindesk"
    }

    fn completeness(&self) -> Completeness {
        Completeness::FailOnMissing
    }

    fn windows(&self) -> Vec<&'static str> {
        vec![WINDOW_24H, WINDOW_7D]
    }
}
