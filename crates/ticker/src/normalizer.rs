//! Raw upstream payloads into ordered `PriceRecord`s.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use ticker_common::{ChangeUnit, InstrumentSpec, PriceChange, PriceRecord, Result, TickerError};
use tracing::{debug, warn};

use crate::coindesk::{self, CoinDeskQuote};
use crate::coingecko::{self, CoinGeckoQuote};
use crate::price_source::{Completeness, RawResponse};

/// Upstream timestamps older than this are logged as stale.
const STALE_AFTER_SECS: i64 = 600;

/// Records of one cycle plus the moment they were current.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub records: Vec<PriceRecord>,
    pub as_of: DateTime<Utc>,
}

/// Maps `raw` onto `instruments`, preserving the configured order.
///
/// `now` is the cycle clock, used as as-of when the source has no timestamp.
pub fn normalize(
    raw: &RawResponse,
    instruments: &[InstrumentSpec],
    completeness: Completeness,
    now: DateTime<Utc>,
) -> Result<Snapshot> {
    if let (Completeness::FailOnMissing, Some(first)) = (completeness, instruments.first()) {
        if !raw.contains(&first.upstream_id) {
            return Err(TickerError::MissingData(format!(
                "no data for {}, check the instrument list",
                first.upstream_id
            )));
        }
    }

    let mut records = Vec::with_capacity(instruments.len());
    for spec in instruments {
        let record = match raw {
            RawResponse::BatchQuote(quotes) => quotes
                .get(&spec.upstream_id)
                .map(|q| batch_record(spec, q))
                .transpose()?,
            RawResponse::SimplePrice {
                quotes,
                change_unit,
            } => quotes
                .get(&spec.upstream_id)
                .map(|q| simple_record(spec, q, *change_unit, now))
                .transpose()?,
        };

        match (record, completeness) {
            (Some(record), _) => records.push(record),
            (None, Completeness::FailOnMissing) => {
                return Err(TickerError::MissingData(format!(
                    "no data for {}",
                    spec.upstream_id
                )));
            }
            (None, Completeness::SkipMissing) => {
                warn!("{} missing from response, skipped this cycle", spec.upstream_id);
            }
        }
    }

    // 빈 표로 이전 표를 지우지 않도록 실패 처리
    if records.is_empty() && !instruments.is_empty() {
        return Err(TickerError::MissingData(
            "none of the configured instruments are in the response".to_string(),
        ));
    }

    // 배치 응답은 첫 번째 종목의 타임스탬프를 공유함
    let as_of = match raw {
        RawResponse::BatchQuote(_) => records.first().and_then(|r| r.as_of).unwrap_or(now),
        RawResponse::SimplePrice { .. } => now,
    };

    if (now - as_of).num_seconds() > STALE_AFTER_SECS {
        warn!(
            "Upstream data is more than 10 minutes old: {} seconds ago",
            (now - as_of).num_seconds()
        );
    }

    debug!("Normalized {} of {} instruments", records.len(), instruments.len());
    Ok(Snapshot { records, as_of })
}

fn batch_record(spec: &InstrumentSpec, quote: &CoinDeskQuote) -> Result<PriceRecord> {
    let changes = [
        (coindesk::WINDOW_24H, quote.change_24h),
        (coindesk::WINDOW_7D, quote.change_7d),
    ]
    .into_iter()
    .filter_map(|(label, value)| value.map(|v| (label, v)))
    .map(|(label, v)| -> Result<PriceChange> {
        Ok(PriceChange::new(label, to_decimal(spec, v)?))
    })
    .collect::<Result<Vec<_>>>()?;

    let as_of = match quote.last_update_ts {
        Some(ts) => Some(DateTime::from_timestamp(ts, 0).ok_or_else(|| {
            TickerError::InvalidQuote {
                instrument: spec.upstream_id.clone(),
                reason: format!("timestamp {} out of range", ts),
            }
        })?),
        None => None,
    };

    Ok(PriceRecord {
        symbol: spec.display_symbol.clone(),
        price: price(spec, quote.price)?,
        precision: spec.price_precision,
        changes,
        as_of,
    })
}

fn simple_record(
    spec: &InstrumentSpec,
    quote: &CoinGeckoQuote,
    unit: ChangeUnit,
    now: DateTime<Utc>,
) -> Result<PriceRecord> {
    let changes = match quote.change_24h {
        Some(v) => vec![PriceChange::new(
            coingecko::WINDOW_24H,
            unit.to_percent(to_decimal(spec, v)?),
        )],
        None => Vec::new(),
    };

    Ok(PriceRecord {
        symbol: spec.display_symbol.clone(),
        price: price(spec, quote.price)?,
        precision: spec.price_precision,
        changes,
        as_of: Some(now),
    })
}

fn price(spec: &InstrumentSpec, value: Option<f64>) -> Result<Option<Decimal>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let price = to_decimal(spec, value)?;
    if price.is_sign_negative() && !price.is_zero() {
        return Err(TickerError::InvalidQuote {
            instrument: spec.upstream_id.clone(),
            reason: format!("negative price {}", price),
        });
    }
    Ok(Some(price))
}

/// Goes through the shortest decimal text of `value` so `0.0456` stays `0.0456`.
fn to_decimal(spec: &InstrumentSpec, value: f64) -> Result<Decimal> {
    Decimal::from_str(&value.to_string()).map_err(|e| TickerError::InvalidQuote {
        instrument: spec.upstream_id.clone(),
        reason: format!("{} is not representable: {}", value, e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn batch_quote(price: f64, chg24: f64, chg7: f64) -> CoinDeskQuote {
        CoinDeskQuote {
            price: Some(price),
            change_24h: Some(chg24),
            change_7d: Some(chg7),
            last_update_ts: Some(1_700_000_000),
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_030, 0).unwrap()
    }

    #[test]
    fn test_batch_records_follow_configured_order() {
        let mut quotes = HashMap::new();
        quotes.insert("ETH-EUR".to_string(), batch_quote(3000.5, -0.75, 3.25));
        quotes.insert("BTC-EUR".to_string(), batch_quote(50000.0, 1.5, -2.0));
        let raw = RawResponse::BatchQuote(quotes);
        let instruments = vec![
            InstrumentSpec::new("BTC-EUR", "BTC", 0),
            InstrumentSpec::new("ETH-EUR", "ETH", 2),
        ];

        let snapshot = normalize(&raw, &instruments, Completeness::FailOnMissing, now()).unwrap();

        let symbols: Vec<_> = snapshot.records.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTC", "ETH"]);
        assert_eq!(snapshot.records[1].price, Some(dec!(3000.5)));
        assert_eq!(snapshot.records[1].changes[0], PriceChange::new("24h", dec!(-0.75)));
        assert_eq!(snapshot.records[1].changes[1], PriceChange::new("7d", dec!(3.25)));
        assert_eq!(snapshot.as_of.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_batch_missing_first_instrument_is_fatal() {
        let mut quotes = HashMap::new();
        quotes.insert("ETH-EUR".to_string(), batch_quote(3000.0, 1.0, 1.0));
        let raw = RawResponse::BatchQuote(quotes);
        let instruments = vec![
            InstrumentSpec::new("BTC-EUR", "BTC", 0),
            InstrumentSpec::new("ETH-EUR", "ETH", 2),
        ];

        let err = normalize(&raw, &instruments, Completeness::FailOnMissing, now()).unwrap_err();

        assert!(matches!(err, TickerError::MissingData(msg) if msg.contains("BTC-EUR")));
    }

    #[test]
    fn test_batch_missing_later_instrument_is_fatal() {
        let mut quotes = HashMap::new();
        quotes.insert("BTC-EUR".to_string(), batch_quote(50000.0, 1.0, 1.0));
        let raw = RawResponse::BatchQuote(quotes);
        let instruments = vec![
            InstrumentSpec::new("BTC-EUR", "BTC", 0),
            InstrumentSpec::new("SOL-EUR", "SOL", 2),
        ];

        let result = normalize(&raw, &instruments, Completeness::FailOnMissing, now());

        assert!(matches!(result, Err(TickerError::MissingData(_))));
    }

    #[test]
    fn test_batch_absent_window_is_omitted_not_zeroed() {
        let mut quotes = HashMap::new();
        quotes.insert(
            "BTC-EUR".to_string(),
            CoinDeskQuote {
                price: None,
                change_24h: Some(0.5),
                change_7d: None,
                last_update_ts: None,
            },
        );
        let raw = RawResponse::BatchQuote(quotes);
        let instruments = vec![InstrumentSpec::new("BTC-EUR", "BTC", 0)];

        let snapshot = normalize(&raw, &instruments, Completeness::FailOnMissing, now()).unwrap();
        let record = &snapshot.records[0];

        assert_eq!(record.price, None);
        assert_eq!(record.changes.len(), 1);
        assert!(record.change("7d").is_none());
        // 타임스탬프가 없으면 사이클 시각 사용
        assert_eq!(snapshot.as_of, now());
    }

    #[test]
    fn test_simple_missing_instrument_is_skipped() {
        let mut quotes = HashMap::new();
        quotes.insert(
            "bitcoin".to_string(),
            CoinGeckoQuote {
                price: Some(50000.0),
                change_24h: Some(1.0),
            },
        );
        quotes.insert(
            "ripple".to_string(),
            CoinGeckoQuote {
                price: Some(0.5123),
                change_24h: Some(-3.0),
            },
        );
        let raw = RawResponse::SimplePrice {
            quotes,
            change_unit: ChangeUnit::Percent,
        };
        let instruments = vec![
            InstrumentSpec::new("bitcoin", "BTC", 0),
            InstrumentSpec::new("ethereum", "ETH", 2),
            InstrumentSpec::new("ripple", "XRP", 4),
        ];

        let snapshot = normalize(&raw, &instruments, Completeness::SkipMissing, now()).unwrap();

        let symbols: Vec<_> = snapshot.records.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTC", "XRP"]);
        assert_eq!(snapshot.as_of, now());
        assert_eq!(snapshot.records[0].as_of, Some(now()));
    }

    #[test]
    fn test_simple_response_without_any_instrument_fails() {
        // Given - 설정한 종목이 하나도 없는 응답
        let raw = RawResponse::SimplePrice {
            quotes: HashMap::new(),
            change_unit: ChangeUnit::Percent,
        };
        let instruments = vec![InstrumentSpec::new("bitcoin", "BTC", 0)];

        // When
        let result = normalize(&raw, &instruments, Completeness::SkipMissing, now());

        // Then
        assert!(matches!(result, Err(TickerError::MissingData(msg)) if msg.contains("none")));
    }

    #[test]
    fn test_simple_fraction_is_converted_to_percent() {
        let mut quotes = HashMap::new();
        quotes.insert(
            "bitcoin".to_string(),
            CoinGeckoQuote {
                price: Some(50000.0),
                change_24h: Some(0.0456),
            },
        );
        let raw = RawResponse::SimplePrice {
            quotes,
            change_unit: ChangeUnit::Fraction,
        };
        let instruments = vec![InstrumentSpec::new("bitcoin", "BTC", 0)];

        let snapshot = normalize(&raw, &instruments, Completeness::SkipMissing, now()).unwrap();

        assert_eq!(snapshot.records[0].changes[0].percent, dec!(4.56));
    }

    #[test]
    fn test_negative_price_is_rejected() {
        let mut quotes = HashMap::new();
        quotes.insert("BTC-EUR".to_string(), batch_quote(-1.0, 0.0, 0.0));
        let raw = RawResponse::BatchQuote(quotes);
        let instruments = vec![InstrumentSpec::new("BTC-EUR", "BTC", 0)];

        let result = normalize(&raw, &instruments, Completeness::FailOnMissing, now());

        assert!(matches!(result, Err(TickerError::InvalidQuote { .. })));
    }
}
