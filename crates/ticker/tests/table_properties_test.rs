use chrono::{DateTime, Utc};
use crypto_ticker::coindesk::CoinDeskQuote;
use crypto_ticker::formatter::{DisplayLine, TableFormatter, TableLayout};
use crypto_ticker::money::CurrencyFormatter;
use crypto_ticker::normalizer::normalize;
use crypto_ticker::{Completeness, InstrumentSpec, RawResponse};
use proptest::prelude::*;
use std::collections::HashMap;
use ticker_common::config::LayoutConfig;
use ticker_common::Locale;

fn now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_030, 0).unwrap()
}

fn formatter(locale: Locale) -> TableFormatter {
    let layout = TableLayout::from_config(&LayoutConfig::default(), &["24h", "7d"]);
    TableFormatter::new(layout, CurrencyFormatter::new(locale, "EUR"))
}

fn locale_strategy() -> impl Strategy<Value = Locale> {
    prop_oneof![
        Just(Locale::FrFr),
        Just(Locale::EnUs),
        Just(Locale::EnGb),
        Just(Locale::DeDe),
    ]
}

/// 2..8 distinct instruments with price, changes and precision.
fn quotes_strategy() -> impl Strategy<Value = Vec<(String, f64, f64, f64, u32)>> {
    prop::collection::btree_map(
        "[A-Z]{3,4}",
        (0.0001f64..100_000.0, -50.0f64..50.0, -80.0f64..80.0, 0u32..5),
        2..8,
    )
    .prop_map(|map| {
        map.into_iter()
            .map(|(id, (price, c24, c7, precision))| (id, price, c24, c7, precision))
            .collect()
    })
}

proptest! {
    #[test]
    fn prop_rows_follow_configured_order(
        quotes in quotes_strategy(),
        seed in any::<u64>(),
    ) {
        // Given - 설정 순서를 섞음
        let mut instruments: Vec<InstrumentSpec> = quotes
            .iter()
            .map(|(id, _, _, _, p)| InstrumentSpec::new(id, id, *p))
            .collect();
        let len = instruments.len();
        instruments.rotate_left((seed as usize) % len);

        let raw = RawResponse::BatchQuote(
            quotes
                .iter()
                .map(|(id, price, c24, c7, _)| {
                    (
                        id.clone(),
                        CoinDeskQuote {
                            price: Some(*price),
                            change_24h: Some(*c24),
                            change_7d: Some(*c7),
                            last_update_ts: Some(1_700_000_000),
                        },
                    )
                })
                .collect::<HashMap<_, _>>(),
        );

        // When
        let snapshot = normalize(&raw, &instruments, Completeness::FailOnMissing, now()).unwrap();
        let table = formatter(Locale::FrFr).format(&snapshot.records, snapshot.as_of);

        // Then
        let rendered: Vec<String> = table
            .rows()
            .iter()
            .map(|row| row.cells()[0].text.clone())
            .collect();
        let expected: Vec<String> = instruments.iter().map(|s| s.display_symbol.clone()).collect();
        prop_assert_eq!(rendered, expected);
    }

    #[test]
    fn prop_format_is_idempotent_and_cells_fill_their_width(
        quotes in quotes_strategy(),
        locale in locale_strategy(),
    ) {
        let instruments: Vec<InstrumentSpec> = quotes
            .iter()
            .map(|(id, _, _, _, p)| InstrumentSpec::new(id, id, *p))
            .collect();
        let raw = RawResponse::BatchQuote(
            quotes
                .iter()
                .map(|(id, price, c24, c7, _)| {
                    (
                        id.clone(),
                        CoinDeskQuote {
                            price: Some(*price),
                            change_24h: Some(*c24),
                            change_7d: Some(*c7),
                            last_update_ts: None,
                        },
                    )
                })
                .collect::<HashMap<_, _>>(),
        );
        let snapshot = normalize(&raw, &instruments, Completeness::FailOnMissing, now()).unwrap();
        let formatter = formatter(locale);

        let first = formatter.format(&snapshot.records, snapshot.as_of);
        let second = formatter.format(&snapshot.records, snapshot.as_of);

        prop_assert_eq!(&first, &second);
        let rule_len = match &first.lines[1] {
            DisplayLine::Rule(len) => *len,
            other => panic!("expected rule, got {:?}", other),
        };
        for line in first.rows() {
            // 가격이 10만 미만이면 모든 셀이 폭 안에 들어감
            prop_assert_eq!(line.plain_text().chars().count(), rule_len);
            for cell in line.cells() {
                prop_assert!(cell.text.chars().count() + cell.padding() == cell.width);
            }
        }
    }
}
