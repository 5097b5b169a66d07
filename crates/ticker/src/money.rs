use chrono::{DateTime, TimeZone};
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt::Display;
use ticker_common::Locale;

const NARROW_NBSP: &str = "\u{202F}";
const NBSP: &str = "\u{00A0}";

/// Separators and symbol placement of one locale.
struct NumberStyle {
    group: &'static str,
    decimal: char,
    symbol_after: bool,
}

fn number_style(locale: Locale) -> NumberStyle {
    match locale {
        Locale::FrFr => NumberStyle {
            group: NARROW_NBSP,
            decimal: ',',
            symbol_after: true,
        },
        Locale::DeDe => NumberStyle {
            group: ".",
            decimal: ',',
            symbol_after: true,
        },
        Locale::EnUs | Locale::EnGb => NumberStyle {
            group: ",",
            decimal: '.',
            symbol_after: false,
        },
    }
}

/// Display symbol for an ISO 4217 code; unknown codes are shown as-is.
pub fn currency_symbol(code: &str) -> Option<&'static str> {
    match code.to_ascii_uppercase().as_str() {
        "EUR" => Some("€"),
        "USD" => Some("$"),
        "GBP" => Some("£"),
        "JPY" => Some("¥"),
        _ => None,
    }
}

/// Locale-aware currency formatting with exact decimal rounding.
#[derive(Debug, Clone)]
pub struct CurrencyFormatter {
    locale: Locale,
    currency: String,
}

impl CurrencyFormatter {
    /// 통화 코드는 대문자로 정규화
    pub fn new(locale: Locale, currency: &str) -> Self {
        Self {
            locale,
            currency: currency.to_ascii_uppercase(),
        }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// `50000` at precision 0 in fr-FR/EUR gives `50 000 €`.
    pub fn format_price(&self, price: Decimal, precision: u32) -> String {
        let style = number_style(self.locale);
        let number = format_number(price, precision, &style);

        match currency_symbol(&self.currency) {
            Some(symbol) if style.symbol_after => format!("{}{}{}", number, NBSP, symbol),
            Some(symbol) => match number.strip_prefix('-') {
                Some(abs) => format!("-{}{}", symbol, abs),
                None => format!("{}{}", symbol, number),
            },
            None if style.symbol_after => format!("{}{}{}", number, NBSP, self.currency),
            None => format!("{}{}{}", self.currency, NBSP, number),
        }
    }

    /// Timestamp in the locale's usual date-time layout.
    pub fn format_timestamp<Tz>(&self, ts: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let pattern = match self.locale {
            Locale::FrFr => "%d/%m/%Y %H:%M:%S",
            Locale::EnUs => "%-m/%-d/%Y, %-I:%M:%S %p",
            Locale::EnGb => "%d/%m/%Y, %H:%M:%S",
            Locale::DeDe => "%-d.%-m.%Y, %H:%M:%S",
        };
        ts.format(pattern).to_string()
    }
}

/// Absolute value rounded half away from zero, always `.`-separated.
pub fn format_magnitude(value: Decimal, decimals: u32) -> String {
    let rounded = value
        .abs()
        .round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*}", decimals as usize, rounded)
}

fn format_number(value: Decimal, precision: u32, style: &NumberStyle) -> String {
    let rounded = value.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.*}", precision as usize, rounded.abs());
    let (int_part, frac_part) = match text.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (text.as_str(), None),
    };

    let mut out = String::new();
    if rounded.is_sign_negative() && !rounded.is_zero() {
        out.push('-');
    }
    out.push_str(&group_digits(int_part, style.group));
    if let Some(frac) = frac_part {
        out.push(style.decimal);
        out.push_str(frac);
    }
    out
}

fn group_digits(digits: &str, separator: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3 * separator.len());
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(ch);
    }
    out
}
