//! Builds the aligned price table from normalized records.
//!
//! Every cell is right-padded to its column width with spaces; color codes are
//! applied around the text only, so they never count toward the width. Text
//! longer than its column is kept whole and pushes the rest of the row right.

use chrono::{DateTime, Utc};
use crossterm::style::Stylize;
use std::fmt;
use ticker_common::config::LayoutConfig;
use ticker_common::{Direction, PriceChange, PriceRecord};

use crate::money::{format_magnitude, CurrencyFormatter};

/// Glue between two cells.
pub const SEPARATOR: &str = " | ";
/// Shown when a value is absent upstream.
pub const NOT_AVAILABLE: &str = "n/a";

const RULE_CHAR: char = '-';

/// Column widths and header labels. One change column per window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    pub asset_width: usize,
    pub price_width: usize,
    pub change_width: usize,
    pub asset_label: String,
    pub price_label: String,
    /// 구간 이름. 레코드의 변동률을 찾는 키
    pub windows: Vec<String>,
    /// `windows` 와 같은 순서의 열 제목
    pub window_labels: Vec<String>,
}

impl TableLayout {
    /// 설정의 열 폭과 제목에 소스가 제공하는 구간을 붙임
    pub fn from_config(config: &LayoutConfig, windows: &[&str]) -> Self {
        Self {
            asset_width: config.asset_width,
            price_width: config.price_width,
            change_width: config.change_width,
            asset_label: config.asset_label.clone(),
            price_label: config.price_label.clone(),
            windows: windows.iter().map(|w| w.to_string()).collect(),
            window_labels: windows
                .iter()
                .map(|w| config.window_label(w).to_string())
                .collect(),
        }
    }

    /// 자산, 가격, 구간별 변동률 순서의 열 폭
    pub fn widths(&self) -> Vec<usize> {
        let mut widths = vec![self.asset_width, self.price_width];
        widths.extend(std::iter::repeat(self.change_width).take(self.windows.len()));
        widths
    }

    /// Sum of the column widths plus the separator glue between them.
    pub fn total_width(&self) -> usize {
        let widths = self.widths();
        let glue = SEPARATOR.chars().count() * widths.len().saturating_sub(1);
        widths.iter().sum::<usize>() + glue
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub text: String,
    pub width: usize,
    /// Colors the text green (up) or red (down) when set.
    pub direction: Option<Direction>,
}

impl Cell {
    pub fn plain(text: impl Into<String>, width: usize) -> Self {
        Self {
            text: text.into(),
            width,
            direction: None,
        }
    }

    /// `▲ 1.50 %` 형태. 0 은 상승으로 취급
    pub fn change(change: &PriceChange, width: usize) -> Self {
        let direction = change.direction();
        Self {
            text: format!(
                "{} {} %",
                direction.glyph(),
                format_magnitude(change.percent, 2)
            ),
            width,
            direction: Some(direction),
        }
    }

    /// Spaces appended after the text; zero when the text overflows.
    pub fn padding(&self) -> usize {
        self.width.saturating_sub(self.text.chars().count())
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Some(Direction::Up) => write!(f, "{}", self.text.as_str().green())?,
            Some(Direction::Down) => write!(f, "{}", self.text.as_str().red())?,
            None => f.write_str(&self.text)?,
        }
        write!(f, "{:width$}", "", width = self.padding())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayLine {
    Row(Vec<Cell>),
    /// Horizontal rule of the given length.
    Rule(usize),
}

impl DisplayLine {
    /// The line without color codes.
    pub fn plain_text(&self) -> String {
        match self {
            DisplayLine::Row(cells) => cells
                .iter()
                .map(|c| format!("{}{:pad$}", c.text, "", pad = c.padding()))
                .collect::<Vec<_>>()
                .join(SEPARATOR),
            DisplayLine::Rule(len) => RULE_CHAR.to_string().repeat(*len),
        }
    }

    pub fn cells(&self) -> &[Cell] {
        match self {
            DisplayLine::Row(cells) => cells,
            DisplayLine::Rule(_) => &[],
        }
    }
}

impl fmt::Display for DisplayLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayLine::Row(cells) => {
                for (i, cell) in cells.iter().enumerate() {
                    if i > 0 {
                        f.write_str(SEPARATOR)?;
                    }
                    write!(f, "{}", cell)?;
                }
                Ok(())
            }
            DisplayLine::Rule(_) => f.write_str(&self.plain_text()),
        }
    }
}

/// Formatted output of one cycle: header, rule, then one row per record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub as_of: DateTime<Utc>,
    pub lines: Vec<DisplayLine>,
}

impl Table {
    /// Data rows only.
    pub fn rows(&self) -> &[DisplayLine] {
        self.lines.get(2..).unwrap_or(&[])
    }
}

/// 레코드를 헤더와 행으로 변환하는 포매터
pub struct TableFormatter {
    layout: TableLayout,
    money: CurrencyFormatter,
}

impl TableFormatter {
    pub fn new(layout: TableLayout, money: CurrencyFormatter) -> Self {
        Self { layout, money }
    }

    /// 헤더, 구분선, 레코드마다 한 줄
    pub fn format(&self, records: &[PriceRecord], as_of: DateTime<Utc>) -> Table {
        let mut lines = Vec::with_capacity(records.len() + 2);
        lines.push(self.header());
        lines.push(DisplayLine::Rule(self.layout.total_width()));
        lines.extend(records.iter().map(|r| self.row(r)));
        Table { as_of, lines }
    }

    fn header(&self) -> DisplayLine {
        let layout = &self.layout;
        let mut cells = vec![
            Cell::plain(layout.asset_label.as_str(), layout.asset_width),
            Cell::plain(layout.price_label.as_str(), layout.price_width),
        ];
        cells.extend(
            layout
                .window_labels
                .iter()
                .map(|label| Cell::plain(label.as_str(), layout.change_width)),
        );
        DisplayLine::Row(cells)
    }

    fn row(&self, record: &PriceRecord) -> DisplayLine {
        let layout = &self.layout;
        let price = match record.price {
            Some(price) => self.money.format_price(price, record.precision),
            None => NOT_AVAILABLE.to_string(),
        };

        let mut cells = vec![
            Cell::plain(record.symbol.as_str(), layout.asset_width),
            Cell::plain(price, layout.price_width),
        ];
        cells.extend(layout.windows.iter().map(|w| match record.change(w) {
            Some(change) => Cell::change(change, layout.change_width),
            None => Cell::plain(NOT_AVAILABLE, layout.change_width),
        }));
        DisplayLine::Row(cells)
    }
}
