use chrono::Local;
use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};
use std::io::Write;
use ticker_common::{Result, TickerError};

use crate::formatter::Table;
use crate::money::CurrencyFormatter;

/// Writes tables and error banners to a terminal-like sink.
///
/// Only `render` clears the screen; errors are appended below whatever is
/// already visible so the last good table stays on screen.
pub struct Renderer<W: Write> {
    out: W,
    money: CurrencyFormatter,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W, money: CurrencyFormatter) -> Self {
        Self { out, money }
    }

    /// 화면을 지우고 갱신 시각 배너와 표를 출력
    pub fn render(&mut self, table: &Table) -> Result<()> {
        queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        writeln!(self.out)?;
        writeln!(self.out, "{}", self.banner(table))?;
        writeln!(self.out)?;
        for line in &table.lines {
            writeln!(self.out, "{}", line)?;
        }
        self.out.flush()?;
        Ok(())
    }

    /// Freshness line showing the table's as-of time in local time.
    pub fn banner(&self, table: &Table) -> String {
        let text = self.money.locale().messages();
        let local = table.as_of.with_timezone(&Local);
        format!(
            "📅 {}{}{}",
            text.last_update,
            text.colon,
            self.money.format_timestamp(&local)
        )
    }

    /// 화면을 지우지 않고 한 줄짜리 오류 배너를 덧붙임
    pub fn render_error(&mut self, message: &str, status: Option<u16>) -> Result<()> {
        let text = self.money.locale().messages();
        let message = message.split_whitespace().collect::<Vec<_>>().join(" ");
        let mut line = format!("❌ {}{}{}", text.fetch_error, text.colon, message);
        if let Some(status) = status {
            line.push_str(&format!(" ({}{}{})", text.http_status, text.colon, status));
        }

        writeln!(self.out)?;
        writeln!(self.out, "{}", line)?;
        self.out.flush()?;
        Ok(())
    }

    /// 오류 메시지와 HTTP 상태 코드(있으면)로 오류 배너 출력
    pub fn render_failure(&mut self, err: &TickerError) -> Result<()> {
        self.render_error(&err.to_string(), err.status())
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }
}
