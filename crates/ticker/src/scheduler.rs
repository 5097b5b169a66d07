use chrono::Utc;
use std::any::Any;
use std::future::Future;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;
use ticker_common::config::TickerConfig;
use ticker_common::{InstrumentSpec, Result, TickerError};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::formatter::{Table, TableFormatter, TableLayout};
use crate::money::CurrencyFormatter;
use crate::normalizer::normalize;
use crate::price_source::{build_source, PriceSource, RawResponse};
use crate::renderer::Renderer;

/// Whether a refresh cycle is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Running,
}

#[derive(Debug)]
pub enum CycleOutcome {
    /// Table drawn with this many data rows.
    Rendered { rows: usize },
    /// Cycle aborted; the error banner was written below the last table.
    Failed(TickerError),
    /// A tick arrived while a cycle was still running.
    Skipped,
}

impl CycleOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, CycleOutcome::Rendered { .. })
    }
}

/// Drives fetch → normalize → format → render, once now and then every `period`.
pub struct Scheduler<W: Write> {
    source: Box<dyn PriceSource>,
    instruments: Vec<InstrumentSpec>,
    formatter: TableFormatter,
    renderer: Renderer<W>,
    period: Duration,
    state: CycleState,
}

impl<W: Write> Scheduler<W> {
    /// 소스, 종목, 포매터, 렌더러를 묶고 `period` 마다 갱신
    pub fn new(
        source: Box<dyn PriceSource>,
        instruments: Vec<InstrumentSpec>,
        formatter: TableFormatter,
        renderer: Renderer<W>,
        period: Duration,
    ) -> Self {
        Self {
            source,
            instruments,
            formatter,
            renderer,
            period,
            state: CycleState::Idle,
        }
    }

    /// Wires the configured source, layout and locale to `out`.
    pub fn from_config(config: &TickerConfig, out: W) -> Result<Self> {
        config.validate()?;
        let source = build_source(config)?;
        let money = CurrencyFormatter::new(config.locale, &config.quote_currency);
        let layout = TableLayout::from_config(&config.layout, &source.windows());

        Ok(Self::new(
            source,
            config.effective_instruments(),
            TableFormatter::new(layout, money.clone()),
            Renderer::new(out, money),
            config.refresh_interval(),
        ))
    }

    /// 현재 사이클 상태
    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn renderer(&self) -> &Renderer<W> {
        &self.renderer
    }

    /// 한 사이클 실행. 이미 실행 중이면 건너뜀
    pub async fn tick(&mut self) -> CycleOutcome {
        if self.state == CycleState::Running {
            warn!("Previous cycle still running, skipping this tick");
            return CycleOutcome::Skipped;
        }

        self.state = CycleState::Running;
        let outcome = self.run_cycle().await;
        self.state = CycleState::Idle;
        outcome
    }

    async fn run_cycle(&mut self) -> CycleOutcome {
        debug!("Cycle started ({})", self.source.name());
        let now = Utc::now();

        let result = match self.source.fetch(&self.instruments).await {
            Ok(raw) => self.build_table(&raw, now).and_then(|table| {
                self.renderer.render(&table)?;
                Ok(table.rows().len())
            }),
            Err(e) => Err(e),
        };

        match result {
            Ok(rows) => {
                debug!("Cycle finished, {} rows rendered", rows);
                CycleOutcome::Rendered { rows }
            }
            Err(e) => {
                error!("Cycle failed: {}", e);
                if let Err(render_err) = self.renderer.render_failure(&e) {
                    error!("Failed to write error banner: {}", render_err);
                }
                CycleOutcome::Failed(e)
            }
        }
    }

    /// Normalize and format; a panic in here only fails this cycle.
    fn build_table(&self, raw: &RawResponse, now: chrono::DateTime<Utc>) -> Result<Table> {
        let completeness = self.source.completeness();
        panic::catch_unwind(AssertUnwindSafe(|| {
            let snapshot = normalize(raw, &self.instruments, completeness, now)?;
            Ok(self.formatter.format(&snapshot.records, snapshot.as_of))
        }))
        .unwrap_or_else(|payload| {
            Err(TickerError::Render(format!(
                "table build panicked: {}",
                panic_message(payload.as_ref())
            )))
        })
    }

    /// Ticks immediately, then every period, until `shutdown` resolves.
    ///
    /// Returns the number of cycles started.
    pub async fn run_until<F>(&mut self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(self.period);
        // 사이클이 주기보다 길어지면 밀린 tick 은 버림
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!(
            "Ticker started: {} instruments from {}, every {:?}",
            self.instruments.len(),
            self.source.name(),
            self.period
        );

        let mut cycles = 0;
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested after {} cycles", cycles);
                    break;
                }
                _ = ticker.tick() => {
                    cycles += 1;
                    self.tick().await;
                }
            }
        }
        cycles
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
