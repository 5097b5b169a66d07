pub mod coindesk;
pub mod coingecko;
pub mod formatter;
pub mod http;
pub mod money;
pub mod normalizer;
pub mod price_source;
pub mod renderer;
pub mod scheduler;

pub use formatter::{DisplayLine, Table, TableFormatter, TableLayout};
pub use price_source::{Completeness, PriceSource, RawResponse};
pub use renderer::Renderer;
pub use scheduler::{CycleOutcome, CycleState, Scheduler};
pub use ticker_common::{InstrumentSpec, PriceChange, PriceRecord, TickerError};
