pub mod backoff;
pub mod synthetic;
pub mod trade_buffer;
pub mod trade_stream;

pub use backoff::ReconnectBackoff;
pub use synthetic::SyntheticTradeGenerator;
pub use trade_buffer::{BufferStats, RecentTradeBuffer};
pub use trade_stream::{FeedStatus, FeedStatusSnapshot, IngestStats, TradeIngestor};
