// Technical indicators module
// Pure functions over price history; None always means the window was
// too short, never a neutral default

pub mod bollinger;
pub mod macd;
pub mod moving_average;
pub mod rsi;
pub mod snapshot;
pub mod stochastic;
pub mod volume;

pub use bollinger::{calculate_bollinger, BollingerBands};
pub use macd::{calculate_macd, Macd};
pub use moving_average::{calculate_ema, calculate_sma, ema_series};
pub use rsi::calculate_rsi;
pub use snapshot::IndicatorSnapshot;
pub use stochastic::{calculate_stochastic, Stochastic};
pub use volume::calculate_volume_trend;
