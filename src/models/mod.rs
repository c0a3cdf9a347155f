use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// One OHLCV bar. Sequences are ordered oldest-first, one per symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Side of an order or position.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// +1 for long, -1 for short. Used to sign pnl.
    pub fn sign(&self) -> f64 {
        match self {
            Side::Buy => 1.0,
            Side::Sell => -1.0,
        }
    }

    /// The order side that flattens a position opened on this side
    pub fn opposite(&self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Directional outcome of one evaluation. Hold means "do nothing".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Direction {
    Buy,
    Sell,
    Hold,
}

impl Direction {
    pub fn side(&self) -> Option<Side> {
        match self {
            Direction::Buy => Some(Side::Buy),
            Direction::Sell => Some(Side::Sell),
            Direction::Hold => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => write!(f, "BUY"),
            Direction::Sell => write!(f, "SELL"),
            Direction::Hold => write!(f, "HOLD"),
        }
    }
}

/// Trade signal produced fresh each cycle. Stateless; strength in [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub direction: Direction,
    pub strength: f64,
    pub timestamp: DateTime<Utc>,
}

impl Signal {
    pub fn hold(symbol: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.to_string(),
            direction: Direction::Hold,
            strength: 0.0,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum PositionStatus {
    Open,
    Closed,
}

/// An open market commitment, guarded by its stop and take levels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: Uuid,
    pub symbol: String,
    pub side: Side,
    pub amount: f64,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub opened_at: DateTime<Utc>,
    pub status: PositionStatus,
}

impl Position {
    pub fn unrealized_pnl(&self, current_price: f64) -> f64 {
        (current_price - self.entry_price) * self.amount * self.side.sign()
    }

    /// Stop or take trigger at `price`, if any. Touching the level
    /// counts as crossed; the stop is checked first.
    pub fn exit_trigger(&self, price: f64) -> Option<ExitReason> {
        match self.side {
            Side::Buy => {
                if price <= self.stop_loss {
                    Some(ExitReason::StopLoss)
                } else if price >= self.take_profit {
                    Some(ExitReason::TakeProfit)
                } else {
                    None
                }
            }
            Side::Sell => {
                if price >= self.stop_loss {
                    Some(ExitReason::StopLoss)
                } else if price <= self.take_profit {
                    Some(ExitReason::TakeProfit)
                } else {
                    None
                }
            }
        }
    }
}

/// Record of a position's life. Shares its Position's id and mirrors it
/// while open; once closed it is the permanent, immutable record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: Uuid,
    pub symbol: String,
    pub side: Side,
    pub amount: f64,
    pub entry_price: f64,
    pub exit_price: Option<f64>,
    pub pnl: Option<f64>,
    pub status: PositionStatus,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.pnl.map(|p| p > 0.0).unwrap_or(false)
    }
}

/// Why an open position was closed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    Manual,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::StopLoss => write!(f, "stop-loss"),
            ExitReason::TakeProfit => write!(f, "take-profit"),
            ExitReason::Manual => write!(f, "manual"),
        }
    }
}

/// A risk-approved order, ready for the execution collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderIntent {
    pub symbol: String,
    pub side: Side,
    pub amount: f64,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub risk_reward: f64, // take distance / stop distance, informational
}

/// Fill confirmation from the execution collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub price: f64,
    pub amount: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pnl_sign_follows_side() {
        let mut position = Position {
            id: Uuid::new_v4(),
            symbol: "ETH/USD".to_string(),
            side: Side::Buy,
            amount: 2.0,
            entry_price: 100.0,
            stop_loss: 95.0,
            take_profit: 115.0,
            opened_at: Utc::now(),
            status: PositionStatus::Open,
        };
        assert_eq!(position.unrealized_pnl(110.0), 20.0);

        position.side = Side::Sell;
        assert_eq!(position.unrealized_pnl(110.0), -20.0);
    }

    #[test]
    fn test_exit_trigger_respects_side() {
        let long = Position {
            id: Uuid::new_v4(),
            symbol: "ETH/USD".to_string(),
            side: Side::Buy,
            amount: 1.0,
            entry_price: 200.0,
            stop_loss: 190.0,
            take_profit: 230.0,
            opened_at: Utc::now(),
            status: PositionStatus::Open,
        };
        assert_eq!(long.exit_trigger(189.0), Some(ExitReason::StopLoss));
        assert_eq!(long.exit_trigger(230.0), Some(ExitReason::TakeProfit));
        assert_eq!(long.exit_trigger(205.0), None);

        let short = Position {
            side: Side::Sell,
            stop_loss: 210.0,
            take_profit: 170.0,
            ..long
        };
        assert_eq!(short.exit_trigger(211.0), Some(ExitReason::StopLoss));
        assert_eq!(short.exit_trigger(170.0), Some(ExitReason::TakeProfit));
        assert_eq!(short.exit_trigger(195.0), None);
    }

    #[test]
    fn test_hold_signal_has_zero_strength() {
        let signal = Signal::hold("DOT/USD", Utc::now());
        assert_eq!(signal.direction, Direction::Hold);
        assert_eq!(signal.strength, 0.0);
        assert!(signal.direction.side().is_none());
    }
}
