use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::config::Config;
use crate::models::{OrderIntent, Side, Signal};
use crate::portfolio::PortfolioLedger;

/// Why the risk gate refused an entry. These are expected outcomes,
/// not errors; the cycle simply moves on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum RejectReason {
    HoldSignal,
    PositionOpen,
    LimitReached,
    DailyLossLimit,
    CooldownActive,
    InsufficientBalance,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RejectReason::HoldSignal => "HOLD_SIGNAL",
            RejectReason::PositionOpen => "POSITION_OPEN",
            RejectReason::LimitReached => "LIMIT_REACHED",
            RejectReason::DailyLossLimit => "DAILY_LOSS_LIMIT",
            RejectReason::CooldownActive => "COOLDOWN_ACTIVE",
            RejectReason::InsufficientBalance => "INSUFFICIENT_BALANCE",
        };
        write!(f, "{label}")
    }
}

/// Outcome of the risk gate for one signal.
#[derive(Debug, Clone)]
pub enum RiskVerdict {
    Approved(OrderIntent),
    Rejected(RejectReason),
}

impl RiskVerdict {
    pub fn is_approved(&self) -> bool {
        matches!(self, RiskVerdict::Approved(_))
    }
}

/// Validates signals against the portfolio limits and sizes approved
/// entries.
///
/// Checks run in a fixed order and the first failure wins: direction,
/// one-position-per-symbol, daily trade cap, daily loss cap, per-symbol
/// cooldown, then balance. Exits are never gated here; the limits only
/// stop new entries.
#[derive(Debug, Clone)]
pub struct RiskManager {
    investment_amount: f64,
    max_position_size: f64,
    stop_loss_percentage: f64,
    take_profit_percentage: f64,
    max_daily_trades: u32,
    max_daily_loss: f64,
    cooldown_period_secs: u64,
}

impl RiskManager {
    pub fn new(config: &Config) -> Self {
        Self {
            investment_amount: config.investment_amount,
            max_position_size: config.max_position_size,
            stop_loss_percentage: config.stop_loss_percentage,
            take_profit_percentage: config.take_profit_percentage,
            max_daily_trades: config.max_daily_trades,
            max_daily_loss: config.max_daily_loss,
            cooldown_period_secs: config.cooldown_period_secs,
        }
    }

    /// Run the gate for one signal at the current price.
    pub fn evaluate(
        &self,
        signal: &Signal,
        ledger: &PortfolioLedger,
        current_price: f64,
        now: DateTime<Utc>,
    ) -> RiskVerdict {
        let side = match signal.direction.side() {
            Some(side) => side,
            None => return self.reject(&signal.symbol, RejectReason::HoldSignal),
        };

        if ledger.has_open_position(&signal.symbol) {
            return self.reject(&signal.symbol, RejectReason::PositionOpen);
        }

        if ledger.daily_trade_count(now) >= self.max_daily_trades {
            return self.reject(&signal.symbol, RejectReason::LimitReached);
        }

        if ledger.daily_loss(now) >= self.max_daily_loss {
            return self.reject(&signal.symbol, RejectReason::DailyLossLimit);
        }

        if let Some(last) = ledger.last_trade_time(&signal.symbol) {
            let elapsed = (now - last).num_seconds();
            if elapsed < self.cooldown_period_secs as i64 {
                return self.reject(&signal.symbol, RejectReason::CooldownActive);
            }
        }

        let available = ledger.available_balance();
        let notional = self.investment_amount.min(available * self.max_position_size);
        if current_price <= 0.0 || notional <= 0.0 || notional > available {
            return self.reject(&signal.symbol, RejectReason::InsufficientBalance);
        }
        let amount = notional / current_price;

        let (stop_loss, take_profit) = match side {
            Side::Buy => (
                current_price - current_price * self.stop_loss_percentage / 100.0,
                current_price + current_price * self.take_profit_percentage / 100.0,
            ),
            Side::Sell => (
                current_price + current_price * self.stop_loss_percentage / 100.0,
                current_price - current_price * self.take_profit_percentage / 100.0,
            ),
        };

        let stop_distance = (current_price - stop_loss).abs();
        let take_distance = (take_profit - current_price).abs();
        let risk_reward = if stop_distance > 0.0 {
            take_distance / stop_distance
        } else {
            0.0
        };

        debug!(
            "{}: approved {} {:.6} @ {:.4}, stop {:.4}, take {:.4}, r/r {:.2}",
            signal.symbol, side, amount, current_price, stop_loss, take_profit, risk_reward
        );

        RiskVerdict::Approved(OrderIntent {
            symbol: signal.symbol.clone(),
            side,
            amount,
            entry_price: current_price,
            stop_loss,
            take_profit,
            risk_reward,
        })
    }

    fn reject(&self, symbol: &str, reason: RejectReason) -> RiskVerdict {
        debug!("{}: entry rejected ({})", symbol, reason);
        RiskVerdict::Rejected(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Direction, ExitReason, Fill};
    use chrono::Duration;
    use std::collections::HashMap;

    fn signal(symbol: &str, direction: Direction) -> Signal {
        Signal {
            symbol: symbol.to_string(),
            direction,
            strength: 0.8,
            timestamp: Utc::now(),
        }
    }

    fn funded_ledger(now: DateTime<Utc>, balance: f64) -> PortfolioLedger {
        let mut ledger = PortfolioLedger::new("USD", 0, now);
        ledger.set_balances(HashMap::from([("USD".to_string(), balance)]));
        ledger
    }

    fn manager() -> RiskManager {
        RiskManager::new(&Config::default())
    }

    fn approve(verdict: RiskVerdict) -> OrderIntent {
        match verdict {
            RiskVerdict::Approved(intent) => intent,
            RiskVerdict::Rejected(reason) => panic!("expected approval, got {reason}"),
        }
    }

    fn reject_reason(verdict: RiskVerdict) -> RejectReason {
        match verdict {
            RiskVerdict::Rejected(reason) => reason,
            RiskVerdict::Approved(_) => panic!("expected rejection"),
        }
    }

    #[test]
    fn test_sizing_takes_the_smaller_bound() {
        // min(100, 1000 * 0.1) / 50 = 2.0 units
        let now = Utc::now();
        let ledger = funded_ledger(now, 1000.0);
        let intent = approve(manager().evaluate(&signal("ETH/USD", Direction::Buy), &ledger, 50.0, now));
        assert_eq!(intent.amount, 2.0);

        // With a big balance the investment amount binds instead
        let ledger = funded_ledger(now, 100_000.0);
        let intent = approve(manager().evaluate(&signal("ETH/USD", Direction::Buy), &ledger, 50.0, now));
        assert_eq!(intent.amount, 2.0); // min(100, 10000) / 50
    }

    #[test]
    fn test_approved_notional_never_exceeds_bounds() {
        let now = Utc::now();
        let ledger = funded_ledger(now, 730.0);
        let intent = approve(manager().evaluate(&signal("ETH/USD", Direction::Buy), &ledger, 37.0, now));
        let notional = intent.amount * 37.0;
        assert!(notional <= 730.0 * 0.1 + 1e-9);
        assert!(notional <= 100.0 + 1e-9);
    }

    #[test]
    fn test_stop_and_take_straddle_entry_for_buy() {
        // 5% stop and 15% take around entry 200
        let now = Utc::now();
        let ledger = funded_ledger(now, 1000.0);
        let intent = approve(manager().evaluate(&signal("ETH/USD", Direction::Buy), &ledger, 200.0, now));
        assert_eq!(intent.stop_loss, 190.0);
        assert_eq!(intent.take_profit, 230.0);
        assert!(intent.stop_loss < intent.entry_price && intent.entry_price < intent.take_profit);
        assert_eq!(intent.risk_reward, 3.0);
    }

    #[test]
    fn test_stop_and_take_invert_for_sell() {
        let now = Utc::now();
        let ledger = funded_ledger(now, 1000.0);
        let intent = approve(manager().evaluate(&signal("ETH/USD", Direction::Sell), &ledger, 200.0, now));
        assert_eq!(intent.stop_loss, 210.0);
        assert_eq!(intent.take_profit, 170.0);
        assert!(intent.take_profit < intent.entry_price && intent.entry_price < intent.stop_loss);
    }

    #[test]
    fn test_hold_never_proceeds() {
        let now = Utc::now();
        let ledger = funded_ledger(now, 1000.0);
        let verdict = manager().evaluate(&signal("ETH/USD", Direction::Hold), &ledger, 50.0, now);
        assert_eq!(reject_reason(verdict), RejectReason::HoldSignal);
    }

    #[test]
    fn test_one_position_per_symbol() {
        let now = Utc::now();
        let mut ledger = funded_ledger(now, 1000.0);
        let intent = approve(manager().evaluate(&signal("ETH/USD", Direction::Buy), &ledger, 50.0, now));
        ledger
            .open(&intent, &Fill { price: 50.0, amount: intent.amount }, now)
            .unwrap();

        let verdict = manager().evaluate(&signal("ETH/USD", Direction::Buy), &ledger, 50.0, now);
        assert_eq!(reject_reason(verdict), RejectReason::PositionOpen);

        // A different symbol is still allowed
        let verdict = manager().evaluate(&signal("DOT/USD", Direction::Buy), &ledger, 10.0, now);
        assert!(verdict.is_approved());
    }

    #[test]
    fn test_daily_trade_limit_blocks_entries_not_exits() {
        let mut config = Config::default();
        config.cooldown_period_secs = 0;
        config.max_daily_trades = 10;
        let manager = RiskManager::new(&config);

        let now = Utc::now();
        let mut ledger = funded_ledger(now, 10_000.0);

        // Ten round trips fill the day's budget
        for i in 0..10 {
            let symbol = format!("PAIR{i}/USD");
            let intent = approve(manager.evaluate(&signal(&symbol, Direction::Buy), &ledger, 10.0, now));
            let position = ledger
                .open(&intent, &Fill { price: 10.0, amount: intent.amount }, now)
                .unwrap();
            ledger.close(position.id, 10.1, ExitReason::Manual, now).unwrap();
        }
        assert_eq!(ledger.daily_trade_count(now), 10);

        let verdict = manager.evaluate(&signal("ETH/USD", Direction::Buy), &ledger, 50.0, now);
        assert_eq!(reject_reason(verdict), RejectReason::LimitReached);

        // Exits stay permitted past the limit: a still-open position can close
        let mut ledger_with_open = funded_ledger(now, 10_000.0);
        let intent = approve(manager.evaluate(&signal("ETH/USD", Direction::Buy), &ledger_with_open, 50.0, now));
        let position = ledger_with_open
            .open(&intent, &Fill { price: 50.0, amount: intent.amount }, now)
            .unwrap();
        let prices = HashMap::from([("ETH/USD".to_string(), 40.0)]);
        let closed = ledger_with_open.check_exits(&prices, now).unwrap();
        assert_eq!(closed.len(), 1);
    }

    #[test]
    fn test_daily_loss_limit_rejects() {
        let mut config = Config::default();
        config.cooldown_period_secs = 0;
        let manager = RiskManager::new(&config);

        let now = Utc::now();
        let mut ledger = funded_ledger(now, 10_000.0);

        // Lose 50+ on one trade: amount 10 at price 10, exit at 4.9
        let intent = approve(manager.evaluate(&signal("DOT/USD", Direction::Buy), &ledger, 10.0, now));
        let position = ledger
            .open(&intent, &Fill { price: 10.0, amount: intent.amount }, now)
            .unwrap();
        ledger.close(position.id, 4.9, ExitReason::StopLoss, now).unwrap();
        assert!(ledger.daily_loss(now) >= 50.0);

        let verdict = manager.evaluate(&signal("ETH/USD", Direction::Buy), &ledger, 50.0, now);
        assert_eq!(reject_reason(verdict), RejectReason::DailyLossLimit);
    }

    #[test]
    fn test_cooldown_blocks_reentry_until_elapsed() {
        // Last trade 10 minutes ago with a one hour cooldown
        let now = Utc::now();
        let mut ledger = funded_ledger(now, 10_000.0);
        let opened_at = now - Duration::minutes(10);
        let intent = approve(manager().evaluate(&signal("ETH/USD", Direction::Buy), &ledger, 50.0, opened_at));
        let position = ledger
            .open(&intent, &Fill { price: 50.0, amount: intent.amount }, opened_at)
            .unwrap();
        ledger.close(position.id, 57.5, ExitReason::TakeProfit, opened_at).unwrap();

        let verdict = manager().evaluate(&signal("ETH/USD", Direction::Buy), &ledger, 50.0, now);
        assert_eq!(reject_reason(verdict), RejectReason::CooldownActive);

        // Once the hour has passed the entry goes through
        let later = opened_at + Duration::seconds(3600);
        let verdict = manager().evaluate(&signal("ETH/USD", Direction::Buy), &ledger, 50.0, later);
        assert!(verdict.is_approved());
    }

    #[test]
    fn test_insufficient_balance_rejects() {
        let now = Utc::now();
        let ledger = funded_ledger(now, 0.0);
        let verdict = manager().evaluate(&signal("ETH/USD", Direction::Buy), &ledger, 50.0, now);
        assert_eq!(reject_reason(verdict), RejectReason::InsufficientBalance);
    }

    #[test]
    fn test_check_order_position_before_limits() {
        // With both an open position and an exhausted day budget the
        // position check fires first
        let mut config = Config::default();
        config.max_daily_trades = 1;
        config.cooldown_period_secs = 0;
        let manager = RiskManager::new(&config);

        let now = Utc::now();
        let mut ledger = funded_ledger(now, 10_000.0);
        let intent = approve(manager.evaluate(&signal("ETH/USD", Direction::Buy), &ledger, 50.0, now));
        ledger
            .open(&intent, &Fill { price: 50.0, amount: intent.amount }, now)
            .unwrap();

        let verdict = manager.evaluate(&signal("ETH/USD", Direction::Buy), &ledger, 50.0, now);
        assert_eq!(reject_reason(verdict), RejectReason::PositionOpen);
    }
}
