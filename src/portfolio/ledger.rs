use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::{ExitReason, Fill, OrderIntent, Position, PositionStatus, Trade};

/// Totals view for the control surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub total_pnl: f64,
    pub open_positions: usize,
    pub total_trades: usize,
    pub daily_trades: u32,
    pub daily_loss: f64,
}

/// Realized performance over the trade history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub total_pnl: f64,
    pub win_rate: f64, // percent of closed trades with positive pnl
    pub total_trades: usize,
    pub open_positions: usize,
}

/// Point-in-time copy of the whole ledger. Safe to hand out; never
/// aliases ledger-owned containers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub positions: Vec<Position>,
    pub trades: Vec<Trade>,
    pub summary: PortfolioSummary,
}

/// The single source of truth for positions, trades, balances and
/// daily limits.
///
/// Every mutation funnels through `open` / `close` / `check_exits` on
/// one owner, so counters and cooldowns never race. Daily counters
/// reset when the configured day boundary passes; that reset lives
/// here, not in the caller.
#[derive(Debug)]
pub struct PortfolioLedger {
    /// Open positions only; a position leaves this map the moment it closes.
    positions: HashMap<Uuid, Position>,
    /// Append-only history. Open entries mirror `positions` by id.
    trades: Vec<Trade>,
    daily_trade_count: u32,
    daily_loss: f64,
    trading_day: NaiveDate,
    last_trade_time: HashMap<String, DateTime<Utc>>,
    balances: HashMap<String, f64>,
    quote_currency: String,
    day_offset_hours: i32,
}

impl PortfolioLedger {
    pub fn new(quote_currency: &str, day_offset_hours: i32, now: DateTime<Utc>) -> Self {
        let mut ledger = Self {
            positions: HashMap::new(),
            trades: Vec::new(),
            daily_trade_count: 0,
            daily_loss: 0.0,
            trading_day: NaiveDate::default(),
            last_trade_time: HashMap::new(),
            balances: HashMap::new(),
            quote_currency: quote_currency.to_string(),
            day_offset_hours,
        };
        ledger.trading_day = ledger.trading_day_for(now);
        ledger
    }

    fn trading_day_for(&self, now: DateTime<Utc>) -> NaiveDate {
        (now + Duration::hours(self.day_offset_hours as i64)).date_naive()
    }

    fn roll_day(&mut self, now: DateTime<Utc>) {
        let today = self.trading_day_for(now);
        if today != self.trading_day {
            info!(
                "📅 New trading day {} (was {}), daily counters reset",
                today, self.trading_day
            );
            self.trading_day = today;
            self.daily_trade_count = 0;
            self.daily_loss = 0.0;
        }
    }

    /// Entries opened in the current trading day. Reads as zero once
    /// the boundary has passed, even before the next mutation.
    pub fn daily_trade_count(&self, now: DateTime<Utc>) -> u32 {
        if self.trading_day_for(now) != self.trading_day {
            0
        } else {
            self.daily_trade_count
        }
    }

    /// Realized losses accumulated in the current trading day.
    pub fn daily_loss(&self, now: DateTime<Utc>) -> f64 {
        if self.trading_day_for(now) != self.trading_day {
            0.0
        } else {
            self.daily_loss
        }
    }

    pub fn has_open_position(&self, symbol: &str) -> bool {
        self.positions.values().any(|p| p.symbol == symbol)
    }

    pub fn last_trade_time(&self, symbol: &str) -> Option<DateTime<Utc>> {
        self.last_trade_time.get(symbol).copied()
    }

    /// Replace the balances snapshot with fresh collaborator data.
    pub fn set_balances(&mut self, balances: HashMap<String, f64>) {
        self.balances = balances;
    }

    /// Free quote currency available for sizing new entries.
    pub fn available_balance(&self) -> f64 {
        self.balances
            .get(&self.quote_currency)
            .copied()
            .unwrap_or(0.0)
    }

    /// Record a filled entry: one new open Position plus its mirrored
    /// open Trade (same id). Bumps the daily counter, stamps the
    /// symbol's cooldown clock and commits the notional from the quote
    /// balance.
    ///
    /// An existing open position on the symbol means the risk gate was
    /// bypassed, which is ledger corruption, not a rejection.
    pub fn open(
        &mut self,
        intent: &OrderIntent,
        fill: &Fill,
        now: DateTime<Utc>,
    ) -> Result<Position, EngineError> {
        self.roll_day(now);

        if self.has_open_position(&intent.symbol) {
            return Err(EngineError::Invariant(format!(
                "open on {} which already has an open position",
                intent.symbol
            )));
        }

        // Keep the configured stop/take percentages around the actual
        // fill price, not the decision price
        let scale = if intent.entry_price > 0.0 {
            fill.price / intent.entry_price
        } else {
            1.0
        };

        let position = Position {
            id: Uuid::new_v4(),
            symbol: intent.symbol.clone(),
            side: intent.side,
            amount: fill.amount,
            entry_price: fill.price,
            stop_loss: intent.stop_loss * scale,
            take_profit: intent.take_profit * scale,
            opened_at: now,
            status: PositionStatus::Open,
        };
        let trade = Trade {
            id: position.id,
            symbol: position.symbol.clone(),
            side: position.side,
            amount: position.amount,
            entry_price: position.entry_price,
            exit_price: None,
            pnl: None,
            status: PositionStatus::Open,
            opened_at: now,
            closed_at: None,
        };

        self.positions.insert(position.id, position.clone());
        self.trades.push(trade);
        self.daily_trade_count += 1;
        self.last_trade_time.insert(intent.symbol.clone(), now);

        let notional = fill.price * fill.amount;
        *self
            .balances
            .entry(self.quote_currency.clone())
            .or_insert(0.0) -= notional;

        info!(
            "📈 Opened {} {} {:.6} @ {:.4} (stop {:.4}, take {:.4})",
            position.side,
            position.symbol,
            position.amount,
            position.entry_price,
            position.stop_loss,
            position.take_profit
        );
        Ok(position)
    }

    /// Close an open position: pnl signed by side, mirrored Trade
    /// finalized, committed notional plus pnl returned to the quote
    /// balance, losses added to the daily loss counter.
    pub fn close(
        &mut self,
        position_id: Uuid,
        exit_price: f64,
        reason: ExitReason,
        now: DateTime<Utc>,
    ) -> Result<Trade, EngineError> {
        self.roll_day(now);

        let mut position = self.positions.remove(&position_id).ok_or_else(|| {
            EngineError::Invariant(format!(
                "close on unknown or already closed position {position_id}"
            ))
        })?;
        position.status = PositionStatus::Closed;

        let pnl = (exit_price - position.entry_price) * position.amount * position.side.sign();

        let trade = self
            .trades
            .iter_mut()
            .rev()
            .find(|t| t.id == position_id && t.status == PositionStatus::Open)
            .ok_or_else(|| {
                EngineError::Invariant(format!(
                    "no open trade mirrors position {position_id}"
                ))
            })?;
        trade.exit_price = Some(exit_price);
        trade.pnl = Some(pnl);
        trade.status = PositionStatus::Closed;
        trade.closed_at = Some(now);
        let closed = trade.clone();

        if pnl < 0.0 {
            self.daily_loss += pnl.abs();
        }
        *self
            .balances
            .entry(self.quote_currency.clone())
            .or_insert(0.0) += position.entry_price * position.amount + pnl;

        info!(
            "📉 Closed {} {} @ {:.4} ({}): pnl {:+.2}",
            closed.side, closed.symbol, exit_price, reason, pnl
        );
        Ok(closed)
    }

    /// Sweep every open position against current prices and close the
    /// ones whose stop or take has been crossed. Runs once per cycle,
    /// before entries are considered. Symbols without a price are left
    /// alone.
    pub fn check_exits(
        &mut self,
        prices: &HashMap<String, f64>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Trade>, EngineError> {
        // Collect first so the read borrow ends before any close
        let mut triggered: Vec<(Uuid, f64, ExitReason)> = Vec::new();
        for position in self.positions.values() {
            if let Some(&price) = prices.get(&position.symbol) {
                if let Some(reason) = position.exit_trigger(price) {
                    triggered.push((position.id, price, reason));
                }
            }
        }

        let mut closed = Vec::with_capacity(triggered.len());
        for (id, price, reason) in triggered {
            closed.push(self.close(id, price, reason, now)?);
        }
        Ok(closed)
    }

    pub fn open_positions(&self) -> Vec<Position> {
        let mut positions: Vec<Position> = self.positions.values().cloned().collect();
        positions.sort_by_key(|p| p.opened_at);
        positions
    }

    pub fn trade_history(&self) -> Vec<Trade> {
        self.trades.clone()
    }

    pub fn summary(&self, now: DateTime<Utc>) -> PortfolioSummary {
        let total_pnl = self.trades.iter().filter_map(|t| t.pnl).sum();
        PortfolioSummary {
            total_pnl,
            open_positions: self.positions.len(),
            total_trades: self.trades.len(),
            daily_trades: self.daily_trade_count(now),
            daily_loss: self.daily_loss(now),
        }
    }

    pub fn performance(&self) -> PerformanceStats {
        let closed: Vec<&Trade> = self
            .trades
            .iter()
            .filter(|t| t.status == PositionStatus::Closed)
            .collect();
        let winners = closed.iter().filter(|t| t.is_winner()).count();
        let win_rate = if closed.is_empty() {
            0.0
        } else {
            winners as f64 / closed.len() as f64 * 100.0
        };
        PerformanceStats {
            total_pnl: closed.iter().filter_map(|t| t.pnl).sum(),
            win_rate,
            total_trades: self.trades.len(),
            open_positions: self.positions.len(),
        }
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> PortfolioSnapshot {
        PortfolioSnapshot {
            positions: self.open_positions(),
            trades: self.trade_history(),
            summary: self.summary(now),
        }
    }
}
