use crate::models::{PositionStatus, Trade};
use serde::{Deserialize, Serialize};

/// Performance summary of one backtest run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub initial_balance: f64,
    pub ending_equity: f64,
    pub total_pnl: f64,
    pub return_pct: f64,

    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,

    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    /// Total wins over total losses; infinite when nothing was lost
    pub profit_factor: f64,

    pub max_drawdown: f64,
    pub max_drawdown_pct: f64,

    pub trades: Vec<Trade>,
}

impl BacktestReport {
    /// Build a report from the ledger's trade history. Open trades are
    /// ignored; the runner closes everything before reporting.
    pub fn from_trades(trades: Vec<Trade>, initial_balance: f64, ending_equity: f64) -> Self {
        let pnls: Vec<f64> = trades
            .iter()
            .filter(|t| t.status == PositionStatus::Closed)
            .filter_map(|t| t.pnl)
            .collect();

        if pnls.is_empty() {
            return Self::empty(trades, initial_balance, ending_equity);
        }

        let total_pnl: f64 = pnls.iter().sum();
        let return_pct = if initial_balance > 0.0 {
            (ending_equity - initial_balance) / initial_balance * 100.0
        } else {
            0.0
        };

        let wins: Vec<f64> = pnls.iter().copied().filter(|p| *p > 0.0).collect();
        let losses: Vec<f64> = pnls.iter().copied().filter(|p| *p <= 0.0).collect();

        let total_trades = pnls.len();
        let win_rate = wins.len() as f64 / total_trades as f64 * 100.0;

        let total_wins: f64 = wins.iter().sum();
        let total_losses: f64 = losses.iter().map(|p| p.abs()).sum();

        let avg_win = if wins.is_empty() {
            0.0
        } else {
            total_wins / wins.len() as f64
        };
        let avg_loss = if losses.is_empty() {
            0.0
        } else {
            total_losses / losses.len() as f64
        };

        let largest_win = wins.iter().copied().fold(0.0, f64::max);
        let largest_loss = losses.iter().copied().fold(0.0, f64::min);

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_pct) = Self::drawdown(&pnls, initial_balance);

        Self {
            initial_balance,
            ending_equity,
            total_pnl,
            return_pct,
            total_trades,
            winning_trades: wins.len(),
            losing_trades: losses.len(),
            win_rate,
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
            profit_factor,
            max_drawdown,
            max_drawdown_pct,
            trades,
        }
    }

    fn empty(trades: Vec<Trade>, initial_balance: f64, ending_equity: f64) -> Self {
        Self {
            initial_balance,
            ending_equity,
            total_pnl: 0.0,
            return_pct: 0.0,
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            win_rate: 0.0,
            avg_win: 0.0,
            avg_loss: 0.0,
            largest_win: 0.0,
            largest_loss: 0.0,
            profit_factor: 0.0,
            max_drawdown: 0.0,
            max_drawdown_pct: 0.0,
            trades,
        }
    }

    /// Walk the equity curve trade by trade and track the deepest fall
    /// from any peak.
    fn drawdown(pnls: &[f64], initial_balance: f64) -> (f64, f64) {
        let mut equity = initial_balance;
        let mut peak = initial_balance;
        let mut max_dd = 0.0;

        for pnl in pnls {
            equity += pnl;
            if equity > peak {
                peak = equity;
            }
            let dd = peak - equity;
            if dd > max_dd {
                max_dd = dd;
            }
        }

        let max_dd_pct = if peak > 0.0 { max_dd / peak * 100.0 } else { 0.0 };
        (max_dd, max_dd_pct)
    }

    /// Print a formatted report to stdout
    pub fn print_report(&self) {
        println!();
        println!("═══════════════════════════════════════════");
        println!("            BACKTEST REPORT");
        println!("═══════════════════════════════════════════");

        println!();
        println!("📊 P&L");
        println!("  Initial Balance:   ${:.2}", self.initial_balance);
        println!(
            "  Ending Equity:     ${:.2} ({:+.2}%)",
            self.ending_equity, self.return_pct
        );
        println!("  Total P&L:         ${:.2}", self.total_pnl);

        println!();
        println!("📈 TRADES");
        println!("  Total:             {}", self.total_trades);
        println!(
            "  Winners:           {} ({:.1}%)",
            self.winning_trades, self.win_rate
        );
        println!("  Losers:            {}", self.losing_trades);

        if self.total_trades > 0 {
            println!();
            println!("💰 DISTRIBUTION");
            println!("  Average Win:       ${:.2}", self.avg_win);
            println!("  Average Loss:      ${:.2}", self.avg_loss);
            println!("  Largest Win:       ${:.2}", self.largest_win);
            println!("  Largest Loss:      ${:.2}", self.largest_loss);
            println!("  Profit Factor:     {:.2}", self.profit_factor);

            println!();
            println!("⚠️  RISK");
            println!(
                "  Max Drawdown:      ${:.2} ({:.2}%)",
                self.max_drawdown, self.max_drawdown_pct
            );
        }

        println!();
        println!("═══════════════════════════════════════════");
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Side;
    use chrono::Utc;
    use uuid::Uuid;

    fn closed_trade(pnl: f64) -> Trade {
        let entry_price = 100.0;
        let amount = 1.0;
        let opened_at = Utc::now();

        Trade {
            id: Uuid::new_v4(),
            symbol: "SYNTH/USD".to_string(),
            side: Side::Buy,
            amount,
            entry_price,
            exit_price: Some(entry_price + pnl / amount),
            pnl: Some(pnl),
            status: PositionStatus::Closed,
            opened_at,
            closed_at: Some(opened_at + chrono::Duration::minutes(30)),
        }
    }

    #[test]
    fn test_report_with_mixed_trades() {
        let trades = vec![closed_trade(100.0), closed_trade(50.0), closed_trade(-30.0)];
        let report = BacktestReport::from_trades(trades, 10_000.0, 10_120.0);

        assert_eq!(report.total_trades, 3);
        assert_eq!(report.winning_trades, 2);
        assert_eq!(report.losing_trades, 1);
        assert!((report.win_rate - 66.66).abs() < 0.1);
        assert!((report.total_pnl - 120.0).abs() < 1e-9);
        assert!((report.return_pct - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_report_with_no_trades() {
        let report = BacktestReport::from_trades(vec![], 10_000.0, 10_000.0);

        assert_eq!(report.total_trades, 0);
        assert_eq!(report.win_rate, 0.0);
        assert_eq!(report.total_pnl, 0.0);
        assert_eq!(report.profit_factor, 0.0);
    }

    #[test]
    fn test_profit_factor() {
        let trades = vec![closed_trade(200.0), closed_trade(100.0), closed_trade(-50.0)];
        let report = BacktestReport::from_trades(trades, 10_000.0, 10_250.0);

        assert!((report.profit_factor - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_profit_factor_with_no_losses_is_infinite() {
        let trades = vec![closed_trade(10.0)];
        let report = BacktestReport::from_trades(trades, 10_000.0, 10_010.0);

        assert!(report.profit_factor.is_infinite());
    }

    #[test]
    fn test_drawdown_tracks_fall_from_peak() {
        let trades = vec![
            closed_trade(100.0),  // peak 10100
            closed_trade(-200.0), // trough 9900
            closed_trade(50.0),
        ];
        let report = BacktestReport::from_trades(trades, 10_000.0, 9_950.0);

        assert!((report.max_drawdown - 200.0).abs() < 1e-9);
        assert!((report.max_drawdown_pct - 200.0 / 10_100.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_open_trades_are_excluded() {
        let mut open = closed_trade(999.0);
        open.status = PositionStatus::Open;
        open.exit_price = None;
        open.pnl = None;
        open.closed_at = None;

        let trades = vec![closed_trade(10.0), open];
        let report = BacktestReport::from_trades(trades, 10_000.0, 10_010.0);

        assert_eq!(report.total_trades, 1);
        assert!((report.total_pnl - 10.0).abs() < 1e-9);
    }
}
