use crate::backtest::metrics::BacktestReport;
use crate::config::Config;
use crate::error::EngineError;
use crate::exchange::synthetic::{MarketScenario, SyntheticSeries};
use crate::indicators::IndicatorSnapshot;
use crate::models::{ExitReason, Fill};
use crate::portfolio::PortfolioLedger;
use crate::risk::{RiskManager, RiskVerdict};
use crate::strategy::SignalGenerator;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

const SYNTH_BASE_PRICE: f64 = 150.0;

/// Replays the live decision pipeline bar by bar over a synthetic
/// series: exits first, then signal, risk checks and entry. Same code
/// paths as the engine, just driven synchronously.
pub struct Backtester {
    config: Config,
    initial_balance: f64,
}

impl Backtester {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            initial_balance: 10_000.0,
        }
    }

    pub fn with_initial_balance(mut self, amount: f64) -> Self {
        self.initial_balance = amount;
        self
    }

    pub fn run(
        &self,
        scenario: MarketScenario,
        bars: usize,
        seed: u64,
    ) -> Result<BacktestReport, EngineError> {
        let warmup = self.config.min_candles();
        if bars <= warmup {
            return Err(EngineError::Config(format!(
                "backtest needs more than {} bars for indicator warmup, got {}",
                warmup, bars
            )));
        }

        let symbol = self
            .config
            .trading_pairs
            .first()
            .cloned()
            .unwrap_or_else(|| "SYNTH/USD".to_string());

        let mut series = SyntheticSeries::new(scenario, SYNTH_BASE_PRICE, seed);
        let candles = series.backfill(bars);

        info!(
            "🔬 Backtest: {} over {} bars of {} (seed {})",
            symbol, bars, scenario, seed
        );

        let generator = SignalGenerator::new(&self.config);
        let risk = RiskManager::new(&self.config);

        let start_time = candles[0].timestamp;
        let mut ledger = PortfolioLedger::new(
            &self.config.quote_currency,
            self.config.day_boundary_offset_hours,
            start_time,
        );
        let mut funding = HashMap::new();
        funding.insert(self.config.quote_currency.clone(), self.initial_balance);
        ledger.set_balances(funding);

        for i in warmup..candles.len() {
            let window_start = (i + 1).saturating_sub(self.config.candle_lookback);
            let window = &candles[window_start..=i];
            let price = candles[i].close;
            let now = candles[i].timestamp;

            // exits always run before new entries
            let mut prices = HashMap::new();
            prices.insert(symbol.clone(), price);
            let closed = ledger.check_exits(&prices, now)?;
            if !closed.is_empty() {
                debug!("bar {}: {} position(s) closed by exit trigger", i, closed.len());
            }

            let snapshot = IndicatorSnapshot::compute(window, &self.config);
            let signal = generator.evaluate(&symbol, &snapshot, now);

            if let RiskVerdict::Approved(intent) = risk.evaluate(&signal, &ledger, price, now) {
                let fill = Fill {
                    price,
                    amount: intent.amount,
                };
                ledger.open(&intent, &fill, now)?;
            }
        }

        // flatten whatever is still open at the last bar
        if let Some(last) = candles.last() {
            let open_ids: Vec<Uuid> = ledger.open_positions().iter().map(|p| p.id).collect();
            for id in open_ids {
                ledger.close(id, last.close, ExitReason::Manual, last.timestamp)?;
            }
        }

        let ending_equity = ledger.available_balance();
        let report =
            BacktestReport::from_trades(ledger.trade_history(), self.initial_balance, ending_equity);

        info!(
            "🏁 Backtest complete: {} trades, P&L ${:.2} ({:+.2}%)",
            report.total_trades, report.total_pnl, report.return_pct
        );

        Ok(report)
    }

    /// Run and print the formatted report
    pub fn run_and_report(
        &self,
        scenario: MarketScenario,
        bars: usize,
        seed: u64,
    ) -> Result<BacktestReport, EngineError> {
        println!("\n🔬 Running backtest: {} bars of {} (seed {})", bars, scenario, seed);
        println!("   Initial Balance: ${:.2}", self.initial_balance);

        let report = self.run(scenario, bars, seed)?;
        report.print_report();

        Ok(report)
    }
}
