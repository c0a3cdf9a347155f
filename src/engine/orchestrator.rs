use crate::config::{Config, ConfigPatch};
use crate::error::EngineError;
use crate::exchange::{Execution, MarketData};
use crate::indicators::IndicatorSnapshot;
use crate::models::{Candle, Position, Signal, Trade};
use crate::portfolio::{PerformanceStats, PortfolioLedger, PortfolioSnapshot, PortfolioSummary};
use crate::risk::{RiskManager, RiskVerdict};
use crate::strategy::SignalGenerator;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Point-in-time view of the engine reported over the control surface
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub running: bool,
    pub cycle_count: u64,
    pub last_cycle_at: Option<DateTime<Utc>>,
    /// Symbols skipped last cycle (bad feed or not enough candles)
    pub degraded_symbols: Vec<String>,
    /// Set when a ledger invariant stopped the loop
    pub fatal: Option<String>,
}

#[derive(Default)]
struct EngineState {
    running: bool,
    cycle_count: u64,
    last_cycle_at: Option<DateTime<Utc>>,
    degraded: Vec<String>,
    fatal: Option<String>,
    last_signals: HashMap<String, Signal>,
}

/// Ties the pipeline together: candles in, signals through risk, orders
/// out, ledger updated. One evaluation cycle per tick.
///
/// `start` and `stop` are idempotent. A stop request never aborts a
/// cycle already in flight; the loop drains it and then parks.
pub struct Engine {
    config: Arc<RwLock<Config>>,
    ledger: Arc<Mutex<PortfolioLedger>>,
    market: Arc<dyn MarketData>,
    execution: Arc<dyn Execution>,
    state: Arc<Mutex<EngineState>>,
    stop_tx: Mutex<Option<watch::Sender<bool>>>,
    loop_task: Mutex<Option<JoinHandle<()>>>,
}

impl Engine {
    pub fn new(config: Config, market: Arc<dyn MarketData>, execution: Arc<dyn Execution>) -> Self {
        let ledger = PortfolioLedger::new(
            &config.quote_currency,
            config.day_boundary_offset_hours,
            Utc::now(),
        );

        Self {
            config: Arc::new(RwLock::new(config)),
            ledger: Arc::new(Mutex::new(ledger)),
            market,
            execution,
            state: Arc::new(Mutex::new(EngineState::default())),
            stop_tx: Mutex::new(None),
            loop_task: Mutex::new(None),
        }
    }

    /// Spawn the cycle loop. Calling while already running is a no-op.
    pub async fn start(self: &Arc<Self>) {
        let mut stop_guard = self.stop_tx.lock().await;
        if stop_guard.is_some() {
            if self.state.lock().await.running {
                info!("⚠️  Engine already running, start ignored");
                return;
            }
            // a fatal halt exits the loop without consuming the stop
            // sender; reclaim it so the engine can be restarted
            stop_guard.take();
        }

        // let any previous loop drain before a new ticker exists
        if let Some(handle) = self.loop_task.lock().await.take() {
            let _ = handle.await;
        }

        let (tx, rx) = watch::channel(false);
        *stop_guard = Some(tx);

        {
            let mut state = self.state.lock().await;
            state.running = true;
            state.fatal = None;
        }

        let interval_secs = self.config.read().await.cycle_interval_secs;
        info!("🚀 Engine starting, one cycle every {}s", interval_secs);

        let engine = Arc::clone(self);
        let handle = tokio::spawn(async move {
            engine.run_loop(rx).await;
        });
        *self.loop_task.lock().await = Some(handle);
    }

    /// Request a stop. The in-flight cycle (if any) finishes first.
    /// Calling while already stopped is a no-op.
    pub async fn stop(&self) {
        let mut stop_guard = self.stop_tx.lock().await;
        match stop_guard.take() {
            Some(tx) => {
                let _ = tx.send(true);
                info!("🛑 Stop requested, current cycle will finish");
            }
            None => info!("⚠️  Engine already stopped, stop ignored"),
        }
    }

    async fn run_loop(self: Arc<Self>, mut stop_rx: watch::Receiver<bool>) {
        let interval_secs = self.config.read().await.cycle_interval_secs;
        let mut ticker = interval(Duration::from_secs(interval_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_cycle().await {
                        error!("💥 Fatal engine error, halting loop: {}", e);
                        self.state.lock().await.fatal = Some(e.to_string());
                        break;
                    }
                    if *stop_rx.borrow() {
                        break;
                    }
                }
            }
        }

        self.state.lock().await.running = false;
        info!("👋 Engine loop stopped");
    }

    /// One full evaluation pass over every configured pair: exits first,
    /// then fresh entries. A bad symbol degrades, it never takes the
    /// cycle down; only a ledger invariant does.
    pub async fn run_cycle(&self) -> Result<(), EngineError> {
        let config = self.config.read().await.clone();
        let generator = SignalGenerator::new(&config);
        let risk = RiskManager::new(&config);
        let now = Utc::now();

        info!("💹 [CYCLE] Tick at {}", now.format("%H:%M:%S"));

        match self.execution.balances().await {
            Ok(balances) => self.ledger.lock().await.set_balances(balances),
            Err(e) => warn!("  ✗ Balance refresh failed: {}", e),
        }

        let mut degraded = Vec::new();
        let mut windows: HashMap<String, Vec<Candle>> = HashMap::new();

        for symbol in &config.trading_pairs {
            match self.market.candles(symbol, config.candle_lookback).await {
                Ok(candles) => {
                    windows.insert(symbol.clone(), candles);
                }
                Err(e) => {
                    warn!("  ✗ {} candle fetch failed: {}", symbol, e);
                    degraded.push(symbol.clone());
                }
            }
        }

        let prices: HashMap<String, f64> = windows
            .iter()
            .filter_map(|(symbol, candles)| candles.last().map(|c| (symbol.clone(), c.close)))
            .collect();

        // exits always run before new entries
        let closed = {
            let mut ledger = self.ledger.lock().await;
            ledger.check_exits(&prices, now)?
        };
        for trade in &closed {
            let flatten = trade.side.opposite();
            if let Err(e) = self
                .execution
                .place_order(&trade.symbol, flatten, trade.amount)
                .await
            {
                warn!("  ✗ {} exit order failed on venue: {}", trade.symbol, e);
            }
        }

        let mut cycle_signals = HashMap::new();
        for symbol in &config.trading_pairs {
            let Some(candles) = windows.get(symbol) else {
                continue;
            };

            match self
                .evaluate_symbol(symbol, candles, &config, &generator, &risk, now)
                .await
            {
                Ok(signal) => {
                    cycle_signals.insert(symbol.clone(), signal);
                }
                Err(e) if e.is_symbol_scoped() => {
                    warn!("  ✗ {} skipped: {}", symbol, e);
                    degraded.push(symbol.clone());
                }
                Err(e) => return Err(e),
            }
        }

        self.log_summary(now).await;

        let mut state = self.state.lock().await;
        state.cycle_count += 1;
        state.last_cycle_at = Some(now);
        state.degraded = degraded;
        for (symbol, signal) in cycle_signals {
            state.last_signals.insert(symbol, signal);
        }

        Ok(())
    }

    async fn evaluate_symbol(
        &self,
        symbol: &str,
        candles: &[Candle],
        config: &Config,
        generator: &SignalGenerator,
        risk: &RiskManager,
        now: DateTime<Utc>,
    ) -> Result<Signal, EngineError> {
        let need = config.min_candles();
        if candles.len() < need {
            return Err(EngineError::InsufficientData {
                symbol: symbol.to_string(),
                have: candles.len(),
                need,
            });
        }

        let snapshot = IndicatorSnapshot::compute(candles, config);
        let signal = generator.evaluate(symbol, &snapshot, now);
        let price = snapshot.close;

        let verdict = {
            let ledger = self.ledger.lock().await;
            risk.evaluate(&signal, &ledger, price, now)
        };

        match verdict {
            RiskVerdict::Approved(intent) => {
                let fill = self
                    .execution
                    .place_order(symbol, intent.side, intent.amount)
                    .await
                    .map_err(|e| EngineError::Exchange {
                        symbol: symbol.to_string(),
                        message: e.to_string(),
                    })?;

                let mut ledger = self.ledger.lock().await;
                ledger.open(&intent, &fill, now)?;
            }
            RiskVerdict::Rejected(reason) => {
                debug!("  {} entry rejected: {}", symbol, reason);
            }
        }

        Ok(signal)
    }

    async fn log_summary(&self, now: DateTime<Utc>) {
        let ledger = self.ledger.lock().await;
        let summary = ledger.summary(now);
        info!(
            "📊 Portfolio: pnl ${:.2} | open {} | trades today {} | loss today ${:.2}",
            summary.total_pnl, summary.open_positions, summary.daily_trades, summary.daily_loss
        );
    }

    // ------------------------------------------------------------------
    // Control surface
    // ------------------------------------------------------------------

    pub async fn status(&self) -> EngineStatus {
        let state = self.state.lock().await;
        EngineStatus {
            running: state.running,
            cycle_count: state.cycle_count,
            last_cycle_at: state.last_cycle_at,
            degraded_symbols: state.degraded.clone(),
            fatal: state.fatal.clone(),
        }
    }

    pub async fn portfolio_summary(&self) -> PortfolioSummary {
        self.ledger.lock().await.summary(Utc::now())
    }

    pub async fn portfolio(&self) -> PortfolioSnapshot {
        self.ledger.lock().await.snapshot(Utc::now())
    }

    pub async fn open_positions(&self) -> Vec<Position> {
        self.ledger.lock().await.open_positions()
    }

    pub async fn trade_history(&self) -> Vec<Trade> {
        self.ledger.lock().await.trade_history()
    }

    pub async fn performance(&self) -> PerformanceStats {
        self.ledger.lock().await.performance()
    }

    /// Signal from the most recent evaluation of each symbol
    pub async fn last_signals(&self) -> HashMap<String, Signal> {
        self.state.lock().await.last_signals.clone()
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }

    /// Apply a partial config update. The patch validates as a whole
    /// first; on any error the running config is left untouched. An
    /// empty patch changes nothing.
    pub async fn update_config(&self, patch: &ConfigPatch) -> Result<Config, EngineError> {
        if patch.is_empty() {
            debug!("Empty config patch, nothing to apply");
            return Ok(self.config.read().await.clone());
        }

        let mut config = self.config.write().await;
        let updated = config.with_patch(patch)?;
        *config = updated.clone();
        info!("✅ Configuration updated");
        Ok(updated)
    }
}
