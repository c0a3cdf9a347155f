use clap::{Parser, Subcommand};
use std::sync::Arc;
use swingbot::backtest::Backtester;
use swingbot::exchange::{Execution, MarketScenario, PaperExchange};
use swingbot::{Config, Engine};
use tracing::info;

#[derive(Parser)]
#[command(name = "swingbot", version, about = "Indicator-driven swing trading engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the decision loop against the paper venue
    Run {
        /// Market shape for the synthetic feeds
        #[arg(long, default_value = "trending-up")]
        scenario: MarketScenario,
        /// Seed for the synthetic feeds
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Paper account starting balance in quote currency
        #[arg(long, default_value_t = 10_000.0)]
        balance: f64,
    },
    /// Replay the pipeline over a synthetic series and print a report
    Backtest {
        #[arg(long, default_value = "trending-up")]
        scenario: MarketScenario,
        /// Number of candles to simulate
        #[arg(long, default_value_t = 500)]
        bars: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value_t = 10_000.0)]
        balance: f64,
    },
    /// Validate configuration and venue connectivity
    Check,
    /// Print the active configuration as JSON
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Command::Run {
            scenario,
            seed,
            balance,
        } => run(config, scenario, seed, balance).await,
        Command::Backtest {
            scenario,
            bars,
            seed,
            balance,
        } => backtest(config, scenario, bars, seed, balance),
        Command::Check => check(config).await,
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("swingbot=info,swingbot::strategy=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(
    config: Config,
    scenario: MarketScenario,
    seed: u64,
    balance: f64,
) -> anyhow::Result<()> {
    info!(
        "🚀 swingbot starting in paper mode ({} market, seed {})",
        scenario, seed
    );

    let venue =
        Arc::new(PaperExchange::new(&config, scenario, seed).with_starting_balance(balance));
    if !venue.test_connection().await {
        anyhow::bail!("venue connectivity check failed");
    }

    log_config(&config);

    let engine = Arc::new(Engine::new(config, venue.clone(), venue));
    engine.start().await;

    info!("Press Ctrl+C to stop...");
    tokio::signal::ctrl_c().await?;
    info!("⚠️  Received Ctrl+C, shutting down...");

    engine.stop().await;
    for _ in 0..50 {
        if !engine.status().await.running {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }

    let perf = engine.performance().await;
    info!(
        "📊 Final: pnl ${:.2} | win rate {:.1}% | {} trades | {} still open",
        perf.total_pnl, perf.win_rate, perf.total_trades, perf.open_positions
    );
    info!("👋 swingbot stopped");
    Ok(())
}

fn backtest(
    config: Config,
    scenario: MarketScenario,
    bars: usize,
    seed: u64,
    balance: f64,
) -> anyhow::Result<()> {
    let runner = Backtester::new(config).with_initial_balance(balance);
    runner.run_and_report(scenario, bars, seed)?;
    Ok(())
}

async fn check(config: Config) -> anyhow::Result<()> {
    println!(
        "✅ Configuration valid ({} pairs, cycle every {}s)",
        config.trading_pairs.len(),
        config.cycle_interval_secs
    );

    let venue = PaperExchange::new(&config, MarketScenario::Ranging, 42);
    if venue.test_connection().await {
        println!("✅ Paper venue reachable");
    } else {
        println!("❌ Paper venue unreachable");
    }

    let balances = venue.balances().await?;
    for (currency, amount) in &balances {
        println!("   {} balance: {:.2}", currency, amount);
    }

    Ok(())
}

fn log_config(config: &Config) {
    info!("📊 Configuration:");
    info!("  Investment: ${:.2} per entry", config.investment_amount);
    info!(
        "  Max Position: {:.0}% of available balance",
        config.max_position_size * 100.0
    );
    info!(
        "  Stop Loss: {:.1}% | Take Profit: {:.1}%",
        config.stop_loss_percentage, config.take_profit_percentage
    );
    info!(
        "  Daily Limits: {} trades, ${:.2} loss",
        config.max_daily_trades, config.max_daily_loss
    );
    info!("  Cooldown: {}s per symbol", config.cooldown_period_secs);
    info!("  Cycle: every {}s", config.cycle_interval_secs);
    info!("  Pairs: {}", config.trading_pairs.join(", "));
}
