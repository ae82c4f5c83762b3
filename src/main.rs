//! Copy-trading engine CLI.
//!
//! Drives the library against JSON fixtures: rank a leaderboard snapshot,
//! analyze a trade history into a record, validate policy parameters, or
//! replay a trade-signal script through the engine.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use copytrader::metrics::{RecordCalculator, TradeOutcome, TraderIdentity};
use copytrader::models::{PolicyParams, TradeSignal, TraderRecord};
use copytrader::ranking::{RankingEngine, RankingQuery, ScoreWeights};
use copytrader::store::TraderStore;
use copytrader::trading::{AllowAll, CopyEngine, PolicyBuilder, SessionContext};

/// Copy-trading engine CLI.
#[derive(Parser)]
#[command(name = "copytrader")]
#[command(about = "Rank traders and simulate copy-trade policies", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank a leaderboard snapshot
    Rank {
        /// JSON file with an array of trader records
        #[arg(short, long)]
        traders: PathBuf,

        /// Filter by risk level (low, medium, high)
        #[arg(long)]
        risk: Option<String>,

        /// Filter by asset symbol
        #[arg(long)]
        asset: Option<String>,

        /// Time window (7d, 30d, 90d, all)
        #[arg(short, long, default_value = "all")]
        window: String,

        /// Minimum ROI percent
        #[arg(long, default_value = "0")]
        min_roi: Decimal,

        /// Search by name or address
        #[arg(long)]
        search: Option<String>,

        /// Sort key (roi, win_rate, total_trades, score)
        #[arg(short, long, default_value = "roi")]
        sort: String,

        /// Sort direction (asc, desc)
        #[arg(short, long, default_value = "desc")]
        direction: String,

        /// Maximum rows to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Build a trader record from a closed-trade history
    Analyze {
        /// JSON file with an array of trade outcomes
        #[arg(short, long)]
        trades: PathBuf,

        /// Trader id for the record
        #[arg(long, default_value = "trader")]
        id: String,

        /// Trader wallet address
        #[arg(long, default_value = "0x0")]
        address: String,
    },

    /// Validate copy-trade parameters against a trader
    CheckPolicy {
        /// JSON file with an array of trader records
        #[arg(short, long)]
        traders: PathBuf,

        /// Trader id to copy
        #[arg(long)]
        trader: String,

        /// User id owning the policy
        #[arg(short, long, default_value = "local-user")]
        user: String,

        /// Investment amount (10-10000)
        #[arg(short, long)]
        amount: Decimal,

        /// Stop-loss percent (5-50)
        #[arg(long, default_value = "10")]
        stop_loss: Decimal,

        /// Max investment per trade, percent (5-100)
        #[arg(long, default_value = "25")]
        max_per_trade: Decimal,

        /// Close positions automatically on stop-loss breach
        #[arg(long)]
        auto_exit: bool,
    },

    /// Replay a trade-signal script through the copy engine
    Simulate {
        /// JSON file with an array of trader records
        #[arg(short, long)]
        traders: PathBuf,

        /// JSON file with an array of trade signals
        #[arg(short, long)]
        signals: PathBuf,

        /// Trader id to copy
        #[arg(long)]
        trader: String,

        /// Investment amount (10-10000)
        #[arg(short, long, default_value = "1000")]
        amount: Decimal,

        /// Stop-loss percent (5-50)
        #[arg(long, default_value = "10")]
        stop_loss: Decimal,

        /// Max investment per trade, percent (5-100)
        #[arg(long, default_value = "25")]
        max_per_trade: Decimal,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Rank {
            traders,
            risk,
            asset,
            window,
            min_roi,
            search,
            sort,
            direction,
            limit,
        } => {
            let records: Vec<TraderRecord> = load_json(&traders)?;

            let query = RankingQuery {
                risk_level: risk.as_deref().map(str::parse).transpose()?,
                asset,
                window: window.parse()?,
                min_roi,
                search,
                sort_key: sort.parse()?,
                direction: direction.parse()?,
            };

            let engine = RankingEngine::new(ScoreWeights::from_env());
            let ranked = engine.rank(&records, &query)?;

            println!(
                "\n{:<4} {:<16} {:<14} {:>7} {:>9} {:>8} {:>8} {:>8}",
                "#", "NAME", "ADDRESS", "WIN%", "ROI%", "RISK", "TRADES", "SCORE"
            );
            println!("{}", "-".repeat(82));

            for (rank, trader) in ranked.iter().take(limit).enumerate() {
                println!(
                    "{:<4} {:<16} {:<14} {:>6.1}% {:>9} {:>8} {:>8} {:>8.1}",
                    rank + 1,
                    truncate(&trader.name, 16),
                    truncate(&trader.address, 14),
                    trader.win_rate,
                    trader.roi_for(query.window),
                    trader.risk_level.as_str(),
                    trader.total_trades,
                    engine.composite_score(trader, query.window),
                );
            }
        }

        Commands::Analyze {
            trades,
            id,
            address,
        } => {
            let outcomes: Vec<TradeOutcome> = load_json(&trades)?;
            info!(trades = outcomes.len(), "Analyzing trade history");

            let record = RecordCalculator::calculate(
                TraderIdentity {
                    id: id.clone(),
                    name: id,
                    address,
                    verified: false,
                },
                &outcomes,
            );

            println!("\n=== Trader Record ===");
            println!("Total Trades:  {}", record.total_trades);
            println!("Win Rate:      {:.1}%", record.win_rate);
            println!("ROI (all):     {}%", record.roi);
            println!("ROI (7d):      {}%", record.roi_7d);
            println!("ROI (30d):     {}%", record.roi_30d);
            println!("ROI (90d):     {}%", record.roi_90d);
            println!("Max Drawdown:  {:.1}%", record.max_drawdown * 100.0);
            println!("Risk Level:    {}", record.risk_level.as_str());
            println!("Avg Duration:  {:.1}h", record.avg_trade_duration_hours);
        }

        Commands::CheckPolicy {
            traders,
            trader,
            user,
            amount,
            stop_loss,
            max_per_trade,
            auto_exit,
        } => {
            let store = load_store(&traders).await?;
            let builder = PolicyBuilder::new(&store);

            let params = PolicyParams {
                investment_amount: amount,
                stop_loss_pct: stop_loss,
                max_per_trade_pct: max_per_trade,
                auto_exit,
            };

            match builder
                .build(&SessionContext::new(user), &trader, params, &AllowAll)
                .await
            {
                Ok(policy) => {
                    println!("Policy valid:");
                    println!("  Trader:         {}", policy.trader_id);
                    println!("  Investment:     {}", policy.investment_amount);
                    println!("  Stop-Loss:      {}%", policy.stop_loss_pct);
                    println!("  Max Per Trade:  {}%", policy.max_per_trade_pct);
                    println!("  Auto-Exit:      {}", policy.auto_exit);
                }
                Err(err) => {
                    println!("Policy rejected: {err}");
                    std::process::exit(1);
                }
            }
        }

        Commands::Simulate {
            traders,
            signals,
            trader,
            amount,
            stop_loss,
            max_per_trade,
        } => {
            let store = Arc::new(load_store(&traders).await?);
            let script: Vec<TradeSignal> = load_json(&signals)?;

            let builder = PolicyBuilder::new(&store);
            let session = SessionContext::new("local-user");
            let policy = builder
                .build(
                    &session,
                    &trader,
                    PolicyParams {
                        investment_amount: amount,
                        stop_loss_pct: stop_loss,
                        max_per_trade_pct: max_per_trade,
                        auto_exit: true,
                    },
                    &AllowAll,
                )
                .await?;

            let engine = CopyEngine::new(store);
            engine.register(policy).await?;

            for signal in &script {
                let events = engine.handle_signal(signal).await?;
                for position in events {
                    println!(
                        "{:?} {} {} @ {} -> pnl {}%{}",
                        signal.kind,
                        position.asset,
                        position.amount,
                        position.current_price,
                        position.pnl_pct.round_dp(2),
                        position
                            .close_reason
                            .map(|r| format!(" (closed: {})", r.as_str()))
                            .unwrap_or_default(),
                    );
                }
            }

            println!("\n=== Final Positions ===");
            for position in engine.positions_for(&session.user_id).await {
                println!(
                    "{} {} entry {} current {} pnl {}% [{}]",
                    position.asset,
                    position.amount,
                    position.entry_price,
                    position.current_price,
                    position.pnl_pct.round_dp(2),
                    position
                        .close_reason
                        .map(|r| r.as_str().to_string())
                        .unwrap_or_else(|| "open".to_string()),
                );
            }
            println!(
                "Stale signals absorbed: {}, dropped: {}",
                engine.tracker().stale_signals(),
                engine.tracker().dropped_signals()
            );
        }
    }

    Ok(())
}

fn load_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

async fn load_store(path: &PathBuf) -> Result<TraderStore> {
    let records: Vec<TraderRecord> = load_json(path)?;
    let store = TraderStore::new();
    store.replace_snapshot(records).await?;
    Ok(store)
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}…", &s[..max.saturating_sub(1)])
    }
}
