use super::RunContext;
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use earnings_analytics::MarketDataBackend;
use earnings_data::{group_trades, CsvStorage, JournalTrade};
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct JournalArgs {
    /// Journal CSV file
    #[arg(long, default_value = "journal/option_orders.csv")]
    pub path: PathBuf,

    #[command(subcommand)]
    pub command: JournalCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum JournalCommand {
    /// Write the full option order history, replacing the file
    Backfill,
    /// Append orders newer than the last journal row
    Update,
    /// Print trades grouped from the journal
    View,
}

pub async fn run_journal(ctx: &RunContext, args: JournalArgs) -> Result<()> {
    let path = args.path;
    match args.command {
        JournalCommand::Backfill => {
            let orders = ctx
                .with_client(MarketDataBackend::Robinhood, |client| async move {
                    Ok(client.option_orders().await?)
                })
                .await?;
            CsvStorage::write_orders(&path, &orders)
                .with_context(|| format!("writing {}", path.display()))?;
            info!(rows = orders.len(), path = %path.display(), "Journal backfilled");
            println!("Wrote {} order legs to {}", orders.len(), path.display());
        }
        JournalCommand::Update => {
            let orders = ctx
                .with_client(MarketDataBackend::Robinhood, |client| async move {
                    Ok(client.option_orders().await?)
                })
                .await?;
            let added = CsvStorage::append_orders(&path, &orders)
                .with_context(|| format!("updating {}", path.display()))?;
            info!(added, path = %path.display(), "Journal updated");
            println!("Added {} order legs to {}", added, path.display());
        }
        JournalCommand::View => {
            let orders = CsvStorage::read_orders(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            print_trades(&group_trades(&orders));
        }
    }
    Ok(())
}

fn print_trades(trades: &[JournalTrade]) {
    println!(
        "\n{:<8} {:<22} {:<20} {:>9} {:>12} {:>12} {:>12}",
        "Symbol", "Strategy", "Opened", "Qty", "Open", "Close", "P/L"
    );
    println!("{}", "=".repeat(100));

    let money = |value: Option<Decimal>| value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"));
    for trade in trades {
        println!(
            "{:<8} {:<22} {:<20} {:>9} {:>12} {:>12} {:>12}",
            trade.chain_symbol,
            trade.strategy_label,
            trade.opened_at.get(..19).unwrap_or(&trade.opened_at),
            trade.contracts.normalize().to_string(),
            money(Some(trade.premium_open)),
            money(trade.premium_close),
            money(trade.profit),
        );
    }

    let closed: Vec<_> = trades.iter().filter_map(|t| t.profit).collect();
    let total: Decimal = closed.iter().sum();
    println!("{}", "=".repeat(100));
    println!("{:<25} {:>12}", "Trades", trades.len());
    println!("{:<25} {:>12}", "Closed", closed.len());
    println!("{:<25} {:>12}", "Realised P/L", format!("{total:.2}"));
}
