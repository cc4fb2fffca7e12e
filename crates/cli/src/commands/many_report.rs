use super::{ensure_history, RunContext};
use anyhow::Result;
use clap::Args;
use earnings_analytics::{SummaryRow, SummaryTable, ValidatorFactory};
use earnings_core::{MarketDataProvider, Ticker};
use earnings_data::{Downloader, HistoricalSeries};
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Args, Debug, Clone)]
pub struct ManyReportArgs {
    /// Tickers to report on; defaults to those with upcoming earnings
    #[arg(long, num_args = 1..)]
    pub tickers: Vec<Ticker>,

    /// Tickers processed concurrently
    #[arg(long)]
    pub max_workers: Option<usize>,
}

pub async fn run_many_report(ctx: &RunContext, args: ManyReportArgs) -> Result<()> {
    let workers = ctx.max_workers(args.max_workers);
    let downloader = Arc::new(ctx.downloader()?);

    ctx.with_client(ctx.backend, |client| async move {
        let tickers = if args.tickers.is_empty() {
            client.upcoming_earnings().await?
        } else {
            args.tickers
        };
        info!(count = tickers.len(), workers, "Running multi-ticker report");

        let provider = client.provider(ctx.estimator());
        let days = ctx.days();

        let rows: Vec<SummaryRow> = stream::iter(tickers)
            .map(|ticker| {
                let provider = Arc::clone(&provider);
                let downloader = Arc::clone(&downloader);
                let path = ctx.history_path(&ticker);
                async move {
                    let outcome = summarize(&ticker, path, days, provider, &downloader).await;
                    if let Err(e) = &outcome {
                        warn!(ticker = %ticker, error = %e, "Skipping ticker");
                    }
                    outcome.ok()
                }
            })
            .buffer_unordered(workers)
            .filter_map(|row| async move { row })
            .collect()
            .await;

        let mut table = SummaryTable::new();
        for row in rows {
            table.push(row);
        }
        table.sort_by_probability();

        println!("\nUpcoming earnings ({}-event window, {} tickers)", days, table.len());
        println!("{}", "=".repeat(100));
        if table.is_empty() {
            println!("No ticker passed validation.");
        } else {
            print!("{}", table.render());
        }
        Ok(())
    })
    .await
}

async fn summarize(
    ticker: &Ticker,
    path: PathBuf,
    days: usize,
    provider: Arc<dyn MarketDataProvider>,
    downloader: &Downloader,
) -> Result<SummaryRow> {
    ensure_history(downloader, ticker, &path).await?;
    ValidatorFactory::new(ticker.clone(), &path, Arc::clone(&provider))
        .validate_all()
        .await?;
    let series = HistoricalSeries::from_csv(&path)?;
    Ok(SummaryRow::build(ticker.clone(), series, days, provider).await?)
}
