use super::{ensure_history, RunContext};
use anyhow::{Context, Result};
use clap::Args;
use earnings_analytics::{TickerReport, ValidatorFactory, ValidatorKind};
use earnings_core::Ticker;
use earnings_data::HistoricalSeries;
use std::path::Path;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Ticker symbol, e.g. AAPL
    #[arg(long)]
    pub ticker: Ticker,

    /// Download the history again even if it is already on disk
    #[arg(long)]
    pub refresh: bool,
}

pub async fn run_report(ctx: &RunContext, args: ReportArgs) -> Result<()> {
    let ticker = args.ticker;
    let path = ctx.history_path(&ticker);
    info!(ticker = %ticker, backend = %ctx.backend, days = ctx.days(), "Building report");

    ctx.with_client(ctx.backend, |client| async move {
        let provider = client.provider(ctx.estimator());
        let validators = ValidatorFactory::new(ticker.clone(), &path, provider.clone());

        // An unknown ticker must not cost a download.
        validators.validate(&[ValidatorKind::Ticker]).await?;

        if args.refresh {
            discard_history(&path).await?;
        }
        ensure_history(&ctx.downloader()?, &ticker, &path).await?;
        validators.validate(&ValidatorKind::AFTER_DOWNLOAD).await?;

        let series = HistoricalSeries::from_csv(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let report = TickerReport::build(ticker.clone(), series, ctx.days(), provider).await?;

        println!("\n{} earnings moves ({}-event window)", ticker, ctx.days());
        println!("{}", "=".repeat(100));
        print!("{}", report.render());
        Ok(())
    })
    .await
}

/// Removes a downloaded history so it is fetched again. A file that is
/// already gone is fine.
async fn discard_history(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("removing {}", path.display())),
    }
}
