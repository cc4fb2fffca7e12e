use super::RunContext;
use anyhow::Result;
use clap::Args;
use earnings_core::Ticker;
use futures::stream::{self, StreamExt};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Args, Debug, Clone)]
pub struct DownloadAllArgs {
    /// Watchlist names to skip
    #[arg(long, num_args = 1..)]
    pub ignore: Vec<String>,

    /// Concurrent downloads
    #[arg(long)]
    pub max_workers: Option<usize>,
}

/// Symbols across every watchlist not named in `ignore`, deduplicated.
/// Symbols that are not valid tickers are dropped.
fn collect_symbols<'a>(
    watchlists: impl IntoIterator<Item = (&'a String, &'a Vec<String>)>,
    ignore: &[String],
) -> BTreeSet<Ticker> {
    watchlists
        .into_iter()
        .filter(|(name, _)| !ignore.iter().any(|i| i.eq_ignore_ascii_case(name)))
        .flat_map(|(_, symbols)| symbols.iter())
        .filter_map(|symbol| Ticker::new(symbol).ok())
        .collect()
}

pub async fn run_download_all(ctx: &RunContext, args: DownloadAllArgs) -> Result<()> {
    let workers = ctx.max_workers(args.max_workers);
    let downloader = Arc::new(ctx.downloader()?);

    let tickers = ctx
        .with_client(ctx.backend, |client| async move {
            Ok(collect_symbols(&client.watchlists().await?, &args.ignore))
        })
        .await?;
    info!(count = tickers.len(), workers, "Downloading watchlist histories");

    let results: Vec<(Ticker, bool)> = stream::iter(tickers)
        .map(|ticker| {
            let downloader = Arc::clone(&downloader);
            let path = ctx.history_path(&ticker);
            async move {
                match downloader.download(&ticker, &path).await {
                    Ok(bytes) => {
                        info!(ticker = %ticker, bytes, "Downloaded");
                        (ticker, true)
                    }
                    Err(e) => {
                        warn!(ticker = %ticker, error = %e, "Download failed");
                        (ticker, false)
                    }
                }
            }
        })
        .buffer_unordered(workers)
        .collect()
        .await;

    let failed: Vec<_> = results
        .iter()
        .filter(|(_, ok)| !ok)
        .map(|(ticker, _)| ticker.as_str())
        .collect();

    println!("\n{:<25} {:>12}", "Downloaded", results.len() - failed.len());
    println!("{:<25} {:>12}", "Failed", failed.len());
    if !failed.is_empty() {
        println!("{:<25} {}", "Failed tickers", failed.join(", "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_collect_symbols_skips_ignored_lists() {
        let mut lists = BTreeMap::new();
        lists.insert("Tech".to_string(), vec!["AAPL".to_string(), "msft".to_string()]);
        lists.insert("Crypto".to_string(), vec!["BTC-USD!".to_string()]);
        lists.insert("Options Watchlist".to_string(), vec!["AAPL".to_string(), "NFLX".to_string()]);

        let symbols = collect_symbols(&lists, &["crypto".to_string()]);
        let names: Vec<_> = symbols.iter().map(Ticker::as_str).collect();

        assert_eq!(names, vec!["AAPL", "MSFT", "NFLX"]);
    }
}
