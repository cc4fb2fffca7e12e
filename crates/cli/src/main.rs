use clap::{Parser, Subcommand};
use std::path::Path;

mod commands;

use commands::{
    DownloadAllArgs, GlobalArgs, JournalArgs, ManyReportArgs, ReportArgs, RunContext,
};

#[derive(Parser)]
#[command(name = "earnings")]
#[command(about = "Earnings move statistics against straddle-implied moves", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report every statistic for one ticker's earnings history
    Report(ReportArgs),
    /// Summarise many tickers, best profit probability first
    ManyReport(ManyReportArgs),
    /// Download earnings histories for every watchlist symbol
    DownloadAll(DownloadAllArgs),
    /// Option trade journal
    Journal(JournalArgs),
}

fn init_tracing(level: &str, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level))
    };

    if let Some(path) = log_file {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Credentials and DEFAULT_CLIENT may come from .env
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let ctx = RunContext::load(cli.global)?;
    init_tracing(&ctx.config.logging.level, ctx.config.logging.file.as_deref())?;

    match cli.command {
        Commands::Report(args) => commands::run_report(&ctx, args).await?,
        Commands::ManyReport(args) => commands::run_many_report(&ctx, args).await?,
        Commands::DownloadAll(args) => commands::run_download_all(&ctx, args).await?,
        Commands::Journal(args) => commands::run_journal(&ctx, args).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use commands::JournalCommand;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("earnings").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_report_parses_ticker() {
        let cli = parse(&["report", "--ticker", "aapl", "--days", "8"]);
        assert_eq!(cli.global.days, Some(8));
        match cli.command {
            Commands::Report(args) => {
                assert_eq!(args.ticker.as_str(), "AAPL");
                assert!(!args.refresh);
            }
            _ => panic!("expected report"),
        }
    }

    #[test]
    fn test_report_rejects_bad_ticker() {
        let result = Cli::try_parse_from(["earnings", "report", "--ticker", "../etc"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_many_report_tickers_and_workers() {
        let cli = parse(&["many-report", "--tickers", "AAPL", "msft", "--max-workers", "4"]);
        match cli.command {
            Commands::ManyReport(args) => {
                let names: Vec<_> = args.tickers.iter().map(|t| t.as_str()).collect();
                assert_eq!(names, vec!["AAPL", "MSFT"]);
                assert_eq!(args.max_workers, Some(4));
            }
            _ => panic!("expected many-report"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&["download-all", "--ignore", "Crypto", "--data-source", "yfinance"]);
        assert_eq!(
            cli.global.data_source,
            Some(earnings_analytics::MarketDataBackend::Yahoo)
        );
        match cli.command {
            Commands::DownloadAll(args) => assert_eq!(args.ignore, vec!["Crypto".to_string()]),
            _ => panic!("expected download-all"),
        }
    }

    #[test]
    fn test_unknown_data_source_rejected() {
        let result = Cli::try_parse_from(["earnings", "--data-source", "bloomberg", "journal", "view"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_journal_subcommands() {
        let cli = parse(&["journal", "--path", "/tmp/orders.csv", "update"]);
        match cli.command {
            Commands::Journal(args) => {
                assert!(matches!(args.command, JournalCommand::Update));
                assert_eq!(args.path, std::path::PathBuf::from("/tmp/orders.csv"));
            }
            _ => panic!("expected journal"),
        }
    }
}
