pub mod download_all;
pub mod journal;
pub mod many_report;
pub mod report;

pub use download_all::{run_download_all, DownloadAllArgs};
pub use journal::{run_journal, JournalArgs, JournalCommand};
pub use many_report::{run_many_report, ManyReportArgs};
pub use report::{run_report, ReportArgs};

use anyhow::{Context, Result};
use clap::Args;
use earnings_analytics::{ClientFactory, MarketClient, MarketDataBackend};
use earnings_core::{AppConfig, ConfigLoader, StraddleEstimator, Ticker};
use earnings_data::{earnings_path, Credentials, Downloader, DownloaderConfig};
use earnings_robinhood::RobinhoodCredentials;
use std::future::Future;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Options shared by every subcommand.
#[derive(Args, Clone)]
pub struct GlobalArgs {
    /// TOML configuration file
    #[arg(long, global = true, default_value = "config/Config.toml")]
    pub config: PathBuf,

    /// Market data backend (robinhood or yahoo)
    #[arg(long, global = true, env = "DEFAULT_CLIENT")]
    pub data_source: Option<MarketDataBackend>,

    /// Lookback window in earnings events
    #[arg(long, global = true)]
    pub days: Option<usize>,

    /// Directory holding `{TICKER}/earnings.csv`
    #[arg(long, global = true, env = "DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[arg(long, global = true, env = "RH_USERNAME")]
    pub rh_username: Option<String>,

    #[arg(long, global = true, env = "RH_PASSWORD", hide_env_values = true)]
    pub rh_password: Option<String>,

    /// One-time code for accounts with multi-factor login
    #[arg(long, global = true, env = "RH_MFA")]
    pub rh_mfa: Option<String>,

    #[arg(long, global = true, env = "OPTIONSLAM_USERNAME")]
    pub optionslam_username: Option<String>,

    #[arg(long, global = true, env = "OPTIONSLAM_PASSWORD", hide_env_values = true)]
    pub optionslam_password: Option<String>,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true, env = "LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

/// Configuration and credentials resolved for one command. Neither type
/// derives `Debug` since both hold passwords.
pub struct RunContext {
    pub config: AppConfig,
    pub backend: MarketDataBackend,
    global: GlobalArgs,
}

impl RunContext {
    /// Loads the config file and applies command-line overrides on top.
    pub fn load(global: GlobalArgs) -> Result<Self> {
        let mut config = ConfigLoader::load_from(&global.config)
            .with_context(|| format!("loading {}", global.config.display()))?;

        if let Some(days) = global.days {
            config.report.days = days;
        }
        if let Some(dir) = &global.data_dir {
            config.report.data_dir = dir.clone();
        }
        if let Some(file) = &global.log_file {
            config.logging.file = Some(file.clone());
        }

        Ok(Self {
            config,
            backend: global.data_source.unwrap_or_default(),
            global,
        })
    }

    #[must_use]
    pub fn days(&self) -> usize {
        self.config.report.days
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.config.report.data_dir
    }

    #[must_use]
    pub fn history_path(&self, ticker: &Ticker) -> PathBuf {
        earnings_path(self.data_dir(), ticker)
    }

    #[must_use]
    pub fn estimator(&self) -> StraddleEstimator {
        StraddleEstimator::new(self.config.straddle.clone())
    }

    /// Worker count from the flag, then config, then available cores.
    #[must_use]
    pub fn max_workers(&self, flag: Option<usize>) -> usize {
        flag.or(self.config.report.max_workers)
            .filter(|n| *n > 0)
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(NonZeroUsize::get)
                    .unwrap_or(1)
            })
    }

    #[must_use]
    pub fn robinhood_credentials(&self) -> Option<RobinhoodCredentials> {
        let username = self.global.rh_username.as_deref()?;
        let password = self.global.rh_password.as_deref()?;
        let credentials = RobinhoodCredentials::new(username, password);
        Some(match self.global.rh_mfa.as_deref() {
            Some(code) => credentials.with_mfa_code(code),
            None => credentials,
        })
    }

    /// History downloader. Without credentials every download fails with
    /// a missing-credentials error rather than at startup.
    pub fn downloader(&self) -> Result<Downloader> {
        let credentials = match (
            self.global.optionslam_username.as_deref(),
            self.global.optionslam_password.as_deref(),
        ) {
            (Some(user), Some(pass)) => Some(Credentials::new(user, pass)),
            _ => None,
        };
        let downloader = Downloader::new(DownloaderConfig::from(&self.config.optionslam), credentials)?;
        Ok(downloader)
    }

    /// Logs in to `backend`, runs `f` with the client, then logs out
    /// whether or not `f` succeeded.
    pub async fn with_client<F, Fut, T>(&self, backend: MarketDataBackend, f: F) -> Result<T>
    where
        F: FnOnce(MarketClient) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let factory = ClientFactory::new(self.config.clone());
        let credentials = self.robinhood_credentials();
        let client = factory
            .create(backend, credentials.as_ref())
            .await
            .with_context(|| format!("connecting to {backend}"))?;
        debug!(backend = %backend, "Client ready");

        let result = f(client.clone()).await;
        client.logout().await;
        result
    }
}

/// Downloads the history file unless it is already on disk.
pub async fn ensure_history(downloader: &Downloader, ticker: &Ticker, path: &Path) -> Result<()> {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        debug!(ticker = %ticker, path = %path.display(), "History already downloaded");
        return Ok(());
    }
    downloader
        .download(ticker, path)
        .await
        .with_context(|| format!("downloading history for {ticker}"))?;
    Ok(())
}
