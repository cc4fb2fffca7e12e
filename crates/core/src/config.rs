use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub report: ReportConfig,
    pub straddle: StraddleConfig,
    pub robinhood: RobinhoodConfig,
    pub yahoo: YahooConfig,
    pub optionslam: OptionSlamConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Directory holding `{TICKER}/earnings.csv` files.
    pub data_dir: PathBuf,
    /// Lookback window for the windowed statistics.
    pub days: usize,
    /// Parallelism for multi-ticker reports. `None` uses the core count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_workers: Option<usize>,
}

/// Strike-widening search bounds for the straddle estimator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StraddleConfig {
    pub strike_increment: Decimal,
    pub timeout_secs: u64,
    pub retry_delay_ms: u64,
}

impl StraddleConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobinhoodConfig {
    pub api_url: String,
    pub concurrency_limit: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YahooConfig {
    pub api_url: String,
    /// Requests allowed per `period_secs`.
    pub requests_per_period: u32,
    pub period_secs: u64,
    pub cache_path: PathBuf,
    pub cache_ttl_secs: u64,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionSlamConfig {
    pub base_url: String,
    pub login_path: String,
    pub download_path: String,
    pub csrf_field: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            report: ReportConfig {
                data_dir: PathBuf::from("data"),
                days: 30,
                max_workers: None,
            },
            straddle: StraddleConfig {
                strike_increment: Decimal::new(5, 1),
                timeout_secs: 10,
                retry_delay_ms: 250,
            },
            robinhood: RobinhoodConfig {
                api_url: "https://api.robinhood.com".to_string(),
                concurrency_limit: 2,
                timeout_secs: 30,
            },
            yahoo: YahooConfig {
                api_url: "https://query2.finance.yahoo.com".to_string(),
                requests_per_period: 2,
                period_secs: 5,
                cache_path: PathBuf::from("cache/yahoo.json"),
                cache_ttl_secs: 3600,
                timeout_secs: 30,
            },
            optionslam: OptionSlamConfig {
                base_url: "https://www.optionslam.com".to_string(),
                login_path: "/accounts/os_login/".to_string(),
                download_path: "/earnings/excel/{ticker}".to_string(),
                csrf_field: "csrfmiddlewaretoken".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.report.days, 30);
        assert_eq!(config.straddle.strike_increment, dec!(0.5));
        assert_eq!(config.straddle.timeout(), Duration::from_secs(10));
        assert_eq!(config.robinhood.concurrency_limit, 2);
        assert_eq!(config.yahoo.requests_per_period, 2);
        assert_eq!(config.yahoo.period_secs, 5);
    }
}
