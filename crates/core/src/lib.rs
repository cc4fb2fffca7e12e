pub mod config;
pub mod config_loader;
pub mod dates;
pub mod error;
pub mod estimator;
pub mod provider;
pub mod traced;
pub mod traits;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{
    AppConfig, LoggingConfig, OptionSlamConfig, ReportConfig, RobinhoodConfig, StraddleConfig,
    YahooConfig,
};
pub use config_loader::ConfigLoader;
pub use dates::closest_on_or_after;
pub use error::{ProviderError, Result};
pub use estimator::{predicted_move_percent, StraddleEstimate, StraddleEstimator};
pub use provider::MarketData;
pub use traced::Traced;
pub use traits::{MarketDataProvider, OptionsDataSource};
pub use types::{OptionRight, StraddleQuote, Ticker};
