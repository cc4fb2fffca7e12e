//! Earnings-history downloader.
//!
//! The history site only serves its CSV export to logged-in users behind a
//! CSRF-protected form, so a download is three requests on one cookie
//! session: fetch the landing page for the token, post the login form,
//! then fetch the export.

use earnings_core::{OptionSlamConfig, Ticker};
use regex::{Regex, RegexBuilder};
use reqwest::header::{HeaderMap, HeaderValue, ORIGIN, REFERER, USER_AGENT};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/112.0";

/// Errors from the download flow. None of them carry the password.
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("could not find {attr} on page: {url}")]
    CsrfNotFound { attr: String, url: String },

    #[error("login to {url} as {username} rejected: {status}")]
    LoginRejected {
        url: String,
        status: StatusCode,
        username: String,
    },

    #[error("GET {url} returned {status}")]
    Status { url: String, status: StatusCode },

    #[error("no credentials configured for {0}")]
    MissingCredentials(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid header or pattern: {0}")]
    Setup(String),
}

/// Site login. The password is never logged or formatted.
#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    pub base_url: String,
    pub login_path: String,
    /// Export path; `{ticker}` is substituted.
    pub download_path: String,
    pub csrf_field: String,
    pub timeout_secs: u64,
}

impl From<&OptionSlamConfig> for DownloaderConfig {
    fn from(config: &OptionSlamConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            login_path: config.login_path.clone(),
            download_path: config.download_path.clone(),
            csrf_field: config.csrf_field.clone(),
            timeout_secs: 60,
        }
    }
}

impl DownloaderConfig {
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn login_url(&self) -> String {
        format!("{}{}", self.base_url, self.login_path)
    }

    #[must_use]
    pub fn download_url(&self, ticker: &Ticker) -> String {
        format!(
            "{}{}",
            self.base_url,
            self.download_path.replace("{ticker}", ticker.as_str())
        )
    }
}

/// Pulls a named `<input>`'s value out of an HTML page.
#[derive(Debug, Clone)]
struct InputExtractor {
    input_tag: Regex,
    value_attr: Regex,
}

impl InputExtractor {
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            input_tag: RegexBuilder::new(r"<input\b[^>]*>").case_insensitive(true).build()?,
            value_attr: RegexBuilder::new(r#"\bvalue\s*=\s*["']([^"']*)["']"#)
                .case_insensitive(true)
                .build()?,
        })
    }

    fn value_of(&self, html: &str, name: &str) -> Option<String> {
        let name_attr = [format!("name=\"{name}\""), format!("name='{name}'")];
        self.input_tag
            .find_iter(html)
            .map(|m| m.as_str())
            .find(|tag| name_attr.iter().any(|attr| tag.contains(attr.as_str())))
            .and_then(|tag| self.value_attr.captures(tag))
            .and_then(|caps| caps.get(1))
            .map(|value| value.as_str().to_string())
    }
}

pub struct Downloader {
    config: DownloaderConfig,
    credentials: Option<Credentials>,
    http: Client,
    extractor: InputExtractor,
}

impl std::fmt::Debug for Downloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downloader")
            .field("base_url", &self.config.base_url)
            .field(
                "username",
                &self.credentials.as_ref().map(|c| c.username.as_str()),
            )
            .finish_non_exhaustive()
    }
}

impl Downloader {
    /// Builds a downloader with its own cookie session.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(
        config: DownloaderConfig,
        credentials: Option<Credentials>,
    ) -> Result<Self, DownloadError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));
        headers.insert(
            ORIGIN,
            HeaderValue::from_str(&config.base_url).map_err(|e| DownloadError::Setup(e.to_string()))?,
        );
        headers.insert(
            REFERER,
            HeaderValue::from_str(&config.login_url())
                .map_err(|e| DownloadError::Setup(e.to_string()))?,
        );

        let http = Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        let extractor = InputExtractor::new().map_err(|e| DownloadError::Setup(e.to_string()))?;

        Ok(Self {
            config,
            credentials,
            http,
            extractor,
        })
    }

    #[must_use]
    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    /// Logs in and saves the ticker's export to `destination`, creating
    /// parent directories. Returns the number of bytes written.
    ///
    /// # Errors
    /// See [`DownloadError`].
    pub async fn download(&self, ticker: &Ticker, destination: &Path) -> Result<usize, DownloadError> {
        let csrf = self.csrf_token().await?;
        self.login(&csrf).await?;

        let url = self.config.download_url(ticker);
        debug!(ticker = %ticker, url = %url, "Downloading earnings history");
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status { url, status });
        }
        let content = response.bytes().await?;

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(destination, &content).await?;

        info!(
            ticker = %ticker,
            path = %destination.display(),
            bytes = content.len(),
            "Saved earnings history"
        );
        Ok(content.len())
    }

    async fn csrf_token(&self) -> Result<String, DownloadError> {
        let url = self.config.base_url.clone();
        let page = self.http.get(&url).send().await?.text().await?;
        self.extractor
            .value_of(&page, &self.config.csrf_field)
            .ok_or_else(|| DownloadError::CsrfNotFound {
                attr: self.config.csrf_field.clone(),
                url,
            })
    }

    async fn login(&self, csrf: &str) -> Result<(), DownloadError> {
        let url = self.config.login_url();
        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| DownloadError::MissingCredentials(url.clone()))?;

        let form = [
            ("username", credentials.username.as_str()),
            ("password", credentials.password.expose_secret()),
            ("next", "/"),
            (self.config.csrf_field.as_str(), csrf),
        ];
        let response = self.http.post(&url).form(&form).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::LoginRejected {
                url,
                status,
                username: credentials.username.clone(),
            });
        }

        debug!(url = %url, username = %credentials.username, "Logged in");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LANDING: &str = r#"<html><body><form method="post">
        <input type="hidden" name="csrfmiddlewaretoken" value="tok123">
        <input type="text" name="username">
        </form></body></html>"#;

    fn config(base: &str) -> DownloaderConfig {
        DownloaderConfig::from(&OptionSlamConfig {
            base_url: "https://www.optionslam.com".to_string(),
            login_path: "/accounts/os_login/".to_string(),
            download_path: "/earnings/excel/{ticker}".to_string(),
            csrf_field: "csrfmiddlewaretoken".to_string(),
        })
        .with_base_url(base)
    }

    fn ticker() -> Ticker {
        Ticker::new("ACME").unwrap()
    }

    // ==================== Extraction Tests ====================

    #[test]
    fn test_extracts_csrf_value() {
        let extractor = InputExtractor::new().unwrap();
        assert_eq!(
            extractor.value_of(LANDING, "csrfmiddlewaretoken").as_deref(),
            Some("tok123")
        );
    }

    #[test]
    fn test_extracts_value_before_name() {
        let extractor = InputExtractor::new().unwrap();
        let html = "<INPUT value='abc' type='hidden' name='csrfmiddlewaretoken'/>";
        assert_eq!(
            extractor.value_of(html, "csrfmiddlewaretoken").as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn test_missing_input_is_none() {
        let extractor = InputExtractor::new().unwrap();
        assert!(extractor.value_of("<html></html>", "csrfmiddlewaretoken").is_none());
    }

    // ==================== URL Tests ====================

    #[test]
    fn test_urls() {
        let config = config("https://example.com/");
        assert_eq!(config.login_url(), "https://example.com/accounts/os_login/");
        assert_eq!(
            config.download_url(&ticker()),
            "https://example.com/earnings/excel/ACME"
        );
    }

    #[test]
    fn test_debug_hides_password() {
        let downloader = Downloader::new(
            config("https://example.com"),
            Some(Credentials::new("trader", "hunter2")),
        )
        .unwrap();
        let debug = format!("{downloader:?}");
        assert!(debug.contains("trader"));
        assert!(!debug.contains("hunter2"));
    }

    // ==================== Flow Tests ====================

    #[tokio::test]
    async fn test_download_writes_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LANDING))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/accounts/os_login/"))
            .and(body_string_contains("csrfmiddlewaretoken=tok123"))
            .and(body_string_contains("next=%2F"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/earnings/excel/ACME"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Earning Date,Max Move\n"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("ACME").join("earnings.csv");
        let downloader =
            Downloader::new(config(&server.uri()), Some(Credentials::new("u", "p"))).unwrap();

        let bytes = downloader.download(&ticker(), &dest).await.unwrap();
        assert_eq!(bytes, 22);
        assert_eq!(
            std::fs::read_to_string(&dest).unwrap(),
            "Earning Date,Max Move\n"
        );
    }

    #[tokio::test]
    async fn test_csrf_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let downloader =
            Downloader::new(config(&server.uri()), Some(Credentials::new("u", "p"))).unwrap();
        let dir = TempDir::new().unwrap();
        let err = downloader
            .download(&ticker(), &dir.path().join("x.csv"))
            .await
            .unwrap_err();

        match err {
            DownloadError::CsrfNotFound { attr, .. } => assert_eq!(attr, "csrfmiddlewaretoken"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_login_rejected_redacts_password() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LANDING))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/accounts/os_login/"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let downloader = Downloader::new(
            config(&server.uri()),
            Some(Credentials::new("trader", "s3cret-pw")),
        )
        .unwrap();
        let dir = TempDir::new().unwrap();
        let err = downloader
            .download(&ticker(), &dir.path().join("x.csv"))
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(matches!(err, DownloadError::LoginRejected { .. }));
        assert!(message.contains("trader"));
        assert!(!message.contains("s3cret-pw"));
        assert!(!format!("{err:?}").contains("s3cret-pw"));
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LANDING))
            .mount(&server)
            .await;

        let downloader = Downloader::new(config(&server.uri()), None).unwrap();
        let dir = TempDir::new().unwrap();
        let err = downloader
            .download(&ticker(), &dir.path().join("x.csv"))
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::MissingCredentials(_)));
    }
}
