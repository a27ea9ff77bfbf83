//! Loading and refreshing the parser configuration.
//!
//! A [`ConfigRefresher`] owns the lifecycle of the configuration behind a
//! [`ConfigHandle`]: it installs the cached document at startup, fetches the remote document
//! on demand or on a fixed interval, and swaps it in only once it has decoded. A failed fetch
//! or decode leaves the previous configuration in force.
//!
//! # Example
//!
//! ```no_run
//! use otp_extract::{ConfigHandle, ConfigRefresher, OtpParser, PatternOtpParser, RefreshConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> otp_extract::Result<()> {
//! let settings = RefreshConfig::builder()
//!     .cache_path("/var/cache/otp-extract/config.json")
//!     .refresh_interval(Duration::from_secs(3600))
//!     .build()?;
//!
//! let handle = ConfigHandle::default();
//! let refresher = Arc::new(ConfigRefresher::new(settings, handle.clone()));
//! refresher.load_initial().await;
//! let _worker = Arc::clone(&refresher).spawn();
//!
//! let parser = PatternOtpParser::with_handle(handle);
//! println!("{:?}", parser.parse("Your Lyft code is 744444"));
//! # Ok(())
//! # }
//! ```

use crate::config::{ParserConfig, ParserSnapshot};
use crate::error::{Error, Result};
use crate::handle::ConfigHandle;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

/// Published location of the remote configuration document.
pub const DEFAULT_CONFIG_URL: &str =
    "https://raw.githubusercontent.com/SoFriendly/2fhey/main/AppConfig.json";

/// Settings for loading and refreshing the configuration.
///
/// Create using [`RefreshConfig::builder()`].
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// URL of the remote configuration document.
    pub remote_url: String,
    /// Where the last good document is cached. No caching when `None`.
    pub cache_path: Option<PathBuf>,
    /// Interval between scheduled refreshes.
    pub refresh_interval: Duration,
    /// Timeout for one fetch, body included.
    pub request_timeout: Duration,
}

impl RefreshConfig {
    /// Creates a new settings builder.
    #[must_use]
    pub fn builder() -> RefreshConfigBuilder {
        RefreshConfigBuilder::default()
    }
}

/// Builder for [`RefreshConfig`].
#[derive(Debug, Default)]
pub struct RefreshConfigBuilder {
    remote_url: Option<String>,
    cache_path: Option<PathBuf>,
    refresh_interval: Option<Duration>,
    request_timeout: Option<Duration>,
}

impl RefreshConfigBuilder {
    /// Sets the remote document URL.
    ///
    /// Default is [`DEFAULT_CONFIG_URL`].
    #[must_use]
    pub fn remote_url(mut self, url: impl Into<String>) -> Self {
        self.remote_url = Some(url.into());
        self
    }

    /// Sets the cache file path.
    #[must_use]
    pub fn cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(path.into());
        self
    }

    /// Sets the refresh interval.
    ///
    /// Default is one hour.
    #[must_use]
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = Some(interval);
        self
    }

    /// Sets the fetch timeout.
    ///
    /// Default is 30 seconds.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Builds the settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the URL is not an absolute HTTP(S) URL or a
    /// duration is zero.
    pub fn build(self) -> Result<RefreshConfig> {
        let remote_url = self
            .remote_url
            .unwrap_or_else(|| DEFAULT_CONFIG_URL.to_string());

        let parsed = reqwest::Url::parse(&remote_url).map_err(|e| Error::InvalidConfig {
            message: format!("invalid remote_url '{remote_url}': {e}"),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::InvalidConfig {
                message: format!("remote_url must be http or https, got '{}'", parsed.scheme()),
            });
        }

        let refresh_interval = self
            .refresh_interval
            .unwrap_or(Duration::from_secs(60 * 60));
        if refresh_interval.is_zero() {
            return Err(Error::InvalidConfig {
                message: "refresh_interval must be greater than zero".into(),
            });
        }

        let request_timeout = self.request_timeout.unwrap_or(Duration::from_secs(30));
        if request_timeout.is_zero() {
            return Err(Error::InvalidConfig {
                message: "request_timeout must be greater than zero".into(),
            });
        }

        Ok(RefreshConfig {
            remote_url,
            cache_path: self.cache_path,
            refresh_interval,
            request_timeout,
        })
    }
}

/// Where the configuration installed by [`ConfigRefresher::load_initial`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// The cached document.
    Cache,
    /// The configuration bundled with the crate.
    Bundled,
}

/// Loads, fetches and swaps the configuration behind a [`ConfigHandle`].
#[derive(Debug)]
pub struct ConfigRefresher {
    settings: RefreshConfig,
    handle: ConfigHandle,
    client: reqwest::Client,
    in_flight: AtomicBool,
    generation: watch::Sender<u64>,
}

impl ConfigRefresher {
    /// Creates a refresher updating `handle`.
    #[must_use]
    pub fn new(settings: RefreshConfig, handle: ConfigHandle) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            settings,
            handle,
            client: reqwest::Client::new(),
            in_flight: AtomicBool::new(false),
            generation,
        }
    }

    /// Returns the handle this refresher updates.
    #[must_use]
    pub fn handle(&self) -> &ConfigHandle {
        &self.handle
    }

    /// Returns the settings.
    #[must_use]
    pub fn settings(&self) -> &RefreshConfig {
        &self.settings
    }

    /// Returns how many configurations this refresher has installed.
    #[must_use]
    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    /// Subscribes to configuration swaps. The value is the generation counter.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    /// Installs the cached configuration if it can be read and decoded, otherwise the
    /// bundled one.
    #[instrument(name = "ConfigRefresher::load_initial", skip(self))]
    pub async fn load_initial(&self) -> ConfigOrigin {
        match self.read_cache().await {
            Ok(Some(config)) => match compile(config).await {
                Ok(snapshot) => {
                    self.install(snapshot);
                    info!("Loaded configuration from cache");
                    return ConfigOrigin::Cache;
                }
                Err(error) => warn!(error = %error, "Failed to compile cached configuration"),
            },
            Ok(None) => debug!("No cached configuration"),
            Err(error) => warn!(error = %error, "Ignoring unusable configuration cache"),
        }

        let bundled = tokio::task::spawn_blocking(ParserSnapshot::bundled)
            .await
            .unwrap_or_else(|_| ParserSnapshot::bundled());
        self.install(bundled);
        info!("Using bundled configuration");
        ConfigOrigin::Bundled
    }

    /// Fetches the remote configuration and swaps it in.
    ///
    /// The cache is rewritten before the swap; a failed write is logged and does not
    /// prevent the swap.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RefreshInProgress`] if another refresh is running, a fetch error if
    /// the document could not be retrieved with status 200, [`Error::DecodeConfig`] if it
    /// did not decode, or [`Error::CompileAborted`] if the runtime dropped the compile task.
    /// The active configuration is unchanged in every error case.
    #[instrument(
        name = "ConfigRefresher::refresh",
        skip(self),
        fields(url = %self.settings.remote_url)
    )]
    pub async fn refresh(&self) -> Result<()> {
        let _guard = InFlightGuard::acquire(&self.in_flight).ok_or(Error::RefreshInProgress)?;

        let body = self.fetch().await?;
        let config = ParserConfig::from_json(&body)?;
        let snapshot = compile(config).await?;

        if let Err(error) = self.write_cache(&body).await {
            warn!(error = %error, "Failed to write configuration cache");
        }

        self.install(snapshot);
        info!(bytes = body.len(), "Configuration refreshed");
        Ok(())
    }

    /// Runs [`refresh`](Self::refresh) immediately and then on every interval tick,
    /// logging failures. The task runs until aborted.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.settings.refresh_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if let Err(error) = self.refresh().await {
                    warn!(
                        error = %error,
                        category = %error.category(),
                        retryable = error.is_retryable(),
                        "Configuration refresh failed, keeping previous configuration"
                    );
                }
            }
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Private methods
    // ─────────────────────────────────────────────────────────────────────────

    fn install(&self, snapshot: Arc<ParserSnapshot>) {
        self.handle.store(snapshot);
        self.bump_generation();
    }

    fn bump_generation(&self) {
        self.generation.send_modify(|generation| *generation += 1);
    }

    async fn fetch(&self) -> Result<Vec<u8>> {
        let url = &self.settings.remote_url;
        let timeout = self.settings.request_timeout;

        let request = async {
            let response = self
                .client
                .get(url.as_str())
                .send()
                .await
                .map_err(|source| Error::FetchConfig {
                    url: url.clone(),
                    source,
                })?;

            let status = response.status();
            if status != reqwest::StatusCode::OK {
                return Err(Error::FetchStatus {
                    url: url.clone(),
                    status: status.as_u16(),
                });
            }

            let body = response
                .bytes()
                .await
                .map_err(|source| Error::FetchConfig {
                    url: url.clone(),
                    source,
                })?;
            Ok(body.to_vec())
        };

        tokio::time::timeout(timeout, request)
            .await
            .map_err(|_| Error::FetchTimeout {
                url: url.clone(),
                timeout,
            })?
    }

    async fn read_cache(&self) -> Result<Option<ParserConfig>> {
        let Some(path) = &self.settings.cache_path else {
            return Ok(None);
        };

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(Error::ReadCache {
                    path: path.clone(),
                    source,
                })
            }
        };

        ParserConfig::from_json(&bytes).map(Some)
    }

    async fn write_cache(&self, body: &[u8]) -> Result<()> {
        let Some(path) = &self.settings.cache_path else {
            return Ok(());
        };

        let write_error = |source| Error::WriteCache {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
        }

        let staging = staging_path(path);
        tokio::fs::write(&staging, body).await.map_err(write_error)?;
        tokio::fs::rename(&staging, path).await.map_err(write_error)?;

        debug!(path = %path.display(), "Configuration cache written");
        Ok(())
    }
}

/// Sibling path the cache is written to before being renamed into place.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Compiles `config` on the blocking pool, leaving the runtime's workers free.
async fn compile(config: ParserConfig) -> Result<Arc<ParserSnapshot>> {
    tokio::task::spawn_blocking(move || Arc::new(ParserSnapshot::compile(config)))
        .await
        .map_err(|source| {
            if source.is_panic() {
                std::panic::resume_unwind(source.into_panic());
            }
            Error::CompileAborted { source }
        })
}

/// Clears the in-flight flag when the refresh ends, however it ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CustomPatternConfig;

    fn settings_with_cache(path: PathBuf) -> RefreshConfig {
        RefreshConfig::builder()
            .remote_url("http://127.0.0.1:9/config.json")
            .cache_path(path)
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let settings = RefreshConfig::builder().build().unwrap();
        assert_eq!(settings.remote_url, DEFAULT_CONFIG_URL);
        assert_eq!(settings.refresh_interval, Duration::from_secs(3600));
        assert_eq!(settings.request_timeout, Duration::from_secs(30));
        assert!(settings.cache_path.is_none());
    }

    #[test]
    fn test_builder_validation() {
        let result = RefreshConfig::builder().remote_url("not a url").build();
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));

        let result = RefreshConfig::builder()
            .remote_url("ftp://example.com/config.json")
            .build();
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));

        let result = RefreshConfig::builder()
            .refresh_interval(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));

        let result = RefreshConfig::builder().request_timeout(Duration::ZERO).build();
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_in_flight_guard() {
        let flag = AtomicBool::new(false);
        let guard = InFlightGuard::acquire(&flag).unwrap();
        assert!(InFlightGuard::acquire(&flag).is_none());
        drop(guard);
        assert!(InFlightGuard::acquire(&flag).is_some());
    }

    #[test]
    fn test_staging_path() {
        assert_eq!(
            staging_path(Path::new("/tmp/cache/config.json")),
            PathBuf::from("/tmp/cache/config.json.tmp")
        );
    }

    #[tokio::test]
    async fn test_load_initial_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = ParserConfig {
            custom_patterns: vec![CustomPatternConfig::new(Some("cached"), r"^c-(\d+)$", "")],
            ..ParserConfig::default()
        };
        std::fs::write(&path, config.to_json().unwrap()).unwrap();

        let refresher = ConfigRefresher::new(settings_with_cache(path), ConfigHandle::default());
        assert_eq!(refresher.load_initial().await, ConfigOrigin::Cache);
        assert_eq!(
            refresher.handle().load().custom_rules()[0].service(),
            Some("cached")
        );
        assert_eq!(refresher.generation(), 1);
    }

    #[tokio::test]
    async fn test_load_initial_falls_back_to_bundled() {
        let dir = tempfile::tempdir().unwrap();

        // Missing cache
        let refresher = ConfigRefresher::new(
            settings_with_cache(dir.path().join("missing.json")),
            ConfigHandle::default(),
        );
        assert_eq!(refresher.load_initial().await, ConfigOrigin::Bundled);

        // Corrupt cache
        let path = dir.path().join("corrupt.json");
        std::fs::write(&path, b"{ not json").unwrap();
        let handle = ConfigHandle::from_config(ParserConfig {
            custom_patterns: vec![CustomPatternConfig::new(None, r"^x(\d+)$", "")],
            ..ParserConfig::default()
        });
        let refresher = ConfigRefresher::new(settings_with_cache(path), handle);
        assert_eq!(refresher.load_initial().await, ConfigOrigin::Bundled);
        assert!(refresher.handle().load().custom_rules().is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_compile_leaves_runtime_free() {
        let ticks = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let ticker = tokio::spawn(async move {
            loop {
                counter.fetch_add(1, Ordering::Relaxed);
                tokio::task::yield_now().await;
            }
        });

        let config = ParserConfig {
            service_patterns: (0..24)
                .map(|i| format!(r"compile-{i} ([\w\d ]{{2,64}}) code"))
                .collect(),
            ..ParserConfig::default()
        };
        let snapshot = compile(config).await.unwrap();
        ticker.abort();

        assert_eq!(snapshot.service_rules().len(), 24);
        assert!(ticks.load(Ordering::Relaxed) > 0);
    }

    #[tokio::test]
    async fn test_write_cache_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let refresher = ConfigRefresher::new(settings_with_cache(path.clone()), ConfigHandle::default());

        refresher.write_cache(b"{}").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"{}");
    }

    #[tokio::test]
    async fn test_refresh_rejected_while_in_flight() {
        let refresher = ConfigRefresher::new(
            RefreshConfig::builder().build().unwrap(),
            ConfigHandle::default(),
        );
        let _guard = InFlightGuard::acquire(&refresher.in_flight).unwrap();

        let result = refresher.refresh().await;
        assert!(matches!(result, Err(Error::RefreshInProgress)));
    }
}
