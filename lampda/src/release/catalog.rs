//! Release catalog client.
//!
//! Every request is preceded by a quota check against the rate-limit
//! endpoint: the catalog refuses to run when fewer than
//! [`RATE_LIMIT_MARGIN`] + 1 requests are left. Nothing is cached.

use std::fs;
use std::path::Path;

use log::{debug, info};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::release::{ApiRelease, Release};

/// Requests kept in reserve; at or below this the catalog is not queried.
pub const RATE_LIMIT_MARGIN: u64 = 10;

/// Default releases endpoint.
pub const DEFAULT_RELEASES_URL: &str = "https://api.github.com/repos/BaptisteHudyma/Lamp-Da/releases";

/// Default rate-limit endpoint.
pub const DEFAULT_RATE_LIMIT_URL: &str = "https://api.github.com/rate_limit";

/// Minimal blocking HTTP GET.
pub trait HttpTransport: Send + Sync {
    /// GET `url` and return the body as text. Non-success statuses are errors.
    fn get_text(&self, url: &str) -> Result<String>;

    /// GET `url` and return the raw body. Non-success statuses are errors.
    fn get_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

/// Catalog endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    /// Endpoint returning the JSON release list.
    pub releases_url: String,
    /// Endpoint returning `{"rate": {"remaining": n}}`.
    pub rate_limit_url: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            releases_url: DEFAULT_RELEASES_URL.to_string(),
            rate_limit_url: DEFAULT_RATE_LIMIT_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RateLimitResponse {
    rate: RateBudget,
}

#[derive(Debug, Deserialize)]
struct RateBudget {
    remaining: u64,
}

/// Fetches releases and downloads their assets.
pub struct ReleaseCatalog<T: HttpTransport> {
    transport: T,
    config: CatalogConfig,
}

impl<T: HttpTransport> ReleaseCatalog<T> {
    /// Create a catalog client.
    pub fn new(transport: T, config: CatalogConfig) -> Self {
        Self { transport, config }
    }

    /// Endpoints in use.
    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Remaining request budget.
    pub fn remaining_quota(&self) -> Result<u64> {
        let body = self
            .transport
            .get_text(&self.config.rate_limit_url)?;
        let response: RateLimitResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Catalog(format!("rate limit response: {e}")))?;
        debug!("Catalog quota: {} requests left", response.rate.remaining);
        Ok(response.rate.remaining)
    }

    fn ensure_quota(&self) -> Result<()> {
        let remaining = self.remaining_quota()?;
        if remaining <= RATE_LIMIT_MARGIN {
            return Err(Error::RateLimited { remaining });
        }
        Ok(())
    }

    /// All published releases, in catalog order.
    pub fn fetch_releases(&self) -> Result<Vec<Release>> {
        self.ensure_quota()?;

        let body = self
            .transport
            .get_text(&self.config.releases_url)?;
        let releases: Vec<ApiRelease> = serde_json::from_str(&body)
            .map_err(|e| Error::Catalog(format!("release list: {e}")))?;

        info!("Fetched {} releases", releases.len());
        Ok(releases
            .into_iter()
            .map(Release::from)
            .collect())
    }

    /// Download one asset.
    pub fn download_asset(&self, url: &str) -> Result<Vec<u8>> {
        self.ensure_quota()?;

        info!("Downloading {url}");
        let bytes = self.transport.get_bytes(url)?;
        debug!("Downloaded {} bytes", bytes.len());
        Ok(bytes)
    }

    /// Download one asset into `path`, returning its size.
    pub fn download_asset_to(&self, url: &str, path: &Path) -> Result<u64> {
        let bytes = self.download_asset(url)?;
        fs::write(path, &bytes)?;
        Ok(bytes.len() as u64)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::HttpTransport;
    use crate::error::{Error, Result};

    /// Serves canned bodies and records every requested URL.
    #[derive(Default)]
    pub(crate) struct MockTransport {
        bodies: HashMap<String, Vec<u8>>,
        pub(crate) requests: Mutex<Vec<String>>,
    }

    impl MockTransport {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn with(mut self, url: &str, body: impl AsRef<[u8]>) -> Self {
            self.bodies
                .insert(url.to_string(), body.as_ref().to_vec());
            self
        }

        pub(crate) fn with_quota(self, url: &str, remaining: u64) -> Self {
            self.with(url, format!(r#"{{"rate": {{"limit": 60, "remaining": {remaining}}}}}"#))
        }

        pub(crate) fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl HttpTransport for MockTransport {
        fn get_text(&self, url: &str) -> Result<String> {
            self.get_bytes(url)
                .map(|b| String::from_utf8_lossy(&b).into_owned())
        }

        fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
            self.requests
                .lock()
                .unwrap()
                .push(url.to_string());
            self.bodies
                .get(url)
                .cloned()
                .ok_or_else(|| Error::Network(format!("404 Not Found: {url}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockTransport;
    use super::*;

    const RELEASES: &str = "http://catalog/releases";
    const RATE: &str = "http://catalog/rate";

    fn config() -> CatalogConfig {
        CatalogConfig {
            releases_url: RELEASES.to_string(),
            rate_limit_url: RATE.to_string(),
        }
    }

    const TWO_RELEASES: &str = r#"[
        {"tag_name": "v1.2", "name": "b", "assets": [{"browser_download_url": "http://x/simple.uf2"}]},
        {"tag_name": "v1.1", "name": "a", "assets": []}
    ]"#;

    #[test]
    fn test_fetch_releases() {
        let transport = MockTransport::new()
            .with_quota(RATE, 55)
            .with(RELEASES, TWO_RELEASES);
        let catalog = ReleaseCatalog::new(transport, config());

        let releases = catalog.fetch_releases().unwrap();
        assert_eq!(releases.len(), 2);
        assert_eq!(releases[0].tag, "v1.2");
        assert_eq!(releases[0].asset_urls, vec!["http://x/simple.uf2"]);
        assert_eq!(catalog.transport.requests(), vec![RATE, RELEASES]);
    }

    #[test]
    fn test_fetch_releases_empty_catalog() {
        let transport = MockTransport::new()
            .with_quota(RATE, 55)
            .with(RELEASES, "[]");
        let catalog = ReleaseCatalog::new(transport, config());
        assert!(catalog.fetch_releases().unwrap().is_empty());
    }

    #[test]
    fn test_rate_limit_gate_skips_releases_request() {
        for remaining in [0, 3, RATE_LIMIT_MARGIN] {
            let transport = MockTransport::new()
                .with_quota(RATE, remaining)
                .with(RELEASES, TWO_RELEASES);
            let catalog = ReleaseCatalog::new(transport, config());

            let err = catalog.fetch_releases().unwrap_err();
            assert!(matches!(err, Error::RateLimited { remaining: r } if r == remaining));
            assert_eq!(catalog.transport.requests(), vec![RATE]);
        }
    }

    #[test]
    fn test_rate_limit_just_above_margin_is_allowed() {
        let transport = MockTransport::new()
            .with_quota(RATE, RATE_LIMIT_MARGIN + 1)
            .with(RELEASES, "[]");
        let catalog = ReleaseCatalog::new(transport, config());
        assert!(catalog.fetch_releases().is_ok());
    }

    #[test]
    fn test_network_failure() {
        let catalog = ReleaseCatalog::new(MockTransport::new(), config());
        assert!(matches!(catalog.fetch_releases(), Err(Error::Network(_))));

        let transport = MockTransport::new().with_quota(RATE, 60);
        let catalog = ReleaseCatalog::new(transport, config());
        assert!(matches!(catalog.fetch_releases(), Err(Error::Network(_))));
    }

    #[test]
    fn test_malformed_responses() {
        let transport = MockTransport::new().with(RATE, "{}");
        let catalog = ReleaseCatalog::new(transport, config());
        assert!(matches!(catalog.fetch_releases(), Err(Error::Catalog(_))));

        let transport = MockTransport::new()
            .with_quota(RATE, 60)
            .with(RELEASES, r#"{"message": "Not Found"}"#);
        let catalog = ReleaseCatalog::new(transport, config());
        assert!(matches!(catalog.fetch_releases(), Err(Error::Catalog(_))));
    }

    #[test]
    fn test_download_asset_checks_quota_every_time() {
        let transport = MockTransport::new()
            .with_quota(RATE, 30)
            .with("http://x/simple.uf2", b"UF2\n");
        let catalog = ReleaseCatalog::new(transport, config());

        assert_eq!(catalog.download_asset("http://x/simple.uf2").unwrap(), b"UF2\n");
        assert_eq!(catalog.download_asset("http://x/simple.uf2").unwrap(), b"UF2\n");
        assert_eq!(
            catalog.transport.requests(),
            vec![RATE, "http://x/simple.uf2", RATE, "http://x/simple.uf2"]
        );
    }

    #[test]
    fn test_download_asset_rate_limited() {
        let transport = MockTransport::new()
            .with_quota(RATE, 1)
            .with("http://x/simple.uf2", b"UF2\n");
        let catalog = ReleaseCatalog::new(transport, config());

        assert!(matches!(
            catalog.download_asset("http://x/simple.uf2"),
            Err(Error::RateLimited { remaining: 1 })
        ));
        assert_eq!(catalog.transport.requests(), vec![RATE]);
    }

    #[test]
    fn test_download_asset_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("simple.uf2");
        let transport = MockTransport::new()
            .with_quota(RATE, 30)
            .with("http://x/simple.uf2", b"UF2 payload");
        let catalog = ReleaseCatalog::new(transport, config());

        let size = catalog
            .download_asset_to("http://x/simple.uf2", &path)
            .unwrap();
        assert_eq!(size, 11);
        assert_eq!(std::fs::read(&path).unwrap(), b"UF2 payload");
    }
}
