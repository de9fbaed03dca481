//! Firmware releases published on the remote catalog.

pub mod catalog;
#[cfg(feature = "http")]
pub mod http;
pub mod version;

use serde::{Deserialize, Serialize};

pub use catalog::{CatalogConfig, HttpTransport, RATE_LIMIT_MARGIN, ReleaseCatalog};
#[cfg(feature = "http")]
pub use http::ReqwestTransport;
pub use version::{compare_tags, select_latest, version_score};

/// A published firmware release.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Release {
    /// Version tag, e.g. `v1.4`.
    pub tag: String,
    /// Release title.
    pub name: String,
    /// Creation timestamp (RFC 3339, as published).
    pub created_at: Option<String>,
    /// Last update timestamp.
    pub updated_at: Option<String>,
    /// Publication timestamp.
    pub published_at: Option<String>,
    /// Download URLs, one firmware file per lamp type.
    pub asset_urls: Vec<String>,
    /// Release notes.
    pub description: String,
}

/// Release object as returned by the GitHub releases API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiRelease {
    #[serde(default)]
    tag_name: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    assets: Vec<ApiAsset>,
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ApiAsset {
    browser_download_url: String,
}

impl From<ApiRelease> for Release {
    fn from(api: ApiRelease) -> Self {
        Self {
            tag: api.tag_name,
            name: api.name.unwrap_or_default(),
            created_at: api.created_at,
            updated_at: api.updated_at,
            published_at: api.published_at,
            asset_urls: api
                .assets
                .into_iter()
                .map(|a| a.browser_download_url)
                .collect(),
            description: api.body.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_from_api_json() {
        let json = r#"{
            "tag_name": "v1.4",
            "name": "Spring update",
            "created_at": "2025-03-01T10:00:00Z",
            "updated_at": "2025-03-02T10:00:00Z",
            "published_at": "2025-03-03T10:00:00Z",
            "assets": [
                {"name": "simple.uf2", "browser_download_url": "https://x/simple.uf2"},
                {"name": "indexable.uf2", "browser_download_url": "https://x/indexable.uf2"}
            ],
            "body": "notes",
            "draft": false
        }"#;
        let release: Release = serde_json::from_str::<ApiRelease>(json)
            .unwrap()
            .into();

        assert_eq!(release.tag, "v1.4");
        assert_eq!(release.name, "Spring update");
        assert_eq!(release.published_at.as_deref(), Some("2025-03-03T10:00:00Z"));
        assert_eq!(
            release.asset_urls,
            vec!["https://x/simple.uf2", "https://x/indexable.uf2"]
        );
        assert_eq!(release.description, "notes");
    }

    #[test]
    fn test_release_from_sparse_json() {
        let release: Release = serde_json::from_str::<ApiRelease>(r#"{"tag_name": "v0.1", "body": null}"#)
            .unwrap()
            .into();
        assert_eq!(release.tag, "v0.1");
        assert!(release.asset_urls.is_empty());
        assert!(release.created_at.is_none());
        assert_eq!(release.description, "");
    }
}
