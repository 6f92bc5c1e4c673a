//! Site configuration (_config.yml)

use anyhow::{anyhow, Result};
use chrono::Locale;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding `api.endpoint`
pub const ENDPOINT_ENV: &str = "PRISMIC_API_ENDPOINT";
/// Environment variable overriding `api.access_token`
pub const ACCESS_TOKEN_ENV: &str = "PRISMIC_ACCESS_TOKEN";
/// Largest `pageSize` the search endpoint accepts
pub const MAX_PAGE_SIZE: usize = 100;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub url: String,
    pub root: String,
    pub public_dir: String,

    // Date / Time
    pub language: String,
    pub timezone: String,
    pub date_format: String,
    pub edited_format: String,

    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub detail: DetailConfig,
    #[serde(default)]
    pub comments: CommentsConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "spacetraveling".to_string(),
            url: "http://localhost:4000".to_string(),
            root: "/".to_string(),
            public_dir: "public".to_string(),

            language: "pt_BR".to_string(),
            timezone: "UTC".to_string(),
            date_format: "dd MMM yyyy".to_string(),
            edited_format: "dd MMM yyyy, 'às' HH:mm".to_string(),

            api: ApiConfig::default(),
            listing: ListingConfig::default(),
            detail: DetailConfig::default(),
            comments: CommentsConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Apply `PRISMIC_*` environment overrides
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(ENDPOINT_ENV).ok(),
            std::env::var(ACCESS_TOKEN_ENV).ok(),
        );
    }

    fn apply_overrides(&mut self, endpoint: Option<String>, token: Option<String>) {
        if let Some(endpoint) = endpoint.filter(|e| !e.trim().is_empty()) {
            tracing::debug!("Using content API endpoint from {}", ENDPOINT_ENV);
            self.api.endpoint = endpoint;
        }
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.api.access_token = Some(token);
        }
    }

    /// Reject values that would break every build
    pub fn validate(&self) -> Result<()> {
        if self.listing.page_size == 0 || self.listing.page_size > MAX_PAGE_SIZE {
            return Err(anyhow!(
                "listing.page_size must be between 1 and {}",
                MAX_PAGE_SIZE
            ));
        }
        if self.detail.prerender_limit > MAX_PAGE_SIZE {
            return Err(anyhow!(
                "detail.prerender_limit must be at most {}",
                MAX_PAGE_SIZE
            ));
        }
        if self.detail.words_per_minute == 0 {
            return Err(anyhow!("detail.words_per_minute must be > 0"));
        }
        if self.api.document_type.trim().is_empty() {
            return Err(anyhow!("api.document_type must be non-empty"));
        }
        if self.api.fixture.is_none() && self.api.endpoint.trim().is_empty() {
            return Err(anyhow!(
                "api.endpoint (or {}) is required unless api.fixture is set",
                ENDPOINT_ENV
            ));
        }
        self.locale()?;
        self.tz()?;
        Ok(())
    }

    /// Locale used for month and weekday names
    pub fn locale(&self) -> Result<Locale> {
        Locale::try_from(self.language.as_str())
            .map_err(|_| anyhow!("unknown language '{}'", self.language))
    }

    /// Timezone used to display publication dates
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow!("unknown timezone '{}': {}", self.timezone, e))
    }

    /// Resolve the fixture path relative to the site directory
    pub fn fixture_path(&self, base_dir: &Path) -> Option<PathBuf> {
        self.api.fixture.as_ref().map(|p| {
            let p = PathBuf::from(p);
            if p.is_absolute() {
                p
            } else {
                base_dir.join(p)
            }
        })
    }
}

/// Content API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Repository API root, e.g. `https://repo.cdn.prismic.io/api/v2`
    pub endpoint: String,
    pub access_token: Option<String>,
    pub document_type: String,
    /// Serve documents from a local JSON file instead of the remote API
    pub fixture: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_token: None,
            document_type: "post".to_string(),
            fixture: None,
        }
    }
}

/// Home page listing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    pub page_size: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self { page_size: 2 }
    }
}

/// Post page configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailConfig {
    /// Number of newest posts rendered at build time
    pub prerender_limit: usize,
    pub words_per_minute: usize,
}

impl Default for DetailConfig {
    fn default() -> Self {
        Self {
            prerender_limit: 3,
            words_per_minute: 200,
        }
    }
}

/// Utterances comment widget
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentsConfig {
    /// `owner/repo`; comments are disabled when empty
    pub repo: String,
    pub issue_term: String,
    pub theme: String,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            repo: String::new(),
            issue_term: "pathname".to_string(),
            theme: "github-dark".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.listing.page_size, 2);
        assert_eq!(config.detail.prerender_limit, 3);
        assert_eq!(config.detail.words_per_minute, 200);
        assert_eq!(config.api.document_type, "post");
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: My Blog
timezone: America/Sao_Paulo
api:
  endpoint: https://blog.cdn.prismic.io/api/v2
listing:
  page_size: 5
comments:
  repo: someone/blog-comments
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "My Blog");
        assert_eq!(config.api.endpoint, "https://blog.cdn.prismic.io/api/v2");
        assert_eq!(config.api.document_type, "post");
        assert_eq!(config.listing.page_size, 5);
        assert_eq!(config.detail.prerender_limit, 3);
        assert_eq!(config.comments.repo, "someone/blog-comments");
        assert_eq!(config.comments.issue_term, "pathname");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_requires_source() {
        let config = SiteConfig::default();
        assert!(config.validate().is_err());

        let mut config = SiteConfig::default();
        config.api.fixture = Some("posts.json".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = SiteConfig::default();
        config.api.fixture = Some("posts.json".to_string());
        config.listing.page_size = 0;
        assert!(config.validate().is_err());

        let mut config = SiteConfig::default();
        config.api.fixture = Some("posts.json".to_string());
        config.timezone = "Mars/Olympus".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_caps_page_sizes() {
        let mut config = SiteConfig::default();
        config.api.fixture = Some("posts.json".to_string());
        config.detail.prerender_limit = MAX_PAGE_SIZE;
        assert!(config.validate().is_ok());

        config.detail.prerender_limit = MAX_PAGE_SIZE + 1;
        assert!(config.validate().is_err());

        config.detail.prerender_limit = 3;
        config.listing.page_size = MAX_PAGE_SIZE + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = SiteConfig::default();
        config.apply_overrides(
            Some("https://other.cdn.prismic.io/api/v2".to_string()),
            Some("secret".to_string()),
        );
        assert_eq!(config.api.endpoint, "https://other.cdn.prismic.io/api/v2");
        assert_eq!(config.api.access_token.as_deref(), Some("secret"));

        config.apply_overrides(Some("  ".to_string()), None);
        assert_eq!(config.api.endpoint, "https://other.cdn.prismic.io/api/v2");
    }

    #[test]
    fn test_fixture_path() {
        let mut config = SiteConfig::default();
        config.api.fixture = Some("data/posts.json".to_string());
        assert_eq!(
            config.fixture_path(Path::new("/site")),
            Some(PathBuf::from("/site/data/posts.json"))
        );
    }
}
