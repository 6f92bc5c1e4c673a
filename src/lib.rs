//! ignite-blog: a small blog rendered from the Prismic content API
//!
//! The listing and the newest posts are rendered at build time; every other
//! post is rendered on its first request and cached from then on.

pub mod cache;
pub mod cms;
pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod generator;
pub mod helpers;
pub mod pager;
pub mod resolver;
pub mod server;
pub mod templates;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cms::ContentApi;

/// The blog application
#[derive(Clone)]
pub struct Blog {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
    /// Content API shared by every flow
    pub api: Arc<dyn ContentApi>,
}

impl Blog {
    /// Create a new blog from a directory holding `_config.yml`
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let mut config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            tracing::debug!("No _config.yml in {:?}, using defaults", base_dir);
            config::SiteConfig::default()
        };
        config.apply_env();
        config.validate()?;

        let api = cms::connect(&config, &base_dir)?;
        Ok(Self::with_api(config, base_dir, api))
    }

    /// Create a blog around an already constructed content API
    pub fn with_api(
        config: config::SiteConfig,
        base_dir: PathBuf,
        api: Arc<dyn ContentApi>,
    ) -> Self {
        let public_dir = base_dir.join(&config.public_dir);
        Self {
            config,
            base_dir,
            public_dir,
            api,
        }
    }

    /// Build the static pages
    pub async fn generate(&self) -> Result<generator::BuildReport> {
        commands::generate::run(self).await
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
