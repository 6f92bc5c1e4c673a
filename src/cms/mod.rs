//! Content API access
//!
//! The blog only ever reads from the content API. Both the listing and the
//! post pages go through the [`ContentApi`] trait, which has a remote
//! implementation ([`PrismicClient`]) and an in-memory one ([`MemoryApi`])
//! fed from a JSON fixture.

mod client;
mod memory;
mod model;
mod predicate;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

pub use client::PrismicClient;
pub use memory::{Fixture, MemoryApi};
pub use model::{parse_timestamp, plain_text, ApiRef, ApiRoot, RawDoc, SearchResponse};
pub use predicate::{
    to_orderings, to_query, ContentRef, Ordering, Predicate, QueryOptions, FIRST_PUBLICATION,
};

use crate::config::SiteConfig;
use crate::content::{Cursor, Page};
use crate::error::FetchError;

/// Read access to the content API
#[async_trait]
pub trait ContentApi: Send + Sync {
    /// Run a filtered, paged search and return its first page
    async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<Page<RawDoc>, FetchError>;

    /// Fetch the page a previous search pointed to
    async fn fetch_page(&self, cursor: &Cursor) -> Result<Page<RawDoc>, FetchError>;

    /// First document matching the predicates, if any
    async fn query_first(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<Option<RawDoc>, FetchError> {
        let options = options.clone().page_size(1);
        let page = self.query(predicates, &options).await?;
        Ok(page.items.into_iter().next())
    }

    /// Document of `doc_type` whose uid is `uid`
    async fn get_by_uid(
        &self,
        doc_type: &str,
        uid: &str,
        reference: &ContentRef,
    ) -> Result<Option<RawDoc>, FetchError> {
        let predicates = [Predicate::uid(doc_type, uid)];
        self.query_first(&predicates, &QueryOptions::new(reference))
            .await
    }
}

/// Build the content API configured for a site
pub fn connect(config: &SiteConfig, base_dir: &Path) -> Result<Arc<dyn ContentApi>> {
    if let Some(path) = config.fixture_path(base_dir) {
        tracing::info!("Reading content from fixture {:?}", path);
        let api = MemoryApi::load(&path)
            .with_context(|| format!("failed to load content fixture {:?}", path))?;
        return Ok(Arc::new(api));
    }

    if config.api.endpoint.trim().is_empty() {
        return Err(anyhow!("no content API endpoint configured"));
    }
    let endpoint = reqwest::Url::parse(&config.api.endpoint)
        .with_context(|| format!("invalid api.endpoint '{}'", config.api.endpoint))?;
    tracing::info!("Reading content from {}", endpoint);
    let client = PrismicClient::new(endpoint, config.api.access_token.clone())?;
    Ok(Arc::new(client))
}
