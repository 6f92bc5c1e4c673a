//! Remote content API client

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::fmt;

use super::model::{ApiRoot, RawDoc, SearchResponse};
use super::predicate::{to_orderings, to_query, ContentRef, Predicate, QueryOptions};
use super::ContentApi;
use crate::content::{Cursor, Page};
use crate::error::FetchError;

const ACCESS_TOKEN_PARAM: &str = "access_token";

/// Client for a Prismic repository's REST API.
///
/// Holds the endpoint and credentials explicitly; every flow receives it by
/// reference.
#[derive(Clone)]
pub struct PrismicClient {
    http: Client,
    endpoint: Url,
    access_token: Option<String>,
}

impl fmt::Debug for PrismicClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrismicClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl PrismicClient {
    pub fn new(mut endpoint: Url, access_token: Option<String>) -> Result<Self, FetchError> {
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }
        let http = Client::builder()
            .user_agent(concat!("ignite-blog/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            endpoint,
            access_token,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Ref of the currently published content
    pub async fn master_ref(&self) -> Result<String, FetchError> {
        let root: ApiRoot = self.get_json(self.endpoint.clone()).await?;
        root.refs
            .into_iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference)
            .ok_or_else(|| FetchError::malformed("API root lists no master ref"))
    }

    async fn resolve_ref(&self, reference: &ContentRef) -> Result<String, FetchError> {
        match reference {
            ContentRef::Published => self.master_ref().await,
            ContentRef::Preview(r) => Ok(r.clone()),
        }
    }

    /// Build the search URL for a query against a resolved ref
    pub fn search_url(
        &self,
        content_ref: &str,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<Url, FetchError> {
        let mut url = self
            .endpoint
            .join("documents/search")
            .map_err(|e| FetchError::malformed(format!("invalid endpoint: {}", e)))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("ref", content_ref);
            if !predicates.is_empty() {
                pairs.append_pair("q", &to_query(predicates));
            }
            if let Some(size) = options.page_size {
                pairs.append_pair("pageSize", &size.to_string());
            }
            if !options.orderings.is_empty() {
                pairs.append_pair("orderings", &to_orderings(&options.orderings));
            }
        }
        Ok(url)
    }

    /// Turn an API `next_page` URL into a cursor safe to hand to browsers
    fn cursor_from_next_page(&self, next_page: &str) -> Result<Cursor, FetchError> {
        let url = Url::parse(next_page)
            .map_err(|e| FetchError::malformed(format!("invalid next_page '{}': {}", next_page, e)))?;
        Ok(Cursor::new(strip_access_token(url).to_string()))
    }

    fn page_from(&self, resp: SearchResponse) -> Result<Page<RawDoc>, FetchError> {
        let continuation = resp
            .next_page
            .as_deref()
            .map(|next| self.cursor_from_next_page(next))
            .transpose()?;
        Ok(Page::new(resp.results, continuation))
    }

    fn with_token(&self, mut url: Url) -> Url {
        if let Some(token) = &self.access_token {
            url.query_pairs_mut().append_pair(ACCESS_TOKEN_PARAM, token);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, FetchError> {
        tracing::debug!("GET {}", url);
        let url = self.with_token(url);
        let res = self.http.get(url).send().await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            tracing::warn!("Content API error - Status: {}, Body: {}", status, body);
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = res.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ContentApi for PrismicClient {
    async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<Page<RawDoc>, FetchError> {
        let content_ref = self.resolve_ref(&options.reference).await?;
        let url = self.search_url(&content_ref, predicates, options)?;
        let resp: SearchResponse = self.get_json(url).await?;
        tracing::debug!("Search returned {} documents", resp.results.len());
        self.page_from(resp)
    }

    async fn fetch_page(&self, cursor: &Cursor) -> Result<Page<RawDoc>, FetchError> {
        let url = Url::parse(cursor.as_str())
            .map_err(|_| FetchError::ForeignCursor(cursor.as_str().to_string()))?;
        if url.origin() != self.endpoint.origin() || !url.path().starts_with(self.endpoint.path())
        {
            return Err(FetchError::ForeignCursor(cursor.as_str().to_string()));
        }
        let resp: SearchResponse = self.get_json(url).await?;
        self.page_from(resp)
    }
}

fn strip_access_token(mut url: Url) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != ACCESS_TOKEN_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
    url
}
