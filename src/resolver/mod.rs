//! Detail resolver - single posts, their neighbours and the prerender set

use serde::Serialize;
use std::collections::BTreeSet;

use crate::cms::{ContentApi, ContentRef, Ordering, Predicate, QueryOptions, FIRST_PUBLICATION};
use crate::content::{
    estimated_read_minutes, post_id, Adjacency, PostDetail, PostLink, DEFAULT_WORDS_PER_MINUTE,
};
use crate::error::{ContentError, FetchError};

/// A post with everything its page needs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedPost {
    pub post: PostDetail,
    pub adjacency: Adjacency,
    pub read_minutes: u64,
}

/// Looks up posts by id for the post pages
pub struct DetailResolver<'a> {
    api: &'a dyn ContentApi,
    doc_type: String,
    reference: ContentRef,
    words_per_minute: usize,
}

impl<'a> DetailResolver<'a> {
    pub fn new(api: &'a dyn ContentApi, doc_type: &str) -> Self {
        Self {
            api,
            doc_type: doc_type.to_string(),
            reference: ContentRef::Published,
            words_per_minute: DEFAULT_WORDS_PER_MINUTE,
        }
    }

    pub fn with_reference(mut self, reference: ContentRef) -> Self {
        self.reference = reference;
        self
    }

    pub fn words_per_minute(mut self, wpm: usize) -> Self {
        self.words_per_minute = wpm;
        self
    }

    /// Ids of the newest `limit` posts, rendered eagerly at build time
    pub async fn list_prerender_ids(&self, limit: usize) -> Result<BTreeSet<String>, FetchError> {
        if limit == 0 {
            return Ok(BTreeSet::new());
        }
        let options = QueryOptions::new(&self.reference)
            .page_size(limit)
            .order_by(Ordering::desc(FIRST_PUBLICATION));
        let page = self
            .api
            .query(&[Predicate::document_type(&self.doc_type)], &options)
            .await?;
        page.items
            .iter()
            .map(post_id)
            .collect()
    }

    /// The post whose uid is `id`
    pub async fn get_post(&self, id: &str) -> Result<PostDetail, ContentError> {
        let doc = self
            .api
            .get_by_uid(&self.doc_type, id, &self.reference)
            .await?
            .ok_or_else(|| ContentError::NotFound {
                kind: self.doc_type.clone(),
                uid: id.to_string(),
            })?;
        Ok(PostDetail::try_from(&doc)?)
    }

    /// Posts published immediately after and before `post`
    pub async fn get_adjacent(&self, post: &PostDetail) -> Result<Adjacency, FetchError> {
        let Some(published_at) = post.published_at else {
            return Ok(Adjacency::default());
        };

        let after = self
            .first_link(
                Predicate::date_after(FIRST_PUBLICATION, published_at),
                Ordering::asc(FIRST_PUBLICATION),
            )
            .await?;
        let before = self
            .first_link(
                Predicate::date_before(FIRST_PUBLICATION, published_at),
                Ordering::desc(FIRST_PUBLICATION),
            )
            .await?;

        Ok(Adjacency { after, before })
    }

    async fn first_link(
        &self,
        bound: Predicate,
        ordering: Ordering,
    ) -> Result<Option<PostLink>, FetchError> {
        let predicates = [Predicate::document_type(&self.doc_type), bound];
        let options = QueryOptions::new(&self.reference).order_by(ordering);
        self.api
            .query_first(&predicates, &options)
            .await?
            .map(|doc| PostLink::try_from(&doc))
            .transpose()
    }

    /// Post, neighbours and reading time in one go
    pub async fn resolve(&self, id: &str) -> Result<ResolvedPost, ContentError> {
        let post = self.get_post(id).await?;
        let adjacency = self.get_adjacent(&post).await?;
        let read_minutes = estimated_read_minutes(&post.sections, self.words_per_minute);
        tracing::debug!(
            "Resolved post {} ({} min, after={:?}, before={:?})",
            id,
            read_minutes,
            adjacency.after.as_ref().map(|p| &p.id),
            adjacency.before.as_ref().map(|p| &p.id)
        );
        Ok(ResolvedPost {
            post,
            adjacency,
            read_minutes,
        })
    }
}
