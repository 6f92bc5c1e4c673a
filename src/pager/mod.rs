//! Listing pager - first page of posts plus "load more" continuation

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use tokio::sync::Mutex;

use crate::cms::{ContentApi, ContentRef, Ordering, Predicate, QueryOptions, FIRST_PUBLICATION};
use crate::content::{Cursor, Page, PostSummary};
use crate::error::FetchError;

/// Fetches pages of post summaries, newest first
pub struct ListingPager<'a> {
    api: &'a dyn ContentApi,
    doc_type: String,
    reference: ContentRef,
}

impl<'a> ListingPager<'a> {
    pub fn new(api: &'a dyn ContentApi, doc_type: &str) -> Self {
        Self {
            api,
            doc_type: doc_type.to_string(),
            reference: ContentRef::Published,
        }
    }

    /// Read content at `reference` instead of the published ref
    pub fn with_reference(mut self, reference: ContentRef) -> Self {
        self.reference = reference;
        self
    }

    /// First page of the listing
    pub async fn load_initial_page(
        &self,
        page_size: usize,
    ) -> Result<Page<PostSummary>, FetchError> {
        let options = QueryOptions::new(&self.reference)
            .page_size(page_size)
            .order_by(Ordering::desc(FIRST_PUBLICATION));
        let page = self
            .api
            .query(&[Predicate::document_type(&self.doc_type)], &options)
            .await?;
        tracing::debug!(
            "Loaded initial page: {} posts, more={}",
            page.items.len(),
            page.has_more()
        );
        page.try_map(|doc| PostSummary::try_from(&doc))
    }

    /// Page following a previously returned one
    pub async fn load_next_page(&self, cursor: &Cursor) -> Result<Page<PostSummary>, FetchError> {
        let page = self.api.fetch_page(cursor).await?;
        tracing::debug!(
            "Loaded next page: {} posts, more={}",
            page.items.len(),
            page.has_more()
        );
        page.try_map(|doc| PostSummary::try_from(&doc))
    }
}

/// What a call to [`Feed::load_more`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was fetched; `appended` new posts were added
    Loaded { appended: usize },
    /// Another load is still in flight; nothing was fetched
    Busy,
    /// There is no further page
    Exhausted,
}

#[derive(Debug, Default)]
struct FeedState {
    items: Vec<PostSummary>,
    seen: HashSet<String>,
    next: Option<Cursor>,
}

impl FeedState {
    fn append(&mut self, page: Page<PostSummary>) -> usize {
        let mut appended = 0;
        for item in page.items {
            if self.seen.insert(item.id.clone()) {
                self.items.push(item);
                appended += 1;
            } else {
                tracing::debug!("Skipping duplicate post {}", item.id);
            }
        }
        self.next = page.continuation;
        appended
    }
}

/// Accumulated listing behind a "load more" control.
///
/// Items are only ever appended, each id at most once, and the cursor only
/// moves forward. At most one fetch runs at a time.
#[derive(Debug, Default)]
pub struct Feed {
    state: Mutex<FeedState>,
    loading: AtomicBool,
}

impl Feed {
    /// Start from an initial page
    pub fn new(initial: Page<PostSummary>) -> Self {
        let mut state = FeedState::default();
        state.append(initial);
        Self {
            state: Mutex::new(state),
            loading: AtomicBool::new(false),
        }
    }

    /// Fetch and append the next page.
    ///
    /// On error the feed keeps its last good items and cursor.
    pub async fn load_more(&self, pager: &ListingPager<'_>) -> Result<LoadOutcome, FetchError> {
        if self.loading.swap(true, AtomicOrdering::AcqRel) {
            return Ok(LoadOutcome::Busy);
        }
        let _guard = LoadingGuard(&self.loading);

        let next = self.state.lock().await.next.clone();
        let Some(cursor) = next else {
            return Ok(LoadOutcome::Exhausted);
        };

        let page = pager.load_next_page(&cursor).await?;
        let appended = self.state.lock().await.append(page);
        Ok(LoadOutcome::Loaded { appended })
    }

    /// Keep loading until the listing is exhausted
    pub async fn load_all(&self, pager: &ListingPager<'_>) -> Result<usize, FetchError> {
        let mut total = 0;
        loop {
            match self.load_more(pager).await? {
                LoadOutcome::Loaded { appended } => total += appended,
                LoadOutcome::Busy | LoadOutcome::Exhausted => return Ok(total),
            }
        }
    }

    pub async fn items(&self) -> Vec<PostSummary> {
        self.state.lock().await.items.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Whether the "load more" control should be shown
    pub async fn has_more(&self) -> bool {
        self.state.lock().await.next.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(AtomicOrdering::Acquire)
    }
}

struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, AtomicOrdering::Release);
    }
}
