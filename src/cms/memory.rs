//! In-memory content API backed by a JSON fixture

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::model::RawDoc;
use super::predicate::{ContentRef, Ordering, Predicate, QueryOptions};
use super::ContentApi;
use crate::content::{Cursor, Page};
use crate::error::FetchError;

const CURSOR_BASE: &str = "memory://search";
const DEFAULT_PAGE_SIZE: usize = 20;

/// Fixture file layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub documents: Vec<RawDoc>,
    /// Preview ref -> documents visible under that ref
    #[serde(default)]
    pub previews: HashMap<String, Vec<RawDoc>>,
}

/// Content API answering from documents held in memory.
///
/// Supports the same predicates, orderings and paging as the remote API.
/// Cursors are `memory://search?...` URLs carrying the query.
#[derive(Debug, Clone, Default)]
pub struct MemoryApi {
    fixture: Fixture,
}

impl MemoryApi {
    pub fn new(documents: Vec<RawDoc>) -> Self {
        Self {
            fixture: Fixture {
                documents,
                previews: HashMap::new(),
            },
        }
    }

    /// Load documents from a fixture file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let fixture: Fixture = serde_json::from_str(&content)?;
        tracing::debug!(
            "Loaded {} documents and {} preview refs",
            fixture.documents.len(),
            fixture.previews.len()
        );
        Ok(Self { fixture })
    }

    /// Make `documents` visible under a preview ref
    pub fn with_preview(mut self, reference: &str, documents: Vec<RawDoc>) -> Self {
        self.fixture
            .previews
            .insert(reference.to_string(), documents);
        self
    }

    fn documents(&self, reference: &ContentRef) -> Result<&[RawDoc], FetchError> {
        match reference {
            ContentRef::Published => Ok(&self.fixture.documents),
            ContentRef::Preview(r) => self
                .fixture
                .previews
                .get(r)
                .map(Vec::as_slice)
                .ok_or_else(|| FetchError::Status {
                    status: 404,
                    body: format!("unknown ref '{}'", r),
                }),
        }
    }

    fn search(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
        page: usize,
    ) -> Result<Page<RawDoc>, FetchError> {
        let mut matched: Vec<&RawDoc> = self
            .documents(&options.reference)?
            .iter()
            .filter(|doc| predicates.iter().all(|p| matches(doc, p)))
            .collect();
        matched.sort_by(|a, b| compare(a, b, &options.orderings));

        let size = options.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
        let start = page.saturating_sub(1).saturating_mul(size);
        let items: Vec<RawDoc> = matched.iter().skip(start).take(size).map(|d| (*d).clone()).collect();

        let remaining = matched.len().saturating_sub(start);
        let continuation = match page.checked_add(1) {
            Some(next) if remaining > size => Some(encode_cursor(predicates, options, next)?),
            _ => None,
        };
        Ok(Page::new(items, continuation))
    }
}

#[async_trait]
impl ContentApi for MemoryApi {
    async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<Page<RawDoc>, FetchError> {
        self.search(predicates, options, 1)
    }

    async fn fetch_page(&self, cursor: &Cursor) -> Result<Page<RawDoc>, FetchError> {
        let (predicates, options, page) = decode_cursor(cursor)?;
        self.search(&predicates, &options, page)
    }
}

fn matches(doc: &RawDoc, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::At { field, value } => doc.path_value(field).as_deref() == Some(value.as_str()),
        Predicate::DateAfter { field, ts } => doc.path_timestamp(field).is_some_and(|t| t > *ts),
        Predicate::DateBefore { field, ts } => doc.path_timestamp(field).is_some_and(|t| t < *ts),
    }
}

fn compare(a: &RawDoc, b: &RawDoc, orderings: &[Ordering]) -> CmpOrdering {
    for ordering in orderings {
        let ord = match (
            a.path_timestamp(&ordering.field),
            b.path_timestamp(&ordering.field),
        ) {
            (None, None) => a
                .path_value(&ordering.field)
                .cmp(&b.path_value(&ordering.field)),
            (x, y) => x.cmp(&y),
        };
        let ord = if ordering.descending { ord.reverse() } else { ord };
        if ord != CmpOrdering::Equal {
            return ord;
        }
    }
    a.id.cmp(&b.id)
}

fn encode_cursor(
    predicates: &[Predicate],
    options: &QueryOptions,
    page: usize,
) -> Result<Cursor, FetchError> {
    let mut url = Url::parse(CURSOR_BASE).map_err(|e| FetchError::malformed(e.to_string()))?;
    url.query_pairs_mut()
        .append_pair("page", &page.to_string())
        .append_pair("q", &serde_json::to_string(predicates)?)
        .append_pair("options", &serde_json::to_string(options)?);
    Ok(Cursor::new(url.to_string()))
}

fn decode_cursor(cursor: &Cursor) -> Result<(Vec<Predicate>, QueryOptions, usize), FetchError> {
    let foreign = || FetchError::ForeignCursor(cursor.as_str().to_string());
    let url = Url::parse(cursor.as_str()).map_err(|_| foreign())?;
    if url.scheme() != "memory" {
        return Err(foreign());
    }

    let mut page = None;
    let mut predicates = None;
    let mut options = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "page" => page = value.parse::<usize>().ok().filter(|p| *p >= 1),
            "q" => predicates = serde_json::from_str(&value).ok(),
            "options" => options = serde_json::from_str(&value).ok(),
            _ => {}
        }
    }
    match (predicates, options, page) {
        (Some(q), Some(o), Some(p)) => Ok((q, o, p)),
        _ => Err(foreign()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::predicate::FIRST_PUBLICATION;
    use serde_json::json;

    fn doc(uid: &str, published: &str) -> RawDoc {
        serde_json::from_value(json!({
            "id": format!("id-{}", uid),
            "uid": uid,
            "type": "post",
            "first_publication_date": published,
            "data": { "title": uid, "subtitle": "", "author": "A" }
        }))
        .unwrap()
    }

    fn api() -> MemoryApi {
        MemoryApi::new(vec![
            doc("p2", "2020-02-01T00:00:00+0000"),
            doc("p1", "2020-01-01T00:00:00+0000"),
            doc("p3", "2020-03-01T00:00:00+0000"),
        ])
    }

    fn uids(page: &Page<RawDoc>) -> Vec<String> {
        page.items.iter().filter_map(|d| d.uid.clone()).collect()
    }

    #[tokio::test]
    async fn test_paged_query_follows_cursor() {
        let api = api();
        let options = QueryOptions::default()
            .page_size(2)
            .order_by(Ordering::desc(FIRST_PUBLICATION));
        let first = api
            .query(&[Predicate::document_type("post")], &options)
            .await
            .unwrap();
        assert_eq!(uids(&first), vec!["p3", "p2"]);

        let cursor = first.continuation.unwrap();
        assert!(cursor.as_str().starts_with("memory://search?"));
        let second = api.fetch_page(&cursor).await.unwrap();
        assert_eq!(uids(&second), vec!["p1"]);
        assert!(second.continuation.is_none());
    }

    #[tokio::test]
    async fn test_date_predicates() {
        let api = api();
        let ts = doc("x", "2020-02-01T00:00:00+0000")
            .first_publication_date
            .unwrap();
        let options = QueryOptions::default().order_by(Ordering::asc(FIRST_PUBLICATION));

        let after = api
            .query(&[Predicate::date_after(FIRST_PUBLICATION, ts)], &options)
            .await
            .unwrap();
        assert_eq!(uids(&after), vec!["p3"]);

        let before = api
            .query(&[Predicate::date_before(FIRST_PUBLICATION, ts)], &options)
            .await
            .unwrap();
        assert_eq!(uids(&before), vec!["p1"]);
    }

    #[tokio::test]
    async fn test_get_by_uid() {
        let api = api();
        let found = api
            .get_by_uid("post", "p2", &ContentRef::Published)
            .await
            .unwrap();
        assert_eq!(found.unwrap().id, "id-p2");

        let missing = api
            .get_by_uid("post", "nope", &ContentRef::Published)
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_preview_ref() {
        let api = api().with_preview("draft-1", vec![doc("draft", "2021-01-01T00:00:00+0000")]);
        let options = QueryOptions::new(&ContentRef::Preview("draft-1".to_string()));
        let page = api.query(&[], &options).await.unwrap();
        assert_eq!(uids(&page), vec!["draft"]);

        let options = QueryOptions::new(&ContentRef::Preview("unknown".to_string()));
        assert!(api.query(&[], &options).await.is_err());
    }

    #[tokio::test]
    async fn test_bad_cursor() {
        let api = api();
        let err = api
            .fetch_page(&Cursor::from_wire("https://example.com/?page=2"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::ForeignCursor(_)));

        let err = api
            .fetch_page(&Cursor::from_wire("memory://search?page=0&q=[]&options={}"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::ForeignCursor(_)));
    }

    #[tokio::test]
    async fn test_cursor_past_the_end_is_empty() {
        let api = api();
        let cursor = format!(
            "memory://search?page={}&q=[]&options={{\"page_size\":2}}",
            usize::MAX
        );
        let page = api.fetch_page(&Cursor::from_wire(cursor)).await.unwrap();
        assert!(page.items.is_empty());
        assert!(page.continuation.is_none());
    }

    #[test]
    fn test_load_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posts.json");
        fs::write(
            &path,
            r#"{"documents": [{"id": "1", "uid": "a", "type": "post", "data": {}}]}"#,
        )
        .unwrap();
        let api = MemoryApi::load(&path).unwrap();
        assert_eq!(api.fixture.documents.len(), 1);
        assert!(api.fixture.previews.is_empty());
    }
}
