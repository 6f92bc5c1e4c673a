//! Generation cache for on-demand post pages
//!
//! Pages that were not rendered at build time are rendered on their first
//! request and kept here. Entries are write-once: the first successful render
//! for an id wins and is never replaced or evicted. Each entry is also written
//! to `public/post/<id>/index.html`, so it survives a server restart and goes
//! away with the next full rebuild.

use anyhow::Result;
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{OnceCell, RwLock};

type Slot = Arc<OnceCell<Arc<str>>>;

/// Write-once store of rendered post pages keyed by post id.
///
/// Each id has one slot; concurrent misses for the same id wait on the
/// same render instead of each querying the content API.
#[derive(Debug)]
pub struct GenerationCache {
    public_dir: PathBuf,
    entries: RwLock<HashMap<String, Slot>>,
}

impl GenerationCache {
    pub fn new<P: AsRef<Path>>(public_dir: P) -> Self {
        Self {
            public_dir: public_dir.as_ref().to_path_buf(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Output file of a post page
    pub fn page_path(&self, id: &str) -> Option<PathBuf> {
        post_page_path(&self.public_dir, id)
    }

    /// Cached page for `id`, from memory or from a previous build on disk
    pub async fn get(&self, id: &str) -> Option<Arc<str>> {
        if let Some(html) = self.cached(id).await {
            return Some(html);
        }

        let html = self.read_from_disk(id).await?;
        let slot = self.slot(id).await;
        Some(slot.get_or_init(|| async { html }).await.clone())
    }

    /// Store a rendered page unless one is already cached; returns the kept page
    pub async fn insert(&self, id: &str, html: String) -> Result<Arc<str>> {
        let slot = self.slot(id).await;
        let kept = slot.get_or_init(|| async { Arc::from(html) }).await.clone();
        self.persist(id, &kept).await?;
        Ok(kept)
    }

    /// Cached page for `id`, rendering and storing it on a miss.
    ///
    /// Only one render per id runs at a time; a failed render leaves the
    /// slot empty so a later request tries again.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, id: &str, render: F) -> Result<Arc<str>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
        E: From<anyhow::Error>,
    {
        let slot = self.slot(id).await;
        let html = slot
            .get_or_try_init(|| async {
                if let Some(html) = self.read_from_disk(id).await {
                    return Ok(html);
                }
                let html: Arc<str> = Arc::from(render().await?);
                self.persist(id, &html).await?;
                Ok::<_, E>(html)
            })
            .await?;
        Ok(html.clone())
    }

    /// Number of stored pages
    pub async fn len(&self) -> usize {
        self.entries
            .read()
            .await
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn cached(&self, id: &str) -> Option<Arc<str>> {
        self.entries.read().await.get(id)?.get().cloned()
    }

    async fn slot(&self, id: &str) -> Slot {
        if let Some(slot) = self.entries.read().await.get(id) {
            return slot.clone();
        }
        self.entries
            .write()
            .await
            .entry(id.to_string())
            .or_default()
            .clone()
    }

    async fn read_from_disk(&self, id: &str) -> Option<Arc<str>> {
        let path = self.page_path(id)?;
        let html = fs::read_to_string(&path).await.ok()?;
        tracing::debug!("Loaded pre-rendered page {:?}", path);
        Some(Arc::from(html))
    }

    async fn persist(&self, id: &str, html: &str) -> Result<()> {
        let Some(path) = self.page_path(id) else {
            return Ok(());
        };
        if fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, html.as_bytes()).await?;
        tracing::info!("Generated on demand: {:?}", path);
        Ok(())
    }
}

/// `public/post/<id>/index.html`, or `None` for ids that are not a single
/// safe path segment
pub fn post_page_path(public_dir: &Path, id: &str) -> Option<PathBuf> {
    if !is_safe_id(id) {
        return None;
    }
    Some(public_dir.join("post").join(id).join("index.html"))
}

fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && id
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
