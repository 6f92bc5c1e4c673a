//! Generator module - renders pages and writes the build output

use anyhow::{Context as _, Result};
use chrono::{DateTime, FixedOffset, Locale};
use chrono_tz::Tz;
use std::fs;
use std::path::Path;
use tera::Context;

use crate::cache::post_page_path;
use crate::cms::ContentApi;
use crate::config::SiteConfig;
use crate::content::{Page, PostLink, PostSummary};
use crate::helpers::{date_xml, format_date, post_path, post_url, url_for};
use crate::pager::ListingPager;
use crate::resolver::{DetailResolver, ResolvedPost};
use crate::templates::{
    CommentsData, ListingData, NavPost, PostCardData, PostPageData, SectionData, SiteData,
    TemplateRenderer, STYLESHEET,
};

/// What a build produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub listed: usize,
    pub has_more: bool,
    pub prerendered: Vec<String>,
}

/// Renders listing, post and not-found pages
pub struct Generator {
    config: SiteConfig,
    renderer: TemplateRenderer,
    locale: Locale,
    tz: Tz,
}

impl Generator {
    /// Create a new generator
    pub fn new(config: &SiteConfig) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            renderer: TemplateRenderer::new()?,
            locale: config.locale()?,
            tz: config.tz()?,
        })
    }

    /// Build the site: first listing page plus the newest posts
    pub async fn generate(&self, api: &dyn ContentApi, public_dir: &Path) -> Result<BuildReport> {
        fs::create_dir_all(public_dir)?;
        self.write_assets(public_dir)?;

        let doc_type = &self.config.api.document_type;

        let pager = ListingPager::new(api, doc_type);
        let first = pager
            .load_initial_page(self.config.listing.page_size)
            .await
            .context("failed to load the post listing")?;
        let html = self.render_listing(&first, false)?;
        write_page(&public_dir.join("index.html"), &html)?;
        tracing::info!("Generated listing with {} posts", first.items.len());

        let resolver = DetailResolver::new(api, doc_type)
            .words_per_minute(self.config.detail.words_per_minute);
        let ids = resolver
            .list_prerender_ids(self.config.detail.prerender_limit)
            .await
            .context("failed to list posts to pre-render")?;

        let mut prerendered = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(path) = post_page_path(public_dir, &id) else {
                tracing::warn!("Skipping post with unsafe id {:?}", id);
                continue;
            };
            let resolved = resolver
                .resolve(&id)
                .await
                .with_context(|| format!("failed to resolve post '{}'", id))?;
            let html = self.render_post(&resolved)?;
            write_page(&path, &html)?;
            tracing::debug!("Generated post: {:?}", path);
            prerendered.push(id);
        }
        tracing::info!("Pre-rendered {} posts", prerendered.len());

        Ok(BuildReport {
            listed: first.items.len(),
            has_more: first.has_more(),
            prerendered,
        })
    }

    fn write_assets(&self, public_dir: &Path) -> Result<()> {
        let css = public_dir.join("css").join("style.css");
        if let Some(parent) = css.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&css, STYLESHEET)?;
        Ok(())
    }

    /// Listing page for a page of summaries
    pub fn render_listing(&self, page: &Page<PostSummary>, preview: bool) -> Result<String> {
        let listing = ListingData {
            posts: page.items.iter().map(|p| self.card(p)).collect(),
            next_page: page.continuation.as_ref().map(|c| c.as_str().to_string()),
            load_more_url: url_for(&self.config, "api/posts"),
            preview,
            exit_preview_url: url_for(&self.config, "api/exit-preview"),
        };

        let mut context = self.base_context();
        context.insert("listing", &listing);
        self.renderer.render("index.html", &context)
    }

    /// Post page with its neighbour links
    pub fn render_post(&self, resolved: &ResolvedPost) -> Result<String> {
        let post = &resolved.post;
        let data = PostPageData {
            id: post.id.clone(),
            url: post_url(&self.config, &post.id),
            title: post.title.clone(),
            banner_url: post.banner_url.clone(),
            author: post.author.clone(),
            date: self.display_date(post.published_at, &self.config.date_format),
            datetime: post
                .published_at
                .map(|d| date_xml(&d.with_timezone(&self.tz)))
                .unwrap_or_default(),
            edited: post
                .last_edited_at
                .map(|d| self.display_date(Some(d), &self.config.edited_format)),
            read_minutes: resolved.read_minutes,
            sections: post
                .sections
                .iter()
                .map(|s| SectionData {
                    heading: s.heading.clone(),
                    paragraphs: s.paragraphs.clone(),
                })
                .collect(),
        };

        let comments = (!self.config.comments.repo.trim().is_empty()).then(|| CommentsData {
            repo: self.config.comments.repo.clone(),
            issue_term: self.config.comments.issue_term.clone(),
            theme: self.config.comments.theme.clone(),
        });

        let mut context = self.base_context();
        context.insert("post", &data);
        // Older post on the left, newer on the right
        context.insert("prev_post", &resolved.adjacency.before.as_ref().map(|l| self.nav(l)));
        context.insert("next_post", &resolved.adjacency.after.as_ref().map(|l| self.nav(l)));
        context.insert("comments", &comments);
        self.renderer.render("post.html", &context)
    }

    /// Page shown for ids without a post
    pub fn render_not_found(&self, id: &str) -> Result<String> {
        let mut context = self.base_context();
        context.insert("id", id);
        self.renderer.render("not_found.html", &context)
    }

    /// Listing entry, also served as JSON to the "load more" script
    pub fn card(&self, post: &PostSummary) -> PostCardData {
        PostCardData {
            id: post.id.clone(),
            path: post_path(&self.config, &post.id),
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            author: post.author.clone(),
            date: self.display_date(post.published_at, &self.config.date_format),
        }
    }

    fn nav(&self, link: &PostLink) -> NavPost {
        NavPost {
            title: link.title.clone(),
            path: post_path(&self.config, &link.id),
        }
    }

    fn display_date(&self, date: Option<DateTime<FixedOffset>>, pattern: &str) -> String {
        date.map(|d| format_date(&d.with_timezone(&self.tz), pattern, self.locale))
            .unwrap_or_default()
    }

    fn base_context(&self) -> Context {
        let mut context = Context::new();
        context.insert(
            "site",
            &SiteData {
                title: self.config.title.clone(),
                root: url_for(&self.config, ""),
                stylesheet: url_for(&self.config, "css/style.css"),
            },
        );
        context
    }
}

fn write_page(path: &Path, html: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| anyhow::anyhow!("Failed to create dir {:?}: {}", parent, e))?;
    }
    fs::write(path, html).map_err(|e| anyhow::anyhow!("Failed to write {:?}: {}", path, e))?;
    Ok(())
}
