//! Built-in templates using the Tera template engine
//!
//! All templates are embedded directly in the binary.

use anyhow::Result;
use serde::Serialize;
use tera::{Context, Tera};

/// Stylesheet copied to `public/css/style.css`
pub const STYLESHEET: &str = include_str!("site/style.css");

/// Template renderer with the embedded blog templates
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        // Content comes from the CMS as plain text, escape it everywhere
        tera.autoescape_on(vec![".html"]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("site/layout.html")),
            ("index.html", include_str!("site/index.html")),
            ("post.html", include_str!("site/post.html")),
            ("not_found.html", include_str!("site/not_found.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("site/partials/header.html"),
            ),
            (
                "partials/post_card.html",
                include_str!("site/partials/post_card.html"),
            ),
            (
                "partials/comments.html",
                include_str!("site/partials/comments.html"),
            ),
            (
                "partials/load_more.html",
                include_str!("site/partials/load_more.html"),
            ),
        ])?;

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub root: String,
    pub stylesheet: String,
}

/// A post in the listing; also the JSON shape of `/api/posts` results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostCardData {
    pub id: String,
    pub path: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListingData {
    pub posts: Vec<PostCardData>,
    pub next_page: Option<String>,
    pub load_more_url: String,
    pub preview: bool,
    pub exit_preview_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostPageData {
    pub id: String,
    pub url: String,
    pub title: String,
    pub banner_url: String,
    pub author: String,
    pub date: String,
    pub datetime: String,
    pub edited: Option<String>,
    pub read_minutes: u64,
    pub sections: Vec<SectionData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionData {
    pub heading: String,
    pub paragraphs: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NavPost {
    pub title: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentsData {
    pub repo: String,
    pub issue_term: String,
    pub theme: String,
}
