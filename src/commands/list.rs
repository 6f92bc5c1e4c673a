//! List posts from the content API

use anyhow::Result;

use crate::cms::ContentRef;
use crate::pager::{Feed, ListingPager};
use crate::Blog;

/// Print the listing; with `all`, keep following the continuation to the end
pub async fn run(blog: &Blog, all: bool, reference: ContentRef) -> Result<()> {
    let pager = ListingPager::new(blog.api.as_ref(), &blog.config.api.document_type)
        .with_reference(reference);
    let feed = Feed::new(pager.load_initial_page(blog.config.listing.page_size).await?);

    if all {
        feed.load_all(&pager).await?;
    }

    let posts = feed.items().await;
    println!("Posts ({}):", posts.len());
    for post in &posts {
        let date = post
            .published_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "----------".to_string());
        println!("  {} - {} [{}] by {}", date, post.title, post.id, post.author);
    }
    if feed.has_more().await {
        println!("  ... more posts available (use --all)");
    }

    Ok(())
}
