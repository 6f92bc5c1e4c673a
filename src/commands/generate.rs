//! Generate static files

use anyhow::Result;
use std::fs;

use crate::generator::{BuildReport, Generator};
use crate::Blog;

/// Full rebuild: wipe previous output, render the listing and the newest posts
pub async fn run(blog: &Blog) -> Result<BuildReport> {
    let start = std::time::Instant::now();

    // Pages generated on demand live until the next full rebuild
    if blog.public_dir.exists() {
        fs::remove_dir_all(&blog.public_dir)?;
    }

    let generator = Generator::new(&blog.config)?;
    let report = generator.generate(blog.api.as_ref(), &blog.public_dir).await?;

    let duration = start.elapsed();
    tracing::info!(
        "Generated {} posts in the listing (more: {}) and {} post pages in {:.2}s",
        report.listed,
        report.has_more,
        report.prerendered.len(),
        duration.as_secs_f64()
    );
    Ok(report)
}
