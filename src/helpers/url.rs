//! URL helper functions

use crate::config::SiteConfig;

/// Generate a URL with the root path
///
/// # Examples
/// ```ignore
/// url_for(&config, "/css/style.css") // -> "/blog/css/style.css"
/// ```
pub fn url_for(config: &SiteConfig, path: &str) -> String {
    let root = config.root.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", root)
    } else {
        format!("{}/{}", root, path)
    }
}

/// Generate a full URL including the domain
pub fn full_url_for(config: &SiteConfig, path: &str) -> String {
    let base = config.url.trim_end_matches('/');
    format!("{}{}", base, url_for(config, path))
}

/// Route of a post page
pub fn post_path(config: &SiteConfig, id: &str) -> String {
    url_for(config, &post_route(id))
}

/// Absolute URL of a post page
pub fn post_url(config: &SiteConfig, id: &str) -> String {
    full_url_for(config, &post_route(id))
}

fn post_route(id: &str) -> String {
    let encoded = percent_encoding::utf8_percent_encode(id, SEGMENT);
    format!("post/{}", encoded)
}

/// Characters escaped in a single path segment
const SEGMENT: &percent_encoding::AsciiSet = &percent_encoding::CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[cfg(test)]
mod tests {
    use super::*;

    fn config(root: &str) -> SiteConfig {
        SiteConfig {
            root: root.to_string(),
            url: "https://example.com".to_string(),
            ..SiteConfig::default()
        }
    }

    #[test]
    fn test_url_for() {
        assert_eq!(url_for(&config("/"), "/css/style.css"), "/css/style.css");
        assert_eq!(url_for(&config("/blog/"), "css/style.css"), "/blog/css/style.css");
        assert_eq!(url_for(&config("/blog"), ""), "/blog/");
    }

    #[test]
    fn test_full_url_for() {
        assert_eq!(
            full_url_for(&config("/blog/"), "/post/a"),
            "https://example.com/blog/post/a"
        );
    }

    #[test]
    fn test_post_path() {
        assert_eq!(post_path(&config("/"), "como-usar"), "/post/como-usar");
        assert_eq!(post_path(&config("/"), "a b/c"), "/post/a%20b%2Fc");
        assert_eq!(
            post_url(&config("/blog/"), "como-usar"),
            "https://example.com/blog/post/como-usar"
        );
    }
}
