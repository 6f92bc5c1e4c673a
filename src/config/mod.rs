//! Configuration module

mod site;

pub use site::SiteConfig;
pub use site::ApiConfig;
pub use site::CommentsConfig;
pub use site::DetailConfig;
pub use site::ListingConfig;
pub use site::{ACCESS_TOKEN_ENV, ENDPOINT_ENV, MAX_PAGE_SIZE};
