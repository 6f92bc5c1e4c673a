//! Helper functions for templates

mod date;
mod url;

pub use date::*;
pub use url::*;
