//! Content module - view models, pages and derived values

mod page;
mod post;
mod reading;

pub use page::{Cursor, Page};
pub use post::{post_id, Adjacency, PostDetail, PostLink, PostSummary, Section};
pub use reading::{estimated_read_minutes, total_word_count, DEFAULT_WORDS_PER_MINUTE};
