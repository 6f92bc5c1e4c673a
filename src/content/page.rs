//! Paged results and their continuation cursor

use serde::Serialize;
use std::fmt;

/// Opaque continuation handed out by the content API.
///
/// Only the API that produced a cursor knows what it means. Callers hold on
/// to it and pass it back to fetch the following page; they never build one
/// themselves except to rebuild a token that crossed the HTTP boundary.
#[derive(Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub(crate) fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Rebuild a cursor previously sent out with [`Cursor::as_str`]
    pub fn from_wire(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Token form for embedding in rendered pages
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cursor").field(&self.0).finish()
    }
}

/// One page of results.
///
/// `continuation` is `None` exactly when no further page exists.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub continuation: Option<Cursor>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, continuation: Option<Cursor>) -> Self {
        Self {
            items,
            continuation,
        }
    }

    /// Whether another page can be requested
    pub fn has_more(&self) -> bool {
        self.continuation.is_some()
    }

    /// Convert every item, keeping the continuation
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        let items = self.items.into_iter().map(f).collect::<Result<Vec<_>, _>>()?;
        Ok(Page {
            items,
            continuation: self.continuation,
        })
    }
}
