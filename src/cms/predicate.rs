//! Query predicates, orderings and content references

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Field holding a document's first publication timestamp
pub const FIRST_PUBLICATION: &str = "document.first_publication_date";

/// A single filter on the document set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    /// `field == value`
    At { field: String, value: String },
    /// `field > ts`
    DateAfter {
        field: String,
        ts: DateTime<FixedOffset>,
    },
    /// `field < ts`
    DateBefore {
        field: String,
        ts: DateTime<FixedOffset>,
    },
}

impl Predicate {
    pub fn at(field: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::At {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn document_type(doc_type: &str) -> Self {
        Self::at("document.type", doc_type)
    }

    pub fn uid(doc_type: &str, uid: &str) -> Self {
        Self::at(format!("my.{}.uid", doc_type), uid)
    }

    pub fn date_after(field: impl Into<String>, ts: DateTime<FixedOffset>) -> Self {
        Predicate::DateAfter {
            field: field.into(),
            ts,
        }
    }

    pub fn date_before(field: impl Into<String>, ts: DateTime<FixedOffset>) -> Self {
        Predicate::DateBefore {
            field: field.into(),
            ts,
        }
    }

    /// Render in the search endpoint's query syntax
    pub fn to_query(&self) -> String {
        match self {
            Predicate::At { field, value } => {
                format!("[at({}, {})]", field, quote(value))
            }
            Predicate::DateAfter { field, ts } => {
                format!("[date.after({}, {})]", field, ts.timestamp_millis())
            }
            Predicate::DateBefore { field, ts } => {
                format!("[date.before({}, {})]", field, ts.timestamp_millis())
            }
        }
    }
}

/// Render a full `q` parameter from a predicate list
pub fn to_query(predicates: &[Predicate]) -> String {
    let inner: String = predicates.iter().map(Predicate::to_query).collect();
    format!("[{}]", inner)
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Sort key for a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ordering {
    pub field: String,
    pub descending: bool,
}

impl Ordering {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

/// Render an `orderings` parameter
pub fn to_orderings(orderings: &[Ordering]) -> String {
    let inner: Vec<String> = orderings
        .iter()
        .map(|o| {
            if o.descending {
                format!("{} desc", o.field)
            } else {
                o.field.clone()
            }
        })
        .collect();
    format!("[{}]", inner.join(","))
}

/// Which version of the content a query reads
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentRef {
    /// The currently published content
    #[default]
    Published,
    /// A draft or release preview ref
    Preview(String),
}

impl ContentRef {
    pub fn is_preview(&self) -> bool {
        matches!(self, ContentRef::Preview(_))
    }
}

/// Paging, sorting and ref selection for a query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    pub page_size: Option<usize>,
    #[serde(default)]
    pub orderings: Vec<Ordering>,
    #[serde(default)]
    pub reference: ContentRef,
}

impl QueryOptions {
    pub fn new(reference: &ContentRef) -> Self {
        Self {
            reference: reference.clone(),
            ..Default::default()
        }
    }

    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn order_by(mut self, ordering: Ordering) -> Self {
        self.orderings.push(ordering);
        self
    }
}
