//! Post view models built from content API documents

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use serde_json::Value;

use crate::cms::{plain_text, RawDoc};
use crate::error::FetchError;

/// A post as shown in the listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostSummary {
    pub id: String,
    pub published_at: Option<DateTime<FixedOffset>>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

/// A full post
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostDetail {
    pub id: String,
    pub published_at: Option<DateTime<FixedOffset>>,
    pub last_edited_at: Option<DateTime<FixedOffset>>,
    pub title: String,
    pub banner_url: String,
    pub author: String,
    pub sections: Vec<Section>,
}

/// One headed block of a post body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub heading: String,
    pub paragraphs: Vec<String>,
}

/// Enough of a post to link to it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostLink {
    pub id: String,
    pub title: String,
    pub published_at: Option<DateTime<FixedOffset>>,
}

/// The posts published immediately after and before a given post
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Adjacency {
    pub after: Option<PostLink>,
    pub before: Option<PostLink>,
}

impl TryFrom<&RawDoc> for PostSummary {
    type Error = FetchError;

    fn try_from(doc: &RawDoc) -> Result<Self, Self::Error> {
        Ok(Self {
            id: post_id(doc)?,
            published_at: doc.first_publication_date,
            title: text(doc, "title")?,
            subtitle: text(doc, "subtitle")?,
            author: text(doc, "author")?,
        })
    }
}

impl TryFrom<&RawDoc> for PostDetail {
    type Error = FetchError;

    fn try_from(doc: &RawDoc) -> Result<Self, Self::Error> {
        let banner_url = doc
            .field("banner")
            .and_then(|b| b.get("url"))
            .and_then(Value::as_str)
            .ok_or_else(|| missing(doc, "banner.url"))?
            .to_string();

        let sections = doc
            .field("content")
            .and_then(Value::as_array)
            .ok_or_else(|| missing(doc, "content"))?
            .iter()
            .map(|s| section(doc, s))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: post_id(doc)?,
            published_at: doc.first_publication_date,
            last_edited_at: doc.last_publication_date,
            title: text(doc, "title")?,
            banner_url,
            author: text(doc, "author")?,
            sections,
        })
    }
}

impl TryFrom<&RawDoc> for PostLink {
    type Error = FetchError;

    fn try_from(doc: &RawDoc) -> Result<Self, Self::Error> {
        Ok(Self {
            id: post_id(doc)?,
            title: text(doc, "title")?,
            published_at: doc.first_publication_date,
        })
    }
}

fn section(doc: &RawDoc, value: &Value) -> Result<Section, FetchError> {
    let heading = value
        .get("heading")
        .and_then(plain_text)
        .ok_or_else(|| missing(doc, "content.heading"))?;
    let paragraphs = value
        .get("body")
        .and_then(Value::as_array)
        .ok_or_else(|| missing(doc, "content.body"))?
        .iter()
        .map(|p| {
            p.get("text")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| missing(doc, "content.body.text"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Section {
        heading,
        paragraphs,
    })
}

/// Route id of a document: its non-empty uid
pub fn post_id(doc: &RawDoc) -> Result<String, FetchError> {
    doc.uid
        .clone()
        .filter(|u| !u.is_empty())
        .ok_or_else(|| missing(doc, "uid"))
}

fn text(doc: &RawDoc, name: &str) -> Result<String, FetchError> {
    doc.field(name)
        .and_then(plain_text)
        .ok_or_else(|| missing(doc, name))
}

fn missing(doc: &RawDoc, field: &str) -> FetchError {
    FetchError::malformed(format!("document {} has no usable '{}'", doc.id, field))
}
