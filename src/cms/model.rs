//! Wire shapes of the content API

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// A document as returned by the search endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDoc {
    pub id: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: String,
    #[serde(default, with = "timestamp")]
    pub first_publication_date: Option<DateTime<FixedOffset>>,
    #[serde(default, with = "timestamp")]
    pub last_publication_date: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub data: Value,
}

impl RawDoc {
    /// Value of a `data` field, if present and not null
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name).filter(|v| !v.is_null())
    }

    /// Look up a field by its query path (`document.*` or `my.<type>.*`)
    pub fn path_value(&self, path: &str) -> Option<String> {
        match path {
            "document.id" => Some(self.id.clone()),
            "document.type" => Some(self.doc_type.clone()),
            _ => {
                let prefix = format!("my.{}.", self.doc_type);
                let name = path.strip_prefix(&prefix)?;
                if name == "uid" {
                    return self.uid.clone();
                }
                self.field(name).and_then(plain_text)
            }
        }
    }

    /// Look up a timestamp by its query path
    pub fn path_timestamp(&self, path: &str) -> Option<DateTime<FixedOffset>> {
        match path {
            "document.first_publication_date" => self.first_publication_date,
            "document.last_publication_date" => self.last_publication_date,
            _ => None,
        }
    }
}

/// Response of `documents/search`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<RawDoc>,
    #[serde(default)]
    pub next_page: Option<String>,
}

/// Response of the API root, listing the content refs
#[derive(Debug, Clone, Deserialize)]
pub struct ApiRoot {
    #[serde(default)]
    pub refs: Vec<ApiRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiRef {
    pub id: String,
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(rename = "isMasterRef", default)]
    pub is_master_ref: bool,
}

/// Read a text field that is either a plain string or rich text spans
pub fn plain_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(spans) => {
            let parts: Vec<&str> = spans
                .iter()
                .filter_map(|span| span.get("text").and_then(Value::as_str))
                .collect();
            if parts.len() == spans.len() {
                Some(parts.join(" "))
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Parse a timestamp in RFC 3339 or the API's `+0000` offset form
pub fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z"))
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .ok()
}

mod timestamp {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<FixedOffset>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_str(&dt.format("%Y-%m-%dT%H:%M:%S%z").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<FixedOffset>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) => parse_timestamp(&s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_search_response() {
        let body = json!({
            "page": 1,
            "results_per_page": 2,
            "next_page": "https://blog.cdn.prismic.io/api/v2/documents/search?page=2",
            "results": [{
                "id": "YF0Zh",
                "uid": "como-utilizar-hooks",
                "type": "post",
                "first_publication_date": "2021-03-25T19:25:28+0000",
                "last_publication_date": null,
                "data": { "title": "Como utilizar Hooks", "author": "Joseph Oliveira" }
            }]
        });
        let resp: SearchResponse = serde_json::from_value(body).unwrap();
        assert_eq!(resp.results.len(), 1);
        let doc = &resp.results[0];
        assert_eq!(doc.uid.as_deref(), Some("como-utilizar-hooks"));
        assert_eq!(
            doc.first_publication_date.unwrap().to_rfc3339(),
            "2021-03-25T19:25:28+00:00"
        );
        assert!(doc.last_publication_date.is_none());
        assert!(resp.next_page.is_some());
    }

    #[test]
    fn test_invalid_timestamp_rejected() {
        let body = json!({
            "id": "x", "type": "post", "first_publication_date": "yesterday"
        });
        assert!(serde_json::from_value::<RawDoc>(body).is_err());
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(plain_text(&json!("Hello")), Some("Hello".to_string()));
        assert_eq!(
            plain_text(&json!([{ "type": "heading1", "text": "Hello" }, { "text": "World" }])),
            Some("Hello World".to_string())
        );
        assert_eq!(plain_text(&json!([{ "type": "image" }])), None);
        assert_eq!(plain_text(&json!(3)), None);
    }

    #[test]
    fn test_path_value() {
        let doc: RawDoc = serde_json::from_value(json!({
            "id": "abc", "uid": "hello", "type": "post",
            "data": { "author": "Ana" }
        }))
        .unwrap();
        assert_eq!(doc.path_value("document.type").as_deref(), Some("post"));
        assert_eq!(doc.path_value("my.post.uid").as_deref(), Some("hello"));
        assert_eq!(doc.path_value("my.post.author").as_deref(), Some("Ana"));
        assert_eq!(doc.path_value("my.page.uid"), None);
    }
}
