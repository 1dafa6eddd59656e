//! Source documents and their field projections.

use std::io::BufRead;

use serde::{Deserialize, Serialize};

use crate::error::{FolioError, Result};

/// A page of the repository as handed to the indexer.
///
/// Deserializes from one JSON object per document; only `route` is required.
///
/// ```
/// use folio::field::SourceDocument;
///
/// let doc: SourceDocument = serde_json::from_str(
///     r#"{"route": "/guides/setup/", "title": "Setup", "tags": ["install"]}"#,
/// ).unwrap();
/// assert_eq!(doc.id(), "/guides/setup");
/// assert_eq!(doc.routes_text(), "guides setup");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub route: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub body: String,
}

impl SourceDocument {
    pub fn new<S: Into<String>>(route: S) -> Self {
        SourceDocument {
            route: route.into(),
            ..Default::default()
        }
    }

    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_body<S: Into<String>>(mut self, body: S) -> Self {
        self.body = body.into();
        self
    }

    /// Document id: the route with a leading `/` and no trailing `/`.
    pub fn id(&self) -> String {
        let trimmed = self.route.trim().trim_matches('/');
        format!("/{trimmed}")
    }

    /// Value returned with search hits: the title, or the id when untitled.
    pub fn stored_value(&self) -> String {
        let title = self.title.trim();
        if title.is_empty() { self.id() } else { title.to_string() }
    }

    pub fn routes_text(&self) -> String {
        route_words(&self.route)
    }

    pub fn tags_text(&self) -> String {
        self.tags.join(" ")
    }

    pub fn content_text(&self) -> String {
        let route = route_words(&self.route);
        [
            self.title.as_str(),
            self.description.as_str(),
            route.as_str(),
            self.body.as_str(),
        ]
        .join("\n")
    }
}

/// The components of a route separated by spaces.
pub fn route_words(route: &str) -> String {
    route
        .split('/')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Read documents from JSON lines, skipping blank lines.
pub fn load_documents<R: BufRead>(reader: R) -> Result<Vec<SourceDocument>> {
    let mut documents = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let document = serde_json::from_str(&line).map_err(|e| {
            FolioError::invalid_argument(format!("document on line {}: {e}", number + 1))
        })?;
        documents.push(document);
    }
    Ok(documents)
}
