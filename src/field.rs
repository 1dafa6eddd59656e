//! Multi-field search over a document repository.
//!
//! Every source document is indexed three times, once per [`Field`]:
//!
//! - `routes`: the components of its route (`/guides/setup` → `guides setup`)
//! - `tags`: its tags
//! - `content`: title, description, route components and body
//!
//! A query picks its field with a leading sigil, see [`dispatch`].

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod document;
pub mod manager;

pub use document::{SourceDocument, load_documents, route_words};
pub use manager::{FieldIndexConfig, FieldIndexManager, UpdateSummary};

/// One of the three indices kept per repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Routes,
    Tags,
    Content,
}

impl Field {
    /// All fields, in build order.
    pub const ALL: [Field; 3] = [Field::Routes, Field::Tags, Field::Content];

    /// Name of the index file holding this field.
    pub fn file_name(self) -> &'static str {
        match self {
            Field::Routes => "routes.idx",
            Field::Tags => "tags.idx",
            Field::Content => "content.idx",
        }
    }

    /// The text of `doc` indexed under this field.
    pub fn project(self, doc: &SourceDocument) -> String {
        match self {
            Field::Routes => doc.routes_text(),
            Field::Tags => doc.tags_text(),
            Field::Content => doc.content_text(),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Routes => "routes",
            Field::Tags => "tags",
            Field::Content => "content",
        };
        f.write_str(name)
    }
}

/// A query routed to one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldQuery {
    pub field: Field,
    pub text: String,
}

/// Route a raw query to a field.
///
/// - A leading `/` searches routes; every `/` becomes a space.
/// - A leading `#` searches tags; the `#` of each word is dropped.
/// - Anything else searches content unchanged.
///
/// ```
/// use folio::field::{Field, dispatch};
///
/// let query = dispatch("/docs/intro");
/// assert_eq!(query.field, Field::Routes);
/// assert_eq!(query.text, "docs intro");
///
/// let query = dispatch("#golang");
/// assert_eq!(query.field, Field::Tags);
/// assert_eq!(query.text, "golang");
/// ```
pub fn dispatch(query: &str) -> FieldQuery {
    let query = query.trim();

    if query.starts_with('/') {
        FieldQuery {
            field: Field::Routes,
            text: query.replace('/', " ").trim().to_string(),
        }
    } else if query.starts_with('#') {
        let text = query
            .split_whitespace()
            .map(|word| word.trim_start_matches('#'))
            .filter(|word| !word.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        FieldQuery {
            field: Field::Tags,
            text,
        }
    } else {
        FieldQuery {
            field: Field::Content,
            text: query.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_routes() {
        assert_eq!(
            dispatch("/docs/intro"),
            FieldQuery {
                field: Field::Routes,
                text: "docs intro".to_string()
            }
        );
        assert_eq!(dispatch("  /a//b/ ").text, "a  b");
        assert_eq!(dispatch("/").text, "");
    }

    #[test]
    fn test_dispatch_tags() {
        assert_eq!(
            dispatch("#golang"),
            FieldQuery {
                field: Field::Tags,
                text: "golang".to_string()
            }
        );
        assert_eq!(dispatch("#rust #async").text, "rust async");
        assert_eq!(dispatch("#").text, "");
    }

    #[test]
    fn test_dispatch_content() {
        let query = dispatch("how to install");
        assert_eq!(query.field, Field::Content);
        assert_eq!(query.text, "how to install");

        // Sigils only count at the start.
        assert_eq!(dispatch("c# /usr").field, Field::Content);
    }

    #[test]
    fn test_field_names() {
        assert_eq!(Field::Routes.to_string(), "routes");
        assert_eq!(Field::Content.file_name(), "content.idx");
        assert_eq!(serde_json::to_string(&Field::Tags).unwrap(), "\"tags\"");
    }
}
