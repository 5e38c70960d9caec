//! Collection member lists and prev/next navigation.
//!
//! A collection is an externally maintained, ordered list of file basenames
//! (appended on publish). Navigation never derives order from dates.

use serde::Serialize;
use serde_json::Value;

use crate::content::clean_name;
use crate::error::{ContentError, Result};
use crate::frontmatter::file_stem;
use crate::store::Document;

/// Navigation links for one member of a collection.
///
/// `first` is only set when `prev` is, and `last` only when `next` is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NavLinks {
    pub prev: Option<String>,
    pub next: Option<String>,
    pub first: Option<String>,
    pub last: Option<String>,
}

/// An ordered collection of content ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    /// Normalized collection name (its document id).
    pub name: String,
    members: Vec<String>,
}

impl Collection {
    pub fn new(name: &str) -> Self {
        Collection {
            name: clean_name(name),
            members: Vec::new(),
        }
    }

    pub fn with_members<I, S>(name: &str, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut collection = Collection::new(name);
        for m in members {
            collection.append(m);
        }
        collection
    }

    /// Decode a `{"content": [...]}` document. Non-string members are skipped.
    pub fn from_document(name: &str, doc: &Document) -> Self {
        let members = doc
            .get("content")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|s| file_stem(s).to_string())
                    .collect()
            })
            .unwrap_or_default();
        Collection {
            name: clean_name(name),
            members,
        }
    }

    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert(
            "content".to_string(),
            Value::Array(self.members.iter().cloned().map(Value::String).collect()),
        );
        doc
    }

    /// Append `id` (extension stripped) unless already present.
    pub fn append(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        let id = file_stem(&id).to_string();
        if self.members.contains(&id) {
            return false;
        }
        self.members.push(id);
        true
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Resolve navigation for the member `id`.
    ///
    /// Returns `Ok(None)` for a single-member collection and
    /// [`ContentError::NotInCollection`] when `id` is absent.
    pub fn navigate(&self, id: &str) -> Result<Option<NavLinks>> {
        let id = file_stem(id);
        let index = self
            .members
            .iter()
            .position(|m| m == id)
            .ok_or_else(|| ContentError::NotInCollection {
                collection: self.name.clone(),
                id: id.to_string(),
            })?;

        if self.members.len() == 1 {
            return Ok(None);
        }

        let mut links = NavLinks::default();
        if index > 0 {
            links.prev = Some(self.members[index - 1].clone());
            links.first = self.members.first().cloned();
        }
        if index + 1 < self.members.len() {
            links.next = Some(self.members[index + 1].clone());
            links.last = self.members.last().cloned();
        }
        Ok(Some(links))
    }
}
