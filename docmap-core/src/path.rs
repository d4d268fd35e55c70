//! Addresses of collections and documents in a hierarchical store.
//!
//! A path is a list of segments alternating between collection names and document ids.
//! Collection paths have an odd number of segments, document paths an even number.

use std::fmt;

use crate::error::{DocMapError, DocMapResult};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath {
    segments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath {
    segments: Vec<String>,
}

impl CollectionPath {
    /// Path of a top-level collection.
    pub fn root(name: impl Into<String>) -> Self {
        Self { segments: vec![name.into()] }
    }

    /// Parses `posts/hello-world/comments` (a leading `/` is accepted).
    pub fn parse(path: &str) -> DocMapResult<Self> {
        let segments = split(path);
        if segments.len() % 2 == 1 {
            Ok(Self { segments })
        } else {
            Err(DocMapError::Configuration(format!("{path} is not a collection path")))
        }
    }

    /// The collection's own name (last segment).
    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    pub fn doc(&self, id: impl Into<String>) -> DocumentPath {
        let mut segments = self.segments.clone();
        segments.push(id.into());
        DocumentPath { segments }
    }

    /// The document this collection is nested under, `None` for root collections.
    pub fn parent(&self) -> Option<DocumentPath> {
        (self.segments.len() > 1).then(|| DocumentPath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl DocumentPath {
    pub fn parse(path: &str) -> DocMapResult<Self> {
        let segments = split(path);
        if !segments.is_empty() && segments.len() % 2 == 0 {
            Ok(Self { segments })
        } else {
            Err(DocMapError::Configuration(format!("{path} is not a document path")))
        }
    }

    pub fn id(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    pub fn collection(&self, name: impl Into<String>) -> CollectionPath {
        let mut segments = self.segments.clone();
        segments.push(name.into());
        CollectionPath { segments }
    }

    pub fn parent(&self) -> CollectionPath {
        CollectionPath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

fn split(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}
