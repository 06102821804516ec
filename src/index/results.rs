//! Search result sets returned by the retrieval index.

use crate::vector_store::{PassageMatch, PassageMetadata};

/// One passage in a result set.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// Passage text.
    pub content: String,
    /// Course and lesson placement.
    pub metadata: PassageMetadata,
    /// Distance to the query (ascending = more similar).
    pub distance: f32,
}

impl From<PassageMatch> for SearchHit {
    fn from(m: PassageMatch) -> Self {
        Self {
            content: m.content,
            metadata: m.metadata,
            distance: m.distance,
        }
    }
}

/// Ordered search hits, or an error explaining why there are none.
///
/// An error result never carries hits; an empty successful result never
/// carries an error.
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    hits: Vec<SearchHit>,
    error: Option<String>,
}

impl SearchResults {
    /// Successful result, possibly empty.
    pub fn from_hits(hits: Vec<SearchHit>) -> Self {
        Self { hits, error: None }
    }

    /// Failed result with no hits.
    pub fn empty(error: impl Into<String>) -> Self {
        Self {
            hits: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn hits(&self) -> &[SearchHit] {
        &self.hits
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }
}

impl From<Vec<PassageMatch>> for SearchResults {
    fn from(matches: Vec<PassageMatch>) -> Self {
        Self::from_hits(matches.into_iter().map(SearchHit::from).collect())
    }
}
