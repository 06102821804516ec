//! Retrieval index over the course catalog and passage content.
//!
//! Wraps a [`VectorStore`] and an [`Embedder`] with the operations the tools
//! need: fuzzy course-name resolution, filtered passage search, and link
//! lookups for citations. Query failures never escape [`RetrievalIndex::search`];
//! they come back as [`SearchResults`] carrying an error message.

mod results;

pub use results::{SearchHit, SearchResults};

use crate::embedding::Embedder;
use crate::error::{CoursewiseError, Result};
use crate::vector_store::{
    CourseRecord, MetadataFilter, Passage, PassageMatch, PassageMetadata, VectorStore,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Default number of passages returned by a search.
pub const DEFAULT_MAX_RESULTS: usize = 5;

const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// A passage chunk waiting to be embedded and indexed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseChunk {
    pub content: String,
    #[serde(flatten)]
    pub metadata: PassageMetadata,
}

/// Two-tier retrieval index: catalog for course lookup, content for passages.
pub struct RetrievalIndex {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    max_results: usize,
    query_timeout: Duration,
}

impl RetrievalIndex {
    /// Create an index over the given store and embedder.
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            max_results: DEFAULT_MAX_RESULTS,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Set the default search limit.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Set the timeout applied to each embed-and-query step.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn store(&self) -> &dyn VectorStore {
        self.store.as_ref()
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Resolve a partial course name to its canonical title.
    ///
    /// Takes the single nearest catalog entry with no similarity floor, so any
    /// non-empty catalog resolves every input. Returns `None` when the catalog
    /// is empty or the lookup fails.
    #[instrument(skip(self))]
    pub async fn resolve_course_name(&self, partial: &str) -> Option<String> {
        let lookup = self
            .bounded(async {
                let embedding = self.embedder.embed(partial).await?;
                self.store.query_catalog(&embedding, 1).await
            })
            .await;

        match lookup {
            Ok(matches) => matches.into_iter().next().map(|m| {
                debug!(
                    "Resolved '{}' to '{}' (distance {:.3})",
                    partial, m.title, m.distance
                );
                m.title
            }),
            Err(e) => {
                warn!("Course name resolution failed for '{}': {}", partial, e);
                None
            }
        }
    }

    /// Search passage content, optionally restricted to a course and lesson.
    ///
    /// The course filter is resolved to a canonical title first; if it cannot
    /// be resolved the content collection is not queried at all.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
        limit: Option<usize>,
    ) -> SearchResults {
        let course_title = match course_name {
            Some(name) => match self.resolve_course_name(name).await {
                Some(title) => Some(title),
                None => return SearchResults::empty(format!("No course found matching '{}'", name)),
            },
            None => None,
        };

        let filter = MetadataFilter::compose(course_title.as_deref(), lesson_number);
        let limit = limit.unwrap_or(self.max_results);

        match self.query_content(query, filter.as_ref(), limit).await {
            Ok(matches) => {
                debug!("Search returned {} passages", matches.len());
                SearchResults::from(matches)
            }
            Err(e) => {
                warn!("Search failed: {}", e);
                SearchResults::empty(format!("Search error: {}", e))
            }
        }
    }

    async fn query_content(
        &self,
        query: &str,
        filter: Option<&MetadataFilter>,
        limit: usize,
    ) -> Result<Vec<PassageMatch>> {
        if let Some(f) = filter {
            debug!("Content filter: {}", f);
        }
        self.bounded(async {
            let embedding = self.embedder.embed(query).await?;
            self.store.query_content(&embedding, filter, limit).await
        })
        .await
    }

    /// Catalog record for an exact canonical title.
    pub async fn get_course(&self, title: &str) -> Result<Option<CourseRecord>> {
        self.bounded(self.store.get_course(title)).await
    }

    /// Link for a lesson, if the course and lesson exist and have one.
    pub async fn get_lesson_link(&self, course_title: &str, lesson_number: u32) -> Option<String> {
        self.lookup_course(course_title)
            .await?
            .lesson(lesson_number)
            .and_then(|l| l.link.clone())
    }

    /// Link for a course, if it exists and has one.
    pub async fn get_course_link(&self, course_title: &str) -> Option<String> {
        self.lookup_course(course_title).await?.link
    }

    async fn lookup_course(&self, title: &str) -> Option<CourseRecord> {
        match self.get_course(title).await {
            Ok(course) => course,
            Err(e) => {
                debug!("Link lookup for '{}' failed: {}", title, e);
                None
            }
        }
    }

    /// Add or replace a course's catalog entry, embedded on its title.
    #[instrument(skip(self, course), fields(title = %course.title))]
    pub async fn add_course(&self, course: &CourseRecord) -> Result<()> {
        let embedding = self.embedder.embed(&course.title).await?;
        self.store.upsert_course(course, &embedding).await?;
        info!("Added course '{}' with {} lessons", course.title, course.lessons.len());
        Ok(())
    }

    /// Embed and index passage chunks.
    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    pub async fn add_chunks(&self, chunks: &[CourseChunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(CoursewiseError::Embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let passages: Vec<Passage> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                Passage::new(chunk.content.clone(), chunk.metadata.clone(), embedding)
            })
            .collect();

        self.store.upsert_passages(&passages).await
    }

    /// All canonical course titles.
    pub async fn course_titles(&self) -> Result<Vec<String>> {
        self.store.course_titles().await
    }

    /// Number of courses in the catalog.
    pub async fn course_count(&self) -> Result<usize> {
        self.store.course_count().await
    }

    /// Remove every course and passage.
    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await?;
        info!("Cleared course catalog and content");
        Ok(())
    }

    async fn bounded<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.query_timeout, fut)
            .await
            .map_err(|_| {
                CoursewiseError::VectorStore(format!(
                    "query timed out after {:?}",
                    self.query_timeout
                ))
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        rag_course, seeded_index, FailingEmbedder, KeywordEmbedder, RecordingStore, SlowEmbedder,
    };
    use crate::vector_store::{Condition, MemoryVectorStore};
    use serde_json::json;

    #[tokio::test]
    async fn test_resolve_partial_name_to_canonical_title() {
        let (index, _) = seeded_index().await;
        assert_eq!(
            index.resolve_course_name("RAG").await.as_deref(),
            Some("Introduction to RAG")
        );
    }

    #[tokio::test]
    async fn test_resolve_exact_title_is_idempotent() {
        let (index, _) = seeded_index().await;
        for title in index.course_titles().await.unwrap() {
            assert_eq!(index.resolve_course_name(&title).await, Some(title.clone()));
        }
    }

    #[tokio::test]
    async fn test_resolve_against_empty_catalog() {
        let index = RetrievalIndex::new(
            Arc::new(MemoryVectorStore::new()),
            Arc::new(KeywordEmbedder::new()),
        );
        assert_eq!(index.resolve_course_name("anything").await, None);
    }

    #[tokio::test]
    async fn test_resolve_accepts_unrelated_nearest_entry() {
        let (index, _) = seeded_index().await;
        // No overlap with any title, yet the nearest entry is still accepted
        assert!(index.resolve_course_name("zebra husbandry").await.is_some());
    }

    #[tokio::test]
    async fn test_search_filters_on_resolved_title() {
        let (index, store) = seeded_index().await;

        let results = index.search("x", Some("RAG"), None, None).await;
        assert!(results.error().is_none());

        let filters = store.content_filters();
        assert_eq!(filters.len(), 1);
        assert_eq!(
            filters[0],
            Some(MetadataFilter::Eq(Condition::CourseTitle(
                "Introduction to RAG".to_string()
            )))
        );
        assert!(results
            .hits()
            .iter()
            .all(|h| h.metadata.course_title == "Introduction to RAG"));
    }

    #[tokio::test]
    async fn test_search_filter_composition() {
        let (index, store) = seeded_index().await;

        index.search("retrieval", None, None, None).await;
        index.search("retrieval", None, Some(2), None).await;
        index.search("retrieval", Some("RAG"), Some(2), None).await;

        let filters: Vec<_> = store
            .content_filters()
            .into_iter()
            .map(|f| f.map(|f| f.to_json()))
            .collect();
        assert_eq!(filters[0], None);
        assert_eq!(filters[1], Some(json!({"lesson_number": 2})));
        assert_eq!(
            filters[2],
            Some(json!({"$and": [{"course_title": "Introduction to RAG"}, {"lesson_number": 2}]}))
        );
    }

    #[tokio::test]
    async fn test_unresolved_course_short_circuits() {
        let store = Arc::new(RecordingStore::new());
        let index = RetrievalIndex::new(store.clone(), Arc::new(KeywordEmbedder::new()));

        let results = index.search("x", Some("Nonexistent"), None, None).await;
        assert!(results.is_empty());
        assert_eq!(results.error(), Some("No course found matching 'Nonexistent'"));
        assert!(store.content_filters().is_empty());
    }

    #[tokio::test]
    async fn test_search_failure_becomes_error_result() {
        let (index, store) = seeded_index().await;
        store.fail_content_queries("DB Error");

        let results = index.search("test", None, None, None).await;
        assert!(results.is_empty());
        let error = results.error().unwrap();
        assert!(error.starts_with("Search error: "));
        assert!(error.contains("DB Error"));
    }

    #[tokio::test]
    async fn test_embedder_failure_becomes_error_result() {
        let store = Arc::new(RecordingStore::new());
        let index = RetrievalIndex::new(store, Arc::new(FailingEmbedder));

        let results = index.search("test", None, None, None).await;
        assert!(results.error().unwrap().starts_with("Search error: "));
    }

    #[tokio::test]
    async fn test_search_limit_default_and_override() {
        let (index, store) = seeded_index().await;
        let index = index.with_max_results(4);

        index.search("x", None, None, None).await;
        index.search("x", None, None, Some(3)).await;
        assert_eq!(store.content_limits(), vec![4, 3]);
    }

    #[tokio::test]
    async fn test_empty_successful_search_has_no_error() {
        let (index, _) = seeded_index().await;
        let results = index.search("x", Some("RAG"), Some(99), None).await;
        assert!(results.is_empty());
        assert!(results.error().is_none());
    }

    #[tokio::test]
    async fn test_slow_query_times_out() {
        let store = Arc::new(RecordingStore::new());
        let index = RetrievalIndex::new(store, Arc::new(SlowEmbedder(Duration::from_secs(5))))
            .with_query_timeout(Duration::from_millis(20));

        let results = index.search("x", None, None, None).await;
        assert!(results.error().unwrap().contains("timed out"));
        assert_eq!(index.resolve_course_name("x").await, None);
    }

    #[tokio::test]
    async fn test_link_lookups() {
        let (index, _) = seeded_index().await;
        let course = rag_course();

        assert_eq!(
            index.get_course_link(&course.title).await,
            course.link.clone()
        );
        assert_eq!(
            index.get_lesson_link(&course.title, 1).await,
            course.lesson(1).and_then(|l| l.link.clone())
        );
        assert_eq!(index.get_lesson_link(&course.title, 3).await, None);
        assert_eq!(index.get_lesson_link("Unknown", 1).await, None);
        assert_eq!(index.get_course_link("Unknown").await, None);
    }

    #[tokio::test]
    async fn test_add_chunks_embeds_and_indexes() {
        let store = Arc::new(MemoryVectorStore::new());
        let index = RetrievalIndex::new(store.clone(), Arc::new(KeywordEmbedder::new()));

        let chunks: Vec<CourseChunk> = serde_json::from_value(json!([
            {"content": "vector databases", "course_title": "A", "lesson_number": 1, "chunk_index": 0},
            {"content": "prompt design", "course_title": "A", "lesson_number": null, "chunk_index": 1}
        ]))
        .unwrap();

        assert_eq!(index.add_chunks(&chunks).await.unwrap(), 2);
        assert_eq!(index.add_chunks(&[]).await.unwrap(), 0);

        let results = index.search("vector databases", None, None, Some(1)).await;
        assert_eq!(results.hits()[0].content, "vector databases");
    }

    #[tokio::test]
    async fn test_clear_drops_catalog_and_content() {
        let (index, _) = seeded_index().await;
        assert!(index.course_count().await.unwrap() > 0);

        index.clear().await.unwrap();
        assert_eq!(index.course_count().await.unwrap(), 0);
        assert_eq!(index.resolve_course_name("RAG").await, None);
        assert!(index.search("retrieval", None, None, None).await.is_empty());
    }
}
