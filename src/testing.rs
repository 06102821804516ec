//! Test doubles shared by unit tests across the crate.

use crate::backend::{ContentItem, ModelBackend, ModelRequest, ModelResponse, ToolInvocation};
use crate::embedding::Embedder;
use crate::error::{CoursewiseError, Result};
use crate::index::{CourseChunk, RetrievalIndex};
use crate::vector_store::{
    CatalogMatch, CourseRecord, LessonRecord, MemoryVectorStore, MetadataFilter, Passage,
    PassageMatch, PassageMetadata, VectorStore,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const KEYWORD_DIMENSIONS: usize = 256;

/// Bag-of-words embedder: texts sharing words land close together.
pub struct KeywordEmbedder;

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self
    }

    fn bucket(word: &str) -> usize {
        // FNV-1a
        let hash = word
            .bytes()
            .fold(0xcbf29ce484222325u64, |h, b| (h ^ u64::from(b)).wrapping_mul(0x100000001b3));
        (hash % KEYWORD_DIMENSIONS as u64) as usize
    }

    fn vectorize(text: &str) -> Vec<f32> {
        let mut v = vec![0.0; KEYWORD_DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            v[Self::bucket(&word.to_lowercase())] += 1.0;
        }
        v
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(Self::vectorize(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::vectorize(t)).collect())
    }
}

/// Embedder whose every call fails.
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(CoursewiseError::Embedding("embedding service unavailable".to_string()))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(CoursewiseError::Embedding("embedding service unavailable".to_string()))
    }
}

/// Embedder that sleeps before answering.
pub struct SlowEmbedder(pub Duration);

#[async_trait]
impl Embedder for SlowEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        tokio::time::sleep(self.0).await;
        Ok(KeywordEmbedder::vectorize(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        tokio::time::sleep(self.0).await;
        Ok(texts.iter().map(|t| KeywordEmbedder::vectorize(t)).collect())
    }
}

/// Memory store that records content queries and can be told to fail them.
pub struct RecordingStore {
    inner: MemoryVectorStore,
    filters: Mutex<Vec<Option<MetadataFilter>>>,
    limits: Mutex<Vec<usize>>,
    content_failure: Mutex<Option<String>>,
    course_lookup: Mutex<CourseLookup>,
}

/// How [`RecordingStore::get_course`] behaves.
#[derive(Clone)]
pub enum CourseLookup {
    Normal,
    Missing,
    Fail(String),
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryVectorStore::new(),
            filters: Mutex::new(Vec::new()),
            limits: Mutex::new(Vec::new()),
            content_failure: Mutex::new(None),
            course_lookup: Mutex::new(CourseLookup::Normal),
        }
    }

    pub fn set_course_lookup(&self, lookup: CourseLookup) {
        *self.course_lookup.lock().unwrap() = lookup;
    }

    pub fn fail_content_queries(&self, message: &str) {
        *self.content_failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn content_filters(&self) -> Vec<Option<MetadataFilter>> {
        self.filters.lock().unwrap().clone()
    }

    pub fn content_limits(&self) -> Vec<usize> {
        self.limits.lock().unwrap().clone()
    }
}

#[async_trait]
impl VectorStore for RecordingStore {
    async fn upsert_course(&self, course: &CourseRecord, embedding: &[f32]) -> Result<()> {
        self.inner.upsert_course(course, embedding).await
    }

    async fn upsert_passages(&self, passages: &[Passage]) -> Result<usize> {
        self.inner.upsert_passages(passages).await
    }

    async fn query_catalog(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<CatalogMatch>> {
        self.inner.query_catalog(query_embedding, limit).await
    }

    async fn query_content(
        &self,
        query_embedding: &[f32],
        filter: Option<&MetadataFilter>,
        limit: usize,
    ) -> Result<Vec<PassageMatch>> {
        self.filters.lock().unwrap().push(filter.cloned());
        self.limits.lock().unwrap().push(limit);
        let failure = self.content_failure.lock().unwrap().clone();
        if let Some(message) = failure {
            return Err(CoursewiseError::VectorStore(message));
        }
        self.inner.query_content(query_embedding, filter, limit).await
    }

    async fn get_course(&self, title: &str) -> Result<Option<CourseRecord>> {
        let lookup = self.course_lookup.lock().unwrap().clone();
        match lookup {
            CourseLookup::Normal => self.inner.get_course(title).await,
            CourseLookup::Missing => Ok(None),
            CourseLookup::Fail(message) => Err(CoursewiseError::VectorStore(message)),
        }
    }

    async fn course_titles(&self) -> Result<Vec<String>> {
        self.inner.course_titles().await
    }

    async fn course_count(&self) -> Result<usize> {
        self.inner.course_count().await
    }

    async fn clear(&self) -> Result<()> {
        self.inner.clear().await
    }
}

/// Three-lesson course with course and lesson 1 links; lesson 2 has no link.
pub fn rag_course() -> CourseRecord {
    CourseRecord {
        title: "Introduction to RAG".to_string(),
        instructor: Some("AI Expert".to_string()),
        link: Some("https://example.com/rag-course".to_string()),
        lessons: vec![
            LessonRecord {
                number: 1,
                title: "What is Retrieval".to_string(),
                link: Some("https://example.com/rag-course/lesson-1".to_string()),
            },
            LessonRecord {
                number: 2,
                title: "Embeddings and Vector Search".to_string(),
                link: None,
            },
            LessonRecord {
                number: 3,
                title: "Putting It Together".to_string(),
                link: None,
            },
        ],
    }
}

/// Course with no links at all.
pub fn mcp_course() -> CourseRecord {
    CourseRecord {
        title: "MCP: Build Rich-Context AI Apps".to_string(),
        instructor: Some("Elie Schoppik".to_string()),
        link: None,
        lessons: vec![LessonRecord {
            number: 0,
            title: "Introduction".to_string(),
            link: None,
        }],
    }
}

fn chunk(course: &str, lesson: Option<u32>, index: u32, content: &str) -> CourseChunk {
    CourseChunk {
        content: content.to_string(),
        metadata: PassageMetadata {
            course_title: course.to_string(),
            lesson_number: lesson,
            chunk_index: index,
        },
    }
}

/// Index over a recording store seeded with both fixture courses.
pub async fn seeded_index() -> (RetrievalIndex, Arc<RecordingStore>) {
    let store = Arc::new(RecordingStore::new());
    let index = RetrievalIndex::new(store.clone(), Arc::new(KeywordEmbedder::new()));

    let rag = rag_course();
    let mcp = mcp_course();
    index.add_course(&rag).await.unwrap();
    index.add_course(&mcp).await.unwrap();
    index
        .add_chunks(&[
            chunk(&rag.title, Some(1), 0, "Retrieval finds relevant documents for a query."),
            chunk(&rag.title, Some(2), 1, "Embeddings map text into vectors for similarity search."),
            chunk(&rag.title, Some(3), 2, "Generation grounds answers in retrieved passages."),
            chunk(&mcp.title, Some(0), 0, "MCP servers expose tools and resources to clients."),
        ])
        .await
        .unwrap();

    (index, store)
}

/// Model backend that replays canned responses and records every request.
pub struct ScriptedBackend {
    responses: Mutex<VecDeque<Result<ModelResponse>>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedBackend {
    pub fn new(responses: Vec<ModelResponse>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    pub fn with_results(responses: Vec<Result<ModelResponse>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CoursewiseError::Backend("script exhausted".to_string())))
    }
}

/// Response holding a single text item.
pub fn text_response(text: &str) -> ModelResponse {
    ModelResponse {
        content: vec![ContentItem::text(text)],
    }
}

/// Response requesting one tool invocation.
pub fn tool_response(id: &str, name: &str, input: Value) -> ModelResponse {
    ModelResponse {
        content: vec![ContentItem::ToolInvocation(ToolInvocation {
            id: id.to_string(),
            name: name.to_string(),
            input,
        })],
    }
}
