//! Course assistant: the wired-up question answering service.
//!
//! Owns the retrieval index, the tool registry and the orchestrator, and
//! exposes the operations the CLI needs.

use crate::agent::{Answer, CourseOutlineTool, CourseSearchTool, ResponseOrchestrator, ToolRegistry};
use crate::backend::{create_backend, ModelBackend};
use crate::config::Settings;
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{CoursewiseError, Result};
use crate::index::{CourseChunk, RetrievalIndex};
use crate::vector_store::{CourseRecord, MemoryVectorStore, SqliteVectorStore, VectorStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Course catalog summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseAnalytics {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}

impl CourseAnalytics {
    pub async fn collect(store: &dyn VectorStore) -> Result<Self> {
        Ok(Self {
            total_courses: store.course_count().await?,
            course_titles: store.course_titles().await?,
        })
    }
}

/// A pre-chunked course, as read by `coursewise import`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseImport {
    pub course: CourseRecord,
    #[serde(default)]
    pub chunks: Vec<CourseChunk>,
}

pub struct Assistant {
    index: Arc<RetrievalIndex>,
    tools: ToolRegistry,
    orchestrator: ResponseOrchestrator,
}

impl Assistant {
    /// Build every component from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let store = open_store(settings)?;
        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::from_settings(&settings.embedding)?);
        let backend = create_backend(&settings.backend)?;

        info!(
            "Using {} backend ({}) with {} vector store",
            settings.backend.provider, settings.backend.model, settings.vector_store.provider
        );

        Self::with_components(settings, store, embedder, backend)
    }

    /// Build from explicit components; settings supply the tuning values.
    pub fn with_components(
        settings: &Settings,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        backend: Arc<dyn ModelBackend>,
    ) -> Result<Self> {
        let index = Arc::new(build_index(settings, store, embedder));

        let mut tools = ToolRegistry::new();
        tools.register(CourseSearchTool::new(index.clone()))?;
        tools.register(CourseOutlineTool::new(index.clone()))?;

        let orchestrator = ResponseOrchestrator::from_settings(backend, &settings.backend);

        Ok(Self {
            index,
            tools,
            orchestrator,
        })
    }

    /// Answer a question about the course materials, using tools.
    #[instrument(skip(self, history))]
    pub async fn ask(&self, query: &str, history: Option<&str>) -> Result<Answer> {
        self.orchestrator
            .generate(&course_prompt(query), history, Some(&self.tools))
            .await
    }

    /// Answer without offering any tools.
    #[instrument(skip(self, history))]
    pub async fn ask_without_tools(&self, query: &str, history: Option<&str>) -> Result<Answer> {
        self.orchestrator
            .generate(&course_prompt(query), history, None)
            .await
    }

    pub async fn course_analytics(&self) -> Result<CourseAnalytics> {
        CourseAnalytics::collect(self.index.store()).await
    }

    /// Add a course to the catalog and index its chunks.
    ///
    /// Returns the number of chunks indexed.
    pub async fn add_course(&self, course: &CourseRecord, chunks: &[CourseChunk]) -> Result<usize> {
        import_course(&self.index, course, chunks).await
    }
}

/// Add a course and its chunks to an index.
///
/// Every chunk must belong to `course`.
pub async fn import_course(
    index: &RetrievalIndex,
    course: &CourseRecord,
    chunks: &[CourseChunk],
) -> Result<usize> {
    if let Some(stray) = chunks
        .iter()
        .find(|c| c.metadata.course_title != course.title)
    {
        return Err(CoursewiseError::InvalidInput(format!(
            "Chunk {} belongs to '{}', not '{}'",
            stray.metadata.chunk_index, stray.metadata.course_title, course.title
        )));
    }

    index.add_course(course).await?;
    let indexed = index.add_chunks(chunks).await?;
    info!("Indexed {} chunks for '{}'", indexed, course.title);
    Ok(indexed)
}

/// Open the vector store selected in the settings.
pub fn open_store(settings: &Settings) -> Result<Arc<dyn VectorStore>> {
    match settings.vector_store.provider.as_str() {
        "memory" => Ok(Arc::new(MemoryVectorStore::new())),
        "sqlite" => {
            Ok(Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?))
        }
        other => Err(CoursewiseError::Config(format!(
            "Unknown vector store provider: {}",
            other
        ))),
    }
}

/// Open the retrieval index alone, without a model backend.
pub fn open_index(settings: &Settings) -> Result<Arc<RetrievalIndex>> {
    let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::from_settings(&settings.embedding)?);
    Ok(Arc::new(build_index(settings, open_store(settings)?, embedder)))
}

fn build_index(
    settings: &Settings,
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
) -> RetrievalIndex {
    RetrievalIndex::new(store, embedder)
        .with_max_results(settings.vector_store.max_results)
        .with_query_timeout(Duration::from_secs(settings.vector_store.query_timeout_secs))
}

fn course_prompt(query: &str) -> String {
    format!("Answer this question about course materials: {}", query)
}
