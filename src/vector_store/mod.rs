//! Vector store abstraction for Coursewise.
//!
//! A store holds two logical collections: the course catalog (one entry per
//! course, embedded on its title) and the content collection (one entry per
//! passage chunk). Both are queried by nearest-neighbor distance.

mod filter;
mod memory;
mod sqlite;

pub use filter::{Condition, MetadataFilter};
pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A lesson within a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonRecord {
    /// Lesson number as it appears in the course.
    #[serde(rename = "lesson_number")]
    pub number: u32,
    /// Lesson title.
    #[serde(rename = "lesson_title")]
    pub title: String,
    /// Link to the lesson, if published.
    #[serde(rename = "lesson_link", default)]
    pub link: Option<String>,
}

/// Catalog metadata for one course. `title` is the canonical key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub title: String,
    #[serde(default)]
    pub instructor: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub lessons: Vec<LessonRecord>,
}

impl CourseRecord {
    /// Find a lesson by number.
    pub fn lesson(&self, number: u32) -> Option<&LessonRecord> {
        self.lessons.iter().find(|l| l.number == number)
    }
}

/// Metadata attached to each indexed passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassageMetadata {
    /// Canonical title of the course the passage came from.
    pub course_title: String,
    /// Lesson the passage belongs to, if any.
    pub lesson_number: Option<u32>,
    /// Position of the chunk within its course.
    pub chunk_index: u32,
}

/// A passage chunk stored in the content collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    /// Unique passage ID.
    pub id: String,
    /// Text content of this chunk.
    pub content: String,
    /// Course and lesson placement.
    pub metadata: PassageMetadata,
    /// Embedding vector.
    pub embedding: Vec<f32>,
}

impl Passage {
    /// Create a passage with an ID derived from its course and chunk index.
    pub fn new(content: String, metadata: PassageMetadata, embedding: Vec<f32>) -> Self {
        let id = format!(
            "{}_{}",
            metadata.course_title.replace(' ', "_"),
            metadata.chunk_index
        );
        Self {
            id,
            content,
            metadata,
            embedding,
        }
    }
}

/// A passage matched by a content query.
#[derive(Debug, Clone)]
pub struct PassageMatch {
    pub content: String,
    pub metadata: PassageMetadata,
    /// Cosine distance to the query (lower is closer).
    pub distance: f32,
}

/// A catalog entry matched by a catalog query.
#[derive(Debug, Clone)]
pub struct CatalogMatch {
    /// Canonical course title.
    pub title: String,
    /// Cosine distance to the query (lower is closer).
    pub distance: f32,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace a catalog entry, keyed by the course title.
    async fn upsert_course(&self, course: &CourseRecord, embedding: &[f32]) -> Result<()>;

    /// Insert or replace passages in the content collection.
    async fn upsert_passages(&self, passages: &[Passage]) -> Result<usize>;

    /// Nearest catalog entries to the query embedding, closest first.
    async fn query_catalog(&self, query_embedding: &[f32], limit: usize)
        -> Result<Vec<CatalogMatch>>;

    /// Nearest passages to the query embedding that satisfy `filter`, closest first.
    async fn query_content(
        &self,
        query_embedding: &[f32],
        filter: Option<&MetadataFilter>,
        limit: usize,
    ) -> Result<Vec<PassageMatch>>;

    /// Catalog record for an exact canonical title.
    async fn get_course(&self, title: &str) -> Result<Option<CourseRecord>>;

    /// All canonical course titles, sorted.
    async fn course_titles(&self) -> Result<Vec<String>>;

    /// Number of catalog entries.
    async fn course_count(&self) -> Result<usize>;

    /// Remove everything from both collections.
    async fn clear(&self) -> Result<()>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Cosine distance, in `0.0..=2.0`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

/// Sort ascending by distance and keep the first `limit`.
pub(crate) fn nearest<T>(mut items: Vec<(f32, T)>, limit: usize) -> Vec<(f32, T)> {
    items.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    items.truncate(limit);
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_distance() {
        let a = vec![1.0, 0.0, 0.0];
        assert!(cosine_distance(&a, &a).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_distance(&a, &c) - 1.0).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_distance(&a, &d) - 2.0).abs() < 0.001);
    }

    #[test]
    fn test_nearest_orders_ascending() {
        let ranked = nearest(vec![(0.9, "far"), (0.1, "near"), (0.5, "mid")], 2);
        let labels: Vec<_> = ranked.iter().map(|(_, l)| *l).collect();
        assert_eq!(labels, vec!["near", "mid"]);
    }

    #[test]
    fn test_course_record_lessons_json_shape() {
        let json = r#"{
            "title": "Introduction to RAG",
            "instructor": "AI Expert",
            "lessons": [{"lesson_number": 1, "lesson_title": "Basics", "lesson_link": "https://x/1"}]
        }"#;
        let course: CourseRecord = serde_json::from_str(json).unwrap();
        assert_eq!(course.link, None);
        assert_eq!(course.lesson(1).unwrap().title, "Basics");
        assert!(course.lesson(2).is_none());
    }

    #[test]
    fn test_passage_id_from_course_and_chunk() {
        let passage = Passage::new(
            "text".to_string(),
            PassageMetadata {
                course_title: "Intro to RAG".to_string(),
                lesson_number: Some(1),
                chunk_index: 4,
            },
            vec![],
        );
        assert_eq!(passage.id, "Intro_to_RAG_4");
    }
}
