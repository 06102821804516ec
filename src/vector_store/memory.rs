//! In-memory vector store implementation.
//!
//! Useful for testing and small catalogs.

use super::{
    cosine_distance, nearest, CatalogMatch, CourseRecord, MetadataFilter, Passage, PassageMatch,
    VectorStore,
};
use crate::error::{CoursewiseError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

struct CatalogEntry {
    course: CourseRecord,
    embedding: Vec<f32>,
}

#[derive(Default)]
struct Collections {
    catalog: BTreeMap<String, CatalogEntry>,
    content: BTreeMap<String, Passage>,
}

/// In-memory vector store.
#[derive(Default)]
pub struct MemoryVectorStore {
    inner: RwLock<Collections>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>> {
        self.inner
            .read()
            .map_err(|e| CoursewiseError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>> {
        self.inner
            .write()
            .map_err(|e| CoursewiseError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert_course(&self, course: &CourseRecord, embedding: &[f32]) -> Result<()> {
        self.write()?.catalog.insert(
            course.title.clone(),
            CatalogEntry {
                course: course.clone(),
                embedding: embedding.to_vec(),
            },
        );
        Ok(())
    }

    async fn upsert_passages(&self, passages: &[Passage]) -> Result<usize> {
        let mut inner = self.write()?;
        for passage in passages {
            inner.content.insert(passage.id.clone(), passage.clone());
        }
        Ok(passages.len())
    }

    async fn query_catalog(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<CatalogMatch>> {
        let inner = self.read()?;
        let scored = inner
            .catalog
            .values()
            .map(|entry| {
                (
                    cosine_distance(query_embedding, &entry.embedding),
                    entry.course.title.clone(),
                )
            })
            .collect();

        Ok(nearest(scored, limit)
            .into_iter()
            .map(|(distance, title)| CatalogMatch { title, distance })
            .collect())
    }

    async fn query_content(
        &self,
        query_embedding: &[f32],
        filter: Option<&MetadataFilter>,
        limit: usize,
    ) -> Result<Vec<PassageMatch>> {
        let inner = self.read()?;
        let scored = inner
            .content
            .values()
            .filter(|p| filter.map_or(true, |f| f.matches(&p.metadata)))
            .map(|p| (cosine_distance(query_embedding, &p.embedding), p))
            .collect();

        Ok(nearest(scored, limit)
            .into_iter()
            .map(|(distance, p)| PassageMatch {
                content: p.content.clone(),
                metadata: p.metadata.clone(),
                distance,
            })
            .collect())
    }

    async fn get_course(&self, title: &str) -> Result<Option<CourseRecord>> {
        Ok(self.read()?.catalog.get(title).map(|e| e.course.clone()))
    }

    async fn course_titles(&self) -> Result<Vec<String>> {
        Ok(self.read()?.catalog.keys().cloned().collect())
    }

    async fn course_count(&self) -> Result<usize> {
        Ok(self.read()?.catalog.len())
    }

    async fn clear(&self) -> Result<()> {
        let mut inner = self.write()?;
        inner.catalog.clear();
        inner.content.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::PassageMetadata;

    fn passage(course: &str, lesson: Option<u32>, index: u32, embedding: Vec<f32>) -> Passage {
        Passage::new(
            format!("{} chunk {}", course, index),
            PassageMetadata {
                course_title: course.to_string(),
                lesson_number: lesson,
                chunk_index: index,
            },
            embedding,
        )
    }

    fn course(title: &str) -> CourseRecord {
        CourseRecord {
            title: title.to_string(),
            instructor: None,
            link: None,
            lessons: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_catalog_query_returns_nearest_first() {
        let store = MemoryVectorStore::new();
        store.upsert_course(&course("A"), &[1.0, 0.0]).await.unwrap();
        store.upsert_course(&course("B"), &[0.0, 1.0]).await.unwrap();

        let matches = store.query_catalog(&[0.1, 0.9], 1).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].title, "B");

        assert_eq!(store.course_count().await.unwrap(), 2);
        assert_eq!(store.course_titles().await.unwrap(), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_equal_distances_order_by_key() {
        let store = MemoryVectorStore::new();
        for title in ["Gamma", "Alpha", "Beta"] {
            store.upsert_course(&course(title), &[1.0, 0.0]).await.unwrap();
        }
        store
            .upsert_passages(&[
                passage("B", None, 0, vec![1.0, 0.0]),
                passage("A", None, 1, vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let matches = store.query_catalog(&[1.0, 0.0], 3).await.unwrap();
        let titles: Vec<_> = matches.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "Beta", "Gamma"]);

        let hits = store.query_content(&[1.0, 0.0], None, 1).await.unwrap();
        assert_eq!(hits[0].metadata.course_title, "A");
    }

    #[tokio::test]
    async fn test_content_query_applies_filter() {
        let store = MemoryVectorStore::new();
        store
            .upsert_passages(&[
                passage("A", Some(1), 0, vec![1.0, 0.0]),
                passage("A", Some(2), 1, vec![1.0, 0.1]),
                passage("B", Some(1), 0, vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let all = store.query_content(&[1.0, 0.0], None, 10).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all[0].distance <= all[2].distance);

        let filter = MetadataFilter::compose(Some("A"), Some(2)).unwrap();
        let filtered = store
            .query_content(&[1.0, 0.0], Some(&filter), 10)
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].metadata.chunk_index, 1);
    }

    #[tokio::test]
    async fn test_clear_empties_both_collections() {
        let store = MemoryVectorStore::new();
        store.upsert_course(&course("A"), &[1.0]).await.unwrap();
        store
            .upsert_passages(&[passage("A", None, 0, vec![1.0])])
            .await
            .unwrap();

        store.clear().await.unwrap();
        assert_eq!(store.course_count().await.unwrap(), 0);
        assert!(store.query_content(&[1.0], None, 5).await.unwrap().is_empty());
        assert!(store.query_catalog(&[1.0], 1).await.unwrap().is_empty());
    }
}
