//! SQLite-based vector store implementation.
//!
//! Uses SQLite for storage with cosine distance computed in Rust. Metadata
//! filters are pushed down into the `WHERE` clause so only candidate passages
//! are scored.

use super::{
    cosine_distance, nearest, CatalogMatch, CourseRecord, LessonRecord, MetadataFilter, Passage,
    PassageMatch, PassageMetadata, VectorStore,
};
use crate::error::{CoursewiseError, Result};
use async_trait::async_trait;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS courses (
        title TEXT PRIMARY KEY,
        instructor TEXT,
        link TEXT,
        lessons_json TEXT,
        embedding BLOB NOT NULL
    );

    CREATE TABLE IF NOT EXISTS passages (
        id TEXT PRIMARY KEY,
        course_title TEXT NOT NULL,
        lesson_number INTEGER,
        chunk_index INTEGER NOT NULL,
        content TEXT NOT NULL,
        embedding BLOB NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_passages_course ON passages(course_title);
    CREATE INDEX IF NOT EXISTS idx_passages_lesson ON passages(course_title, lesson_number);
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Open (or create) a store at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| CoursewiseError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn decode_lessons(title: &str, lessons_json: Option<String>) -> Result<Vec<LessonRecord>> {
        match lessons_json {
            None => Ok(Vec::new()),
            Some(json) => serde_json::from_str(&json).map_err(|e| {
                CoursewiseError::VectorStore(format!(
                    "Failed to decode lessons for '{}': {}",
                    title, e
                ))
            }),
        }
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, course, embedding), fields(title = %course.title))]
    async fn upsert_course(&self, course: &CourseRecord, embedding: &[f32]) -> Result<()> {
        let conn = self.lock()?;
        let lessons_json = serde_json::to_string(&course.lessons)?;

        conn.execute(
            r#"
            INSERT OR REPLACE INTO courses (title, instructor, link, lessons_json, embedding)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                course.title,
                course.instructor,
                course.link,
                lessons_json,
                Self::embedding_to_bytes(embedding),
            ],
        )?;

        debug!("Upserted course {}", course.title);
        Ok(())
    }

    #[instrument(skip(self, passages), fields(count = passages.len()))]
    async fn upsert_passages(&self, passages: &[Passage]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for passage in passages {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO passages
                (id, course_title, lesson_number, chunk_index, content, embedding)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    passage.id,
                    passage.metadata.course_title,
                    passage.metadata.lesson_number,
                    passage.metadata.chunk_index,
                    passage.content,
                    Self::embedding_to_bytes(&passage.embedding),
                ],
            )?;
        }

        tx.commit()?;
        info!("Batch upserted {} passages", passages.len());
        Ok(passages.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn query_catalog(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<CatalogMatch>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT title, embedding FROM courses")?;

        let rows = stmt.query_map([], |row| {
            let title: String = row.get(0)?;
            let embedding_bytes: Vec<u8> = row.get(1)?;
            Ok((title, embedding_bytes))
        })?;

        let mut scored = Vec::new();
        for row in rows {
            let (title, bytes) = row?;
            let distance = cosine_distance(query_embedding, &Self::bytes_to_embedding(&bytes));
            scored.push((distance, title));
        }

        Ok(nearest(scored, limit)
            .into_iter()
            .map(|(distance, title)| CatalogMatch { title, distance })
            .collect())
    }

    #[instrument(skip(self, query_embedding))]
    async fn query_content(
        &self,
        query_embedding: &[f32],
        filter: Option<&MetadataFilter>,
        limit: usize,
    ) -> Result<Vec<PassageMatch>> {
        let conn = self.lock()?;

        let (where_clause, values) = match filter {
            Some(f) => {
                let (clause, values) = f.to_sql();
                (format!(" WHERE {}", clause), values)
            }
            None => (String::new(), Vec::new()),
        };

        let mut stmt = conn.prepare(&format!(
            "SELECT course_title, lesson_number, chunk_index, content, embedding FROM passages{}",
            where_clause
        ))?;

        let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
            let embedding_bytes: Vec<u8> = row.get(4)?;
            Ok((
                PassageMetadata {
                    course_title: row.get(0)?,
                    lesson_number: row.get(1)?,
                    chunk_index: row.get(2)?,
                },
                row.get::<_, String>(3)?,
                embedding_bytes,
            ))
        })?;

        let mut scored = Vec::new();
        for row in rows {
            let (metadata, content, bytes) = row?;
            let distance = cosine_distance(query_embedding, &Self::bytes_to_embedding(&bytes));
            scored.push((distance, (metadata, content)));
        }

        let results: Vec<PassageMatch> = nearest(scored, limit)
            .into_iter()
            .map(|(distance, (metadata, content))| PassageMatch {
                content,
                metadata,
                distance,
            })
            .collect();

        debug!("Found {} matching passages", results.len());
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn get_course(&self, title: &str) -> Result<Option<CourseRecord>> {
        let conn = self.lock()?;

        let row = conn
            .query_row(
                "SELECT title, instructor, link, lessons_json FROM courses WHERE title = ?1",
                params![title],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((title, instructor, link, lessons_json)) => {
                let lessons = Self::decode_lessons(&title, lessons_json)?;
                Ok(Some(CourseRecord {
                    title,
                    instructor,
                    link,
                    lessons,
                }))
            }
            None => Ok(None),
        }
    }

    async fn course_titles(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT title FROM courses ORDER BY title")?;
        let titles = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(titles)
    }

    async fn course_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM courses", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    async fn clear(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch("DELETE FROM passages; DELETE FROM courses;")?;
        info!("Cleared vector store");
        Ok(())
    }
}
