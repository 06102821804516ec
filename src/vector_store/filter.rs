//! Metadata filters for content queries.

use super::PassageMetadata;
use rusqlite::types::Value as SqlValue;
use serde_json::json;

/// An equality clause on one passage metadata field.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    CourseTitle(String),
    LessonNumber(u32),
}

impl Condition {
    fn field(&self) -> &'static str {
        match self {
            Condition::CourseTitle(_) => "course_title",
            Condition::LessonNumber(_) => "lesson_number",
        }
    }

    fn matches(&self, metadata: &PassageMetadata) -> bool {
        match self {
            Condition::CourseTitle(title) => metadata.course_title == *title,
            Condition::LessonNumber(n) => metadata.lesson_number == Some(*n),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            Condition::CourseTitle(title) => json!({ self.field(): title }),
            Condition::LessonNumber(n) => json!({ self.field(): n }),
        }
    }

    fn sql_value(&self) -> SqlValue {
        match self {
            Condition::CourseTitle(title) => SqlValue::Text(title.clone()),
            Condition::LessonNumber(n) => SqlValue::Integer(i64::from(*n)),
        }
    }
}

/// Filter applied to a content query.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataFilter {
    /// A single equality clause.
    Eq(Condition),
    /// Logical AND of equality clauses.
    And(Vec<Condition>),
}

impl MetadataFilter {
    /// Compose a filter from an optional canonical course title and lesson number.
    ///
    /// No inputs gives no filter, one gives a single clause, both give an AND
    /// of the two clauses.
    pub fn compose(course_title: Option<&str>, lesson_number: Option<u32>) -> Option<Self> {
        match (course_title, lesson_number) {
            (None, None) => None,
            (Some(title), None) => Some(Self::Eq(Condition::CourseTitle(title.to_string()))),
            (None, Some(n)) => Some(Self::Eq(Condition::LessonNumber(n))),
            (Some(title), Some(n)) => Some(Self::And(vec![
                Condition::CourseTitle(title.to_string()),
                Condition::LessonNumber(n),
            ])),
        }
    }

    /// The clauses of this filter, in order.
    pub fn conditions(&self) -> &[Condition] {
        match self {
            MetadataFilter::Eq(c) => std::slice::from_ref(c),
            MetadataFilter::And(cs) => cs,
        }
    }

    /// Whether a passage satisfies every clause.
    pub fn matches(&self, metadata: &PassageMetadata) -> bool {
        self.conditions().iter().all(|c| c.matches(metadata))
    }

    /// Render as `{"field": value}` or `{"$and": [...]}`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            MetadataFilter::Eq(c) => c.to_json(),
            MetadataFilter::And(cs) => {
                json!({ "$and": cs.iter().map(Condition::to_json).collect::<Vec<_>>() })
            }
        }
    }

    /// Render as a SQL boolean expression with positional parameters.
    pub(crate) fn to_sql(&self) -> (String, Vec<SqlValue>) {
        let conditions = self.conditions();
        let clause = conditions
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{} = ?{}", c.field(), i + 1))
            .collect::<Vec<_>>()
            .join(" AND ");
        let values = conditions.iter().map(Condition::sql_value).collect();
        (clause, values)
    }
}

impl std::fmt::Display for MetadataFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}
