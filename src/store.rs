//! The single capability the catalog needs from the outside world: a
//! row-returning executor over the sections table.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{CatalogError, Result};
use crate::models::CourseSectionRow;

/// Substring lookup used by the targeted strategy and by the full-text
/// fallback. All present predicates are combined with `AND`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubstringQuery {
    /// Upper-cased subject prefix matched against the start of the code.
    pub subject_prefix: Option<String>,
    /// Free text matched against the title or the space-free code.
    pub text: Option<String>,
    pub limit: usize,
}

/// Instructor lookup used by the professor resolver. Only rows with a
/// non-null rating are returned, ordered by course code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstructorQuery {
    /// Case-insensitive substring of the instructor name.
    pub name_fragment: String,
    pub subject_prefix: Option<String>,
    /// Compact course code (`COMP202`) restricting the lookup to one course.
    pub course_code: Option<String>,
    pub limit: usize,
}

#[async_trait]
pub trait SectionStore: Send + Sync {
    async fn substring_search(&self, query: &SubstringQuery) -> Result<Vec<CourseSectionRow>>;

    /// Indexed text search over the precomputed search vector. Any error
    /// here is recoverable by the caller.
    async fn full_text_search(&self, text: &str, limit: usize) -> Result<Vec<CourseSectionRow>>;

    async fn instructor_rows(&self, query: &InstructorQuery) -> Result<Vec<CourseSectionRow>>;

    /// Rows for any of the given compact codes that carry a positive rating.
    async fn rated_rows_for_codes(&self, codes: &[String]) -> Result<Vec<CourseSectionRow>>;

    /// Distinct subject prefixes present in the table.
    async fn subjects(&self) -> Result<Vec<String>>;
}

/// Runs a store call under a deadline.
pub async fn with_deadline<T, F>(operation: &'static str, after: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(after, call).await {
        Ok(result) => result,
        Err(_) => Err(CatalogError::Timeout { operation, after }),
    }
}
