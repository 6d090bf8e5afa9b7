use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use crate::error::Result;
use crate::models::CourseSectionRow;
use crate::store::{InstructorQuery, SectionStore, SubstringQuery};
use crate::text::escape_like;

const SECTION_COLUMNS: &str = "course_code, course_title, instructor, class_average, term, \
     rating, difficulty, num_ratings, would_take_again";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Postgres-backed sections table.
#[derive(Clone)]
pub struct PgSectionStore {
    pool: PgPool,
}

impl PgSectionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn section_from_row(row: &PgRow) -> CourseSectionRow {
    CourseSectionRow {
        course_code: row.get("course_code"),
        course_title: row.get("course_title"),
        instructor: row.get("instructor"),
        class_average: row.get("class_average"),
        term: row.get("term"),
        rating: row.get("rating"),
        difficulty: row.get("difficulty"),
        num_ratings: row.get("num_ratings"),
        would_take_again: row.get("would_take_again"),
    }
}

fn select_sections() -> QueryBuilder<'static, Postgres> {
    QueryBuilder::new(format!(
        "SELECT {SECTION_COLUMNS} FROM course_catalog.sections WHERE TRUE"
    ))
}

#[async_trait]
impl SectionStore for PgSectionStore {
    async fn substring_search(&self, query: &SubstringQuery) -> Result<Vec<CourseSectionRow>> {
        let mut builder = select_sections();

        if let Some(prefix) = &query.subject_prefix {
            builder
                .push(" AND course_code ILIKE ")
                .push_bind(format!("{}%", escape_like(prefix)));
        }

        if let Some(text) = &query.text {
            let title_pattern = format!("%{}%", escape_like(text));
            let code_pattern = format!("%{}%", escape_like(&text.replace(' ', "")));
            builder
                .push(" AND (course_title ILIKE ")
                .push_bind(title_pattern)
                .push(" OR REPLACE(course_code, ' ', '') ILIKE ")
                .push_bind(code_pattern)
                .push(")");
        }

        builder
            .push(" ORDER BY course_code LIMIT ")
            .push_bind(query.limit as i64);

        let records = builder.build().fetch_all(&self.pool).await?;
        Ok(records.iter().map(section_from_row).collect())
    }

    async fn full_text_search(&self, text: &str, limit: usize) -> Result<Vec<CourseSectionRow>> {
        let records = sqlx::query(&format!(
            r#"
            SELECT {SECTION_COLUMNS}
            FROM course_catalog.sections
            WHERE search_vector @@ plainto_tsquery('english', $1)
            ORDER BY ts_rank(search_vector, plainto_tsquery('english', $1)) DESC, course_code
            LIMIT $2
            "#
        ))
        .bind(text)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.iter().map(section_from_row).collect())
    }

    async fn instructor_rows(&self, query: &InstructorQuery) -> Result<Vec<CourseSectionRow>> {
        let mut builder = select_sections();
        builder
            .push(" AND rating IS NOT NULL AND instructor ILIKE ")
            .push_bind(format!("%{}%", escape_like(&query.name_fragment)));

        if let Some(prefix) = &query.subject_prefix {
            builder
                .push(" AND course_code ILIKE ")
                .push_bind(format!("{}%", escape_like(prefix)));
        }

        if let Some(code) = &query.course_code {
            builder
                .push(" AND UPPER(REPLACE(course_code, ' ', '')) = ")
                .push_bind(code.clone());
        }

        builder
            .push(" ORDER BY course_code LIMIT ")
            .push_bind(query.limit as i64);

        let records = builder.build().fetch_all(&self.pool).await?;
        Ok(records.iter().map(section_from_row).collect())
    }

    async fn rated_rows_for_codes(&self, codes: &[String]) -> Result<Vec<CourseSectionRow>> {
        let records = sqlx::query(&format!(
            r#"
            SELECT {SECTION_COLUMNS}
            FROM course_catalog.sections
            WHERE UPPER(REPLACE(course_code, ' ', '')) = ANY($1)
              AND rating > 0
            ORDER BY course_code
            "#
        ))
        .bind(codes)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.iter().map(section_from_row).collect())
    }

    async fn subjects(&self) -> Result<Vec<String>> {
        let records = sqlx::query(
            r#"
            SELECT DISTINCT UPPER(SUBSTRING(course_code FROM '^[A-Za-z]{2,4}')) AS subject
            FROM course_catalog.sections
            WHERE course_code ~ '^[A-Za-z]{2,4}\s*[0-9]'
            ORDER BY subject
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records.iter().map(|row| row.get("subject")).collect())
    }
}
