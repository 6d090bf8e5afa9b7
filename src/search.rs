use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::aggregate::sorted_courses;
use crate::cache::TtlCache;
use crate::error::Result;
use crate::models::{CourseSectionRow, SearchResponse, SearchStrategy};
use crate::store::{with_deadline, SectionStore, SubstringQuery};
use crate::text::looks_like_course_code;

/// Rows fetched per requested course; many sections fold into one course.
pub const ROW_MULTIPLIER: usize = 20;
pub const TARGETED_ROW_CAP: usize = 1000;
pub const FULL_TEXT_ROW_CAP: usize = 2000;

/// Normalized search inputs and the strategy they select.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPlan {
    pub query: Option<String>,
    pub subject: Option<String>,
    pub limit: usize,
    pub strategy: SearchStrategy,
}

impl SearchPlan {
    pub fn new(query: Option<&str>, subject: Option<&str>, limit: usize, max_limit: usize) -> Self {
        let query = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string);
        let subject = subject
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_uppercase);
        let limit = limit.clamp(1, max_limit.max(1));

        let strategy = if subject.is_some() || query.as_deref().is_some_and(looks_like_course_code) {
            SearchStrategy::Targeted
        } else if query.is_some() {
            SearchStrategy::FullText
        } else {
            SearchStrategy::Empty
        };

        Self {
            query,
            subject,
            limit,
            strategy,
        }
    }

    /// Strategy-qualified key; the inputs are JSON-encoded so separators in
    /// user text cannot make two requests share a slot.
    pub fn cache_key(&self) -> String {
        let parts = serde_json::json!([
            self.query.as_deref().map(str::to_lowercase),
            self.subject,
            self.limit,
        ]);
        format!("search:{}:{parts}", self.strategy.as_str())
    }

    fn substring_query(&self) -> SubstringQuery {
        SubstringQuery {
            subject_prefix: self.subject.clone(),
            text: self.query.clone(),
            limit: self.limit.saturating_mul(ROW_MULTIPLIER).min(TARGETED_ROW_CAP),
        }
    }

    fn full_text_limit(&self) -> usize {
        self.limit.saturating_mul(ROW_MULTIPLIER).min(FULL_TEXT_ROW_CAP)
    }
}

/// Course search in front of the sections table.
pub struct CourseSearch {
    store: Arc<dyn SectionStore>,
    cache: TtlCache<SearchResponse>,
    max_limit: usize,
    query_timeout: Duration,
}

impl CourseSearch {
    pub fn new(
        store: Arc<dyn SectionStore>,
        cache: TtlCache<SearchResponse>,
        max_limit: usize,
        query_timeout: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            max_limit,
            query_timeout,
        }
    }

    pub fn cache(&self) -> &TtlCache<SearchResponse> {
        &self.cache
    }

    pub async fn search_courses(
        &self,
        query: Option<&str>,
        subject: Option<&str>,
        limit: usize,
    ) -> Result<SearchResponse> {
        let plan = SearchPlan::new(query, subject, limit, self.max_limit);
        let key = plan.cache_key();
        if let Some(mut cached) = self.cache.get(&key) {
            // The key folds query case; echo this request's spelling.
            cached.query = plan.query.clone();
            return Ok(cached);
        }

        let rows = self.fetch_rows(&plan).await?;
        debug!(
            strategy = plan.strategy.as_str(),
            rows = rows.len(),
            "fetched section rows"
        );

        let mut courses = sorted_courses(&rows);
        courses.truncate(plan.limit);

        let response = SearchResponse {
            count: courses.len(),
            courses,
            query: plan.query.clone(),
            subject: plan.subject.clone(),
            strategy: plan.strategy,
        };

        if plan.strategy != SearchStrategy::Empty {
            self.cache.set(key, response.clone());
        }
        Ok(response)
    }

    async fn fetch_rows(&self, plan: &SearchPlan) -> Result<Vec<CourseSectionRow>> {
        match plan.strategy {
            SearchStrategy::Empty => Ok(Vec::new()),
            SearchStrategy::Targeted => {
                let query = plan.substring_query();
                with_deadline(
                    "targeted search",
                    self.query_timeout,
                    self.store.substring_search(&query),
                )
                .await
            }
            SearchStrategy::FullText => {
                let text = plan.query.as_deref().unwrap_or_default();
                let full_text = with_deadline(
                    "full-text search",
                    self.query_timeout,
                    self.store.full_text_search(text, plan.full_text_limit()),
                )
                .await;

                match full_text {
                    Ok(rows) => Ok(rows),
                    Err(err) => {
                        warn!(error = %err, query = text, "full-text search failed, falling back to substring match");
                        let query = plan.substring_query();
                        with_deadline(
                            "substring fallback search",
                            self.query_timeout,
                            self.store.substring_search(&query),
                        )
                        .await
                    }
                }
            }
        }
    }
}
