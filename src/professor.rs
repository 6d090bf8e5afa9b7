//! Resolves human-typed professor names to instructor rows.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::cache::TtlCache;
use crate::error::{CatalogError, Result};
use crate::models::{
    BulkRatings, CourseContext, CourseSectionRow, ProfessorLookup, ProfessorMatch, RatingSnapshot,
};
use crate::store::{with_deadline, InstructorQuery, SectionStore};
use crate::text::{compact_code, name_tokens, normalize_name, parse_course_code, similarity, split_full_name};

pub const DEFAULT_NAME_MATCH_THRESHOLD: f64 = 0.60;
pub const DEFAULT_COURSE_MATCH_THRESHOLD: f64 = 0.65;
pub const INSTRUCTOR_ROW_CAP: usize = 200;
pub const MAX_BULK_CODES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchThresholds {
    /// Bare name lookups.
    pub by_name: f64,
    /// Lookups scoped to a single course.
    pub by_course: f64,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            by_name: DEFAULT_NAME_MATCH_THRESHOLD,
            by_course: DEFAULT_COURSE_MATCH_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Scope {
    subject_prefix: Option<String>,
    course_code: Option<String>,
}

pub struct ProfessorResolver {
    store: Arc<dyn SectionStore>,
    cache: TtlCache<ProfessorLookup>,
    bulk_cache: TtlCache<BulkRatings>,
    thresholds: MatchThresholds,
    query_timeout: Duration,
}

impl ProfessorResolver {
    pub fn new(
        store: Arc<dyn SectionStore>,
        cache: TtlCache<ProfessorLookup>,
        bulk_cache: TtlCache<BulkRatings>,
        thresholds: MatchThresholds,
        query_timeout: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            bulk_cache,
            thresholds,
            query_timeout,
        }
    }

    pub fn cache(&self) -> &TtlCache<ProfessorLookup> {
        &self.cache
    }

    pub fn bulk_cache(&self) -> &TtlCache<BulkRatings> {
        &self.bulk_cache
    }

    pub async fn resolve_by_name(&self, name: &str, subject: Option<&str>) -> Result<ProfessorLookup> {
        let subject = subject
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_uppercase);
        let key = format!(
            "professor:{}",
            serde_json::json!([collapse_lower(name), subject])
        );
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let scope = Scope {
            subject_prefix: subject,
            course_code: None,
        };
        let lookup = self.resolve(name, &scope, self.thresholds.by_name).await?;
        self.cache.set(key, lookup.clone());
        Ok(lookup)
    }

    /// Resolves a name among the instructors of one course; a match carries
    /// the course as context.
    pub async fn resolve_for_course(&self, name: &str, course_code: &str) -> Result<ProfessorLookup> {
        let code = compact_code(course_code)
            .ok_or_else(|| CatalogError::InvalidInput(format!("malformed course code '{course_code}'")))?;
        let key = format!(
            "professor-course:{}",
            serde_json::json!([collapse_lower(name), code])
        );
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let scope = Scope {
            subject_prefix: None,
            course_code: Some(code),
        };
        let lookup = self.resolve(name, &scope, self.thresholds.by_course).await?;
        self.cache.set(key, lookup.clone());
        Ok(lookup)
    }

    async fn resolve(&self, name: &str, scope: &Scope, threshold: f64) -> Result<ProfessorLookup> {
        let normalized = normalize_name(name);
        // Honorific tokens are never search fragments.
        let tokens: Vec<&str> = name_tokens(name)
            .into_iter()
            .filter(|token| !normalize_name(token).is_empty())
            .collect();
        let (Some(first), Some(last)) = (tokens.first(), tokens.last()) else {
            return Ok(ProfessorLookup::not_found());
        };
        if normalized.is_empty() {
            return Ok(ProfessorLookup::not_found());
        }

        let mut fragments = vec![*last];
        if tokens.len() > 1 && !first.eq_ignore_ascii_case(last) {
            fragments.push(*first);
        }

        for fragment in fragments {
            let rows = with_deadline(
                "instructor lookup",
                self.query_timeout,
                self.store.instructor_rows(&InstructorQuery {
                    name_fragment: fragment.to_string(),
                    subject_prefix: scope.subject_prefix.clone(),
                    course_code: scope.course_code.clone(),
                    limit: INSTRUCTOR_ROW_CAP,
                }),
            )
            .await?;

            let Some((row, score)) = best_match(&normalized, &rows) else {
                continue;
            };
            debug!(name, fragment, score, candidates = rows.len(), "best instructor candidate");
            if score < threshold {
                continue;
            }

            let course = scope.course_code.as_ref().map(|_| course_context(row));
            if let Some(professor) = professor_from_row(row, Some(score), course) {
                return Ok(ProfessorLookup {
                    found: true,
                    professor: Some(professor),
                    match_score: score,
                });
            }
        }

        Ok(ProfessorLookup::not_found())
    }

    /// Best-rated instructor per course, fetched in a single round trip.
    pub async fn resolve_bulk(&self, course_codes: &[String]) -> Result<BulkRatings> {
        let mut wanted: BTreeMap<String, String> = BTreeMap::new();
        let mut unparsed: BTreeSet<String> = BTreeSet::new();
        for code in course_codes {
            match parse_course_code(code) {
                Some((subject, catalog)) => {
                    wanted.insert(format!("{subject}{catalog}"), format!("{subject} {catalog}"));
                }
                None => {
                    let trimmed = code.trim().to_uppercase();
                    if !trimmed.is_empty() {
                        unparsed.insert(trimmed);
                    }
                }
            }
        }

        if wanted.len() + unparsed.len() > MAX_BULK_CODES {
            return Err(CatalogError::InvalidInput(format!(
                "at most {MAX_BULK_CODES} course codes per request"
            )));
        }

        let mut ratings: BTreeMap<String, Option<ProfessorMatch>> =
            unparsed.iter().map(|code| (code.clone(), None)).collect();
        if wanted.is_empty() {
            return Ok(BulkRatings { ratings });
        }

        let key = format!(
            "bulk:{}",
            serde_json::json!([wanted.keys().collect::<Vec<_>>(), unparsed])
        );
        if let Some(cached) = self.bulk_cache.get(&key) {
            return Ok(cached);
        }

        let codes: Vec<String> = wanted.keys().cloned().collect();
        let rows = with_deadline(
            "bulk rating lookup",
            self.query_timeout,
            self.store.rated_rows_for_codes(&codes),
        )
        .await?;

        let mut best: HashMap<String, &CourseSectionRow> = HashMap::new();
        for row in rows.iter().filter(|row| row.has_positive_rating()) {
            let Some(code) = compact_code(&row.course_code) else {
                continue;
            };
            if row.instructor_name().is_none() {
                continue;
            }
            let replace = best
                .get(&code)
                .map_or(true, |current| row.rating > current.rating);
            if replace {
                best.insert(code, row);
            }
        }

        for (code, spaced) in &wanted {
            let professor = best
                .get(code)
                .and_then(|row| professor_from_row(row, None, Some(course_context(row))));
            ratings.insert(spaced.clone(), professor);
        }

        let result = BulkRatings { ratings };
        self.bulk_cache.set(key, result.clone());
        Ok(result)
    }
}

fn collapse_lower(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Highest-scoring rated row; ties keep the earlier row.
fn best_match<'a>(normalized: &str, rows: &'a [CourseSectionRow]) -> Option<(&'a CourseSectionRow, f64)> {
    let mut best: Option<(&CourseSectionRow, f64)> = None;
    for row in rows.iter().filter(|row| row.rating.is_some()) {
        let Some(instructor) = row.instructor_name() else {
            continue;
        };
        let score = similarity(normalized, &normalize_name(instructor));
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((row, score));
        }
    }
    best
}

fn course_context(row: &CourseSectionRow) -> CourseContext {
    CourseContext {
        code: crate::text::spaced_code(&row.course_code).unwrap_or_else(|| row.course_code.clone()),
        title: row.course_title.clone(),
    }
}

fn professor_from_row(
    row: &CourseSectionRow,
    match_score: Option<f64>,
    course: Option<CourseContext>,
) -> Option<ProfessorMatch> {
    let name = row.instructor_name()?.to_string();
    let snapshot = RatingSnapshot::from_row(row)?;
    let (first_name, last_name) = split_full_name(&name);
    Some(ProfessorMatch {
        name,
        first_name,
        last_name,
        rating: snapshot.rating,
        difficulty: snapshot.difficulty,
        num_ratings: snapshot.num_ratings,
        would_take_again: snapshot.would_take_again,
        match_score,
        course,
    })
}
