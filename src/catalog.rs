//! Entry point used by the HTTP layer and the CLI.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheStats, TtlCache};
use crate::config::CatalogConfig;
use crate::error::Result;
use crate::models::{BulkRatings, ProfessorLookup, SearchResponse, SubjectList};
use crate::professor::ProfessorResolver;
use crate::search::CourseSearch;
use crate::store::{with_deadline, SectionStore};

const SUBJECTS_KEY: &str = "subjects:all";

pub struct Catalog {
    store: Arc<dyn SectionStore>,
    search: CourseSearch,
    professors: ProfessorResolver,
    subjects: TtlCache<SubjectList>,
    query_timeout: Duration,
}

impl Catalog {
    pub fn new(store: Arc<dyn SectionStore>, config: &CatalogConfig) -> Result<Self> {
        config.validate()?;
        let threshold = config.cache_eviction_threshold;

        let search = CourseSearch::new(
            Arc::clone(&store),
            TtlCache::new("search", config.search_ttl(), threshold),
            config.max_limit,
            config.query_timeout(),
        );
        let professors = ProfessorResolver::new(
            Arc::clone(&store),
            TtlCache::new("professor", config.professor_ttl(), threshold),
            TtlCache::new("professor-bulk", config.professor_ttl(), threshold),
            config.thresholds(),
            config.query_timeout(),
        );

        Ok(Self {
            store,
            search,
            professors,
            subjects: TtlCache::new("subjects", config.subjects_ttl(), threshold),
            query_timeout: config.query_timeout(),
        })
    }

    pub async fn search_courses(
        &self,
        query: Option<&str>,
        subject: Option<&str>,
        limit: usize,
    ) -> Result<SearchResponse> {
        self.search.search_courses(query, subject, limit).await
    }

    pub async fn resolve_professor_by_name(
        &self,
        name: &str,
        subject: Option<&str>,
    ) -> Result<ProfessorLookup> {
        self.professors.resolve_by_name(name, subject).await
    }

    pub async fn resolve_professor_for_course(
        &self,
        name: &str,
        course_code: &str,
    ) -> Result<ProfessorLookup> {
        self.professors.resolve_for_course(name, course_code).await
    }

    pub async fn resolve_professors_bulk(&self, course_codes: &[String]) -> Result<BulkRatings> {
        self.professors.resolve_bulk(course_codes).await
    }

    pub async fn list_subjects(&self) -> Result<SubjectList> {
        if let Some(cached) = self.subjects.get(SUBJECTS_KEY) {
            return Ok(cached);
        }

        let mut subjects =
            with_deadline("subject listing", self.query_timeout, self.store.subjects()).await?;
        subjects.sort();
        subjects.dedup();

        let list = SubjectList {
            count: subjects.len(),
            subjects,
        };
        self.subjects.set(SUBJECTS_KEY, list.clone());
        Ok(list)
    }

    pub fn cache_stats(&self) -> Vec<CacheStats> {
        vec![
            self.search.cache().stats(),
            self.professors.cache().stats(),
            self.professors.bulk_cache().stats(),
            self.subjects.stats(),
        ]
    }

    /// Drops every cached result, e.g. after the sections table is reloaded.
    pub fn clear_caches(&self) {
        self.search.cache().clear();
        self.professors.cache().clear();
        self.professors.bulk_cache().clear();
        self.subjects.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::store::testing::{rated, row, MemoryStore};

    fn store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new(vec![
            row("COMP202", "Intro to Software Systems", Some("A. Smith"), Some(78.0)),
            row("COMP202", "Intro to Software Systems", None, Some(82.0)),
            rated(row("COMP250", "Intro to Computer Science", Some("John Smith"), None), 4.2),
            rated(row("MATH240", "Discrete Structures", Some("Jane Smithson"), None), 3.1),
            row("math 133", "Linear Algebra", None, None),
        ]))
    }

    #[tokio::test]
    async fn subjects_are_listed_once_and_cached() {
        let store = store();
        let catalog = Catalog::new(store.clone(), &CatalogConfig::default()).unwrap();

        let first = catalog.list_subjects().await.unwrap();
        let second = catalog.list_subjects().await.unwrap();
        assert_eq!(first.subjects, vec!["COMP", "MATH"]);
        assert_eq!(first.count, 2);
        assert_eq!(first, second);
        assert_eq!(store.subject_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn operations_share_one_store() {
        let store = store();
        let catalog = Catalog::new(store.clone(), &CatalogConfig::default()).unwrap();

        let search = catalog.search_courses(Some("COMP202"), None, 5).await.unwrap();
        assert_eq!(search.courses[0].average, Some(80.0));

        let lookup = catalog.resolve_professor_by_name("Dr. J. Smith", None).await.unwrap();
        assert_eq!(lookup.professor.unwrap().name, "John Smith");

        let bulk = catalog
            .resolve_professors_bulk(&["MATH240".to_string(), "COMP250".to_string()])
            .await
            .unwrap();
        assert_eq!(bulk.ratings["MATH 240"].as_ref().unwrap().name, "Jane Smithson");
        assert_eq!(bulk.ratings["COMP 250"].as_ref().unwrap().name, "John Smith");
        assert_eq!(store.calls(), 3);
    }

    #[tokio::test]
    async fn clearing_caches_forces_refetch() {
        let store = store();
        let catalog = Catalog::new(store.clone(), &CatalogConfig::default()).unwrap();

        catalog.search_courses(None, Some("COMP"), 5).await.unwrap();
        catalog.clear_caches();
        catalog.search_courses(None, Some("COMP"), 5).await.unwrap();
        assert_eq!(store.substring_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cache_stats_cover_every_cache() {
        let catalog = Catalog::new(store(), &CatalogConfig::default()).unwrap();
        catalog.search_courses(None, Some("COMP"), 5).await.unwrap();
        catalog.search_courses(None, Some("COMP"), 5).await.unwrap();

        let stats = catalog.cache_stats();
        let names: Vec<&str> = stats.iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["search", "professor", "professor-bulk", "subjects"]);
        assert_eq!(stats[0].hits, 1);
        assert_eq!(stats[0].misses, 1);
        assert_eq!(stats[0].entries, 1);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = CatalogConfig {
            name_match_threshold: -0.1,
            ..CatalogConfig::default()
        };
        assert!(Catalog::new(store(), &config).is_err());
    }
}
