use serde::{Deserialize, Serialize};

/// One offered section as it comes back from the sections table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseSectionRow {
    pub course_code: String,
    pub course_title: String,
    pub instructor: Option<String>,
    pub class_average: Option<f64>,
    pub term: Option<String>,
    pub rating: Option<f64>,
    pub difficulty: Option<f64>,
    pub num_ratings: Option<f64>,
    pub would_take_again: Option<f64>,
}

impl CourseSectionRow {
    /// Instructor name with blank values treated as missing.
    pub fn instructor_name(&self) -> Option<&str> {
        self.instructor
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    pub fn has_positive_rating(&self) -> bool {
        matches!(self.rating, Some(value) if value > 0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingSnapshot {
    pub rating: f64,
    pub difficulty: Option<f64>,
    pub num_ratings: u32,
    pub would_take_again: Option<i32>,
}

impl RatingSnapshot {
    /// Builds a snapshot from a row carrying a rating value.
    pub fn from_row(row: &CourseSectionRow) -> Option<Self> {
        let rating = row.rating?;
        Some(Self {
            rating,
            difficulty: row.difficulty,
            num_ratings: row
                .num_ratings
                .filter(|count| count.is_finite() && *count > 0.0)
                .map(|count| count.round() as u32)
                .unwrap_or(0),
            would_take_again: row
                .would_take_again
                .filter(|pct| pct.is_finite())
                .map(|pct| pct.round() as i32),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedCourse {
    pub code: String,
    pub subject: String,
    pub catalog: String,
    pub title: String,
    pub instructor: Option<String>,
    #[serde(skip)]
    pub averages: Vec<f64>,
    pub average: Option<f64>,
    pub section_count: usize,
    pub rating: Option<RatingSnapshot>,
    pub latest_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseContext {
    pub code: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfessorMatch {
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub rating: f64,
    pub difficulty: Option<f64>,
    pub num_ratings: u32,
    pub would_take_again: Option<i32>,
    /// Similarity against the queried name; absent for course-only lookups.
    pub match_score: Option<f64>,
    pub course: Option<CourseContext>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    Targeted,
    FullText,
    Empty,
}

impl SearchStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchStrategy::Targeted => "targeted",
            SearchStrategy::FullText => "full_text",
            SearchStrategy::Empty => "empty",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub courses: Vec<AggregatedCourse>,
    pub count: usize,
    pub query: Option<String>,
    pub subject: Option<String>,
    pub strategy: SearchStrategy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfessorLookup {
    pub found: bool,
    pub professor: Option<ProfessorMatch>,
    pub match_score: f64,
}

impl ProfessorLookup {
    pub fn not_found() -> Self {
        Self {
            found: false,
            professor: None,
            match_score: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkRatings {
    pub ratings: std::collections::BTreeMap<String, Option<ProfessorMatch>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectList {
    pub subjects: Vec<String>,
    pub count: usize,
}
