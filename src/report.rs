use std::fmt::Write;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::models::{AggregatedCourse, BulkRatings, ProfessorLookup, SearchResponse};

fn format_average(average: Option<f64>) -> String {
    average.map_or_else(|| "n/a".to_string(), |value| format!("{value:.2}"))
}

pub fn course_line(course: &AggregatedCourse) -> String {
    let mut line = format!(
        "{} {}: avg {} across {} sections",
        course.code,
        course.title,
        format_average(course.average),
        course.section_count
    );
    if let Some(instructor) = &course.instructor {
        let _ = write!(line, ", taught by {instructor}");
    }
    if let Some(rating) = &course.rating {
        let _ = write!(line, " (rated {:.1} from {} ratings)", rating.rating, rating.num_ratings);
    }
    line
}

pub fn professor_line(lookup: &ProfessorLookup) -> String {
    match &lookup.professor {
        Some(professor) => {
            let mut line = format!(
                "{} rated {:.1} from {} ratings (match {:.2})",
                professor.name, professor.rating, professor.num_ratings, lookup.match_score
            );
            if let Some(difficulty) = professor.difficulty {
                let _ = write!(line, ", difficulty {difficulty:.1}");
            }
            if let Some(pct) = professor.would_take_again {
                let _ = write!(line, ", {pct}% would take again");
            }
            if let Some(course) = &professor.course {
                let _ = write!(line, " [{} {}]", course.code, course.title);
            }
            line
        }
        None => "No matching professor found.".to_string(),
    }
}

pub fn bulk_lines(ratings: &BulkRatings) -> Vec<String> {
    ratings
        .ratings
        .iter()
        .map(|(code, professor)| match professor {
            Some(professor) => format!(
                "{code}: {} ({:.1} from {} ratings)",
                professor.name, professor.rating, professor.num_ratings
            ),
            None => format!("{code}: no rated instructor"),
        })
        .collect()
}

pub fn build_search_report(response: &SearchResponse, generated_at: DateTime<Utc>) -> String {
    let mut output = String::new();
    let label = match (&response.query, &response.subject) {
        (Some(query), Some(subject)) => format!("\"{query}\" in {subject}"),
        (Some(query), None) => format!("\"{query}\""),
        (None, Some(subject)) => subject.clone(),
        (None, None) => "all courses".to_string(),
    };

    let _ = writeln!(output, "# Course Search Report");
    let _ = writeln!(
        output,
        "Generated for {} on {} ({} strategy)",
        label,
        generated_at.format("%Y-%m-%d %H:%M UTC"),
        response.strategy.as_str()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Courses");

    if response.courses.is_empty() {
        let _ = writeln!(output, "No courses matched this search.");
    } else {
        for course in &response.courses {
            let _ = writeln!(output, "- {}", course_line(course));
        }
    }

    let rated: Vec<&AggregatedCourse> = response
        .courses
        .iter()
        .filter(|course| course.rating.is_some())
        .collect();
    let _ = writeln!(output);
    let _ = writeln!(output, "## Rated Instructors");

    if rated.is_empty() {
        let _ = writeln!(output, "No instructor ratings for these courses.");
    } else {
        for course in rated {
            if let (Some(instructor), Some(rating)) = (&course.instructor, &course.rating) {
                let _ = writeln!(
                    output,
                    "- {}: {} ({:.1})",
                    course.code, instructor, rating.rating
                );
            }
        }
    }

    output
}

#[derive(serde::Serialize)]
struct CsvCourse<'a> {
    code: &'a str,
    title: &'a str,
    instructor: Option<&'a str>,
    average: Option<f64>,
    section_count: usize,
    rating: Option<f64>,
    latest_year: Option<i32>,
}

pub fn write_csv(response: &SearchResponse, path: &Path) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for course in &response.courses {
        writer.serialize(CsvCourse {
            code: &course.code,
            title: &course.title,
            instructor: course.instructor.as_deref(),
            average: course.average,
            section_count: course.section_count,
            rating: course.rating.as_ref().map(|rating| rating.rating),
            latest_year: course.latest_year,
        })?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::sorted_courses;
    use crate::models::SearchStrategy;
    use crate::store::testing::{rated, row};
    use chrono::TimeZone;

    fn response() -> SearchResponse {
        let courses = sorted_courses(&[
            rated(row("COMP202", "Intro to Software Systems", Some("A. Smith"), Some(78.0)), 4.2),
            row("MATH240", "Discrete Structures", None, None),
        ]);
        SearchResponse {
            count: courses.len(),
            courses,
            query: None,
            subject: Some("COMP".to_string()),
            strategy: SearchStrategy::Targeted,
        }
    }

    #[test]
    fn report_lists_courses_and_ratings() {
        let generated_at = Utc.with_ymd_and_hms(2026, 2, 2, 9, 30, 0).unwrap();
        let report = build_search_report(&response(), generated_at);

        assert!(report.starts_with("# Course Search Report"));
        assert!(report.contains("Generated for COMP on 2026-02-02 09:30 UTC (targeted strategy)"));
        assert!(report.contains(
            "- COMP 202 Intro to Software Systems: avg 78.00 across 1 sections, taught by A. Smith (rated 4.2 from 12 ratings)"
        ));
        assert!(report.contains("- MATH 240 Discrete Structures: avg n/a across 1 sections"));
        assert!(report.contains("- COMP 202: A. Smith (4.2)"));
    }

    #[test]
    fn empty_report_says_so() {
        let empty = SearchResponse {
            courses: Vec::new(),
            count: 0,
            query: Some("basket weaving".to_string()),
            subject: None,
            strategy: SearchStrategy::FullText,
        };
        let report = build_search_report(&empty, Utc::now());
        assert!(report.contains("No courses matched this search."));
        assert!(report.contains("No instructor ratings for these courses."));
    }

    #[test]
    fn not_found_professor_line() {
        assert_eq!(
            professor_line(&ProfessorLookup::not_found()),
            "No matching professor found."
        );
    }

    #[test]
    fn csv_export_has_one_row_per_course() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("courses.csv");
        write_csv(&response(), &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "code,title,instructor,average,section_count,rating,latest_year"
        );
        assert!(lines[1].starts_with("COMP 202,Intro to Software Systems,A. Smith,78.0,1,4.2,"));
    }
}
