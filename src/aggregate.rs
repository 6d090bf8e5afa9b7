use std::cmp::Ordering;
use std::collections::HashMap;

use crate::models::{AggregatedCourse, CourseSectionRow, RatingSnapshot};
use crate::text::{parse_course_code, round2, term_year};

/// Folds per-section rows into one entry per course, keyed by the compact
/// course code (`COMP202`). Rows whose code does not parse are dropped.
pub fn aggregate(rows: &[CourseSectionRow]) -> HashMap<String, AggregatedCourse> {
    let mut courses: HashMap<String, AggregatedCourse> = HashMap::new();

    for row in rows {
        let Some((subject, catalog)) = parse_course_code(&row.course_code) else {
            continue;
        };
        let key = format!("{subject}{catalog}");

        let course = courses.entry(key).or_insert_with(|| AggregatedCourse {
            code: format!("{subject} {catalog}"),
            subject,
            catalog,
            title: row.course_title.trim().to_string(),
            instructor: None,
            averages: Vec::new(),
            average: None,
            section_count: 0,
            rating: None,
            latest_year: None,
        });

        course.section_count += 1;
        if let Some(average) = row.class_average {
            course.averages.push(average);
        }
        if course.instructor.is_none() {
            course.instructor = row.instructor_name().map(str::to_string);
        }
        // First rated row wins; later rows never replace it.
        if course.rating.is_none() && row.has_positive_rating() {
            course.rating = RatingSnapshot::from_row(row);
        }
        if let Some(year) = row.term.as_deref().and_then(term_year) {
            course.latest_year = Some(course.latest_year.map_or(year, |seen| seen.max(year)));
        }
    }

    for course in courses.values_mut() {
        course.average = mean(&course.averages).map(round2);
    }

    courses
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Orders courses by subject, then catalog number, numerically where the
/// catalog numbers differ in width.
pub fn compare_courses(a: &AggregatedCourse, b: &AggregatedCourse) -> Ordering {
    a.subject
        .cmp(&b.subject)
        .then_with(|| catalog_number(&a.catalog).cmp(&catalog_number(&b.catalog)))
        .then_with(|| a.catalog.cmp(&b.catalog))
}

fn catalog_number(catalog: &str) -> u32 {
    catalog
        .chars()
        .take_while(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .unwrap_or(0)
}

/// Aggregates and returns courses sorted for display.
pub fn sorted_courses(rows: &[CourseSectionRow]) -> Vec<AggregatedCourse> {
    let mut courses: Vec<AggregatedCourse> = aggregate(rows).into_values().collect();
    courses.sort_by(compare_courses);
    courses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::{rated, row};

    #[test]
    fn averages_ignore_missing_values_but_count_sections() {
        let rows = vec![
            row("COMP202", "Intro to Software Systems", None, Some(78.5)),
            row("COMP202", "Intro to Software Systems", None, Some(82.0)),
            row("COMP202", "Intro to Software Systems", None, None),
            row("COMP202", "Intro to Software Systems", None, Some(90.25)),
        ];

        let courses = aggregate(&rows);
        let course = &courses["COMP202"];
        assert_eq!(course.average, Some(83.58));
        assert_eq!(course.section_count, 4);
        assert_eq!(course.averages.len(), 3);
    }

    #[test]
    fn backfills_missing_instructor() {
        let rows = vec![
            row("COMP202", "Intro to Software Systems", Some("A. Smith"), Some(78.0)),
            row("COMP202", "Intro to Software Systems", None, Some(82.0)),
        ];

        let courses = sorted_courses(&rows);
        assert_eq!(courses.len(), 1);
        let course = &courses[0];
        assert_eq!(course.code, "COMP 202");
        assert_eq!(course.average, Some(80.0));
        assert_eq!(course.section_count, 2);
        assert_eq!(course.instructor.as_deref(), Some("A. Smith"));

        let reversed: Vec<_> = rows.iter().rev().cloned().collect();
        let courses = sorted_courses(&reversed);
        assert_eq!(courses[0].instructor.as_deref(), Some("A. Smith"));
    }

    #[test]
    fn blank_instructor_counts_as_missing() {
        let rows = vec![
            row("MATH240", "Discrete Structures", Some("  "), None),
            row("MATH240", "Discrete Structures", Some("B. Jones"), None),
        ];
        let courses = aggregate(&rows);
        assert_eq!(courses["MATH240"].instructor.as_deref(), Some("B. Jones"));
        assert_eq!(courses["MATH240"].average, None);
    }

    #[test]
    fn first_positive_rating_wins() {
        let mut zero = row("COMP250", "Intro to Computer Science", Some("C. Lee"), None);
        zero.rating = Some(0.0);
        let rows = vec![
            zero,
            rated(row("COMP250", "Intro to Computer Science", Some("D. Kim"), None), 3.1),
            rated(row("COMP250", "Intro to Computer Science", Some("E. Ng"), None), 4.9),
        ];

        let courses = aggregate(&rows);
        let snapshot = courses["COMP250"].rating.as_ref().expect("rating captured");
        assert_eq!(snapshot.rating, 3.1);
        assert_eq!(snapshot.num_ratings, 12);
        assert_eq!(snapshot.would_take_again, Some(82));
    }

    #[test]
    fn malformed_codes_are_dropped() {
        let rows = vec![
            row("???", "Broken", None, Some(50.0)),
            row("", "Empty", None, Some(60.0)),
            row("COMP202", "Intro to Software Systems", None, Some(70.0)),
        ];
        let courses = aggregate(&rows);
        assert_eq!(courses.len(), 1);
        assert!(courses.contains_key("COMP202"));
    }

    #[test]
    fn spaced_and_compact_codes_merge() {
        let rows = vec![
            row("COMP 202", "Intro to Software Systems", None, Some(70.0)),
            row("comp202", "Intro to Software Systems", None, Some(80.0)),
        ];
        let courses = aggregate(&rows);
        assert_eq!(courses.len(), 1);
        assert_eq!(courses["COMP202"].section_count, 2);
        assert_eq!(courses["COMP202"].average, Some(75.0));
    }

    #[test]
    fn duplicate_rows_each_count_as_a_section() {
        let section = row("COMP202", "Intro to Software Systems", None, Some(70.0));
        let courses = aggregate(&[section.clone(), section]);
        assert_eq!(courses["COMP202"].section_count, 2);
    }

    #[test]
    fn sorts_by_subject_then_catalog() {
        let rows = vec![
            row("MATH240", "Discrete Structures", None, None),
            row("COMP202", "Intro to Software Systems", None, None),
            row("COMP102", "Computers and Computing", None, None),
            row("COMP99", "Legacy", None, None),
        ];
        let codes: Vec<String> = sorted_courses(&rows).into_iter().map(|c| c.code).collect();
        assert_eq!(codes, vec!["COMP 99", "COMP 102", "COMP 202", "MATH 240"]);
    }

    #[test]
    fn aggregation_is_repeatable_and_order_independent_for_statistics() {
        let rows = vec![
            row("COMP202", "Intro to Software Systems", Some("A. Smith"), Some(78.0)),
            row("MATH240", "Discrete Structures", None, Some(65.5)),
            row("COMP202", "Intro to Software Systems", None, Some(81.0)),
        ];
        assert_eq!(aggregate(&rows), aggregate(&rows));

        let shuffled = vec![rows[2].clone(), rows[1].clone(), rows[0].clone()];
        let a = aggregate(&rows);
        let b = aggregate(&shuffled);
        for key in ["COMP202", "MATH240"] {
            assert_eq!(a[key].average, b[key].average);
            assert_eq!(a[key].section_count, b[key].section_count);
        }
    }

    #[test]
    fn tracks_latest_term_year() {
        let mut fall = row("COMP202", "Intro to Software Systems", None, None);
        fall.term = Some("Fall 2021".to_string());
        let mut winter = row("COMP202", "Intro to Software Systems", None, None);
        winter.term = Some("Winter 2023".to_string());
        let courses = aggregate(&[winter, fall]);
        assert_eq!(courses["COMP202"].latest_year, Some(2023));
    }
}
