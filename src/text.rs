//! String helpers shared by the search router, the aggregator and the
//! professor resolver.

use std::sync::OnceLock;

use regex::Regex;

fn course_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z]{2,4})\s*(\d{2,4}[A-Za-z0-9]{0,2})$").expect("valid course code regex")
    })
}

fn code_shaped_query_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z]{2,4}\s?\d{2,4}$").expect("valid query regex"))
}

fn title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:professor|prof|dr|mrs|mr|ms)\b\.?").expect("valid title regex")
    })
}

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b((?:19|20)\d{2})\b").expect("valid year regex"))
}

/// Splits a catalog code such as `COMP202` or `math 240` into an upper-cased
/// `(subject, catalog)` pair.
pub fn parse_course_code(code: &str) -> Option<(String, String)> {
    let caps = course_code_re().captures(code.trim())?;
    Some((caps[1].to_uppercase(), caps[2].to_uppercase()))
}

/// `COMP202` form, used for keys and store filters.
pub fn compact_code(code: &str) -> Option<String> {
    parse_course_code(code).map(|(subject, catalog)| format!("{subject}{catalog}"))
}

/// `COMP 202` form, used for display and bulk result keys.
pub fn spaced_code(code: &str) -> Option<String> {
    parse_course_code(code).map(|(subject, catalog)| format!("{subject} {catalog}"))
}

pub fn looks_like_course_code(query: &str) -> bool {
    code_shaped_query_re().is_match(query.trim())
}

/// Strips honorifics, collapses whitespace and lower-cases.
pub fn normalize_name(name: &str) -> String {
    let stripped = title_re().replace_all(name, " ");
    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Whitespace tokens of a raw name with surrounding punctuation removed.
pub fn name_tokens(name: &str) -> Vec<&str> {
    name.split_whitespace()
        .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'' && c != '-'))
        .filter(|token| !token.is_empty())
        .collect()
}

/// Splits a canonical instructor name into `(first, last)`. The first name is
/// empty for single-token names.
pub fn split_full_name(name: &str) -> (String, String) {
    let parts: Vec<&str> = name.split_whitespace().collect();
    match parts.as_slice() {
        [] => (String::new(), String::new()),
        [only] => (String::new(), (*only).to_string()),
        [head @ .., last] => (head.join(" "), (*last).to_string()),
    }
}

pub fn term_year(term: &str) -> Option<i32> {
    year_re()
        .captures(term)
        .and_then(|caps| caps[1].parse().ok())
}

/// Escapes `LIKE` wildcards so user text matches literally.
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Gestalt pattern-matching ratio: twice the number of matched characters
/// over the combined length, where matches are found by recursively taking
/// the longest common block and recursing on both sides of it.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matched_chars(&a, &b) as f64 / total as f64
}

fn matched_chars(a: &[char], b: &[char]) -> usize {
    let (i, j, size) = longest_common_block(a, b);
    if size == 0 {
        return 0;
    }
    size + matched_chars(&a[..i], &b[..j]) + matched_chars(&a[i + size..], &b[j + size..])
}

/// Earliest longest common substring as `(start_a, start_b, len)`.
fn longest_common_block(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut prev = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        let mut current = vec![0usize; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            if ca == cb {
                let run = prev[j] + 1;
                current[j + 1] = run;
                if run > best.2 {
                    best = (i + 1 - run, j + 1 - run, run);
                }
            }
        }
        prev = current;
    }
    best
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
