// grades.rs

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::data::RouteGradeRecord;

/// Labels are only ever compared in this form.
pub fn normalize(label: &str) -> String {
    label.trim().to_lowercase()
}

/// Grade selection for one region. `All` disables filtering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum GradeFilter {
    #[default]
    All,
    Grade(String),
}

impl GradeFilter {
    pub fn parse(raw: &str) -> Self {
        let grade = normalize(raw);
        if grade == "all" {
            GradeFilter::All
        } else {
            GradeFilter::Grade(grade)
        }
    }

    /// `grade` must already be normalized.
    pub fn matches(&self, grade: &str) -> bool {
        match self {
            GradeFilter::All => true,
            GradeFilter::Grade(selected) => selected == grade,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            GradeFilter::All => "all",
            GradeFilter::Grade(grade) => grade,
        }
    }

    /// Steps through `all`, then each available grade, then back to `all`.
    pub fn cycle(&self, grades: &[String], forward: bool) -> GradeFilter {
        let position = match self {
            GradeFilter::All => None,
            GradeFilter::Grade(grade) => grades.iter().position(|g| g == grade),
        };
        let slots = grades.len() + 1;
        // slot 0 is `all`, slot i is grades[i - 1]
        let current = position.map_or(0, |index| index + 1);
        let next = if forward {
            (current + 1) % slots
        } else {
            (current + slots - 1) % slots
        };
        match next {
            0 => GradeFilter::All,
            slot => GradeFilter::Grade(grades[slot - 1].clone()),
        }
    }
}

impl fmt::Display for GradeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Summed route counts keyed by normalized country name.
pub type RouteCounts = BTreeMap<String, u64>;

pub fn aggregate(records: &[RouteGradeRecord], filter: &GradeFilter) -> RouteCounts {
    let mut counts = RouteCounts::new();
    for record in records.iter().filter(|r| filter.matches(&r.grade)) {
        *counts.entry(normalize(&record.country)).or_insert(0) += record.route_count;
    }
    counts
}

/// Upper bound of the color domain; never below 1.
pub fn max_count(counts: &RouteCounts) -> u64 {
    counts.values().copied().max().unwrap_or(0).max(1)
}

/// Distinct normalized grades in sorted order, for the grade selector.
pub fn available_grades(records: &[RouteGradeRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.grade.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(country: &str, grade: &str, route_count: u64) -> RouteGradeRecord {
        RouteGradeRecord {
            country: country.to_string(),
            grade: normalize(grade),
            route_count,
        }
    }

    fn europe() -> Vec<RouteGradeRecord> {
        vec![
            record("Spain", "6a", 10),
            record(" spain", "6A ", 5),
            record("Spain", "7a", 3),
            record("FRANCE", "6a", 4),
            record("France ", "8a", 2),
            record("Italy", "7a", 0),
        ]
    }

    #[test]
    fn all_sums_every_row_per_country() {
        let counts = aggregate(&europe(), &GradeFilter::All);
        assert_eq!(counts.len(), 3);
        assert_eq!(counts["spain"], 18);
        assert_eq!(counts["france"], 6);
        assert_eq!(counts["italy"], 0);
    }

    #[test]
    fn grade_filter_is_case_and_whitespace_insensitive() {
        let counts = aggregate(&europe(), &GradeFilter::parse(" 6A"));
        assert_eq!(counts["spain"], 15);
        assert_eq!(counts["france"], 4);
        assert!(!counts.contains_key("italy"));
    }

    #[test]
    fn unmatched_grade_yields_empty_map() {
        let counts = aggregate(&europe(), &GradeFilter::parse("9c"));
        assert!(counts.is_empty());
        assert_eq!(max_count(&counts), 1);
    }

    #[test]
    fn all_sentinel_parses_in_any_case() {
        assert_eq!(GradeFilter::parse(" ALL "), GradeFilter::All);
        assert_eq!(GradeFilter::parse("6b+"), GradeFilter::Grade("6b+".into()));
    }

    #[test]
    fn max_count_tracks_largest_country() {
        let counts = aggregate(&europe(), &GradeFilter::All);
        assert_eq!(max_count(&counts), 18);
    }

    #[test]
    fn available_grades_are_sorted_and_distinct() {
        assert_eq!(available_grades(&europe()), vec!["6a", "7a", "8a"]);
    }

    #[test]
    fn cycle_wraps_through_all() {
        let grades = available_grades(&europe());
        let mut filter = GradeFilter::All;
        let mut seen = Vec::new();
        for _ in 0..4 {
            filter = filter.cycle(&grades, true);
            seen.push(filter.label().to_string());
        }
        assert_eq!(seen, vec!["6a", "7a", "8a", "all"]);
        assert_eq!(GradeFilter::All.cycle(&grades, false).label(), "8a");
    }

    #[test]
    fn cycle_from_unlisted_grade_restarts() {
        let grades = available_grades(&europe());
        let stale = GradeFilter::Grade("5c".into());
        assert_eq!(stale.cycle(&grades, true).label(), "6a");
    }
}
