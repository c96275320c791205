//! Artist filtering
//!
//! [`FilterCriteria`] turns into a fixed sequence of [`Predicate`]s: member
//! count, creation year, first album year, then text. Each one narrows the
//! previous result and the listing order is kept. All predicates are pure, so
//! the order changes only the work done, never the result.
//!
//! Text matching is case-insensitive against the artist name and every member
//! name. [`TextMatchMode::Contains`] (the default) matches anywhere in the
//! string, and [`TextMatchMode::StartsWith`] only at the start.

use serde::{Deserialize, Serialize};

use crate::config::TextMatchMode;
use crate::models::CompositeRecord;

/// Optional predicates narrowing a snapshot; absent fields do not filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Exact number of members
    pub member_count: Option<usize>,
    /// Creation year ceiling (inclusive)
    pub created_on_or_before: Option<i32>,
    /// First album year ceiling (inclusive)
    pub first_album_on_or_before: Option<i32>,
    /// Case-insensitive search over the name and member names
    pub text: Option<String>,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        self.predicates(TextMatchMode::default()).is_empty()
    }

    /// Predicates in evaluation order: members, creation year, album year, text
    pub fn predicates(&self, text_mode: TextMatchMode) -> Vec<Predicate> {
        let mut predicates = Vec::new();

        if let Some(count) = self.member_count {
            predicates.push(Predicate::MemberCount(count));
        }
        if let Some(year) = self.created_on_or_before {
            predicates.push(Predicate::CreatedOnOrBefore(year));
        }
        if let Some(year) = self.first_album_on_or_before {
            predicates.push(Predicate::FirstAlbumOnOrBefore(year));
        }
        if let Some(text) = self.text.as_deref().filter(|t| !t.is_empty()) {
            predicates.push(Predicate::Text {
                needle: text.to_lowercase(),
                mode: text_mode,
            });
        }

        predicates
    }
}

/// A single pure test against one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    MemberCount(usize),
    CreatedOnOrBefore(i32),
    FirstAlbumOnOrBefore(i32),
    /// `needle` is already lowercased
    Text { needle: String, mode: TextMatchMode },
}

impl Predicate {
    pub fn matches(&self, record: &CompositeRecord) -> bool {
        match self {
            Predicate::MemberCount(count) => record.member_count() == *count,
            Predicate::CreatedOnOrBefore(year) => record.artist.creation_date <= *year,
            Predicate::FirstAlbumOnOrBefore(year) => record
                .artist
                .first_album_year()
                .is_some_and(|album_year| album_year <= *year),
            Predicate::Text { needle, mode } => {
                std::iter::once(&record.artist.name)
                    .chain(record.artist.members.iter())
                    .any(|candidate| Self::text_matches(candidate, needle, *mode))
            }
        }
    }

    fn text_matches(candidate: &str, needle: &str, mode: TextMatchMode) -> bool {
        let candidate = candidate.to_lowercase();
        match mode {
            TextMatchMode::Contains => candidate.contains(needle),
            TextMatchMode::StartsWith => candidate.starts_with(needle),
        }
    }
}

pub struct FilterEngine {
    text_mode: TextMatchMode,
}

impl FilterEngine {
    pub fn new(text_mode: TextMatchMode) -> Self {
        Self { text_mode }
    }

    pub fn text_mode(&self) -> TextMatchMode {
        self.text_mode
    }

    /// Records matching every predicate in `criteria`, in their original order
    pub fn apply<'a>(
        &self,
        records: &'a [CompositeRecord],
        criteria: &FilterCriteria,
    ) -> Vec<&'a CompositeRecord> {
        Self::apply_predicates(records, &criteria.predicates(self.text_mode))
    }

    /// Narrow `records` by each predicate in turn
    pub fn apply_predicates<'a>(
        records: &'a [CompositeRecord],
        predicates: &[Predicate],
    ) -> Vec<&'a CompositeRecord> {
        let mut view: Vec<&CompositeRecord> = records.iter().collect();
        for predicate in predicates {
            view.retain(|record| predicate.matches(record));
        }
        view
    }
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::new(TextMatchMode::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::record;

    fn catalogue() -> Vec<CompositeRecord> {
        vec![
            record(1, "Pink Floyd", &["Roger Waters", "David Gilmour"], 1965, "05-08-1967"),
            record(
                2,
                "Queen",
                &["Freddie Mercury", "Brian May", "Roger Taylor", "John Deacon"],
                1970,
                "14-07-1973",
            ),
            record(
                3,
                "Arctic Monkeys",
                &["Alex Turner", "Jamie Cook", "Nick O'Malley", "Matt Helders", "Andy Nicholson"],
                2002,
                "23-01-2006",
            ),
            record(4, "Broken Album", &["Solo"], 1990, "99"),
        ]
    }

    fn ids(view: &[&CompositeRecord]) -> Vec<u32> {
        view.iter().map(|r| r.id()).collect()
    }

    #[test]
    fn test_empty_criteria_returns_everything_in_order() {
        let records = catalogue();
        let engine = FilterEngine::default();

        let criteria = FilterCriteria::default();
        assert!(criteria.is_empty());
        assert_eq!(ids(&engine.apply(&records, &criteria)), vec![1, 2, 3, 4]);

        let blank_text = FilterCriteria {
            text: Some(String::new()),
            ..Default::default()
        };
        assert!(blank_text.is_empty());
        assert_eq!(ids(&engine.apply(&records, &blank_text)), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_member_count_is_exact() {
        let records = catalogue();
        let criteria = FilterCriteria {
            member_count: Some(4),
            ..Default::default()
        };
        assert_eq!(ids(&FilterEngine::default().apply(&records, &criteria)), vec![2]);
    }

    #[test]
    fn test_member_count_scenario_keeps_position() {
        let records = vec![
            record(10, "Duo", &["a", "b"], 2000, "01-01-2001"),
            record(11, "Quartet", &["a", "b", "c", "d"], 2000, "01-01-2001"),
            record(12, "Quintet", &["a", "b", "c", "d", "e"], 2000, "01-01-2001"),
        ];
        let criteria = FilterCriteria {
            member_count: Some(4),
            ..Default::default()
        };

        let view = FilterEngine::default().apply(&records, &criteria);
        assert_eq!(view.len(), 1);
        assert!(std::ptr::eq(view[0], &records[1]));
    }

    #[test]
    fn test_creation_year_ceiling_is_inclusive() {
        let records = catalogue();
        let criteria = FilterCriteria {
            created_on_or_before: Some(1970),
            ..Default::default()
        };
        assert_eq!(ids(&FilterEngine::default().apply(&records, &criteria)), vec![1, 2]);
    }

    #[test]
    fn test_album_year_excludes_unparseable_dates() {
        let records = catalogue();
        let criteria = FilterCriteria {
            first_album_on_or_before: Some(3000),
            ..Default::default()
        };
        // "99" is shorter than four characters and never matches
        assert_eq!(ids(&FilterEngine::default().apply(&records, &criteria)), vec![1, 2, 3]);

        let criteria = FilterCriteria {
            first_album_on_or_before: Some(1973),
            ..Default::default()
        };
        assert_eq!(ids(&FilterEngine::default().apply(&records, &criteria)), vec![1, 2]);
    }

    #[test]
    fn test_text_matches_name_case_insensitively() {
        let records = catalogue();
        let criteria = FilterCriteria {
            text: Some("que".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&FilterEngine::default().apply(&records, &criteria)), vec![2]);
    }

    #[test]
    fn test_text_matches_members() {
        let records = catalogue();
        let criteria = FilterCriteria {
            text: Some("ROGER".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&FilterEngine::default().apply(&records, &criteria)), vec![1, 2]);
    }

    #[test]
    fn test_text_match_modes() {
        let records = catalogue();
        let criteria = FilterCriteria {
            text: Some("monkeys".to_string()),
            ..Default::default()
        };

        let contains = FilterEngine::new(TextMatchMode::Contains);
        assert_eq!(ids(&contains.apply(&records, &criteria)), vec![3]);

        let starts_with = FilterEngine::new(TextMatchMode::StartsWith);
        assert!(starts_with.apply(&records, &criteria).is_empty());

        let criteria = FilterCriteria {
            text: Some("arctic".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&starts_with.apply(&records, &criteria)), vec![3]);
    }

    #[test]
    fn test_predicates_combine_with_and() {
        let records = catalogue();
        let criteria = FilterCriteria {
            member_count: Some(2),
            created_on_or_before: Some(1970),
            first_album_on_or_before: Some(1970),
            text: Some("gilmour".to_string()),
        };
        assert_eq!(ids(&FilterEngine::default().apply(&records, &criteria)), vec![1]);

        let criteria = FilterCriteria {
            member_count: Some(4),
            text: Some("floyd".to_string()),
            ..Default::default()
        };
        assert!(FilterEngine::default().apply(&records, &criteria).is_empty());
    }

    #[test]
    fn test_predicate_order_does_not_change_result() {
        let records = catalogue();
        let criteria = FilterCriteria {
            member_count: None,
            created_on_or_before: Some(2002),
            first_album_on_or_before: Some(2006),
            text: Some("o".to_string()),
        };
        let predicates = criteria.predicates(TextMatchMode::Contains);
        assert_eq!(predicates.len(), 3);

        let expected = ids(&FilterEngine::apply_predicates(&records, &predicates));
        let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
        for order in orders {
            let permuted: Vec<Predicate> = order.iter().map(|&i| predicates[i].clone()).collect();
            assert_eq!(ids(&FilterEngine::apply_predicates(&records, &permuted)), expected);
        }
    }

    #[test]
    fn test_result_is_ordered_subsequence() {
        let records = catalogue();
        let criteria_set = [
            FilterCriteria {
                text: Some("a".to_string()),
                ..Default::default()
            },
            FilterCriteria {
                created_on_or_before: Some(1995),
                ..Default::default()
            },
            FilterCriteria {
                member_count: Some(1),
                ..Default::default()
            },
        ];

        for criteria in &criteria_set {
            let view = FilterEngine::default().apply(&records, criteria);
            let positions: Vec<usize> = view
                .iter()
                .map(|r| records.iter().position(|o| o.id() == r.id()).unwrap())
                .collect();
            assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
