use super::core::{VocabularyEntry, VocabularyStore};
use crate::diagnostic::Diagnostic;
use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::RngCore;
use serde::Serialize;
use std::iter;

/// Options shown per question, one of which is correct.
pub const OPTION_COUNT: usize = 4;

/// Questions asked per session unless configured otherwise.
pub const DEFAULT_QUESTION_COUNT: usize = 10;

/// One round's prompt and its shuffled options
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Question {
    pub entry: VocabularyEntry,
    pub options: Vec<String>,
}

impl Question {
    pub fn correct_index(&self) -> Option<usize> {
        self.options
            .iter()
            .position(|o| *o == self.entry.definition)
    }

    pub fn is_correct(&self, option_index: usize) -> bool {
        self.option(option_index)
            .map_or(false, |o| o == self.entry.definition)
    }

    pub fn option(&self, option_index: usize) -> Option<&str> {
        self.options.get(option_index).map(String::as_str)
    }

    /// Indices of every option that is not the correct definition.
    pub fn wrong_indices(&self) -> Vec<usize> {
        (0..self.options.len())
            .filter(|&i| !self.is_correct(i))
            .collect()
    }
}

/// Result of sampling a session's question list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub entries: Vec<VocabularyEntry>,
    /// Labels the entries were actually drawn from.
    pub dates: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Trait for different question sampling strategies
pub trait QuestionSelector {
    /// Pick up to `count` entries from the selected date-sets. Never fails:
    /// degenerate input falls back to the store's first date-set.
    fn select_questions(
        &self,
        store: &VocabularyStore,
        selected: &[String],
        count: usize,
        rng: &mut dyn RngCore,
    ) -> Selection;
}

/// Uniform shuffle of the selected pool, then a prefix
pub struct ShuffledSelector;

impl QuestionSelector for ShuffledSelector {
    fn select_questions(
        &self,
        store: &VocabularyStore,
        selected: &[String],
        count: usize,
        rng: &mut dyn RngCore,
    ) -> Selection {
        let mut selection = collect_pool(store, selected);

        // SliceRandom::shuffle is a Fisher-Yates shuffle
        selection.entries.shuffle(&mut *rng);
        selection.entries.truncate(count);
        selection
    }
}

fn collect_pool(store: &VocabularyStore, selected: &[String]) -> Selection {
    let mut selection = Selection::default();
    let fallback = store.first_label();

    let mut labels: Vec<&str> = selected.iter().map(String::as_str).unique().collect();
    if labels.is_empty() {
        if let Some(fallback) = fallback {
            selection.diagnostics.push(Diagnostic::NoDatesSelected {
                fallback: fallback.to_string(),
            });
            labels.push(fallback);
        }
    }

    for label in labels {
        match store.get(label) {
            Some(entries) => {
                selection.entries.extend(entries.iter().cloned());
                selection.dates.push(label.to_string());
            }
            None => selection.diagnostics.push(Diagnostic::UnknownDateSet {
                label: label.to_string(),
            }),
        }
    }

    if selection.entries.is_empty() {
        if let Some((fallback, entries)) = fallback.and_then(|l| store.get(l).map(|e| (l, e))) {
            selection.diagnostics.push(Diagnostic::EmptyPool {
                fallback: fallback.to_string(),
            });
            selection.entries = entries.to_vec();
            selection.dates = vec![fallback.to_string()];
        }
    }

    selection
}

/// Build the option list for `entry`: its definition plus distractors drawn
/// from `definitions` (the whole store, not just the selected sets).
///
/// Capped at the number of distinct definitions available so the sampling
/// loop always terminates.
pub fn build_options(
    entry: &VocabularyEntry,
    definitions: &[String],
    rng: &mut dyn RngCore,
) -> Vec<String> {
    let distinct = definitions
        .iter()
        .chain(iter::once(&entry.definition))
        .unique()
        .count();
    let target = OPTION_COUNT.min(distinct);

    let mut options = vec![entry.definition.clone()];
    while options.len() < target {
        match definitions.choose(&mut *rng) {
            Some(candidate) if !options.contains(candidate) => options.push(candidate.clone()),
            Some(_) => {}
            None => break,
        }
    }

    options.shuffle(&mut *rng);
    options
}

/// Build a full question for `entry`, or `None` if it has no definition.
pub fn build_question(
    entry: &VocabularyEntry,
    definitions: &[String],
    rng: &mut dyn RngCore,
) -> Option<Question> {
    if entry.definition.trim().is_empty() {
        return None;
    }

    Some(Question {
        entry: entry.clone(),
        options: build_options(entry, definitions, rng),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::core::DateSet;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn entry(id: u32, definition: &str) -> VocabularyEntry {
        VocabularyEntry {
            id,
            word: format!("word{id}"),
            definition: definition.to_string(),
            note: None,
        }
    }

    fn builtin() -> VocabularyStore {
        VocabularyStore::builtin().unwrap()
    }

    #[test]
    fn takes_ten_from_a_single_large_set() {
        let store = builtin();
        let mut rng = StdRng::seed_from_u64(7);

        let selection =
            ShuffledSelector.select_questions(&store, &["Apr. 4".into()], 10, &mut rng);

        assert_eq!(selection.entries.len(), 10);
        assert_eq!(selection.dates, vec!["Apr. 4".to_string()]);
        assert!(selection.diagnostics.is_empty());
    }

    #[test]
    fn takes_whole_pool_when_smaller_than_count() {
        let store = builtin();
        let mut rng = StdRng::seed_from_u64(1);

        let selection =
            ShuffledSelector.select_questions(&store, &["Apr. 1".into()], 20, &mut rng);

        assert_eq!(selection.entries.len(), 11);
    }

    #[test]
    fn no_repeated_ids_across_sets() {
        let store = builtin();
        let mut rng = StdRng::seed_from_u64(99);
        let selected = vec!["Apr. 1".to_string(), "Apr. 3".to_string(), "Apr. 1".to_string()];

        let selection = ShuffledSelector.select_questions(&store, &selected, 30, &mut rng);
        let ids: HashSet<u32> = selection.entries.iter().map(|e| e.id).collect();

        assert_eq!(ids.len(), selection.entries.len());
        assert_eq!(selection.entries.len(), 24);
    }

    #[test]
    fn empty_selection_falls_back_to_first_set() {
        let store = builtin();
        let mut rng = StdRng::seed_from_u64(3);

        let selection = ShuffledSelector.select_questions(&store, &[], 10, &mut rng);

        assert_eq!(selection.entries.len(), 10);
        assert!(selection.entries.iter().all(|e| (1..=11).contains(&e.id)));
        assert_eq!(
            selection.diagnostics,
            vec![Diagnostic::NoDatesSelected {
                fallback: "Apr. 1".into()
            }]
        );
    }

    #[test]
    fn unknown_labels_are_skipped_then_fall_back() {
        let store = builtin();
        let mut rng = StdRng::seed_from_u64(3);

        let selection =
            ShuffledSelector.select_questions(&store, &["May 5".into()], 10, &mut rng);

        assert_eq!(selection.entries.len(), 10);
        assert_eq!(selection.dates, vec!["Apr. 1".to_string()]);
        assert_eq!(
            selection.diagnostics,
            vec![
                Diagnostic::UnknownDateSet {
                    label: "May 5".into()
                },
                Diagnostic::EmptyPool {
                    fallback: "Apr. 1".into()
                },
            ]
        );
    }

    #[test]
    fn options_contain_exactly_one_correct_definition() {
        let store = builtin();
        let definitions = store.all_definitions();
        let mut rng = StdRng::seed_from_u64(11);

        for e in store.get("Apr. 7").unwrap() {
            let question = build_question(e, &definitions, &mut rng).unwrap();
            let unique: HashSet<&String> = question.options.iter().collect();

            assert_eq!(question.options.len(), OPTION_COUNT);
            assert_eq!(unique.len(), OPTION_COUNT);
            assert_eq!(
                question
                    .options
                    .iter()
                    .filter(|o| **o == e.definition)
                    .count(),
                1
            );
            assert!(question.correct_index().is_some());
            assert_eq!(question.wrong_indices().len(), OPTION_COUNT - 1);
        }
    }

    #[test]
    fn options_are_capped_by_distinct_definitions() {
        let definitions = vec!["alpha".to_string(), "beta".to_string(), "alpha".to_string()];
        let mut rng = StdRng::seed_from_u64(5);

        let options = build_options(&entry(1, "alpha"), &definitions, &mut rng);

        assert_eq!(options.len(), 2);
        assert!(options.contains(&"alpha".to_string()));
        assert!(options.contains(&"beta".to_string()));
    }

    #[test]
    fn missing_definition_yields_no_question() {
        let mut rng = StdRng::seed_from_u64(5);
        assert!(build_question(&entry(1, "  "), &["x".into()], &mut rng).is_none());
    }

    #[test]
    fn correct_position_varies() {
        let store = builtin();
        let definitions = store.all_definitions();
        let target = &store.get("Apr. 1").unwrap()[0];
        let mut rng = StdRng::seed_from_u64(2024);

        let positions: HashSet<usize> = (0..200)
            .filter_map(|_| build_question(target, &definitions, &mut rng))
            .filter_map(|q| q.correct_index())
            .collect();

        assert_eq!(positions.len(), OPTION_COUNT);
    }

    #[test]
    fn empty_store_selects_nothing() {
        let store = VocabularyStore::from_date_sets("empty", Vec::<DateSet>::new()).unwrap();
        let mut rng = StdRng::seed_from_u64(0);

        let selection = ShuffledSelector.select_questions(&store, &[], 10, &mut rng);

        assert!(selection.entries.is_empty());
    }
}
