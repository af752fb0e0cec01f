pub mod core;
pub mod selector;

// Re-export the main types for convenience
pub use self::core::{DateSet, VocabularyEntry, VocabularyError, VocabularyStore};
pub use selector::{
    build_options, build_question, Question, QuestionSelector, Selection, ShuffledSelector,
    DEFAULT_QUESTION_COUNT, OPTION_COUNT,
};

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_integrated_selection() {
        let store = VocabularyStore::builtin().unwrap();
        let definitions = store.all_definitions();
        let mut rng = StdRng::seed_from_u64(42);

        // Sample a session, then build every round's options
        let selection = ShuffledSelector.select_questions(
            &store,
            &["Apr. 3".to_string(), "Apr. 7".to_string()],
            DEFAULT_QUESTION_COUNT,
            &mut rng,
        );
        assert_eq!(selection.entries.len(), DEFAULT_QUESTION_COUNT);

        for entry in &selection.entries {
            let question = build_question(entry, &definitions, &mut rng).unwrap();
            assert!(question.is_correct(question.correct_index().unwrap()));
        }
    }
}
