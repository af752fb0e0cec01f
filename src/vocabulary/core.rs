use include_dir::{include_dir, Dir};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

static VOCAB_DIR: Dir = include_dir!("src/vocabulary/data");

pub const BUILTIN_BOOK: &str = "ivy-april";

#[derive(Debug, Error)]
pub enum VocabularyError {
    #[error("vocabulary file {0} not found")]
    NotFound(String),
    #[error("vocabulary file {0} is not valid UTF-8")]
    NotUtf8(String),
    #[error("unable to deserialize vocabulary: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("vocabulary id {0} appears more than once")]
    DuplicateId(u32),
    #[error("vocabulary id must be positive")]
    ZeroId,
    #[error("date-set label must not be empty")]
    EmptyLabel,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VocabularyEntry {
    pub id: u32,
    pub word: String,
    pub definition: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateSet {
    pub label: String,
    pub entries: Vec<VocabularyEntry>,
}

/// Read-only mapping from date-set label to its entries, in definition order.
#[derive(Debug, Clone, Deserialize)]
pub struct VocabularyStore {
    pub name: String,
    date_sets: Vec<DateSet>,
}

impl VocabularyStore {
    /// The vocabulary book compiled into the binary.
    pub fn builtin() -> Result<Self, VocabularyError> {
        Self::load(BUILTIN_BOOK)
    }

    pub fn load(book: &str) -> Result<Self, VocabularyError> {
        let file_name = format!("{book}.json");
        let file = VOCAB_DIR
            .get_file(&file_name)
            .ok_or_else(|| VocabularyError::NotFound(file_name.clone()))?;
        let contents = file
            .contents_utf8()
            .ok_or(VocabularyError::NotUtf8(file_name))?;
        Self::from_json(contents)
    }

    pub fn from_json(json: &str) -> Result<Self, VocabularyError> {
        let store: VocabularyStore = serde_json::from_str(json)?;
        store.validate()?;
        Ok(store)
    }

    pub fn from_date_sets(
        name: impl Into<String>,
        date_sets: Vec<DateSet>,
    ) -> Result<Self, VocabularyError> {
        let store = Self {
            name: name.into(),
            date_sets,
        };
        store.validate()?;
        Ok(store)
    }

    fn validate(&self) -> Result<(), VocabularyError> {
        let mut seen = HashSet::new();
        for set in &self.date_sets {
            if set.label.trim().is_empty() {
                return Err(VocabularyError::EmptyLabel);
            }
            for entry in &set.entries {
                if entry.id == 0 {
                    return Err(VocabularyError::ZeroId);
                }
                if !seen.insert(entry.id) {
                    return Err(VocabularyError::DuplicateId(entry.id));
                }
            }
        }
        Ok(())
    }

    pub fn date_sets(&self) -> &[DateSet] {
        &self.date_sets
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.date_sets.iter().map(|s| s.label.as_str())
    }

    pub fn first_label(&self) -> Option<&str> {
        self.date_sets.first().map(|s| s.label.as_str())
    }

    pub fn get(&self, label: &str) -> Option<&[VocabularyEntry]> {
        self.date_sets
            .iter()
            .find(|s| s.label == label)
            .map(|s| s.entries.as_slice())
    }

    pub fn contains(&self, label: &str) -> bool {
        self.get(label).is_some()
    }

    /// Every non-blank definition across all date-sets, duplicates included.
    pub fn all_definitions(&self) -> Vec<String> {
        self.date_sets
            .iter()
            .flat_map(|s| s.entries.iter())
            .filter(|e| !e.definition.trim().is_empty())
            .map(|e| e.definition.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.date_sets.iter().map(|s| s.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_book_has_the_april_sets() {
        let store = VocabularyStore::builtin().unwrap();

        assert_eq!(store.name, "ivy-april");
        assert_eq!(
            store.labels().collect::<Vec<_>>(),
            vec!["Apr. 1", "Apr. 3", "Apr. 4", "Apr. 7"]
        );
        assert_eq!(store.get("Apr. 1").unwrap().len(), 11);
        assert_eq!(store.get("Apr. 3").unwrap().len(), 13);
        assert_eq!(store.get("Apr. 4").unwrap().len(), 15);
        assert_eq!(store.get("Apr. 7").unwrap().len(), 14);
        assert_eq!(store.len(), 53);
    }

    #[test]
    fn blank_definitions_stay_out_of_the_pool() {
        let json = r#"
        {
            "name": "test",
            "date_sets": [
                { "label": "Day 1", "entries": [
                    { "id": 1, "word": "a", "definition": "alpha" },
                    { "id": 2, "word": "b", "definition": "   " },
                    { "id": 3, "word": "c", "definition": "alpha" }
                ] }
            ]
        }
        "#;

        let store = VocabularyStore::from_json(json).unwrap();
        assert_eq!(store.all_definitions(), vec!["alpha", "alpha"]);
    }

    #[test]
    fn first_label_follows_definition_order() {
        let store = VocabularyStore::builtin().unwrap();
        assert_eq!(store.first_label(), Some("Apr. 1"));
    }

    #[test]
    fn entries_keep_their_notes() {
        let store = VocabularyStore::builtin().unwrap();
        let first = &store.get("Apr. 1").unwrap()[0];

        assert_eq!(first.id, 1);
        assert_eq!(first.word, "portray");
        assert_eq!(first.note.as_deref(), Some("vt."));
    }

    #[test]
    fn note_is_optional() {
        let json = r#"
        {
            "name": "test",
            "date_sets": [
                { "label": "Day 1", "entries": [
                    { "id": 1, "word": "a", "definition": "alpha" }
                ] }
            ]
        }
        "#;

        let store = VocabularyStore::from_json(json).unwrap();
        assert_eq!(store.get("Day 1").unwrap()[0].note, None);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let json = r#"
        {
            "name": "test",
            "date_sets": [
                { "label": "Day 1", "entries": [{ "id": 7, "word": "a", "definition": "alpha" }] },
                { "label": "Day 2", "entries": [{ "id": 7, "word": "b", "definition": "beta" }] }
            ]
        }
        "#;

        assert!(matches!(
            VocabularyStore::from_json(json),
            Err(VocabularyError::DuplicateId(7))
        ));
    }

    #[test]
    fn unknown_book_is_not_found() {
        assert!(matches!(
            VocabularyStore::load("nonexistent"),
            Err(VocabularyError::NotFound(_))
        ));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            VocabularyStore::from_json("{ not json"),
            Err(VocabularyError::Malformed(_))
        ));
    }
}
