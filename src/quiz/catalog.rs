use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};

use crate::quiz::{QuizError, WordItem};

/// Ordered, non-empty set of objects with unique keys.
#[derive(Debug, Clone)]
pub struct Catalog {
    items: Vec<WordItem>,
}

impl Catalog {
    pub fn new(items: Vec<WordItem>) -> Result<Self, QuizError> {
        if items.is_empty() {
            return Err(QuizError::Configuration("catalog is empty".to_string()));
        }
        let mut seen = HashSet::new();
        for item in &items {
            if !seen.insert(item.key.as_str()) {
                return Err(QuizError::Configuration(format!(
                    "duplicate key {:?} in catalog",
                    item.key
                )));
            }
        }
        Ok(Self { items })
    }

    /// The city scene: four objects named in Esperanto.
    pub fn city() -> Self {
        Self {
            items: vec![
                WordItem::new("building", "konstruaĵo"),
                WordItem::new("house", "domo"),
                WordItem::new("car", "aŭto"),
                WordItem::new("tree", "arbo"),
            ],
        }
    }

    /// Reads `key<TAB>label` lines. Blank lines and `#` comments are skipped.
    pub fn from_reader(reader: impl BufRead) -> Result<Self, QuizError> {
        let mut items = Vec::new();
        let mut keys = HashSet::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, label) = line.split_once('\t').ok_or_else(|| {
                QuizError::Configuration(format!("line {}: expected `key<TAB>label`", idx + 1))
            })?;
            if key.is_empty() || label.is_empty() {
                return Err(QuizError::Configuration(format!(
                    "line {}: key and label must not be empty",
                    idx + 1
                )));
            }
            if !keys.insert(key.to_string()) {
                return Err(QuizError::Configuration(format!(
                    "line {}: duplicate key {:?}",
                    idx + 1,
                    key
                )));
            }
            items.push(WordItem::new(key, label));
        }
        Self::new(items)
    }

    pub fn from_file(file: File) -> Result<Self, QuizError> {
        Self::from_reader(BufReader::new(file))
    }

    pub fn items(&self) -> &[WordItem] {
        &self.items
    }

    pub fn get(&self, key: &str) -> Option<&WordItem> {
        self.items.iter().find(|item| item.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_catalog() {
        let err = Catalog::new(vec![]).unwrap_err();
        assert!(matches!(err, QuizError::Configuration(_)));
    }

    #[test]
    fn rejects_duplicate_keys() {
        let err = Catalog::new(vec![
            WordItem::new("car", "aŭto"),
            WordItem::new("car", "veturilo"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("duplicate key \"car\""));
    }

    #[test]
    fn city_catalog_keeps_scene_order() {
        let catalog = Catalog::city();
        let keys: Vec<&str> = catalog.items().iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, ["building", "house", "car", "tree"]);
        assert_eq!(catalog.get("car").unwrap().label, "aŭto");
        assert!(!catalog.contains("Car"));
    }

    #[test]
    fn parses_words_file() {
        let text = "# city\nbuilding\tkonstruaĵo\n\nhouse\tdomo\r\n";
        let catalog = Catalog::from_reader(text.as_bytes()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("house").unwrap().label, "domo");
    }

    #[test]
    fn words_file_errors_name_the_line() {
        let err = Catalog::from_reader("house\tdomo\ntree arbo\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"));

        let err = Catalog::from_reader("\tdomo\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn duplicate_key_in_words_file_names_the_line() {
        let err = Catalog::from_reader("house\tdomo\ncar\taŭto\nhouse\tdomego\n".as_bytes())
            .unwrap_err();
        assert!(matches!(err, QuizError::Configuration(_)));
        assert!(err.to_string().contains("line 3: duplicate key \"house\""));
    }

    #[test]
    fn words_file_with_only_comments_is_empty() {
        let err = Catalog::from_reader("# nothing here\n\n".as_bytes()).unwrap_err();
        assert!(matches!(err, QuizError::Configuration(_)));
    }
}
