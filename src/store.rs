//! Description snapshot persistence.
//!
//! One JSON array per run, holding every descriptor in processing order.
//! Each run replaces the previous file; nothing is merged.

use crate::error::StoreError;
use crate::parser::BookDescriptor;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Ordered descriptors collected during one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DescriptionSnapshot {
    books: Vec<BookDescriptor>,
}

impl DescriptionSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, book: BookDescriptor) {
        self.books.push(book);
    }

    pub fn books(&self) -> &[BookDescriptor] {
        &self.books
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

/// Writes snapshots to disk.
pub struct DescriptionStore;

impl DescriptionStore {
    /// Serializes the snapshot as pretty JSON, overwriting `path`.
    pub fn persist(snapshot: &DescriptionSnapshot, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut content = serde_json::to_string_pretty(snapshot)?;
        content.push('\n');
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reads a snapshot previously written by [`DescriptionStore::persist`].
    pub fn load(path: &Path) -> Result<DescriptionSnapshot, StoreError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Loads the snapshot at `path` if one exists, so a caller can report
    /// what the next `persist` will replace.
    pub fn existing(path: &Path) -> Result<Option<DescriptionSnapshot>, StoreError> {
        if !path.exists() {
            return Ok(None);
        }
        Self::load(path).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn book(id: &str, name: &str) -> BookDescriptor {
        BookDescriptor {
            id: id.to_string(),
            url: format!("https://tululu.org/b{}/", id),
            name: name.to_string(),
            author: "Автор".to_string(),
            image_url: format!("https://tululu.org/shots/{}.jpg", id),
            image_file_name: format!("{}.jpg", id),
            comments: vec!["Хорошо".to_string()],
            genres: vec!["Научная фантастика".to_string()],
        }
    }

    #[test]
    fn test_persist_overwrites_and_keeps_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("books_description.json");

        let mut first = DescriptionSnapshot::new();
        first.push(book("1", "Первая"));
        first.push(book("2", "Вторая"));
        first.push(book("3", "Третья"));
        DescriptionStore::persist(&first, &path).unwrap();

        let mut second = DescriptionSnapshot::new();
        second.push(book("9", "Другая"));
        DescriptionStore::persist(&second, &path).unwrap();

        let loaded = DescriptionStore::load(&path).unwrap();
        assert_eq!(loaded, second);
    }

    #[test]
    fn test_json_shape() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("snapshot.json");

        let mut snapshot = DescriptionSnapshot::new();
        snapshot.push(book("32168", "Пески Марса"));
        DescriptionStore::persist(&snapshot, &path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        // Non-ASCII text is written as-is, not escaped.
        assert!(raw.contains("Пески Марса"));

        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let entry = &value.as_array().unwrap()[0];
        assert_eq!(entry["id"], "32168");
        assert_eq!(entry["image_file_name"], "32168.jpg");
        assert_eq!(entry["genres"][0], "Научная фантастика");
    }

    #[test]
    fn test_empty_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.json");
        DescriptionStore::persist(&DescriptionSnapshot::new(), &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "[]");
    }

    #[test]
    fn test_existing_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("books_description.json");
        assert_eq!(DescriptionStore::existing(&path).unwrap(), None);

        let mut snapshot = DescriptionSnapshot::new();
        snapshot.push(book("4", "Четвёртая"));
        DescriptionStore::persist(&snapshot, &path).unwrap();
        assert_eq!(DescriptionStore::existing(&path).unwrap(), Some(snapshot));

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            DescriptionStore::existing(&path),
            Err(StoreError::Json(_))
        ));
    }
}
