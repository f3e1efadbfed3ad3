use std::path::Path;

use quiz_core::model::Catalog;
use tracing::debug;

use crate::error::CatalogLoadError;

/// Reads catalog documents (`{"chapters": [...]}`) from JSON.
///
/// Structural validation happens while deserializing, so a loaded catalog
/// always satisfies the `Catalog` invariants.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogLoader {
    allow_empty: bool,
}

impl CatalogLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept catalogs without any question set.
    #[must_use]
    pub fn allow_empty(mut self, allow_empty: bool) -> Self {
        self.allow_empty = allow_empty;
        self
    }

    /// Parse a catalog from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns `CatalogLoadError::Parse` for malformed JSON or an invalid
    /// tree, and `CatalogLoadError::Empty` if nothing can be answered.
    pub fn from_json_str(&self, json: &str) -> Result<Catalog, CatalogLoadError> {
        let catalog: Catalog = serde_json::from_str(json)?;
        if !self.allow_empty && catalog.first_question_set().is_none() {
            return Err(CatalogLoadError::Empty);
        }
        debug!(chapters = catalog.chapters().len(), "catalog loaded");
        Ok(catalog)
    }

    /// Read and parse a catalog file.
    ///
    /// # Errors
    ///
    /// Returns `CatalogLoadError::Io` if the file cannot be read, otherwise
    /// the same errors as [`CatalogLoader::from_json_str`].
    pub fn from_path(&self, path: impl AsRef<Path>) -> Result<Catalog, CatalogLoadError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CatalogLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.from_json_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "chapters": [{
            "id": "c1",
            "title": "Basics",
            "questionSets": [{
                "id": "s1",
                "title": "Warm-up",
                "questions": [{
                    "id": "q1",
                    "prompt": "2 + 2?",
                    "options": [{ "id": "a", "text": "4" }, { "id": "b", "text": "5" }],
                    "correctOptionId": "a"
                }]
            }]
        }]
    }"#;

    #[test]
    fn loads_valid_document() {
        let catalog = CatalogLoader::new().from_json_str(DOC).unwrap();
        assert_eq!(catalog.chapters().len(), 1);
        assert!(catalog.find_question(&"q1".into()).is_some());
    }

    #[test]
    fn rejects_empty_catalog_unless_allowed() {
        let empty = r#"{ "chapters": [] }"#;
        let err = CatalogLoader::new().from_json_str(empty).unwrap_err();
        assert!(matches!(err, CatalogLoadError::Empty));
        assert!(CatalogLoader::new().allow_empty(true).from_json_str(empty).is_ok());
    }

    #[test]
    fn reports_invalid_tree_as_parse_error() {
        let broken = DOC.replace("\"correctOptionId\": \"a\"", "\"correctOptionId\": \"z\"");
        let err = CatalogLoader::new().from_json_str(&broken).unwrap_err();
        assert!(matches!(err, CatalogLoadError::Parse(_)));
        assert!(err.to_string().contains("unknown correct option"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = CatalogLoader::new()
            .from_path("/definitely/not/here/catalog.json")
            .unwrap_err();
        assert!(matches!(err, CatalogLoadError::Io { .. }));
    }
}
