//! Fixture files
//!
//! Files are addressed either by a path relative to the suite directory or
//! by an alias registered from the fixtures directory (`@sampleFile`). Both
//! forms resolve to the same [`FixtureFile`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::common::{Error, Result};

/// A loaded fixture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureFile {
    /// File name as reported by a file input
    pub name: String,
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

impl FixtureFile {
    /// Read a fixture from disk; JSON fixtures must parse
    pub fn read(path: &Path) -> Result<Self> {
        let contents = std::fs::read(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json {
            serde_json::from_slice::<serde_json::Value>(&contents)?;
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::Config(format!("Fixture path '{}' has no file name", path.display())))?;

        Ok(Self {
            name,
            path: path.to_path_buf(),
            contents,
        })
    }
}

/// Fixture lookup for one scenario
#[derive(Debug, Clone)]
pub struct FixtureStore {
    base_dir: PathBuf,
    fixtures_dir: PathBuf,
    aliases: HashMap<String, FixtureFile>,
}

impl FixtureStore {
    pub fn new(base_dir: impl Into<PathBuf>, fixtures_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            fixtures_dir: fixtures_dir.into(),
            aliases: HashMap::new(),
        }
    }

    /// Load `path` from the fixtures directory and remember it as `@alias`
    pub fn register(&mut self, path: &str, alias: &str) -> Result<&FixtureFile> {
        let alias = alias.trim_start_matches('@');
        if alias.is_empty() {
            return Err(Error::Config("Fixture alias must not be empty".to_string()));
        }
        let file = FixtureFile::read(&self.fixtures_dir.join(path))?;
        debug!(alias, file = %file.path.display(), "fixture registered");
        self.aliases.insert(alias.to_string(), file);
        self.aliases
            .get(alias)
            .ok_or_else(|| Error::Internal("fixture alias vanished after insert".to_string()))
    }

    /// Resolve `@alias` or a path relative to the suite directory
    pub fn resolve(&self, reference: &str) -> Result<FixtureFile> {
        if let Some(alias) = reference.strip_prefix('@') {
            return self
                .aliases
                .get(alias)
                .cloned()
                .ok_or_else(|| Error::UnknownAlias(alias.to_string()));
        }
        let path = Path::new(reference);
        if path.is_absolute() {
            FixtureFile::read(path)
        } else {
            FixtureFile::read(&self.base_dir.join(path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, FixtureStore) {
        let dir = tempfile::tempdir().unwrap();
        let fixtures = dir.path().join("fixtures");
        std::fs::create_dir_all(&fixtures).unwrap();
        std::fs::write(fixtures.join("example.json"), br#"{"name": "Using fixtures"}"#).unwrap();
        std::fs::write(fixtures.join("broken.json"), b"{not json").unwrap();
        let store = FixtureStore::new(dir.path(), fixtures);
        (dir, store)
    }

    #[test]
    fn test_path_and_alias_resolve_to_same_file() {
        let (_dir, mut store) = store();
        store.register("example.json", "sampleFile").unwrap();

        let by_path = store.resolve("fixtures/example.json").unwrap();
        let by_alias = store.resolve("@sampleFile").unwrap();
        assert_eq!(by_path.name, "example.json");
        assert_eq!(by_path, by_alias);
    }

    #[test]
    fn test_unknown_alias() {
        let (_dir, store) = store();
        assert!(matches!(
            store.resolve("@missing"),
            Err(Error::UnknownAlias(alias)) if alias == "missing"
        ));
    }

    #[test]
    fn test_invalid_json_fixture_is_rejected() {
        let (_dir, store) = store();
        assert!(matches!(
            store.resolve("fixtures/broken.json"),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let (_dir, store) = store();
        let err = store.resolve("fixtures/nope.json").unwrap_err();
        assert!(err.to_string().contains("nope.json"));
    }
}
