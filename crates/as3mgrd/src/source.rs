//! File-backed declaration source.
//!
//! The daemon's producer: re-reads a declaration file and yields a new
//! [`Declaration`] whenever its contents change.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use as3_common::{As3Result, Declaration};

/// Reads the AS3 `declaration.schemaVersion` field, if present.
pub fn schema_version_of(document: &str) -> Option<String> {
    let value: Value = serde_json::from_str(document).ok()?;
    value
        .pointer("/declaration/schemaVersion")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Watches one declaration file for changes.
#[derive(Debug)]
pub struct DeclarationSource {
    path: PathBuf,
    tenants: Vec<String>,
    last: Option<String>,
}

impl DeclarationSource {
    /// Creates a source reading `path`, scoping declarations to `tenants`.
    pub fn new(path: impl Into<PathBuf>, tenants: Vec<String>) -> Self {
        Self {
            path: path.into(),
            tenants,
            last: None,
        }
    }

    /// Returns the watched file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file and returns a declaration if it changed since the
    /// last successful read.
    ///
    /// Only byte changes count here; semantic duplicates are filtered by
    /// the dispatcher.
    pub fn poll(&mut self) -> As3Result<Option<Declaration>> {
        let body = fs::read_to_string(&self.path)?;
        if self.last.as_deref() == Some(body.as_str()) {
            return Ok(None);
        }

        debug!(path = %self.path.display(), "Declaration file changed");
        self.last = Some(body.clone());

        let schema_version = schema_version_of(&body).unwrap_or_default();
        Ok(Some(
            Declaration::new(body)
                .with_tenants(self.tenants.iter().cloned())
                .with_schema_version(schema_version),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DECL: &str = r#"{"class":"AS3","declaration":{"class":"ADC","schemaVersion":"3.20.0"}}"#;

    #[test]
    fn test_schema_version_of() {
        assert_eq!(schema_version_of(DECL), Some("3.20.0".to_string()));
        assert_eq!(schema_version_of(r#"{"class":"AS3"}"#), None);
        assert_eq!(schema_version_of("not json"), None);
    }

    #[test]
    fn test_poll_yields_only_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("declaration.json");
        fs::write(&path, DECL).unwrap();

        let mut source = DeclarationSource::new(&path, vec!["tenant_a".to_string()]);

        let first = source.poll().unwrap().expect("first read yields a declaration");
        assert_eq!(first.body, DECL);
        assert_eq!(first.tenants, vec!["tenant_a"]);
        assert_eq!(first.schema_version, "3.20.0");

        assert_eq!(source.poll().unwrap(), None);

        fs::write(&path, r#"{"class":"AS3"}"#).unwrap();
        let changed = source.poll().unwrap().expect("changed file yields a declaration");
        assert_eq!(changed.schema_version, "");
    }

    #[test]
    fn test_poll_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = DeclarationSource::new(dir.path().join("missing.json"), Vec::new());

        assert!(source.poll().is_err());
        assert_eq!(source.path(), dir.path().join("missing.json"));
    }
}
