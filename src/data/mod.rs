//! Data file loading and shape validation.
//!
//! Reads the structured data file fresh on every call (watch mode depends
//! on this: the on-disk content changes between rebuilds, so nothing here
//! may cache). Format is selected by extension from a small whitelist and
//! parsed with serde_yaml; JSON is a YAML subset so `.json` takes the same
//! path.

use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

use crate::error::BuildError;

/// Extensions accepted for the data file.
const DATA_EXTENSIONS: &[&str] = &["yml", "yaml", "json"];

/// Load and validate the data file.
///
/// Returns `Ok(None)` for an empty (whitespace-only) file: absent data is
/// allowed and renders the template with an empty context. Anything that
/// parses to a non-mapping — explicit `null`, scalar, sequence — is an
/// `InvalidDataShape` error.
pub fn load(path: &Path) -> Result<Option<Map<String, Value>>, BuildError> {
    if !path.is_file() {
        return Err(BuildError::DataNotFound(path.to_path_buf()));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !DATA_EXTENSIONS.contains(&extension.as_str()) {
        return Err(BuildError::UnsupportedFormat {
            path: path.to_path_buf(),
            extension,
        });
    }

    let raw = fs::read_to_string(path).map_err(|e| BuildError::from_io(path, e))?;
    if raw.trim().is_empty() {
        return Ok(None);
    }

    let value: Value = serde_yaml::from_str(&raw).map_err(|source| BuildError::DataParse {
        path: path.to_path_buf(),
        source,
    })?;

    match value {
        Value::Object(map) => Ok(Some(map)),
        other => Err(BuildError::InvalidDataShape {
            path: path.to_path_buf(),
            kind: value_kind(&other),
        }),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        write!(file, "{content}").unwrap();
        path
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = load(&dir.path().join("data.yml")).unwrap_err();
        assert!(matches!(err, BuildError::DataNotFound(_)));
    }

    #[test]
    fn extension_whitelist() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "data.txt", "title: Hello\n");
        let err = load(&path).unwrap_err();
        assert!(matches!(err, BuildError::UnsupportedFormat { .. }));
    }

    #[test]
    fn yaml_mapping_loads() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "data.yml", "title: Hello\ncount: 3\n");
        let map = load(&path).unwrap().unwrap();
        assert_eq!(map["title"], Value::String("Hello".into()));
        assert_eq!(map["count"], Value::from(3));
    }

    #[test]
    fn json_mapping_loads() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "data.json", r#"{"title": "Hello"}"#);
        let map = load(&path).unwrap().unwrap();
        assert_eq!(map["title"], Value::String("Hello".into()));
    }

    #[test]
    fn scalar_is_invalid_shape() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "data.yml", "\"hello\"\n");
        let err = load(&path).unwrap_err();
        assert!(matches!(
            err,
            BuildError::InvalidDataShape {
                kind: "a string",
                ..
            }
        ));
    }

    #[test]
    fn explicit_null_is_invalid_shape() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "data.yml", "null\n");
        let err = load(&path).unwrap_err();
        assert!(matches!(err, BuildError::InvalidDataShape { kind: "null", .. }));
    }

    #[test]
    fn sequence_is_invalid_shape() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "data.yml", "- a\n- b\n");
        let err = load(&path).unwrap_err();
        assert!(matches!(
            err,
            BuildError::InvalidDataShape {
                kind: "a sequence",
                ..
            }
        ));
    }

    #[test]
    fn empty_file_is_absent_data() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "data.yml", "  \n\n");
        assert!(load(&path).unwrap().is_none());
    }

    #[test]
    fn reloads_from_disk_every_call() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "data.yml", "title: One\n");
        assert_eq!(load(&path).unwrap().unwrap()["title"], "One");
        write_file(&dir, "data.yml", "title: Two\n");
        assert_eq!(load(&path).unwrap().unwrap()["title"], "Two");
    }
}
