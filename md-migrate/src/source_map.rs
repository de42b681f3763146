use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Flat key to value table, e.g. generated HTML path to markdown path, or cross-reference uid
/// to URL.
pub type KeyValueMap = BTreeMap<String, String>;

#[derive(Debug, Deserialize)]
struct MappingFile {
    #[serde(default)]
    map: KeyValueMap,
}

/// Errors returned when loading mapping files.
#[derive(Debug, Error)]
pub enum MappingLoadError {
    #[error("failed to read mappings file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse mappings file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Load the `[map]` table of a TOML file.
pub fn load_key_value_map(path: &Path) -> Result<KeyValueMap, MappingLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| MappingLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;

    parse_key_value_map(&raw, path.display().to_string())
}

fn parse_key_value_map(raw: &str, path: String) -> Result<KeyValueMap, MappingLoadError> {
    let parsed: MappingFile =
        toml::from_str(raw).map_err(|source| MappingLoadError::Parse { path, source })?;
    Ok(parsed.map)
}

/// Find the markdown source a rendered file traces back to.
///
/// Keys are compared with `/` separators so maps written on one platform work on another.
pub fn lookup_source<'a>(map: &'a KeyValueMap, rendered: &str) -> Option<&'a str> {
    let key = rendered.replace('\\', "/");
    map.get(&key)
        .or_else(|| map.get(key.trim_start_matches("./")))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::{load_key_value_map, lookup_source, MappingLoadError};

    #[test]
    fn loads_map_table_from_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("map.toml");
        fs::write(
            &path,
            r#"
[map]
"api/index.html" = "docs/api/index.md"
"intro.html" = "docs/intro.md"
"#,
        )
        .expect("write");

        let map = load_key_value_map(&path).expect("load");
        assert_eq!(map.len(), 2);
        assert_eq!(lookup_source(&map, "api\\index.html"), Some("docs/api/index.md"));
        assert_eq!(lookup_source(&map, "missing.html"), None);
    }

    #[test]
    fn missing_section_is_empty() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("empty.toml");
        fs::write(&path, "").expect("write");
        assert!(load_key_value_map(&path).expect("load").is_empty());
    }

    #[test]
    fn reports_io_and_parse_errors() {
        let dir = tempdir().expect("tempdir");
        let missing = load_key_value_map(&dir.path().join("none.toml"));
        assert!(matches!(missing, Err(MappingLoadError::Io { .. })));

        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "[map\n").expect("write");
        assert!(matches!(
            load_key_value_map(&broken),
            Err(MappingLoadError::Parse { .. })
        ));
    }
}
