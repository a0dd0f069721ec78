// Serve schema documents from a directory, addressed by a base URI.

use jschema_validation::{FetchError, JsonValue, Url};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// A resolver mapping `base` + relative path to `dir` + relative path.
pub fn directory_source(
    dir: PathBuf,
    base: Url,
) -> impl Fn(&Url) -> Result<JsonValue, FetchError> + Send + Sync + 'static {
    move |uri: &Url| {
        let not_found = || FetchError::NotFound {
            uri: uri.to_string(),
        };
        let relative = uri.as_str().strip_prefix(base.as_str()).ok_or_else(not_found)?;
        let relative = Path::new(relative);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(not_found());
        }

        let path = dir.join(relative);
        tracing::debug!(uri = %uri, path = %path.display(), "loading schema file");
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(not_found()),
            Err(e) => return Err(FetchError::failed(uri.as_str(), e.to_string())),
        };
        JsonValue::parse(&text).map_err(|e| FetchError::failed(uri.as_str(), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn source(dir: &TempDir) -> impl Fn(&Url) -> Result<JsonValue, FetchError> {
        let base = Url::parse("https://schemas.example/").unwrap();
        directory_source(dir.path().to_path_buf(), base)
    }

    #[test]
    fn test_loads_nested_files() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("common")).unwrap();
        fs::write(dir.path().join("common/id.json"), r#"{"type": "string"}"#).unwrap();

        let resolve = source(&dir);
        let doc = resolve(&Url::parse("https://schemas.example/common/id.json").unwrap()).unwrap();
        assert_eq!(doc.get("type").and_then(JsonValue::as_str), Some("string"));
    }

    #[test]
    fn test_missing_and_foreign_uris() {
        let dir = TempDir::new().unwrap();
        let resolve = source(&dir);
        assert!(matches!(
            resolve(&Url::parse("https://schemas.example/none.json").unwrap()),
            Err(FetchError::NotFound { .. })
        ));
        assert!(matches!(
            resolve(&Url::parse("https://elsewhere.example/a.json").unwrap()),
            Err(FetchError::NotFound { .. })
        ));
    }

    #[test]
    fn test_invalid_json_is_a_failure() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("broken.json"), "{").unwrap();
        let resolve = source(&dir);
        assert!(matches!(
            resolve(&Url::parse("https://schemas.example/broken.json").unwrap()),
            Err(FetchError::Failed { .. })
        ));
    }
}
