use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ManifestError;

pub const MANIFEST_FILE: &str = "manifest.json";

/// The parts of `manifest.json` that packaging depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestInfo {
    pub name: String,
    pub version: String,
    /// Add-on id from `applications.gecko.id` (or `browser_specific_settings.gecko.id`).
    pub application_id: String,
}

/// Read and validate `<source_dir>/manifest.json`.
pub async fn resolve_manifest(source_dir: &Path) -> Result<ManifestInfo, ManifestError> {
    let path = source_dir.join(MANIFEST_FILE);

    let contents = match tokio::fs::read_to_string(&path).await {
        Ok(c) => c,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ManifestError::NotFound { path });
        }
        Err(source) => return Err(ManifestError::Read { path, source }),
    };

    parse_manifest(&contents, &path)
}

/// Parse and validate manifest contents. `path` is only used in error messages.
pub fn parse_manifest(contents: &str, path: &Path) -> Result<ManifestInfo, ManifestError> {
    let manifest: Value = serde_json::from_str(contents).map_err(|source| ManifestError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let name = string_at(&manifest, &["name"]);
    let version = string_at(&manifest, &["version"]);
    let application_id = string_at(&manifest, &["applications", "gecko", "id"])
        .or_else(|| string_at(&manifest, &["browser_specific_settings", "gecko", "id"]));

    let mut missing = Vec::new();
    if name.is_none() {
        missing.push("name".to_string());
    }
    if version.is_none() {
        missing.push("version".to_string());
    }
    if application_id.is_none() {
        missing.push("applications.gecko.id".to_string());
    }

    match (name, version, application_id) {
        (Some(name), Some(version), Some(application_id)) => Ok(ManifestInfo {
            name,
            version,
            application_id,
        }),
        _ => Err(ManifestError::MissingProperties {
            path: path.to_path_buf(),
            missing,
        }),
    }
}

fn string_at(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .try_fold(value, |v, key| v.get(*key))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const VALID: &str = r#"{
        "manifest_version": 2,
        "name": "Example Ext",
        "version": "1.2",
        "applications": { "gecko": { "id": "example@tests.local" } }
    }"#;

    #[tokio::test]
    async fn test_resolve_valid_manifest() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), VALID).unwrap();

        let info = resolve_manifest(dir.path()).await.unwrap();
        assert_eq!(
            info,
            ManifestInfo {
                name: "Example Ext".into(),
                version: "1.2".into(),
                application_id: "example@tests.local".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_missing_manifest_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_manifest(dir.path()).await.unwrap_err();
        assert!(matches!(err, ManifestError::NotFound { .. }), "{err:?}");
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = parse_manifest("{ not json", Path::new("manifest.json")).unwrap_err();
        assert!(matches!(err, ManifestError::Parse { .. }), "{err:?}");
        assert!(err.to_string().contains("manifest.json"));
    }

    #[test]
    fn test_all_missing_properties_are_reported() {
        let err = parse_manifest(r#"{"version": 3}"#, Path::new("manifest.json")).unwrap_err();
        match err {
            ManifestError::MissingProperties { missing, .. } => {
                assert_eq!(missing, vec!["name", "version", "applications.gecko.id"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_browser_specific_settings_id_is_accepted() {
        let info = parse_manifest(
            r#"{"name": "x", "version": "1",
                "browser_specific_settings": {"gecko": {"id": "x@y"}}}"#,
            Path::new("manifest.json"),
        )
        .unwrap();
        assert_eq!(info.application_id, "x@y");
    }
}
