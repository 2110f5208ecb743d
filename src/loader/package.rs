//! Ambient module system lookup via the nearest `package.json`.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use super::context::ModuleSystem;
use super::error::LoadError;

/// Package manifest file name.
pub const MANIFEST: &str = "package.json";

/// The only part of a manifest resolution cares about.
#[derive(Debug, Deserialize)]
struct PackageManifest {
    #[serde(rename = "type", default)]
    package_type: Option<Value>,
}

/// Nearest `package.json` at or above `dir`.
pub fn find_manifest(dir: &Path) -> Option<PathBuf> {
    dir.ancestors()
        .map(|ancestor| ancestor.join(MANIFEST))
        .find(|candidate| candidate.is_file())
}

/// Module system declared by the package enclosing `dir`.
///
/// `"type": "module"` means ESM; any other value, or no manifest at all,
/// means CommonJS. A manifest that is not a JSON object is an error.
pub fn ambient_module_system(dir: &Path) -> Result<ModuleSystem, LoadError> {
    let Some(manifest_path) = find_manifest(dir) else {
        return Ok(ModuleSystem::Cjs);
    };

    let content = std::fs::read_to_string(&manifest_path).map_err(|source| LoadError::Io {
        path: manifest_path.clone(),
        source,
    })?;

    let manifest: PackageManifest =
        serde_json::from_str(&content).map_err(|e| LoadError::InvalidPackageManifest {
            path: manifest_path.clone(),
            reason: e.to_string(),
        })?;

    let system = match manifest.package_type.as_ref().and_then(Value::as_str) {
        Some("module") => ModuleSystem::Esm,
        _ => ModuleSystem::Cjs,
    };
    Ok(system)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_no_manifest_is_cjs() {
        let temp_dir = TempDir::new().unwrap();
        // The temp dir may live under a directory with its own package.json;
        // only assert when nothing is found
        if find_manifest(temp_dir.path()).is_none() {
            assert_eq!(
                ambient_module_system(temp_dir.path()).unwrap(),
                ModuleSystem::Cjs
            );
        }
    }

    #[test]
    fn test_type_module_is_esm() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(MANIFEST), r#"{"type":"module"}"#).unwrap();

        assert_eq!(
            ambient_module_system(temp_dir.path()).unwrap(),
            ModuleSystem::Esm
        );
    }

    #[test]
    fn test_other_types_are_cjs() {
        let temp_dir = TempDir::new().unwrap();
        for manifest in [r#"{"type":"commonjs"}"#, r#"{"name":"x"}"#, r#"{"type":7}"#] {
            fs::write(temp_dir.path().join(MANIFEST), manifest).unwrap();
            assert_eq!(
                ambient_module_system(temp_dir.path()).unwrap(),
                ModuleSystem::Cjs,
                "manifest {manifest}"
            );
        }
    }

    #[test]
    fn test_nearest_manifest_wins() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("lib").join("inner");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp_dir.path().join(MANIFEST), r#"{"type":"module"}"#).unwrap();
        fs::write(
            temp_dir.path().join("lib").join(MANIFEST),
            r#"{"type":"commonjs"}"#,
        )
        .unwrap();

        assert_eq!(ambient_module_system(&nested).unwrap(), ModuleSystem::Cjs);
        assert_eq!(
            find_manifest(&nested),
            Some(temp_dir.path().join("lib").join(MANIFEST))
        );
    }

    #[test]
    fn test_malformed_manifest() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(MANIFEST), "{ not json").unwrap();

        let err = ambient_module_system(temp_dir.path()).unwrap_err();
        assert!(matches!(err, LoadError::InvalidPackageManifest { .. }));
    }
}
