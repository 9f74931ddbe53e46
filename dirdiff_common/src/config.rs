use crate::{AppConfig, DirDiffError};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "dirdiff.toml";

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub path: PathBuf,
    pub exists: bool,
    pub portable: bool,
}

pub fn load_config(prefer_portable: bool) -> Result<LoadedConfig, DirDiffError> {
    let (path, portable) = resolve_config_path(prefer_portable)?;
    load_config_from(&path, portable)
}

/// Load a config file from an explicit location; a missing file yields defaults
pub fn load_config_from(path: &Path, portable: bool) -> Result<LoadedConfig, DirDiffError> {
    let exists = path.exists();

    let mut config = if exists {
        let data = fs::read_to_string(path)?;
        toml::from_str(&data).map_err(|e| DirDiffError::Serialization(e.to_string()))?
    } else {
        AppConfig::default()
    };

    config.portable_mode = portable;

    Ok(LoadedConfig {
        config,
        path: path.to_path_buf(),
        exists,
        portable,
    })
}

pub fn ensure_config(prefer_portable: bool) -> Result<LoadedConfig, DirDiffError> {
    let loaded = load_config(prefer_portable)?;
    if !loaded.exists {
        save_config(&loaded.path, &loaded.config)?;
    }
    Ok(loaded)
}

pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), DirDiffError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let data = toml::to_string_pretty(config)
        .map_err(|e| DirDiffError::Serialization(e.to_string()))?;
    fs::write(path, data)?;
    Ok(())
}

fn resolve_config_path(prefer_portable: bool) -> Result<(PathBuf, bool), DirDiffError> {
    if let Some(portable_path) = portable_config_path() {
        if prefer_portable || portable_path.exists() {
            return Ok((portable_path, true));
        }
    }

    let dirs = ProjectDirs::from("", "", "dirdiff")
        .ok_or_else(|| DirDiffError::Config("Unable to determine config directory".to_string()))?;
    Ok((dirs.config_dir().join(CONFIG_FILE_NAME), false))
}

fn portable_config_path() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.parent().map(|dir| dir.join(CONFIG_FILE_NAME)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DiffAlgorithm;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let loaded = load_config_from(&temp.path().join(CONFIG_FILE_NAME), false).unwrap();
        assert!(!loaded.exists);
        assert!(loaded.config.exclude_names.is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join(CONFIG_FILE_NAME);
        let config = AppConfig {
            exclude_names: vec!["target".to_string(), "dist".to_string()],
            show_all_context: true,
            diff_algorithm: DiffAlgorithm::Patience,
            portable_mode: false,
        };
        save_config(&path, &config).unwrap();

        let loaded = load_config_from(&path, true).unwrap();
        assert!(loaded.exists);
        assert!(loaded.portable);
        assert!(loaded.config.portable_mode);
        assert_eq!(loaded.config.exclude_names, config.exclude_names);
        assert!(loaded.config.show_all_context);
        assert_eq!(loaded.config.diff_algorithm, DiffAlgorithm::Patience);
    }

    #[test]
    fn test_invalid_config_is_serialization_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "exclude_names = 5").unwrap();

        let err = load_config_from(&path, false).unwrap_err();
        assert!(matches!(err, DirDiffError::Serialization(_)));
    }

    #[test]
    fn test_portable_resolution_uses_executable_dir() {
        let (path, portable) = resolve_config_path(true).unwrap();
        let exe_dir = std::env::current_exe().unwrap().parent().unwrap().to_path_buf();

        assert!(portable);
        assert_eq!(path, exe_dir.join(CONFIG_FILE_NAME));
    }

    #[test]
    fn test_default_resolution_uses_project_dirs() {
        // A config beside the executable takes precedence
        if portable_config_path().map_or(false, |path| path.exists()) {
            return;
        }

        let (path, portable) = resolve_config_path(false).unwrap();
        let dirs = ProjectDirs::from("", "", "dirdiff").unwrap();

        assert!(!portable);
        assert_eq!(path, dirs.config_dir().join(CONFIG_FILE_NAME));
    }
}
