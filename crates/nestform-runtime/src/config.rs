use crate::{Error, Result};
use nestform_engine::FormsetOptions;
use nestform_render::TemplateGenConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.toml";

/// Resolve the workspace data directory path based on priority:
/// 1. Explicit path (with tilde expansion)
/// 2. NESTFORM_PATH environment variable (with tilde expansion)
/// 3. XDG data directory (recommended default)
/// 4. ~/.nestform (fallback for systems without XDG)
pub fn resolve_workspace_path(explicit_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(expand_tilde(path));
    }

    if let Ok(env_path) = std::env::var("NESTFORM_PATH") {
        return Ok(expand_tilde(&env_path));
    }

    if let Some(data_dir) = dirs::data_dir() {
        return Ok(data_dir.join("nestform"));
    }

    if let Some(home) = std::env::var_os("HOME") {
        return Ok(PathBuf::from(home).join(".nestform"));
    }

    Err(Error::Config(
        "Could not determine workspace path: no HOME directory or XDG data directory found"
            .to_string(),
    ))
}

/// Expand tilde (~) in paths to the user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

/// Relative paths in the config are relative to the data directory.
fn within(data_dir: &Path, path: &Path) -> PathBuf {
    match path.to_str() {
        Some(raw) if raw.starts_with("~/") => expand_tilde(raw),
        _ if path.is_absolute() => path.to_path_buf(),
        _ => data_dir.join(path),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormsConfig {
    pub extra: usize,
    pub max_num: usize,
    pub validate_max: bool,
    pub can_delete: bool,
}

impl Default for FormsConfig {
    fn default() -> Self {
        let options = FormsetOptions::default();
        Self {
            extra: options.extra,
            max_num: options.max_num,
            validate_max: options.validate_max,
            can_delete: options.can_delete,
        }
    }
}

impl FormsConfig {
    pub fn options(&self) -> FormsetOptions {
        FormsetOptions {
            extra: self.extra,
            max_num: self.max_num,
            validate_max: self.validate_max,
            can_delete: self.can_delete,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub database: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("nestform.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    pub output_dir: PathBuf,
    pub extension: String,
    pub bundle: PathBuf,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("templates"),
            extension: nestform_render::generate::DEFAULT_EXTENSION.to_string(),
            bundle: PathBuf::from("templates.bundle.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    /// Save each tree inside one store transaction
    pub atomic: bool,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self { atomic: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub forms: FormsConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub templates: TemplatesConfig,
    #[serde(default)]
    pub save: SaveConfig,
}

impl Config {
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn path_in(data_dir: &Path) -> PathBuf {
        data_dir.join(CONFIG_FILE)
    }

    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        within(data_dir, &self.store.database)
    }

    pub fn templates_dir(&self, data_dir: &Path) -> PathBuf {
        within(data_dir, &self.templates.output_dir)
    }

    pub fn bundle_path(&self, data_dir: &Path) -> PathBuf {
        within(data_dir, &self.templates.bundle)
    }

    pub fn template_gen_config(&self, data_dir: &Path) -> TemplateGenConfig {
        TemplateGenConfig::new(self.templates_dir(data_dir))
            .with_extension(self.templates.extension.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.forms.extra, 1);
        assert_eq!(config.forms.max_num, 1000);
        assert!(config.forms.can_delete);
        assert!(!config.forms.validate_max);
        assert!(config.save.atomic);
    }

    #[test]
    fn test_config_save_and_load() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("nested").join(CONFIG_FILE);

        let mut config = Config::default();
        config.forms.extra = 3;
        config.save.atomic = false;
        config.save_to(&config_path)?;
        assert!(config_path.exists());

        let loaded = Config::load_from(&config_path)?;
        assert_eq!(loaded, config);
        Ok(())
    }

    #[test]
    fn test_partial_file_keeps_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join(CONFIG_FILE);
        std::fs::write(&config_path, "[forms]\nmax_num = 5\n")?;

        let config = Config::load_from(&config_path)?;
        assert_eq!(config.forms.max_num, 5);
        assert_eq!(config.forms.extra, 1);
        assert_eq!(config.templates.extension, "form");
        assert!(config.save.atomic);
        Ok(())
    }

    #[test]
    fn test_load_nonexistent_returns_default() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config = Config::load_from(&temp_dir.path().join("nonexistent.toml"))?;
        assert_eq!(config, Config::default());
        Ok(())
    }

    #[test]
    fn test_paths_resolve_against_data_dir() {
        let mut config = Config::default();
        let data_dir = Path::new("/data/nestform");
        assert_eq!(
            config.database_path(data_dir),
            PathBuf::from("/data/nestform/nestform.db")
        );

        config.templates.output_dir = PathBuf::from("/srv/templates");
        assert_eq!(config.templates_dir(data_dir), PathBuf::from("/srv/templates"));
        assert_eq!(
            config.template_gen_config(data_dir).path_for("TenantForm"),
            PathBuf::from("/srv/templates/TenantForm.form")
        );
    }

    #[test]
    fn test_explicit_workspace_path_wins() -> Result<()> {
        let path = resolve_workspace_path(Some("/tmp/explicit"))?;
        assert_eq!(path, PathBuf::from("/tmp/explicit"));
        Ok(())
    }
}
