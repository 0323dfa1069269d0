//! Configuration parsing and validation
//!
//! This module handles loading the `tooldrawer.yaml` project file.
//!
//! # Project layout
//!
//! - `tooldrawer.yaml` - Project root configuration
//! - `widgets/<name>/spec.json` - Widget definitions
//! - `stencils/<type>/<type>.html` - Component stencils

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// File name looked up when `Config::load` is given a directory
pub const CONFIG_FILE_NAME: &str = "tooldrawer.yaml";

/// Root project configuration from `tooldrawer.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,

    /// Project version
    #[serde(default = "default_version")]
    pub version: String,

    /// Source and output directories
    #[serde(default)]
    pub paths: PathsConfig,

    /// Asset URL settings
    #[serde(default)]
    pub assets: AssetsConfig,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

/// Directory settings, relative to the project root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Widget definitions directory
    #[serde(default = "default_widgets_dir")]
    pub widgets: String,

    /// Component stencils directory
    #[serde(default = "default_stencils_dir")]
    pub stencils: String,

    /// Compiled output directory
    #[serde(default = "default_output_dir")]
    pub output: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            widgets: default_widgets_dir(),
            stencils: default_stencils_dir(),
            output: default_output_dir(),
        }
    }
}

fn default_widgets_dir() -> String {
    "widgets".to_string()
}

fn default_stencils_dir() -> String {
    "stencils".to_string()
}

fn default_output_dir() -> String {
    ".tooldrawer/compiled".to_string()
}

/// Asset URL settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Origin that serves widget and component assets
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:4000".to_string()
}

/// Main configuration container
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Base path of the project
    pub base_path: PathBuf,
}

impl Config {
    /// Load configuration from a directory
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the project directory or tooldrawer.yaml file
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let config = Config::load("./my-widgets")?;
    /// println!("Project: {}", config.project.name);
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let (config_path, base_path) = if path.is_dir() {
            (path.join(CONFIG_FILE_NAME), path.to_path_buf())
        } else {
            (
                path.to_path_buf(),
                path.parent().unwrap_or(Path::new(".")).to_path_buf(),
            )
        };

        if !config_path.exists() {
            return Err(Error::ConfigNotFound {
                path: config_path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(&config_path)?;
        let project: ProjectConfig = serde_yaml::from_str(&contents)?;

        if project.name.trim().is_empty() {
            return Err(Error::ConfigInvalid {
                message: "project name cannot be empty".to_string(),
            });
        }
        tracing::debug!(path = %config_path.display(), name = %project.name, "loaded project config");

        Ok(Self { project, base_path })
    }

    /// Absolute widgets directory
    pub fn widgets_dir(&self) -> PathBuf {
        self.base_path.join(&self.project.paths.widgets)
    }

    /// Absolute stencils directory
    pub fn stencils_dir(&self) -> PathBuf {
        self.base_path.join(&self.project.paths.stencils)
    }

    /// Absolute compiled output directory
    pub fn output_dir(&self) -> PathBuf {
        self.base_path.join(&self.project.paths.output)
    }

    /// Path of a widget's `spec.json`
    pub fn widget_spec_path(&self, widgetname: &str) -> PathBuf {
        self.widgets_dir().join(widgetname).join("spec.json")
    }

    /// Path of a widget's compiled output
    pub fn compiled_path(&self, widgetname: &str) -> PathBuf {
        self.output_dir().join(format!("{widgetname}.json"))
    }

    /// Names of every widget directory holding a `spec.json`, sorted
    pub fn widget_names(&self) -> Result<Vec<String>> {
        let dir = self.widgets_dir();
        if !dir.exists() {
            return Ok(vec![]);
        }

        let mut names: Vec<String> = std::fs::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().join("spec.json").is_file())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r#"
name: test-project
"#;
        let config: ProjectConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.name, "test-project");
        assert_eq!(config.version, "0.1.0");
        assert_eq!(config.paths.widgets, "widgets");
        assert_eq!(config.paths.stencils, "stencils");
        assert_eq!(config.paths.output, ".tooldrawer/compiled");
        assert_eq!(config.assets.base_url, "http://localhost:4000");
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
name: test-project
version: "1.0.0"
paths:
  widgets: src/widgets
  stencils: dieter/components
  output: dist
assets:
  base_url: "https://cdn.example.com"
"#;
        let config: ProjectConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.version, "1.0.0");
        assert_eq!(config.paths.widgets, "src/widgets");
        assert_eq!(config.paths.stencils, "dieter/components");
        assert_eq!(config.paths.output, "dist");
        assert_eq!(config.assets.base_url, "https://cdn.example.com");
    }

    #[test]
    fn test_load_missing_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = Config::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    fn test_load_rejects_blank_name() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "name: \"  \"\n").unwrap();
        let err = Config::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { .. }));
    }

    #[test]
    fn test_widget_names_lists_spec_dirs() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "name: test\n").unwrap();
        for name in ["faq", "countdown"] {
            let widget_dir = dir.path().join("widgets").join(name);
            std::fs::create_dir_all(&widget_dir).unwrap();
            std::fs::write(widget_dir.join("spec.json"), "{}").unwrap();
        }
        std::fs::create_dir_all(dir.path().join("widgets/empty")).unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.widget_names().unwrap(), vec!["countdown", "faq"]);
        assert_eq!(
            config.widget_spec_path("faq"),
            dir.path().join("widgets/faq/spec.json")
        );
        assert_eq!(
            config.compiled_path("faq"),
            dir.path().join(".tooldrawer/compiled/faq.json")
        );
    }
}
