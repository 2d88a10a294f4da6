//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/rollup/rollup.toml`
//! 3. Local config: `--config <file>`, or `./.rollup.toml` when present
//! 4. Environment variables: `ROLLUP_*` prefix, `__` between sections

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, Map};
use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::application::render::{RenderOptions, RenderStyle, MAX_PRECISION};
use crate::application::{ApplicationError, Reducer};
use crate::domain::{ReparentPolicy, TreeBuilder, DEFAULT_SENTINEL};

/// Name of the local config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = ".rollup.toml";

/// Presentation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderSettings {
    /// Default output layout
    pub style: RenderStyle,
    /// Title of the value column
    pub value_column: String,
    /// Depth marker in the human layout
    pub human_indent: String,
    /// Depth marker in the csv layout
    pub tabular_indent: String,
    /// Suppress rows whose value is exactly zero
    pub hide_zero: bool,
    /// Decimal places
    pub precision: usize,
    /// Width of the value column in the human layout
    pub value_width: usize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            style: RenderStyle::Human,
            value_column: "Value".into(),
            human_indent: RenderStyle::Human.default_indent().into(),
            tabular_indent: RenderStyle::Csv.default_indent().into(),
            hide_zero: true,
            precision: 2,
            value_width: 20,
        }
    }
}

/// Raw render settings for intermediate parsing (`None` → not specified, inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawRenderSettings {
    pub style: Option<RenderStyle>,
    pub value_column: Option<String>,
    pub human_indent: Option<String>,
    pub tabular_indent: Option<String>,
    pub hide_zero: Option<bool>,
    pub precision: Option<usize>,
    pub value_width: Option<usize>,
}

impl RenderSettings {
    /// Overlay wins where it specifies a value.
    pub fn merge(&self, overlay: &RawRenderSettings) -> Self {
        Self {
            style: overlay.style.unwrap_or(self.style),
            value_column: overlay
                .value_column
                .clone()
                .unwrap_or_else(|| self.value_column.clone()),
            human_indent: overlay
                .human_indent
                .clone()
                .unwrap_or_else(|| self.human_indent.clone()),
            tabular_indent: overlay
                .tabular_indent
                .clone()
                .unwrap_or_else(|| self.tabular_indent.clone()),
            hide_zero: overlay.hide_zero.unwrap_or(self.hide_zero),
            precision: overlay.precision.unwrap_or(self.precision),
            value_width: overlay.value_width.unwrap_or(self.value_width),
        }
    }

    /// Render options for `style`, using the matching indent.
    pub fn options_for(&self, style: RenderStyle) -> RenderOptions {
        let indent = match style {
            RenderStyle::Csv => &self.tabular_indent,
            RenderStyle::Human | RenderStyle::Tree => &self.human_indent,
        };
        RenderOptions {
            style,
            value_column: self.value_column.clone(),
            indent: Some(indent.clone()),
            focus: None,
            max_depth: None,
            hide_zero: self.hide_zero,
            precision: self.precision,
            value_width: self.value_width,
        }
    }
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub sentinel: Option<String>,
    pub reparent: Option<ReparentPolicy>,
    pub reducer: Option<Reducer>,
    pub default_leaf_value: Option<f64>,
    #[serde(default)]
    pub render: RawRenderSettings,
}

/// Unified configuration for rollup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Parent token marking the root record (default: "None")
    pub sentinel: String,
    /// Handling of a child claimed by a second parent
    pub reparent: ReparentPolicy,
    /// Default combination of child values
    pub reducer: Reducer,
    /// Value for leaves missing from the values file; unset means error
    pub default_leaf_value: Option<f64>,
    /// Output settings
    pub render: RenderSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sentinel: DEFAULT_SENTINEL.into(),
            reparent: ReparentPolicy::default(),
            reducer: Reducer::default(),
            default_leaf_value: None,
            render: RenderSettings::default(),
        }
    }
}

/// Get the XDG config directory for rollup.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "rollup").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("rollup.toml"))
}

/// Get the path to the local config file in `dir`.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(LOCAL_CONFIG_FILE)
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Merge overlay config onto self (base): overlay wins where specified.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            sentinel: overlay
                .sentinel
                .clone()
                .unwrap_or_else(|| self.sentinel.clone()),
            reparent: overlay.reparent.unwrap_or(self.reparent),
            reducer: overlay.reducer.unwrap_or(self.reducer),
            default_leaf_value: overlay.default_leaf_value.or(self.default_leaf_value),
            render: self.render.merge(&overlay.render),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local` - Explicit local config file; must exist when given.
    ///   Without it `./.rollup.toml` is used if present.
    pub fn load(local: Option<&Path>) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 3. Local config
        let local_path = match local {
            Some(path) => Some(path.to_path_buf()),
            None => std::env::current_dir()
                .ok()
                .map(|dir| local_config_path(&dir))
                .filter(|path| path.exists()),
        };
        if let Some(path) = local_path {
            let raw = load_raw_settings(&path)?;
            current = current.merge_with(&raw);
        }

        // 4. Environment variables (explicit override)
        current = Self::apply_env_overrides(current)?;

        current.validate()?;
        Ok(current)
    }

    /// Load from defaults plus one file only, no global config and no environment.
    pub fn load_file(path: &Path) -> Result<Self, ApplicationError> {
        let raw = load_raw_settings(path)?;
        let settings = Self::default().merge_with(&raw);
        settings.validate()?;
        Ok(settings)
    }

    /// Apply ROLLUP_* environment variables as explicit overrides.
    fn apply_env_overrides(settings: Self) -> Result<Self, ApplicationError> {
        Self::apply_env_source(settings, None)
    }

    /// Apply overrides from `source`, or from the process environment when None.
    ///
    /// Unset keys are skipped; a set but unparsable value is a config error.
    fn apply_env_source(
        mut settings: Self,
        source: Option<Map<String, String>>,
    ) -> Result<Self, ApplicationError> {
        // Use config crate just for env var parsing
        let builder = Config::builder().add_source(
            Environment::with_prefix("ROLLUP")
                .prefix_separator("_")
                .separator("__")
                .source(source),
        );

        let config = builder.build().map_err(config_err)?;

        if let Some(val) = env_value(&config, "sentinel")? {
            settings.sentinel = val;
        }
        if let Some(val) = env_value(&config, "reparent")? {
            settings.reparent = val;
        }
        if let Some(val) = env_value(&config, "reducer")? {
            settings.reducer = val;
        }
        if let Some(val) = env_value(&config, "default_leaf_value")? {
            settings.default_leaf_value = Some(val);
        }
        if let Some(val) = env_value(&config, "render.style")? {
            settings.render.style = val;
        }
        if let Some(val) = env_value(&config, "render.value_column")? {
            settings.render.value_column = val;
        }
        if let Some(val) = env_value(&config, "render.human_indent")? {
            settings.render.human_indent = val;
        }
        if let Some(val) = env_value(&config, "render.tabular_indent")? {
            settings.render.tabular_indent = val;
        }
        if let Some(val) = env_value(&config, "render.hide_zero")? {
            settings.render.hide_zero = val;
        }
        if let Some(val) = env_value(&config, "render.precision")? {
            settings.render.precision = val;
        }
        if let Some(val) = env_value(&config, "render.value_width")? {
            settings.render.value_width = val;
        }

        Ok(settings)
    }

    fn validate(&self) -> Result<(), ApplicationError> {
        if self.sentinel.trim().is_empty() || self.sentinel.contains(',') {
            return Err(ApplicationError::Config {
                message: format!("invalid sentinel '{}'", self.sentinel),
            });
        }
        if self.render.precision > MAX_PRECISION {
            return Err(ApplicationError::Config {
                message: format!(
                    "render.precision must be at most {}, got {}",
                    MAX_PRECISION, self.render.precision
                ),
            });
        }
        if self.default_leaf_value.is_some_and(|v| !v.is_finite()) {
            return Err(ApplicationError::Config {
                message: "default_leaf_value must be a finite number".into(),
            });
        }
        if self.render.value_width == 0 {
            return Err(ApplicationError::Config {
                message: "render.value_width must be positive".into(),
            });
        }
        Ok(())
    }

    /// Tree builder configured from these settings.
    pub fn tree_builder(&self) -> TreeBuilder {
        TreeBuilder::new()
            .with_sentinel(self.sentinel.clone())
            .with_policy(self.reparent)
    }

    /// Serialize current settings to TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize: {}", e),
        })
    }

    /// Commented template for `rollup config init`.
    pub fn template() -> String {
        r#"# rollup configuration
# Global: ~/.config/rollup/rollup.toml
# Local:  ./.rollup.toml (or --config <file>)
# Env:    ROLLUP_REDUCER=max, ROLLUP_RENDER__STYLE=csv

# Parent token marking the root record, e.g. "None,Root"
sentinel = "None"

# Child claimed by a second parent: "fail-fast" or "last-writer-wins"
reparent = "fail-fast"

# Combination of child values: sum, min, max, mean, product
reducer = "sum"

# Value for leaves missing from the values file (unset: error)
# default_leaf_value = 0.0

[render]
# human, csv or tree
style = "human"
value_column = "Value"
human_indent = "---"
tabular_indent = "___"
hide_zero = true
precision = 2
value_width = 20
"#
        .to_string()
    }
}

/// Typed value of `key`; None when the variable is not set.
fn env_value<T: DeserializeOwned>(config: &Config, key: &str) -> Result<Option<T>, ApplicationError> {
    match config.get::<T>(key) {
        Ok(val) => Ok(Some(val)),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(ApplicationError::Config {
            message: format!("environment override '{}': {}", key, e),
        }),
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
