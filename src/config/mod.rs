//! Configuration management for the module framework
//!
//! Handles configuration loading and per-module configuration lookup. The
//! manager stores the active configuration in the communication repository
//! under [`FrameworkConfigSource`] so any module can read it during its
//! configure step.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::module::communication::ModuleAnchor;
use crate::module::traits::ModuleError;
use crate::repository::{DefaultProvidingKnowledgeSource, KnowledgeSource};

/// Framework configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameworkConfig {
    /// List of enabled modules by short name (empty = all registered)
    #[serde(default)]
    pub enabled_modules: Vec<String>,

    /// Module-specific configuration overrides, keyed by short module name
    #[serde(default)]
    pub module_configs: HashMap<String, HashMap<String, String>>,

    /// Log the resolved module order at info level
    #[serde(default)]
    pub trace_resolution: bool,
}

impl FrameworkConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ModuleError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Configuration map for one module, empty if none was declared.
    pub fn module_config(&self, name: &str) -> HashMap<String, String> {
        self.module_configs.get(name).cloned().unwrap_or_default()
    }
}

/// Repository key under which the manager publishes the active
/// [`FrameworkConfig`]. Reads fall back to the default configuration.
pub struct FrameworkConfigSource;

impl KnowledgeSource<ModuleAnchor> for FrameworkConfigSource {
    type Value = FrameworkConfig;
}

impl DefaultProvidingKnowledgeSource<ModuleAnchor> for FrameworkConfigSource {
    fn default_value() -> FrameworkConfig {
        FrameworkConfig::default()
    }
}
