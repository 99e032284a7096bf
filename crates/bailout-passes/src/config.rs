//! Pass configuration.
//!
//! Hosts either build a `DesugarConfig` directly or hand over plugin options
//! as TOML:
//!
//! ```toml
//! marker = "unwrap"
//! standard-containers = true
//!
//! [[containers]]
//! type = "Either"
//! failure-test = "isLeft"
//! failure-payload = "getLeft"
//! success-payload = "getRight"
//! failure-ctor = "left"
//! success-ctor = "right"
//! ```

use bailout_tree::Symbol;
use serde::Deserialize;

use crate::catalog::{Catalog, ContainerDescriptor};
use crate::errors::ConfigError;

#[derive(Clone, Debug)]
pub struct DesugarConfig {
    /// Reserved zero-argument method name that triggers the rewrite.
    pub marker: Symbol,
    pub catalog: Catalog,
    /// Upper bound on fixpoint passes. `None` derives the bound from the
    /// number of marker calls in the unit.
    pub max_passes: Option<usize>,
}

impl DesugarConfig {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            marker: Symbol::new("unwrap"),
            catalog,
            max_passes: None,
        }
    }

    pub fn with_marker(mut self, marker: Symbol) -> Self {
        self.marker = marker;
        self
    }

    pub fn with_max_passes(mut self, n: usize) -> Self {
        self.max_passes = Some(n);
        self
    }

    /// Parse plugin options. Custom containers are appended after the
    /// standard ones unless `standard-containers = false`.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(text)?;
        let mut descriptors = Vec::new();
        if raw.standard_containers {
            descriptors.extend(Catalog::standard().iter().map(|(_, d)| d.clone()));
        }
        descriptors.extend(raw.containers);
        let catalog = Catalog::new(descriptors)?;
        Ok(Self {
            marker: raw.marker,
            catalog,
            max_passes: raw.max_passes,
        })
    }
}

impl Default for DesugarConfig {
    fn default() -> Self {
        Self::new(Catalog::standard())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawConfig {
    #[serde(default = "default_marker")]
    marker: Symbol,
    #[serde(default = "default_true")]
    standard_containers: bool,
    #[serde(default)]
    containers: Vec<ContainerDescriptor>,
    #[serde(default)]
    max_passes: Option<usize>,
}

fn default_marker() -> Symbol {
    Symbol::new("unwrap")
}

fn default_true() -> bool {
    true
}
