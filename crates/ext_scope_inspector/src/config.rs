//! Inspector configuration.
//!
//! Loaded from the `[scope_inspector]` table of a TOML file. Every key is
//! optional.
//!
//! ```toml
//! [scope_inspector]
//! actor_prefix = "conn0.thread1"
//! object_actor_prefix = "conn0.obj"
//! max_parent_depth = 32
//! ```

use serde::Deserialize;

use crate::ScopeInspectorError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InspectorConfig {
    /// Prefix of environment actor ids (`{prefix}.environment{n}`)
    pub actor_prefix: String,
    /// Prefix of object actor ids produced by the default grip encoder
    pub object_actor_prefix: String,
    /// Number of parent forms embedded in one form before the chain is cut
    /// with a truncated reference. `None` embeds the whole chain.
    pub max_parent_depth: Option<usize>,
}

/// Parent forms embedded per response unless configured otherwise.
/// serde_json and serde_v8 recurse once per embedded scope.
pub const DEFAULT_MAX_PARENT_DEPTH: usize = 256;

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            actor_prefix: "conn0.thread1".to_string(),
            object_actor_prefix: "conn0.obj".to_string(),
            max_parent_depth: Some(DEFAULT_MAX_PARENT_DEPTH),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    scope_inspector: InspectorConfig,
}

impl InspectorConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ScopeInspectorError> {
        let file: ConfigFile = toml::from_str(source)
            .map_err(|e| ScopeInspectorError::config(e.to_string()))?;
        Ok(file.scope_inspector)
    }
}
