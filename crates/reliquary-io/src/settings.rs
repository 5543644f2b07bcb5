// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


//! Configuration for the resource manager.

use reliquary_core::{ResourceError, ResourceResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings applied when a [`ResourceManager`](crate::ResourceManager) is built.
///
/// Deserialized from RON. Every field is optional in the source text and
/// falls back to its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceSettings {
    /// The caching policy given to newly registered kinds.
    pub default_caching: bool,
    /// Slots pre-reserved in the identity table.
    pub identity_capacity: usize,
    /// The namespace resource metrics are registered under.
    pub metrics_namespace: String,
    /// If `false`, the manager does not register or record metrics.
    pub record_metrics: bool,
}

impl Default for ResourceSettings {
    fn default() -> Self {
        Self {
            default_caching: true,
            identity_capacity: 256,
            metrics_namespace: "resources".to_string(),
            record_metrics: true,
        }
    }
}

impl ResourceSettings {
    /// Parses settings from RON text.
    pub fn from_ron_str(text: &str) -> ResourceResult<Self> {
        ron::from_str(text).map_err(|e| ResourceError::Settings(e.to_string()))
    }

    /// Reads and parses a RON settings file.
    pub fn load(path: impl AsRef<Path>) -> ResourceResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }

    /// Serializes the settings to pretty-printed RON.
    pub fn to_ron_string(&self) -> ResourceResult<String> {
        let pretty_config = ron::ser::PrettyConfig::default().indentor("  ".to_string());
        ron::ser::to_string_pretty(self, pretty_config)
            .map_err(|e| ResourceError::Settings(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings = ResourceSettings::from_ron_str("(default_caching: false)").unwrap();
        assert!(!settings.default_caching);
        assert_eq!(settings.identity_capacity, 256);
        assert_eq!(settings.metrics_namespace, "resources");
        assert!(settings.record_metrics);

        assert_eq!(
            ResourceSettings::from_ron_str("()").unwrap(),
            ResourceSettings::default()
        );
    }

    #[test]
    fn test_invalid_text_is_a_settings_error() {
        let err = ResourceSettings::from_ron_str("(identity_capacity: \"many\")").unwrap_err();
        assert!(matches!(err, ResourceError::Settings(_)));
    }

    #[test]
    fn test_pretty_output_parses_back() {
        let settings = ResourceSettings {
            metrics_namespace: "assets".to_string(),
            ..Default::default()
        };
        let text = settings.to_ron_string().unwrap();
        assert!(text.contains("metrics_namespace: \"assets\""));
        assert_eq!(ResourceSettings::from_ron_str(&text).unwrap(), settings);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resources.ron");
        std::fs::write(&path, "(identity_capacity: 8, record_metrics: false)").unwrap();

        let settings = ResourceSettings::load(&path).unwrap();
        assert_eq!(settings.identity_capacity, 8);
        assert!(!settings.record_metrics);
        assert!(ResourceSettings::load(dir.path().join("missing.ron")).is_err());
    }
}
