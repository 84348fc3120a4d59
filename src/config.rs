// Copyright 2024 Saptak Santra
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

//! Resource manager configuration, loadable from JSON.

use crate::error::{CacheError, Result, ViolationPolicy};
use crate::resources::DirectoryResolver;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Resource manager configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Game installation root
    #[serde(default = "default_game_path")]
    pub game_path: PathBuf,
    /// Directory under `game_path` holding exported characters
    #[serde(default = "default_characters_dir")]
    pub characters_dir: String,
    /// Resolver roots, highest priority first. Relative paths are taken
    /// relative to `game_path`.
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,
    #[serde(default)]
    pub violation_policy: ViolationPolicy,
}

fn default_game_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_characters_dir() -> String {
    "characters".to_string()
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            game_path: default_game_path(),
            characters_dir: default_characters_dir(),
            search_paths: Vec::new(),
            violation_policy: ViolationPolicy::default(),
        }
    }
}

impl ManagerConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| CacheError::ConfigError(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            CacheError::ConfigError(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    pub fn with_violation_policy(mut self, policy: ViolationPolicy) -> Self {
        self.violation_policy = policy;
        self
    }

    /// Location of an exported character file
    pub fn character_path(&self, name: &str) -> PathBuf {
        self.game_path
            .join(&self.characters_dir)
            .join(format!("{name}.chr"))
    }

    /// Resolver over the configured search paths
    pub fn directory_resolver(&self) -> DirectoryResolver {
        DirectoryResolver::new(self.search_paths.iter().map(|p| self.game_path.join(p)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = ManagerConfig::from_json_str(r#"{ "game_path": "/games/bg2" }"#).unwrap();
        assert_eq!(config.characters_dir, "characters");
        assert_eq!(config.violation_policy, ViolationPolicy::Abort);
        assert_eq!(
            config.character_path("imoen"),
            PathBuf::from("/games/bg2/characters/imoen.chr")
        );
    }

    #[test]
    fn test_policy_and_search_paths() {
        let config = ManagerConfig::from_json_str(
            r#"{
                "game_path": "/g",
                "search_paths": ["override", "/abs/data"],
                "violation_policy": "report"
            }"#,
        )
        .unwrap();
        assert_eq!(config.violation_policy, ViolationPolicy::Report);
        let resolver = config.directory_resolver();
        assert_eq!(
            resolver.roots(),
            &[PathBuf::from("/g/override"), PathBuf::from("/abs/data")]
        );
    }

    #[test]
    fn test_bad_json_is_config_error() {
        assert!(matches!(
            ManagerConfig::from_json_str("{ nope"),
            Err(CacheError::ConfigError(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gamedata.json");
        std::fs::write(&path, r#"{ "characters_dir": "chars" }"#).unwrap();
        let config = ManagerConfig::from_file(&path).unwrap();
        assert_eq!(config.characters_dir, "chars");
        assert_eq!(config.game_path, PathBuf::from("."));
    }
}
