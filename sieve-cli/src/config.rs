use serde::{Deserialize, Serialize};
use sieve_engine::{ClassifierConfig, PlaylistSyntax, SplitConfig};
use std::path::Path;

use crate::error::AppError;

/// Classification rules loaded from a TOML file.
///
/// ```toml
/// [syntax]
/// header_prefix = "#EXTM3U"
/// info_prefix = "#EXTINF"
///
/// [classifier]
/// accepted_tokens = ["it"]
/// keywords = ["rai ", "canale 5"]
///
/// [[classifier.attributes]]
/// name = "tvg-language"
/// equals = ["it", "ita"]
/// ```
///
/// A missing `[classifier]` table selects the built-in Italian rules. A
/// present one replaces them entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesFile {
    pub syntax: PlaylistSyntax,
    pub classifier: ClassifierConfig,
}

impl Default for RulesFile {
    fn default() -> Self {
        Self {
            syntax: PlaylistSyntax::default(),
            classifier: ClassifierConfig::italian(),
        }
    }
}

impl RulesFile {
    /// Load rules from `path`, or the defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    AppError::Rules(format!("Failed to read {}: {e}", path.display()))
                })?;
                Self::parse(&content)
                    .map_err(|e| AppError::Rules(format!("{}: {e}", path.display())))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Show the rules as a formatted string
    pub fn show(&self) -> Result<String, AppError> {
        toml::to_string_pretty(self).map_err(|e| AppError::Rules(e.to_string()))
    }

    pub fn into_split_config(self) -> SplitConfig {
        SplitConfig::new(self.syntax, self.classifier)
    }
}
