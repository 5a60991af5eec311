//! Validator settings.
//!
//! Library callers normally use [`ValidatorConfig::default`]; the batch
//! driver can read overrides from a JSON file. Missing keys fall back to
//! their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::reaction::DEFAULT_MAX_COMBINATIONS;

pub const UNIPROT_SPARQL_ENDPOINT: &str = "https://sparql.uniprot.org/sparql";
pub const WIKIDATA_SPARQL_ENDPOINT: &str = "https://query.wikidata.org/sparql";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Cap on template-match combinations for one reaction application.
    pub max_match_combinations: usize,
    /// Substrates with more fragments than this are not permuted.
    pub max_permutation_fragments: usize,
    pub xref: XrefConfig,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_match_combinations: DEFAULT_MAX_COMBINATIONS,
            max_permutation_fragments: 8,
            xref: XrefConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XrefConfig {
    pub uniprot_endpoint: String,
    pub wikidata_endpoint: String,
    /// Per-request timeout.
    pub timeout_secs: f64,
}

impl Default for XrefConfig {
    fn default() -> Self {
        Self {
            uniprot_endpoint: UNIPROT_SPARQL_ENDPOINT.to_string(),
            wikidata_endpoint: WIKIDATA_SPARQL_ENDPOINT.to_string(),
            timeout_secs: std::f64::consts::PI,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ValidatorConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}
