// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON configuration loading.
//!
//! The file carries a top-level `processes` array. Unknown attributes are
//! ignored; `wait` accepts an integer or a numeric string; `depends` keeps
//! only string-typed elements.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::process::ProcessSpec;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct ConfigFile {
    #[serde(default)]
    processes: Vec<ProcessEntry>,
}

#[derive(Deserialize)]
struct ProcessEntry {
    id: String,
    exec: String,
    #[serde(default, deserialize_with = "int_or_numeric_string")]
    wait: u64,
    #[serde(default)]
    restart_delay: u64,
    #[serde(default, deserialize_with = "string_elements")]
    depends: Vec<String>,
    #[serde(default)]
    restart_on_parent_death: bool,
    #[serde(default)]
    monitored: bool,
    #[serde(default)]
    skip: bool,
}

impl From<ProcessEntry> for ProcessSpec {
    fn from(e: ProcessEntry) -> Self {
        Self {
            id: e.id,
            exec: e.exec,
            wait_seconds: e.wait,
            restart_delay_seconds: e.restart_delay,
            depends: e.depends,
            restart_on_parent_death: e.restart_on_parent_death,
            monitored: e.monitored,
            skip: e.skip,
        }
    }
}

/// Accept `"wait": 5` and `"wait": "5"` alike.
fn int_or_numeric_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match &value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| serde::de::Error::custom(format!("expected a non-negative integer, got {n}"))),
        serde_json::Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("expected a numeric string, got {s:?}"))),
        other => Err(serde::de::Error::custom(format!(
            "expected an integer or numeric string, got {other}"
        ))),
    }
}

/// Keep only string-typed array elements.
fn string_elements<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(values.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
}

/// Parse a configuration document into process specs, in file order.
pub fn parse_config(text: &str) -> Result<Vec<ProcessSpec>, ConfigError> {
    let file: ConfigFile = serde_json::from_str(text)?;
    Ok(file.processes.into_iter().map(ProcessSpec::from).collect())
}

/// Read and parse a configuration file.
pub fn load_config(path: &Path) -> Result<Vec<ProcessSpec>, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
    parse_config(&text)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
