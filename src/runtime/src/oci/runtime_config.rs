//! Runtime configuration document (`config.json` in a bundle).
//!
//! The schema belongs to the image tool. Only the handful of fields a build
//! needs are read or rewritten; everything else is carried through as-is.

use std::collections::HashMap;
use std::path::Path;

use orca_core::error::{BuildError, Result};
use serde_json::{Map, Value};

/// A runtime configuration, held as raw JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig(Value);

impl RuntimeConfig {
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| {
            BuildError::IoError(std::io::Error::new(
                e.kind(),
                format!("Failed to read runtime config {}: {}", path.display(), e),
            ))
        })?;
        Ok(Self(serde_json::from_slice(&data)?))
    }

    /// Write the configuration back out.
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_vec_pretty(&self.0)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// `process.env` split into `(name, value)` pairs, in order.
    ///
    /// Entries without `=` are treated as set to the empty string.
    pub fn env(&self) -> Vec<(String, String)> {
        self.0["process"]["env"]
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|entry| match entry.split_once('=') {
                        Some((k, v)) => (k.to_string(), v.to_string()),
                        None => (entry.to_string(), String::new()),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// `process.args`.
    pub fn args(&self) -> Vec<String> {
        self.0["process"]["args"]
            .as_array()
            .map(|a| a.iter().filter_map(Value::as_str).map(String::from).collect())
            .unwrap_or_default()
    }

    /// `process.cwd`, defaulting to `/`.
    pub fn cwd(&self) -> String {
        self.0["process"]["cwd"]
            .as_str()
            .filter(|s| !s.is_empty())
            .unwrap_or("/")
            .to_string()
    }

    pub fn set_args(&mut self, args: Vec<String>) -> Result<()> {
        self.object("process")?
            .insert("args".to_string(), Value::from(args));
        Ok(())
    }

    pub fn set_terminal(&mut self, terminal: bool) -> Result<()> {
        self.object("process")?
            .insert("terminal".to_string(), Value::Bool(terminal));
        Ok(())
    }

    pub fn set_readonly_root(&mut self, readonly: bool) -> Result<()> {
        self.object("root")?
            .insert("readonly".to_string(), Value::Bool(readonly));
        Ok(())
    }

    /// Append `NAME=value` for every variable not already in `process.env`.
    /// Names set by the image always win.
    pub fn merge_env(&mut self, vars: &HashMap<String, String>) -> Result<()> {
        let existing: Vec<String> = self.env().into_iter().map(|(k, _)| k).collect();

        let mut names: Vec<&String> = vars
            .keys()
            .filter(|name| !existing.contains(name))
            .collect();
        names.sort();

        let process = self.object("process")?;
        let env = process
            .entry("env")
            .or_insert_with(|| Value::Array(Vec::new()));
        let entries = env.as_array_mut().ok_or_else(|| {
            BuildError::SerializationError("process.env is not an array".to_string())
        })?;
        for name in names {
            entries.push(Value::String(format!("{}={}", name, vars[name])));
        }
        Ok(())
    }

    /// Top-level object field, created if missing.
    fn object(&mut self, key: &str) -> Result<&mut Map<String, Value>> {
        let root = self.0.as_object_mut().ok_or_else(|| {
            BuildError::SerializationError("runtime config is not a JSON object".to_string())
        })?;
        root.entry(key)
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .ok_or_else(|| BuildError::SerializationError(format!("{} is not a JSON object", key)))
    }
}
