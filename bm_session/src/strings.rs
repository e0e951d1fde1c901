use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use toml::Table;
use toml::Value;

use crate::services::Strings;

const BUNDLED: &str = include_str!("../strings/en.toml");

/// Flat key → text table loaded from TOML; nested tables become dotted keys (`button.back`)
#[derive(Debug, Clone, Default)]
pub struct StringTable {
    entries: HashMap<String, String>,
}

impl StringTable {
    /// The English table shipped with the console
    pub fn bundled() -> Self {
        Self::from_toml(BUNDLED).unwrap_or_else(|err| {
            tracing::error!("Bundled string table is invalid: {err:#}");
            Self::default()
        })
    }

    pub fn from_toml(source: &str) -> anyhow::Result<Self> {
        let table: Table = source.parse().context("parsing string table")?;
        let mut entries = HashMap::new();
        flatten("", &table, &mut entries);
        Ok(Self { entries })
    }

    /// Bundled table with the entries of `path` layered on top, when given
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut strings = Self::bundled();
        if let Some(path) = path {
            let source = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            let overrides = Self::from_toml(&source).with_context(|| format!("in {}", path.display()))?;
            tracing::info!(entries = overrides.len(), "Loaded string overrides from {}", path.display());
            strings = strings.with_overrides(overrides);
        }
        Ok(strings)
    }

    pub fn with_overrides(mut self, overrides: StringTable) -> Self {
        self.entries.extend(overrides.entries);
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Strings for StringTable {
    fn lookup(&self, key: &str, params: &[(&str, String)]) -> String {
        let Some(template) = self.entries.get(key) else {
            tracing::warn!(key, "Missing string");
            return key.to_string();
        };
        let mut text = template.clone();
        for (name, value) in params {
            text = text.replace(&format!("{{{name}}}"), value);
        }
        text
    }
}

fn flatten(prefix: &str, table: &Table, out: &mut HashMap<String, String>) {
    for (name, value) in table {
        let key = if prefix.is_empty() { name.clone() } else { format!("{prefix}.{name}") };
        match value {
            Value::Table(inner) => flatten(&key, inner, out),
            Value::String(text) => {
                out.insert(key, text.clone());
            }
            other => {
                out.insert(key, other.to_string());
            }
        }
    }
}
