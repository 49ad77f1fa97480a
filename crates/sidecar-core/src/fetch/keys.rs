//! Named filename patterns ("input keys") used to pick which inputs to fetch.

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeMap;

/// Key the checksum activity fetches with.
pub const HDF_KEY: &str = "hdf";

/// Built-in keys: `hdf` matches `*.hdf`, `all` matches everything.
pub const DEFAULT_INPUT_KEYS: &[(&str, &str)] = &[(HDF_KEY, r"^.*\.hdf$"), ("all", r".*")];

#[derive(Debug, Clone)]
pub struct InputKeys {
    patterns: BTreeMap<String, Regex>,
}

impl Default for InputKeys {
    fn default() -> Self {
        let patterns = DEFAULT_INPUT_KEYS
            .iter()
            .map(|(name, pat)| {
                let re = Regex::new(pat)
                    .unwrap_or_else(|e| panic!("built-in pattern {}: {}", name, e));
                (name.to_string(), re)
            })
            .collect();
        Self { patterns }
    }
}

impl InputKeys {
    /// Defaults plus `overrides` (name -> regex); an override replaces a built-in of the same name.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Result<Self> {
        let mut keys = Self::default();
        for (name, pat) in overrides {
            let re = Regex::new(pat)
                .with_context(|| format!("invalid pattern for input key {:?}", name))?;
            keys.patterns.insert(name.clone(), re);
        }
        Ok(keys)
    }

    pub fn pattern(&self, key: &str) -> Option<&Regex> {
        self.patterns.get(key)
    }

    /// Files whose locator matches `key`'s pattern, in input order.
    pub fn select<'a>(&self, key: &str, files: &'a [String]) -> Result<Vec<&'a str>> {
        let re = self
            .pattern(key)
            .with_context(|| format!("unknown input key {:?}", key))?;
        Ok(files
            .iter()
            .map(String::as_str)
            .filter(|f| re.is_match(f))
            .collect())
    }
}
