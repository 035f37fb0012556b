//! Table metadata document
//!
//! The value stored, versioned, and swapped by every update in this crate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stagehand_core::{Result, RetryPolicy};

/// Reserved property that upgrades `format_version` instead of being stored
pub const FORMAT_VERSION_KEY: &str = "format-version";

/// Highest format version this build can write
pub const SUPPORTED_FORMAT_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub format_version: u32,
    pub location: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl TableMetadata {
    /// Format version 1 metadata with no properties
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            format_version: 1,
            location: location.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_format_version(mut self, format_version: u32) -> Self {
        self.format_version = format_version;
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Commit retry settings carried in `commit.retry.*` properties
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailed` when a retry property is malformed.
    pub fn retry_policy(&self) -> Result<RetryPolicy> {
        RetryPolicy::from_properties(&self.properties)
    }
}
