//! Process-wide metadata tags stamped onto every record

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `index`, `source` and `sourcetype` labels shared by all records of one shipper.
///
/// Tags are fixed once the shipper starts; the listener keeps them behind an
/// `Arc` and never hands out a mutable reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataTags {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sourcetype: Option<String>,
}

impl MetadataTags {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_sourcetype(mut self, sourcetype: impl Into<String>) -> Self {
        self.sourcetype = Some(sourcetype.into());
        self
    }

    /// Build tags from a string map. Only `index`, `source` and `sourcetype`
    /// are recognised; other keys are ignored.
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        Self {
            index: map.get("index").cloned(),
            source: map.get("source").cloned(),
            sourcetype: map.get("sourcetype").cloned(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_none() && self.source.is_none() && self.sourcetype.is_none()
    }
}
