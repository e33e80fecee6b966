//! Layer entries read from a WMS capabilities catalog.

use serde::{Deserialize, Serialize};

/// A named layer advertised by a WMS server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    /// Layer name as used in the GetMap `layers` parameter
    pub name: String,

    /// Human-readable title
    pub title: Option<String>,

    /// Optional description/abstract
    pub description: Option<String>,

    /// CRS/SRS codes declared directly on this layer (not inherited)
    pub crs: Vec<String>,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: None,
            description: None,
            crs: Vec::new(),
        }
    }

    /// Title if the server gave one, otherwise the name.
    pub fn display_name(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.name)
    }

    /// Check if this layer declares a given CRS (case-insensitive).
    pub fn declares_crs(&self, code: &str) -> bool {
        self.crs.iter().any(|c| c.eq_ignore_ascii_case(code))
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
