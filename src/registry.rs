//! AI and model registry types
//!
//! The registry of AI families and their models is owned by the host
//! application; this subsystem only reads it to resolve package directories
//! and to enumerate cache locations. Declaration order is preserved and
//! drives inventory listings and deletions.

use serde::{Deserialize, Serialize};

/// An AI family known to the host application.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Ai {
    /// Display name.
    pub name: String,
    /// Directory segment used under the package root and, lower-cased, in
    /// remote URLs.
    pub pkg_dir: String,
}

impl Ai {
    pub fn new(name: impl Into<String>, pkg_dir: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pkg_dir: pkg_dir.into(),
        }
    }
}

/// A model offered by an AI family.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ModelRef {
    /// Display name.
    pub name: String,
    /// Directory segment for the model, both locally and remotely.
    pub dir: String,
}

impl ModelRef {
    pub fn new(name: impl Into<String>, dir: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
        }
    }
}

/// An AI family together with its declared models.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AiModels {
    #[serde(flatten)]
    pub ai: Ai,

    #[serde(default)]
    pub models: Vec<ModelRef>,
}

/// Ordered registry of AI families and their models.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AiRegistry {
    #[serde(default)]
    pub ais: Vec<AiModels>,
}

impl AiRegistry {
    pub fn new(ais: Vec<AiModels>) -> Self {
        Self { ais }
    }

    /// Iterate AI families in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &AiModels> {
        self.ais.iter()
    }

    /// Look up an AI family by name, ignoring ASCII case.
    pub fn find_ai(&self, name: &str) -> Option<&Ai> {
        self.ais
            .iter()
            .map(|entry| &entry.ai)
            .find(|ai| ai.name.eq_ignore_ascii_case(name))
    }

    pub fn len(&self) -> usize {
        self.ais.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ais.is_empty()
    }
}
