//! Static registry of posting targets.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A posting target: one account on one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub icon_ref: String,
}

impl Platform {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        icon_ref: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            icon_ref: icon_ref.into(),
        }
    }
}

/// Errors building a [`PlatformRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("platform id must not be empty")]
    EmptyId,

    #[error("duplicate platform id: {0}")]
    DuplicateId(String),
}

/// Immutable, ordered list of platforms known at process start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformRegistry {
    platforms: Vec<Platform>,
}

impl PlatformRegistry {
    /// Builds a registry, rejecting empty and duplicate ids.
    pub fn new(platforms: Vec<Platform>) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        for p in &platforms {
            if p.id.trim().is_empty() {
                return Err(RegistryError::EmptyId);
            }
            if !seen.insert(p.id.as_str()) {
                return Err(RegistryError::DuplicateId(p.id.clone()));
            }
        }
        Ok(Self { platforms })
    }

    /// The six accounts served by the posting service.
    pub fn builtin() -> Self {
        let platforms = [
            ("youtube", "YouTube"),
            ("instagram", "Instagram"),
            ("tiktok", "TikTok"),
        ]
        .into_iter()
        .flat_map(|(service, name)| {
            [("personal", "Personal"), ("charity", "Charity")]
                .into_iter()
                .map(move |(account, label)| {
                    Platform::new(
                        format!("{service}-{account}"),
                        format!("{name} ({label})"),
                        service,
                    )
                })
        })
        .collect();
        Self { platforms }
    }

    pub fn get(&self, id: &str) -> Option<&Platform> {
        self.platforms.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Platform> {
        self.platforms.iter()
    }

    pub fn as_slice(&self) -> &[Platform] {
        &self.platforms
    }

    pub fn len(&self) -> usize {
        self.platforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }
}

impl Default for PlatformRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
