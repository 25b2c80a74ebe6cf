//! Partial overrides for capabilities, chart metadata and release, and the
//! merge engine that layers them.
//!
//! Every override category is merged leaf by leaf: a job may override
//! `minorVersion` and inherit `majorVersion` and `apiVersions` from its suite.
//! Merging is pure; [`Merge::merge`] returns a new partial and never touches
//! either input.

use super::field::Field;
use crate::render::{Capabilities, ChartMetadata, Release};

/// Layers an override on top of a base partial.
pub trait Merge {
    fn merge(&self, over: &Self) -> Self;
}

// ============================================================================
// CAPABILITIES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CapabilitiesOverride {
    pub major_version: Field<String>,
    pub minor_version: Field<String>,
    pub api_versions: Field<Vec<String>>,
}

impl Merge for CapabilitiesOverride {
    fn merge(&self, over: &Self) -> Self {
        Self {
            major_version: over.major_version.layer_scalar(&self.major_version),
            minor_version: over.minor_version.layer_scalar(&self.minor_version),
            api_versions: over.api_versions.layer_list(&self.api_versions),
        }
    }
}

impl CapabilitiesOverride {
    pub fn resolve(&self, defaults: &Capabilities) -> Capabilities {
        Capabilities {
            major_version: self.major_version.resolve_or(&defaults.major_version),
            minor_version: self.minor_version.resolve_or(&defaults.minor_version),
            api_versions: match &self.api_versions {
                Field::Value(list) => list.clone(),
                Field::Null => Vec::new(),
                Field::Absent => defaults.api_versions.clone(),
            },
        }
    }
}

impl From<&Capabilities> for CapabilitiesOverride {
    fn from(caps: &Capabilities) -> Self {
        Self {
            major_version: Field::Value(caps.major_version.clone()),
            minor_version: Field::Value(caps.minor_version.clone()),
            api_versions: Field::Value(caps.api_versions.clone()),
        }
    }
}

// ============================================================================
// CHART METADATA
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChartOverride {
    pub version: Field<String>,
    pub app_version: Field<String>,
}

impl Merge for ChartOverride {
    fn merge(&self, over: &Self) -> Self {
        Self {
            version: over.version.layer_scalar(&self.version),
            app_version: over.app_version.layer_scalar(&self.app_version),
        }
    }
}

impl ChartOverride {
    pub fn resolve(&self, defaults: &ChartMetadata) -> ChartMetadata {
        ChartMetadata {
            name: defaults.name.clone(),
            version: self.version.resolve_or(&defaults.version),
            app_version: self.app_version.resolve_or(&defaults.app_version),
        }
    }
}

// ============================================================================
// RELEASE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReleaseOverride {
    pub name: Field<String>,
    pub namespace: Field<String>,
    pub revision: Field<u32>,
    pub upgrade: Field<bool>,
}

impl Merge for ReleaseOverride {
    fn merge(&self, over: &Self) -> Self {
        Self {
            name: over.name.layer_scalar(&self.name),
            namespace: over.namespace.layer_scalar(&self.namespace),
            revision: over.revision.layer_scalar(&self.revision),
            upgrade: over.upgrade.layer_scalar(&self.upgrade),
        }
    }
}

impl ReleaseOverride {
    pub fn resolve(&self, defaults: &Release) -> Release {
        Release {
            name: self.name.resolve_or(&defaults.name),
            namespace: self.namespace.resolve_or(&defaults.namespace),
            revision: self.revision.resolve_or(&defaults.revision),
            upgrade: self.upgrade.resolve_or(&defaults.upgrade),
        }
    }
}
