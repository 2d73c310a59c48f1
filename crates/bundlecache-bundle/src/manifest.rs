//! Dependency manifest carried inside the platform master bundle.
//!
//! The manifest maps every bundle name to its direct dependencies. Bundles
//! built in several variants are named `base.tag` (e.g. `ui.hd`, `ui.sd`);
//! a dependency on any variant is remapped at runtime to the preferred one.

use crate::{BundleError, BundleResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Name of the manifest object inside the master bundle.
pub const DEPENDENCY_MANIFEST_OBJECT: &str = "dependencies.json";

/// Separator between a bundle's base name and its variant tag.
pub const VARIANT_SEPARATOR: char = '.';

/// Split a bundle name into its base and optional variant tag.
///
/// # Example
///
/// ```
/// use bundlecache_bundle::split_variant;
///
/// assert_eq!(split_variant("ui.hd"), ("ui", Some("hd")));
/// assert_eq!(split_variant("ui"), ("ui", None));
/// ```
#[must_use]
pub fn split_variant(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once(VARIANT_SEPARATOR) {
        Some((base, tag)) if !base.is_empty() && !tag.is_empty() => (base, Some(tag)),
        _ => (name, None),
    }
}

/// Bundle dependency graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyManifest {
    /// Bundle name to its direct dependencies, in load order.
    #[serde(default)]
    pub bundles: BTreeMap<String, Vec<String>>,
}

impl DependencyManifest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a bundle and its direct dependencies, replacing any previous entry.
    pub fn add_bundle<I, S>(&mut self, name: &str, dependencies: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bundles.insert(
            name.to_string(),
            dependencies.into_iter().map(Into::into).collect(),
        );
    }

    /// Builder form of [`add_bundle`](Self::add_bundle).
    #[must_use]
    pub fn with_bundle<I, S>(mut self, name: &str, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_bundle(name, dependencies);
        self
    }

    /// Direct dependencies of `name`; empty when unknown.
    #[must_use]
    pub fn direct_dependencies(&self, name: &str) -> &[String] {
        self.bundles.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.bundles.contains_key(name)
    }

    /// All bundle names in sorted order.
    pub fn bundle_names(&self) -> impl Iterator<Item = &str> {
        self.bundles.keys().map(String::as_str)
    }

    /// Bundles sharing the base name `base` that carry a variant tag, sorted.
    #[must_use]
    pub fn variants_of(&self, base: &str) -> Vec<&str> {
        self.bundle_names()
            .filter(|name| matches!(split_variant(name), (b, Some(_)) if b == base))
            .collect()
    }

    /// Check that every dependency names a known bundle and no bundle depends
    /// on itself.
    ///
    /// A variant dependency is accepted when any variant of its base exists.
    pub fn validate(&self) -> BundleResult<()> {
        let names: BTreeSet<&str> = self.bundle_names().collect();

        for (name, deps) in &self.bundles {
            if name.is_empty() {
                return Err(BundleError::InvalidManifest(
                    "bundle name cannot be empty".to_string(),
                ));
            }
            for dep in deps {
                if dep == name {
                    return Err(BundleError::InvalidManifest(format!(
                        "{name} depends on itself"
                    )));
                }
                let known = names.contains(dep.as_str())
                    || match split_variant(dep) {
                        (base, Some(_)) => !self.variants_of(base).is_empty(),
                        (_, None) => false,
                    };
                if !known {
                    return Err(BundleError::InvalidManifest(format!(
                        "{name} depends on unknown bundle {dep}"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> BundleResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON bytes and validate.
    pub fn from_bytes(bytes: &[u8]) -> BundleResult<Self> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        let manifest: Self = serde_json::from_slice(bytes)?;
        manifest.validate()?;
        Ok(manifest)
    }
}
