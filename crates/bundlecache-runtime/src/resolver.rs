//! Dependency resolution with variant remapping

use bundlecache_bundle::{DependencyManifest, split_variant};
use std::collections::HashSet;

/// Resolves a bundle's dependencies against the manifest and active variants
///
/// A dependency named `base.tag` is remapped to the variant of `base` whose
/// tag comes earliest in the active variant list. When no active tag matches,
/// the first variant in name order is used and a warning is logged.
#[derive(Debug, Clone, Default)]
pub struct DependencyResolver {
    manifest: DependencyManifest,
    active_variants: Vec<String>,
}

impl DependencyResolver {
    /// Create a resolver
    pub fn new(manifest: DependencyManifest, active_variants: Vec<String>) -> Self {
        Self {
            manifest,
            active_variants,
        }
    }

    /// Get the dependency manifest
    pub fn manifest(&self) -> &DependencyManifest {
        &self.manifest
    }

    /// Variant tags in priority order
    pub fn active_variants(&self) -> &[String] {
        &self.active_variants
    }

    /// Whether the manifest knows `name`
    pub fn contains(&self, name: &str) -> bool {
        self.manifest.contains(name)
    }

    /// Direct dependencies of `name`, with variants remapped
    ///
    /// Unknown bundles have no dependencies.
    pub fn dependencies(&self, name: &str) -> Vec<String> {
        let mut deps: Vec<String> = Vec::new();
        for dep in self.manifest.direct_dependencies(name) {
            let resolved = self.remap_variant(dep);
            if !deps.contains(&resolved) {
                deps.push(resolved);
            }
        }
        deps
    }

    /// Pick the bundle to load for a possibly variant-tagged name
    pub fn remap_variant(&self, name: &str) -> String {
        let (base, Some(_)) = split_variant(name) else {
            return name.to_string();
        };

        let candidates = self.manifest.variants_of(base);
        if candidates.is_empty() {
            return name.to_string();
        }

        let preferred = candidates
            .iter()
            .filter_map(|candidate| {
                let (_, tag) = split_variant(candidate);
                let rank = self
                    .active_variants
                    .iter()
                    .position(|active| Some(active.as_str()) == tag)?;
                Some((rank, *candidate))
            })
            .min_by_key(|(rank, _)| *rank)
            .map(|(_, candidate)| candidate);

        match preferred {
            Some(candidate) => candidate.to_string(),
            None => {
                let fallback = candidates[0];
                if candidates.len() > 1 {
                    tracing::warn!(
                        dependency = name,
                        chosen = fallback,
                        candidates = ?candidates,
                        "no active variant matches; using first candidate"
                    );
                }
                fallback.to_string()
            }
        }
    }

    /// Transitive dependencies of `name`, dependencies before dependents
    ///
    /// Each bundle appears once and `name` itself is excluded. Cycles are cut
    /// at the edge that closes them.
    pub fn all_dependencies(&self, name: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut done = HashSet::new();
        let mut visiting = HashSet::from([name.to_string()]);
        self.visit(name, &mut visiting, &mut done, &mut out);
        out
    }

    fn visit(
        &self,
        name: &str,
        visiting: &mut HashSet<String>,
        done: &mut HashSet<String>,
        out: &mut Vec<String>,
    ) {
        for dep in self.dependencies(name) {
            if done.contains(&dep) {
                continue;
            }
            if visiting.contains(&dep) {
                tracing::warn!(bundle = name, dependency = %dep, "dependency cycle ignored");
                continue;
            }

            visiting.insert(dep.clone());
            self.visit(&dep, visiting, done, out);
            visiting.remove(&dep);

            done.insert(dep.clone());
            out.push(dep);
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use test_case::test_case;

    fn manifest() -> DependencyManifest {
        DependencyManifest::new()
            .with_bundle("characters", ["shared", "textures.hd"])
            .with_bundle("shared", ["core"])
            .with_bundle("core", Vec::<String>::new())
            .with_bundle("textures.hd", ["core"])
            .with_bundle("textures.sd", ["core"])
            .with_bundle("textures.uhd", ["core"])
    }

    fn resolver(active: &[&str]) -> DependencyResolver {
        DependencyResolver::new(manifest(), active.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn DependencyResolver___dependencies___plain_names_unchanged() {
        let resolver = resolver(&[]);

        assert_eq!(resolver.dependencies("shared"), vec!["core"]);
        assert!(resolver.dependencies("core").is_empty());
        assert!(resolver.dependencies("unknown").is_empty());
    }

    #[test_case(&["sd"], "textures.sd" ; "single active tag")]
    #[test_case(&["uhd", "sd"], "textures.uhd" ; "earliest active tag wins")]
    #[test_case(&["xx", "sd", "hd"], "textures.sd" ; "unknown tags skipped")]
    #[test_case(&[], "textures.hd" ; "no active tags falls back to name order")]
    #[test_case(&["ld"], "textures.hd" ; "no match falls back to name order")]
    fn DependencyResolver___dependencies___remaps_variant(active: &[&str], expected: &str) {
        let resolver = resolver(active);

        let deps = resolver.dependencies("characters");

        assert_eq!(deps, vec!["shared".to_string(), expected.to_string()]);
    }

    #[test]
    fn DependencyResolver___remap_variant___unknown_base_unchanged() {
        let resolver = resolver(&["sd"]);

        assert_eq!(resolver.remap_variant("audio.sd"), "audio.sd");
    }

    #[test]
    fn DependencyResolver___all_dependencies___dependencies_first_without_duplicates() {
        let resolver = resolver(&["sd"]);

        let all = resolver.all_dependencies("characters");

        assert_eq!(all, vec!["core", "shared", "textures.sd"]);
    }

    #[test]
    fn DependencyResolver___all_dependencies___cuts_cycles() {
        let manifest = DependencyManifest::new()
            .with_bundle("a", ["b"])
            .with_bundle("b", ["c"])
            .with_bundle("c", ["a"]);
        let resolver = DependencyResolver::new(manifest, Vec::new());

        let all = resolver.all_dependencies("a");

        assert_eq!(all, vec!["c", "b"]);
    }
}
